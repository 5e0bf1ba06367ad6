// Strongly-typed identifiers shared across the workflow core

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }
    };
}

numeric_id!(
    /// A workflow definition
    CircuitId
);
numeric_id!(
    /// A named state inside a circuit
    StatusId
);
numeric_id!(
    /// A directed edge between two statuses
    StepId
);
numeric_id!(DocumentId);
numeric_id!(
    /// Identity of a registered approver. Distinct from the underlying user id.
    ApprovatorId
);
numeric_id!(UserId);
numeric_id!(GroupId);
