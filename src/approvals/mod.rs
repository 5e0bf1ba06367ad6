// Approval model, quorum policy and request lifecycle

pub mod types;
pub mod policy;
pub mod lifecycle;

pub use types::{
    ApprovalGroup, ApprovalRequest, ApprovalResponse, ApprovalTarget, Approver, Decision,
    RequestId, RequestState, RuleType,
};
pub use policy::{ApprovalPolicyResolver, QuorumVerdict};
pub use lifecycle::RequestLifecycle;
