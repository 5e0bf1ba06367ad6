use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

use crate::ids::DocumentId;

/// Initialize structured logging
///
/// Logs go to stderr so command output on stdout stays machine-readable.
/// `RUST_LOG` wins over `default_level` when set.
pub fn init_telemetry(json: bool, default_level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))?;

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_writer(std::io::stderr),
            )
            .try_init()?;
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()?;
    }

    tracing::debug!("Circuit telemetry initialized");
    Ok(())
}

/// Generate a correlation ID for linking related operations
pub fn generate_correlation_id() -> String {
    Uuid::new_v4().to_string()
}

/// Span wrapping one workflow operation on a document
pub fn create_workflow_span(
    operation: &str,
    document_id: DocumentId,
    correlation_id: &str,
) -> tracing::Span {
    tracing::info_span!(
        "workflow",
        workflow.operation = operation,
        document.id = %document_id,
        correlation.id = correlation_id,
        otel.kind = "internal"
    )
}

pub fn shutdown_telemetry() {
    tracing::debug!("Circuit telemetry shutdown complete");
}
