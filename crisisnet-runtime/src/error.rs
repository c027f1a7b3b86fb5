use crisisnet_core::CoreError;
use crisisnet_ports::PortError;
use thiserror::Error;

/// Errors from pipeline execution
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// A required signal provider failed; the run cannot continue
    #[error("signal provider failed: {0}")]
    Provider(#[from] PortError),

    #[error(transparent)]
    Core(#[from] CoreError),
}
