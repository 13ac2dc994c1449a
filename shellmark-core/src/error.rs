use thiserror::Error;

#[derive(Debug, Error)]
pub enum IntegrationError {
    /// A lifecycle event arrived while another one was still being handled.
    /// The host must dispatch prompt events one at a time.
    #[error("prompt lifecycle event `{0}` re-entered while another event was in progress")]
    Reentrant(&'static str),
}
