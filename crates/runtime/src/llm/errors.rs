use thiserror::Error;

/// Errors from model provider calls.
///
/// These never leave the adapter: [`Provider::generate`](crate::Provider::generate)
/// folds them into a final text outcome.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ModelError {
    /// The request never reached the provider, or the connection dropped.
    #[error("network: {0}")]
    Network(String),

    /// The provider answered with a non-success status.
    #[error("provider api: {0}")]
    Api(String),

    /// The provider envelope could not be decoded.
    #[error("invalid provider response: {0}")]
    InvalidResponse(String),
}
