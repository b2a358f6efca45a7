//! Error taxonomy shared by the store, the log pipeline and the agent protocol

use thiserror::Error;

/// Result alias used across the library
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors surfaced by Harbor operations
///
/// Unary protocol calls collapse these into three gRPC codes
/// (`NOT_FOUND`, `INVALID_ARGUMENT`, `INTERNAL`); see the `From` impls below.
#[derive(Debug, Error)]
pub enum Error {
    /// The requested container does not exist on the host
    #[error("container {0} not found")]
    NotFound(String),

    /// The request was malformed and never reached the runtime
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The container runtime rejected or failed an operation
    #[error("runtime error: {0}")]
    Runtime(String),

    /// A log, event or stat stream failed mid-flight
    #[error("stream error: {0}")]
    Stream(String),

    /// The host (local runtime or remote agent) could not be reached
    #[error("host unavailable: {0}")]
    Unavailable(String),

    /// The store never completed its initial container listing
    #[error("container store is not initialized: {0}")]
    Uninitialized(String),

    /// TLS material could not be loaded or was rejected
    #[error("tls configuration error: {0}")]
    Tls(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True when the error means the container is absent
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}

impl From<Error> for tonic::Status {
    fn from(err: Error) -> Self {
        match err {
            Error::NotFound(id) => tonic::Status::not_found(format!("container {} not found", id)),
            Error::InvalidArgument(msg) => tonic::Status::invalid_argument(msg),
            other => tonic::Status::internal(other.to_string()),
        }
    }
}

impl From<tonic::Status> for Error {
    fn from(status: tonic::Status) -> Self {
        match status.code() {
            tonic::Code::NotFound => {
                let message = status.message();
                let id = message
                    .strip_prefix("container ")
                    .and_then(|rest| rest.strip_suffix(" not found"))
                    .unwrap_or(message);
                Error::NotFound(id.to_string())
            }
            tonic::Code::InvalidArgument => Error::InvalidArgument(status.message().to_string()),
            tonic::Code::Unavailable | tonic::Code::DeadlineExceeded | tonic::Code::Cancelled => {
                Error::Unavailable(status.message().to_string())
            }
            _ => Error::Stream(status.message().to_string()),
        }
    }
}

impl From<tonic::transport::Error> for Error {
    fn from(err: tonic::transport::Error) -> Self {
        Error::Unavailable(err.to_string())
    }
}
