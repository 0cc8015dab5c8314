use bridge_traits::error::BridgeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ListingError {
    #[error("Listing request failed with HTTP {status} for {path}")]
    Http { status: u16, path: String },

    #[error("Listing request timed out for {path}")]
    Timeout { path: String },

    #[error("Network failure fetching {path}: {message}")]
    Network { path: String, message: String },

    #[error("Listing response was not valid text: {0}")]
    InvalidResponse(String),
}

impl From<ListingError> for BridgeError {
    fn from(err: ListingError) -> Self {
        match err {
            ListingError::Timeout { .. } => BridgeError::Timeout(err.to_string()),
            other => BridgeError::OperationFailed(other.to_string()),
        }
    }
}
