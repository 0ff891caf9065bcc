mod directory;

pub use directory::{ApiErrorBody, ApiErrorObject, DirectoryError};

pub trait IsRetryable {
    fn is_retryable(&self) -> bool;
}
