use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum QueueError {
    #[error("Config parse error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, QueueError>;

/// Returned by [`ConcurrentQueue::try_push`](crate::ConcurrentQueue::try_push)
/// when the value could not be enqueued. The value is handed back untouched.
#[derive(Error, PartialEq, Eq)]
pub enum PushError<T> {
    #[error("node allocation failed")]
    AllocationFailed(T),
}

impl<T> PushError<T> {
    pub fn into_inner(self) -> T {
        match self {
            Self::AllocationFailed(value) => value,
        }
    }
}

// No `T: Debug` bound, so the error stays usable with opaque payloads.
impl<T> fmt::Debug for PushError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AllocationFailed(_) => f.write_str("AllocationFailed(..)"),
        }
    }
}
