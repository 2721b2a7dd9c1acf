use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum ServiceError {
    /// The call does not fit the scheduler's current state.
    IllegalState(String),
    /// No timer/runtime to schedule ticks on.
    Unavailable(String),
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceError::IllegalState(msg) => write!(f, "illegal state: {msg}"),
            ServiceError::Unavailable(msg) => write!(f, "scheduling unavailable: {msg}"),
        }
    }
}

impl std::error::Error for ServiceError {}

pub type Result<T> = std::result::Result<T, ServiceError>;
