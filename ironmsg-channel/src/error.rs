//! Error types for channel operations.

use thiserror::Error;

/// Error type for publisher/subscriber operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MsgError {
    /// The API was used in a way the channel protocol forbids.
    ///
    /// Blank names, double registration, pushing before `lock`, consuming
    /// without a publisher and similar programming errors end up here.
    #[error("bad use: {message}")]
    BadUse {
        /// Error message.
        message: String,
    },

    /// A bounded wait expired with no message available.
    #[error("no message before timeout")]
    NoMsg,

    /// The channel was broken by one of its endpoints.
    #[error("channel broken")]
    Broke,
}

impl MsgError {
    pub(crate) fn bad_use(message: impl Into<String>) -> Self {
        Self::BadUse {
            message: message.into(),
        }
    }

    /// Returns the kind of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::BadUse { .. } => ErrorKind::BadUse,
            Self::NoMsg => ErrorKind::NoMsg,
            Self::Broke => ErrorKind::Broke,
        }
    }
}

/// Payload-free discriminant of [`MsgError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// See [`MsgError::BadUse`].
    BadUse,
    /// See [`MsgError::NoMsg`].
    NoMsg,
    /// See [`MsgError::Broke`].
    Broke,
}

/// Error returned by [`DelayQueue`](crate::delay::DelayQueue) operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DelayError {
    /// The queue has been closed.
    #[error("delay queue closed")]
    Closed,
}

/// Result type alias for channel operations.
pub type Result<T> = std::result::Result<T, MsgError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind() {
        assert_eq!(MsgError::bad_use("x").kind(), ErrorKind::BadUse);
        assert_eq!(MsgError::NoMsg.kind(), ErrorKind::NoMsg);
        assert_eq!(MsgError::Broke.kind(), ErrorKind::Broke);
    }

    #[test]
    fn test_display() {
        let err = MsgError::bad_use("[Pub] channel \"a\" is not locked");
        assert_eq!(err.to_string(), "bad use: [Pub] channel \"a\" is not locked");
        assert_eq!(DelayError::Closed.to_string(), "delay queue closed");
    }
}
