/// Errors raised by a page session.
///
/// The resolver and the collection flows only care about three broad
/// categories (see [`ErrorKind`]), so every variant maps onto one of them.
#[derive(thiserror::Error, Debug, Clone)]
pub enum SessionError {
    // ============================================================
    // Expected failures
    // ============================================================
    #[error("Timeout")]
    Timeout,

    #[error("Timeout: {operation}")]
    TimeoutWithContext { operation: String },

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Element {id} is stale (removed from DOM)")]
    ElementStale { id: u32 },

    // ============================================================
    // Session loss
    // ============================================================
    #[error("Session closed")]
    SessionClosed,

    #[error("Connection lost")]
    ConnectionLost,

    #[error("Not ready")]
    NotReady,

    // ============================================================
    // Everything else
    // ============================================================
    #[error("Navigation failed: {0}")]
    Navigation(String),

    #[error("Invalid selector: {selector}")]
    SelectorInvalid { selector: String },

    #[error("Script execution error: {0}")]
    ScriptError(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Other: {0}")]
    Other(String),

    #[error("Not supported: {0}")]
    NotSupported(String),
}

/// Coarse classification used to decide whether a search keeps going.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Timeout or nothing matched: try the next candidate.
    NotFound,
    /// The page or browser is gone: abort the current operation.
    SessionClosed,
    /// Anything else: log with detail and treat as a soft failure.
    Unexpected,
}

impl From<std::io::Error> for SessionError {
    fn from(err: std::io::Error) -> Self {
        SessionError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for SessionError {
    fn from(err: serde_json::Error) -> Self {
        SessionError::Serialization(err.to_string())
    }
}

impl SessionError {
    /// Map a raw driver message onto a variant.
    ///
    /// Browser drivers report closed targets and dropped connections as plain
    /// strings, so this inspects the text.
    pub fn from_driver_message(message: impl Into<String>) -> Self {
        let message = message.into();
        if is_closed_message(&message) {
            SessionError::SessionClosed
        } else if message.to_ascii_lowercase().contains("timeout") {
            SessionError::TimeoutWithContext { operation: message }
        } else {
            SessionError::Other(message)
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            SessionError::Timeout
            | SessionError::TimeoutWithContext { .. }
            | SessionError::ElementNotFound(_)
            | SessionError::ElementStale { .. } => ErrorKind::NotFound,
            SessionError::SessionClosed | SessionError::ConnectionLost | SessionError::NotReady => {
                ErrorKind::SessionClosed
            }
            _ => ErrorKind::Unexpected,
        }
    }

    pub fn is_session_closed(&self) -> bool {
        self.kind() == ErrorKind::SessionClosed
    }

    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            SessionError::Timeout | SessionError::TimeoutWithContext { .. }
        )
    }

    /// Stable error code for logs and reports.
    pub fn code(&self) -> &'static str {
        match self {
            SessionError::Timeout | SessionError::TimeoutWithContext { .. } => "TIMEOUT",
            SessionError::ElementNotFound(_) => "ELEMENT_NOT_FOUND",
            SessionError::ElementStale { .. } => "ELEMENT_STALE",
            SessionError::SessionClosed => "SESSION_CLOSED",
            SessionError::ConnectionLost => "CONNECTION_LOST",
            SessionError::NotReady => "NOT_READY",
            SessionError::Navigation(_) => "NAVIGATION_ERROR",
            SessionError::SelectorInvalid { .. } => "SELECTOR_INVALID",
            SessionError::ScriptError(_) => "SCRIPT_ERROR",
            SessionError::Io(_) => "IO_ERROR",
            SessionError::Serialization(_) => "SERIALIZATION_ERROR",
            SessionError::Other(_) => "INTERNAL_ERROR",
            SessionError::NotSupported(_) => "NOT_SUPPORTED",
        }
    }
}

fn is_closed_message(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    lower.contains("closed")
        || lower.contains("disconnect")
        || lower.contains("target crashed")
        || lower.contains("no such target")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_driver_messages() {
        assert!(
            SessionError::from_driver_message("Target page, context or browser has been closed")
                .is_session_closed()
        );
        assert!(SessionError::from_driver_message("websocket disconnected").is_session_closed());
        assert!(SessionError::from_driver_message("Request timeout after 30s").is_timeout());
        assert_eq!(
            SessionError::from_driver_message("Cannot read properties of null").kind(),
            ErrorKind::Unexpected
        );
    }

    #[test]
    fn kinds_follow_variants() {
        assert_eq!(SessionError::Timeout.kind(), ErrorKind::NotFound);
        assert_eq!(SessionError::ElementStale { id: 3 }.kind(), ErrorKind::NotFound);
        assert_eq!(SessionError::NotReady.kind(), ErrorKind::SessionClosed);
        assert_eq!(SessionError::ScriptError("x".into()).kind(), ErrorKind::Unexpected);
        assert_eq!(SessionError::ConnectionLost.code(), "CONNECTION_LOST");
    }
}
