use serde::{Deserialize, Serialize};
use std::fmt;

/// Error severity used to decide whether a failure is surfaced to the user.
///
/// Severity is assigned where the error is constructed, never inferred from
/// the message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorSeverity {
    /// Expected condition, logged only
    Informational,
    /// Degraded operation, caller may retry or fall back
    Recoverable,
    /// Requires intervention (bad configuration, programmer error)
    Fatal,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorSeverity::Informational => write!(f, "informational"),
            ErrorSeverity::Recoverable => write!(f, "recoverable"),
            ErrorSeverity::Fatal => write!(f, "fatal"),
        }
    }
}

/// Errors that know their own severity
pub trait HasSeverity {
    fn severity(&self) -> ErrorSeverity;

    /// Whether the failure should produce a user-facing alert
    fn should_alert(&self) -> bool {
        self.severity() > ErrorSeverity::Informational
    }

    fn is_fatal(&self) -> bool {
        self.severity() == ErrorSeverity::Fatal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Probe(ErrorSeverity);

    impl HasSeverity for Probe {
        fn severity(&self) -> ErrorSeverity {
            self.0
        }
    }

    #[test]
    fn test_severity_ordering() {
        assert!(ErrorSeverity::Fatal > ErrorSeverity::Recoverable);
        assert!(ErrorSeverity::Recoverable > ErrorSeverity::Informational);
    }

    #[test]
    fn test_alerting() {
        assert!(!Probe(ErrorSeverity::Informational).should_alert());
        assert!(Probe(ErrorSeverity::Recoverable).should_alert());
        assert!(Probe(ErrorSeverity::Fatal).is_fatal());
    }

    #[test]
    fn test_display() {
        assert_eq!(ErrorSeverity::Recoverable.to_string(), "recoverable");
    }
}
