//! Shared infrastructure for the AigentQube orchestration workspace:
//! logging bootstrap, the bounded diagnostic log, error severity, timeout
//! presets and the cancellable periodic scheduler.

pub mod config_base;
pub mod diagnostic_log;
pub mod errors;
pub mod scheduler;
pub mod structured_logging;

pub use config_base::TimeoutConfigBase;
pub use diagnostic_log::{DiagnosticLog, DiagnosticLogLayer, LogLevel, LogLine, DEFAULT_CAPACITY};
pub use errors::{ErrorSeverity, HasSeverity};
pub use scheduler::{JobId, ScheduledJob, Scheduler};
pub use structured_logging::{init_structured_logging, JsonFormatter, LoggingConfig, StructuredLogEntry};
