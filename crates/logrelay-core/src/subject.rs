//! Well-known bus subjects

pub const LOGGER_SET: &str = "logger.set";
pub const LOGGER_DEL: &str = "logger.del";
pub const LOGGER_FIND: &str = "logger.find";
pub const LOGGER_LOG: &str = "logger.log";

pub const DIRECTORY_FIND: &str = "datacenter.find";
pub const DIRECTORY_UPDATE: &str = "datacenter.set";

/// Patterns every adapter subscribes to (wildcard depths 1 to 4).
pub const ADAPTER_PATTERNS: [&str; 4] = ["*", "*.*", "*.*.*", "*.*.*.*"];

/// Pattern the router subscribes to.
pub const ROUTER_PATTERN: &str = ">";

pub const INBOX_PREFIX: &str = "_INBOX.";

/// Name of the live stream the router broadcasts on.
pub const LOGS_STREAM: &str = "logs";

/// `logger.log` carries pre-redacted records and must never loop back into redaction.
pub fn is_log_subject(subject: &str) -> bool {
    subject == LOGGER_LOG
}

/// Whether the router should redact and broadcast a message on this subject.
pub fn is_routable(subject: &str) -> bool {
    !is_log_subject(subject) && !subject.starts_with(INBOX_PREFIX)
}
