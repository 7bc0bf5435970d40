pub mod listener;
pub mod message;

pub use listener::{ListenerError, SyslogListener};
pub use message::{parse_rfc3164, LogRecord};
