//! Per-level shortcuts for [`Logger::log`].

use crate::{level::LogLevel, log_record::Context};

use super::Logger;

macro_rules! level_methods {
    ($($(#[$meta:meta])* $name:ident => $level:expr;)+) => {
        impl Logger {
            $(
                $(#[$meta])*
                pub fn $name(&self, message: &str, context: Context) {
                    self.log($level, message, context);
                }
            )+
        }
    };
}

level_methods! {
    /// System is unusable.
    emergency => LogLevel::Emergency;
    /// Action must be taken immediately.
    alert => LogLevel::Alert;
    critical => LogLevel::Critical;
    error => LogLevel::Error;
    warning => LogLevel::Warning;
    notice => LogLevel::Notice;
    info => LogLevel::Info;
    debug => LogLevel::Debug;
}
