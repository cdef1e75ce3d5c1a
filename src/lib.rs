pub mod config;
pub mod events;
pub mod logging;

// Re-export commonly used types
pub use config::{ConsoleConfig, LogLevel};
pub use events::{ConsoleEvent, EventBroadcaster};
pub use logging::{LogConfig, LogGuard};
