pub mod console;
pub mod event;
pub mod task;

// Re-export for convenience
pub use console::ConsoleApi;
pub use event::EventApi;
pub use task::{TaskApi, TrackOptions};
