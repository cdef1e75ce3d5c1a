pub mod console;
pub mod event;
pub mod task;
