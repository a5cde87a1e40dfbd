//! Domain types shared with event producers.

pub mod task_event;

pub use task_event::{TaskEvent, TaskEventKind};
