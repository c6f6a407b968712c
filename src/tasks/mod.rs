//! Tasks — the caller-visible job records and their HTTP surface.

pub mod model;
pub mod routes;
pub mod service;

pub use model::{Counts, Task, TaskPage, TaskQuery, TaskStatus, TerminalOutcome};
pub use routes::{TaskRouteState, app, task_routes};
pub use service::TaskService;
