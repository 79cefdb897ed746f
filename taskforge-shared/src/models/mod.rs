/// Database models for Taskforge
///
/// # Models
///
/// - `user`: User accounts and authentication
/// - `task`: Per-user tasks with priority, status, and due dates

pub mod task;
pub mod user;
