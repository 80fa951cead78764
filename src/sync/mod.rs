pub mod bootstrap;
pub mod detail;
pub mod scheduler;
pub mod session_watch;
