pub mod containers;
pub mod logs;
pub mod watch;
