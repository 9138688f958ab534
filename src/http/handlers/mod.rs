pub mod attendance;
pub mod core;
pub mod records;
pub mod students;
