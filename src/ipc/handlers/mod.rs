pub mod backup;
pub mod class_groups;
pub mod conflicts;
pub mod core;
pub mod courses;
pub mod grid;
pub mod session;
pub mod slots;
pub mod staff;
pub mod subjects;
