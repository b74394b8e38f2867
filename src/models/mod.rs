pub mod project;
pub mod user;
pub mod visit;
