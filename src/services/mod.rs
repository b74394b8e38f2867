pub mod projects;
pub mod users;
pub mod visits;
