pub mod reports;
pub mod tasks;
pub mod users;
