pub mod employee;
pub mod project;
pub mod session;
pub mod user;
