pub mod form;
pub mod password;
pub mod uploads;
pub mod validation;
