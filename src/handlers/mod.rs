pub mod auth;
pub mod employee;
pub mod project;
pub mod storage;
pub mod user;

use crate::db::StoreError;
use crate::errors::AppError;
use crate::state::AppState;

pub(crate) fn taken_message(field: &str) -> String {
    format!("The {} has already been taken.", field.replace('_', " "))
}

pub(crate) fn taken(field: &str) -> AppError {
    AppError::field(field, taken_message(field))
}

/// Like [`AppState::internal`], but a unique-constraint conflict becomes a 422
/// on the offending field.
pub(crate) fn store_failure(state: &AppState, message: &'static str) -> impl Fn(StoreError) -> AppError {
    let internal = state.internal::<StoreError>(message);
    move |err| match err {
        StoreError::Conflict(field) => taken(field),
        other => internal(other),
    }
}
