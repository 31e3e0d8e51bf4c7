//! Employee code allocation.
//!
//! The next code is derived from the employee with the highest primary key,
//! not from the highest numeric suffix. Deleting the newest employee and
//! creating another therefore re-issues the deleted code. Uniqueness is
//! enforced by the store; a losing concurrent insert re-reads and retries.

use thiserror::Error;

use crate::db::{EmployeeStore, StoreError};
use crate::models::employee::EmployeeDraft;

pub const EMPLOYEE_ID_PREFIX: &str = "DTG";
pub const MAX_ALLOCATION_ATTEMPTS: usize = 5;

#[derive(Debug, Error)]
pub enum AllocationError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("could not allocate a unique employee id after {0} attempts")]
    Exhausted(usize),
}

/// Code following `last`, or the first code when there is no previous one.
pub fn next_employee_id(last: Option<&str>) -> String {
    let next = match last {
        Some(code) if !code.is_empty() => suffix_number(code).saturating_add(1),
        _ => 1,
    };
    format!("{EMPLOYEE_ID_PREFIX}{next:03}")
}

/// Leading digits after the 3-character prefix; anything unparsable counts as 0.
fn suffix_number(code: &str) -> u64 {
    let Some(rest) = code.get(EMPLOYEE_ID_PREFIX.len()..) else {
        return 0;
    };
    let digits: String = rest
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().unwrap_or(0)
}

/// Allocates a code and inserts the employee under it.
pub async fn allocate_and_insert<S>(
    store: &S,
    draft: &EmployeeDraft,
) -> Result<(String, i64), AllocationError>
where
    S: EmployeeStore + ?Sized,
{
    for attempt in 1..=MAX_ALLOCATION_ATTEMPTS {
        let last = store.last_employee_code().await?;
        let code = next_employee_id(last.as_deref());
        match store.insert_employee(&code, draft).await {
            Ok(id) => return Ok((code, id)),
            Err(StoreError::Conflict("employee_id")) => {
                log::warn!("employee id {} already taken (attempt {}), retrying", code, attempt);
            }
            Err(err) => return Err(err.into()),
        }
    }
    Err(AllocationError::Exhausted(MAX_ALLOCATION_ATTEMPTS))
}
