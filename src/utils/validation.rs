use chrono::NaiveDate;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::errors::{AppError, FieldErrors};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn validate_payload<T: Validate>(payload: &T) -> Result<(), AppError> {
    check(payload).into_result()
}

/// Collected field errors, so handlers can add their own checks
/// (uniqueness, uploads) before failing.
#[derive(Debug, Default)]
pub struct Report {
    errors: FieldErrors,
}

impl Report {
    pub fn push(&mut self, field: &str, message: impl Into<String>) {
        self.errors.entry(field.to_string()).or_default().push(message.into());
    }

    pub fn has(&self, field: &str) -> bool {
        self.errors.contains_key(field)
    }

    pub fn into_result(self) -> Result<(), AppError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(self.errors))
        }
    }
}

pub fn check<T: Validate>(payload: &T) -> Report {
    let mut report = Report::default();
    if let Err(err) = payload.validate() {
        collect(&err, &mut report);
    }
    report
}

fn collect(err: &ValidationErrors, report: &mut Report) {
    let mut fields: Vec<_> = err.field_errors().into_iter().collect();
    fields.sort_by_key(|(field, _)| *field);
    for (field, errors) in fields {
        for error in errors {
            report.push(field, message_for(field, error));
        }
    }
}

fn message_for(field: &str, error: &ValidationError) -> String {
    if let Some(message) = &error.message {
        return message.to_string();
    }
    let label = field.replace('_', " ");
    match error.code.as_ref() {
        "required" => format!("The {label} field is required."),
        "email" => format!("The {label} field must be a valid email address."),
        "url" => format!("The {label} field must be a valid URL."),
        "date" => format!("The {label} field must be a valid date."),
        "length" => {
            let len = error
                .params
                .get("value")
                .and_then(|v| v.as_str())
                .map(|v| v.chars().count() as u64);
            let min = error.params.get("min").and_then(|v| v.as_u64());
            let max = error.params.get("max").and_then(|v| v.as_u64());
            match (len, min, max) {
                (Some(len), Some(min), _) if len < min => {
                    format!("The {label} field must be at least {min} characters.")
                }
                (_, _, Some(max)) => format!("The {label} field must not be greater than {max} characters."),
                (_, Some(min), None) => format!("The {label} field must be at least {min} characters."),
                _ => format!("The {label} field has an invalid length."),
            }
        }
        _ => format!("The selected {label} is invalid."),
    }
}

/// A field that is present may not be blank.
pub fn non_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("required"));
    }
    Ok(())
}

pub fn validate_date(value: &str) -> Result<(), ValidationError> {
    parse_date(value)
        .map(|_| ())
        .ok_or_else(|| ValidationError::new("date"))
}

pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).ok()
}

pub fn validate_gender(gender: &str) -> Result<(), ValidationError> {
    if gender != "Male" && gender != "Female" {
        return Err(ValidationError::new("gender"));
    }
    Ok(())
}

/// Empty optional inputs are stored as NULL.
pub fn blank_to_none(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
