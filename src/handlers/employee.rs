use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use super::{store_failure, taken, taken_message};
use crate::allocator::{self, AllocationError};
use crate::auth::{Capability, Principal};
use crate::db::StoreError;
use crate::errors::AppError;
use crate::models::employee::{EmployeeChanges, EmployeeDetail, EmployeeDraft};
use crate::state::AppState;
use crate::utils::form::{present, FormData, EMPLOYEE_DOCUMENT_RULE};
use crate::utils::password::hash_password;
use crate::utils::uploads;
use crate::utils::validation::{
    self, blank_to_none, non_blank, parse_date, validate_date, validate_gender, Report,
};

#[derive(Deserialize, Validate)]
pub struct CreateEmployee {
    #[validate(required, custom = "non_blank", length(max = 255))]
    name: Option<String>,
    #[validate(required, custom = "non_blank", length(max = 20))]
    phone: Option<String>,
    #[validate(required, custom = "validate_date")]
    date_of_birth: Option<String>,
    #[validate(required, custom = "validate_gender")]
    gender: Option<String>,
    #[validate(required, email)]
    email: Option<String>,
    #[validate(required, length(min = 8))]
    password: Option<String>,
    #[validate(required, custom = "non_blank")]
    address: Option<String>,
    branch_id: Option<String>,
    department: Option<String>,
    designation: Option<String>,
    #[validate(custom = "validate_date")]
    date_of_joining: Option<String>,
    account_holder_name: Option<String>,
    account_number: Option<String>,
    bank_name: Option<String>,
    bank_identifier_code: Option<String>,
    branch_location: Option<String>,
    tax_payer_id: Option<String>,
}

/// Every field may be omitted. Nullable fields distinguish "absent" from
/// an explicit null or empty value, which clears the column.
#[derive(Deserialize, Validate)]
pub struct UpdateEmployee {
    #[validate(custom = "non_blank", length(max = 255))]
    name: Option<String>,
    #[validate(custom = "non_blank", length(max = 20))]
    phone: Option<String>,
    #[validate(custom = "validate_date")]
    date_of_birth: Option<String>,
    #[validate(custom = "validate_gender")]
    gender: Option<String>,
    #[validate(custom = "non_blank", email)]
    email: Option<String>,
    #[validate(length(min = 8))]
    password: Option<String>,
    #[validate(custom = "non_blank")]
    address: Option<String>,
    #[serde(default, deserialize_with = "present")]
    branch_id: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    department: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    designation: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    date_of_joining: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    account_holder_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    account_number: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    bank_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    bank_identifier_code: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    branch_location: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    tax_payer_id: Option<Option<String>>,
}

fn nullable(value: Option<Option<String>>) -> Option<Option<String>> {
    value.map(blank_to_none)
}

fn not_found() -> AppError {
    AppError::not_found("Employee not found")
}

async fn fetch_detail(state: &AppState, id: i64, failed: &'static str) -> Result<EmployeeDetail, AppError> {
    state
        .store
        .find_employee(id)
        .await
        .map_err(state.internal(failed))?
        .ok_or_else(not_found)
}

async fn check_email(
    state: &AppState,
    email: Option<&str>,
    except: Option<i64>,
    report: &mut Report,
    failed: &'static str,
) -> Result<(), AppError> {
    let Some(email) = email else {
        return Ok(());
    };
    if !report.has("email")
        && state
            .store
            .employee_email_taken(email, except)
            .await
            .map_err(state.internal(failed))?
    {
        report.push("email", taken_message("email"));
    }
    Ok(())
}

async fn store_document(
    req: &HttpRequest,
    state: &AppState,
    form: &FormData,
    failed: &'static str,
) -> Result<Option<String>, AppError> {
    let Some(file) = form.file("document") else {
        return Ok(None);
    };
    let url = uploads::save(
        state.blobs.as_ref(),
        &uploads::base_url(req),
        uploads::EMPLOYEE_DOCUMENT_DIR,
        uploads::generated_name(file),
        file,
    )
    .await
    .map_err(state.internal(failed))?;
    Ok(Some(url))
}

pub async fn list_employees(principal: Principal, state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    principal.require(Capability::ManageEmployees)?;

    let employees = state
        .store
        .list_employees()
        .await
        .map_err(state.internal("An error occurred while fetching employees"))?;

    Ok(HttpResponse::Ok().json(json!({
        "status": "success",
        "employees": employees,
    })))
}

pub async fn get_employee(
    principal: Principal,
    state: web::Data<AppState>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    principal.require(Capability::ManageEmployees)?;

    let employee = fetch_detail(&state, path.into_inner(), "An error occurred while fetching employee").await?;

    Ok(HttpResponse::Ok().json(json!({
        "status": "success",
        "employee": employee,
    })))
}

pub async fn create_employee(
    req: HttpRequest,
    principal: Principal,
    state: web::Data<AppState>,
    payload: web::Payload,
) -> Result<HttpResponse, AppError> {
    const FAILED: &str = "An error occurred while creating employee";
    principal.require(Capability::ManageEmployees)?;
    let form = FormData::read(&req, payload).await?;

    let mut input: CreateEmployee = form.parse()?;
    input.date_of_joining = blank_to_none(input.date_of_joining);

    let mut report = validation::check(&input);
    if let Some(document) = form.file("document") {
        EMPLOYEE_DOCUMENT_RULE.check("document", document, &mut report);
    }
    check_email(&state, input.email.as_deref(), None, &mut report, FAILED).await?;
    report.into_result()?;

    let (
        Some(name),
        Some(phone),
        Some(date_of_birth),
        Some(gender),
        Some(email),
        Some(password),
        Some(address),
    ) = (
        input.name,
        input.phone,
        input.date_of_birth.as_deref().and_then(parse_date),
        input.gender,
        input.email,
        input.password,
        input.address,
    )
    else {
        return Err(AppError::field("body", "The given data was invalid."));
    };

    let password_hash = hash_password(&password).map_err(state.internal(FAILED))?;
    let document = store_document(&req, &state, &form, FAILED).await?;

    let draft = EmployeeDraft {
        name,
        phone,
        date_of_birth,
        gender,
        email,
        password_hash,
        address,
        branch_id: blank_to_none(input.branch_id),
        department: blank_to_none(input.department),
        designation: blank_to_none(input.designation),
        date_of_joining: input.date_of_joining.as_deref().and_then(parse_date),
        account_holder_name: blank_to_none(input.account_holder_name),
        account_number: blank_to_none(input.account_number),
        bank_name: blank_to_none(input.bank_name),
        bank_identifier_code: blank_to_none(input.bank_identifier_code),
        branch_location: blank_to_none(input.branch_location),
        tax_payer_id: blank_to_none(input.tax_payer_id),
        document,
        created_by: Some(principal.user.id),
    };

    let (code, id) = allocator::allocate_and_insert(state.store.as_ref(), &draft)
        .await
        .map_err(|err| match err {
            AllocationError::Store(StoreError::Conflict(field)) => taken(field),
            other => state.internal::<AllocationError>(FAILED)(other),
        })?;
    log::info!("employee {} created as {} by user {}", id, code, principal.user.id);

    let employee = fetch_detail(&state, id, FAILED).await?;
    Ok(HttpResponse::Created().json(json!({
        "status": "success",
        "message": "Employee created successfully",
        "employee": employee,
    })))
}

pub async fn update_employee(
    req: HttpRequest,
    principal: Principal,
    state: web::Data<AppState>,
    path: web::Path<i64>,
    payload: web::Payload,
) -> Result<HttpResponse, AppError> {
    const FAILED: &str = "An error occurred while updating employee";
    principal.require(Capability::ManageEmployees)?;
    let id = path.into_inner();
    fetch_detail(&state, id, FAILED).await?;
    let form = FormData::read(&req, payload).await?;

    let mut input: UpdateEmployee = form.parse()?;
    input.password = blank_to_none(input.password);

    let mut report = validation::check(&input);
    let date_of_joining = match nullable(input.date_of_joining) {
        Some(Some(raw)) => match parse_date(&raw) {
            Some(date) => Some(Some(date)),
            None => {
                report.push("date_of_joining", "The date of joining field must be a valid date.");
                None
            }
        },
        Some(None) => Some(None),
        None => None,
    };
    if let Some(document) = form.file("document") {
        EMPLOYEE_DOCUMENT_RULE.check("document", document, &mut report);
    }
    check_email(&state, input.email.as_deref(), Some(id), &mut report, FAILED).await?;
    report.into_result()?;

    let password_hash = match input.password.as_deref() {
        Some(password) => Some(hash_password(password).map_err(state.internal(FAILED))?),
        None => None,
    };
    let document = store_document(&req, &state, &form, FAILED).await?;

    let changes = EmployeeChanges {
        name: input.name,
        phone: input.phone,
        date_of_birth: input.date_of_birth.as_deref().and_then(parse_date),
        gender: input.gender,
        email: input.email,
        password_hash,
        address: input.address,
        branch_id: nullable(input.branch_id),
        department: nullable(input.department),
        designation: nullable(input.designation),
        date_of_joining,
        account_holder_name: nullable(input.account_holder_name),
        account_number: nullable(input.account_number),
        bank_name: nullable(input.bank_name),
        bank_identifier_code: nullable(input.bank_identifier_code),
        branch_location: nullable(input.branch_location),
        tax_payer_id: nullable(input.tax_payer_id),
        document,
    };
    let updated = state
        .store
        .update_employee(id, &changes)
        .await
        .map_err(store_failure(&state, FAILED))?;
    if !updated {
        return Err(not_found());
    }

    let employee = fetch_detail(&state, id, FAILED).await?;
    Ok(HttpResponse::Ok().json(json!({
        "status": "success",
        "message": "Employee updated successfully",
        "employee": employee,
    })))
}

pub async fn delete_employee(
    principal: Principal,
    state: web::Data<AppState>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    const FAILED: &str = "An error occurred while deleting employee";
    principal.require(Capability::ManageEmployees)?;
    let id = path.into_inner();

    let deleted = state
        .store
        .delete_employee(id)
        .await
        .map_err(state.internal(FAILED))?;
    if !deleted {
        return Err(not_found());
    }
    log::info!("employee {} deleted by user {}", id, principal.user.id);

    Ok(HttpResponse::Ok().json(json!({
        "status": "success",
        "message": "Employee deleted successfully",
    })))
}
