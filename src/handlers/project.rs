use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use crate::auth::{Capability, Principal};
use crate::errors::AppError;
use crate::models::project::{FileType, NewDocument, NewProject, ProjectChanges, ProjectDetail};
use crate::state::AppState;
use crate::utils::form::{present, FormData, PROJECT_DOCUMENT_RULE};
use crate::utils::password::hash_password;
use crate::utils::uploads;
use crate::utils::validation::{self, blank_to_none, non_blank, Report};

#[derive(Deserialize, Validate)]
pub struct CreateProject {
    #[validate(required, custom = "non_blank", length(max = 255))]
    client_name: Option<String>,
    #[validate(required, custom = "non_blank", length(max = 255))]
    project_name: Option<String>,
    #[validate(required, email)]
    client_email: Option<String>,
    #[validate(url, length(max = 500))]
    link: Option<String>,
    #[validate(required, length(min = 6))]
    client_password: Option<String>,
}

#[derive(Deserialize, Validate)]
pub struct UpdateProject {
    #[validate(custom = "non_blank", length(max = 255))]
    client_name: Option<String>,
    #[validate(custom = "non_blank", length(max = 255))]
    project_name: Option<String>,
    #[validate(custom = "non_blank", email)]
    client_email: Option<String>,
    #[serde(default, deserialize_with = "present")]
    link: Option<Option<String>>,
    #[validate(length(min = 6))]
    client_password: Option<String>,
}

fn not_found() -> AppError {
    AppError::not_found("Project not found")
}

fn check_link(link: Option<&str>, report: &mut Report) {
    let Some(link) = link else {
        return;
    };
    if url::Url::parse(link).is_err() {
        report.push("link", "The link field must be a valid URL.");
    }
    if link.chars().count() > 500 {
        report.push("link", "The link field must not be greater than 500 characters.");
    }
}

fn check_documents(form: &FormData, report: &mut Report) {
    for (index, file) in form.files("documents").enumerate() {
        PROJECT_DOCUMENT_RULE.check(&format!("documents.{index}"), file, report);
    }
}

async fn fetch_detail(state: &AppState, id: i64, failed: &'static str) -> Result<ProjectDetail, AppError> {
    state
        .store
        .find_project(id)
        .await
        .map_err(state.internal(failed))?
        .ok_or_else(not_found)
}

/// Stores every uploaded `documents` file and records it against the project.
async fn attach_documents(
    req: &HttpRequest,
    state: &AppState,
    project_id: i64,
    form: &FormData,
    failed: &'static str,
) -> Result<usize, AppError> {
    let base_url = uploads::base_url(req);
    let mut attached = 0;
    for file in form.files("documents") {
        let file_path = uploads::save(
            state.blobs.as_ref(),
            &base_url,
            uploads::PROJECT_DOCUMENT_DIR,
            uploads::name_keeping_original(file),
            file,
        )
        .await
        .map_err(state.internal(failed))?;

        let mime_type = file.mime_type();
        state
            .store
            .insert_document(&NewDocument {
                project_id,
                file_name: file.file_name.clone(),
                file_path,
                file_type: FileType::from_mime(&mime_type),
                mime_type,
                file_size: file.size() as i64,
            })
            .await
            .map_err(state.internal(failed))?;
        attached += 1;
    }
    Ok(attached)
}

pub async fn list_projects(principal: Principal, state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    principal.require(Capability::ManageProjects)?;

    let projects = state
        .store
        .list_projects()
        .await
        .map_err(state.internal("An error occurred while fetching projects"))?;

    Ok(HttpResponse::Ok().json(json!({
        "status": "success",
        "projects": projects,
    })))
}

pub async fn get_project(
    principal: Principal,
    state: web::Data<AppState>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    principal.require(Capability::ManageProjects)?;

    let project = fetch_detail(&state, path.into_inner(), "An error occurred while fetching project").await?;

    Ok(HttpResponse::Ok().json(json!({
        "status": "success",
        "project": project,
    })))
}

pub async fn create_project(
    req: HttpRequest,
    principal: Principal,
    state: web::Data<AppState>,
    payload: web::Payload,
) -> Result<HttpResponse, AppError> {
    const FAILED: &str = "An error occurred while creating project";
    principal.require(Capability::ManageProjects)?;
    let form = FormData::read(&req, payload).await?;

    let mut input: CreateProject = form.parse()?;
    input.link = blank_to_none(input.link);

    let mut report = validation::check(&input);
    check_documents(&form, &mut report);
    report.into_result()?;

    let (Some(client_name), Some(project_name), Some(client_email), Some(client_password)) = (
        input.client_name,
        input.project_name,
        input.client_email,
        input.client_password,
    ) else {
        return Err(AppError::field("body", "The given data was invalid."));
    };

    let client_password_hash = hash_password(&client_password).map_err(state.internal(FAILED))?;
    let id = state
        .store
        .insert_project(&NewProject {
            client_name,
            project_name,
            client_email,
            link: input.link,
            client_password_hash,
            created_by: Some(principal.user.id),
        })
        .await
        .map_err(state.internal(FAILED))?;
    let attached = attach_documents(&req, &state, id, &form, FAILED).await?;
    log::info!(
        "project {} created by user {} with {} document(s)",
        id,
        principal.user.id,
        attached
    );

    let project = fetch_detail(&state, id, FAILED).await?;
    Ok(HttpResponse::Created().json(json!({
        "status": "success",
        "message": "Project created successfully",
        "project": project,
    })))
}

pub async fn update_project(
    req: HttpRequest,
    principal: Principal,
    state: web::Data<AppState>,
    path: web::Path<i64>,
    payload: web::Payload,
) -> Result<HttpResponse, AppError> {
    const FAILED: &str = "An error occurred while updating project";
    principal.require(Capability::ManageProjects)?;
    let id = path.into_inner();
    fetch_detail(&state, id, FAILED).await?;
    let form = FormData::read(&req, payload).await?;

    let mut input: UpdateProject = form.parse()?;
    input.client_password = blank_to_none(input.client_password);
    let link = input.link.take().map(blank_to_none);

    let mut report = validation::check(&input);
    check_link(link.as_ref().and_then(|l| l.as_deref()), &mut report);
    check_documents(&form, &mut report);
    report.into_result()?;

    let client_password_hash = match input.client_password.as_deref() {
        Some(password) => Some(hash_password(password).map_err(state.internal(FAILED))?),
        None => None,
    };
    let changes = ProjectChanges {
        client_name: input.client_name,
        project_name: input.project_name,
        client_email: input.client_email,
        link,
        client_password_hash,
    };
    let updated = state
        .store
        .update_project(id, &changes)
        .await
        .map_err(state.internal(FAILED))?;
    if !updated {
        return Err(not_found());
    }
    attach_documents(&req, &state, id, &form, FAILED).await?;

    let project = fetch_detail(&state, id, FAILED).await?;
    Ok(HttpResponse::Ok().json(json!({
        "status": "success",
        "message": "Project updated successfully",
        "project": project,
    })))
}

pub async fn delete_project(
    principal: Principal,
    state: web::Data<AppState>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    const FAILED: &str = "An error occurred while deleting project";
    principal.require(Capability::ManageProjects)?;
    let id = path.into_inner();

    let project = fetch_detail(&state, id, FAILED).await?;
    for document in &project.documents {
        uploads::discard(state.blobs.as_ref(), &document.file_path)
            .await
            .map_err(state.internal(FAILED))?;
    }
    let deleted = state
        .store
        .delete_project(id)
        .await
        .map_err(state.internal(FAILED))?;
    if !deleted {
        return Err(not_found());
    }
    log::info!(
        "project {} deleted by user {} ({} document(s) removed)",
        id,
        principal.user.id,
        project.documents.len()
    );

    Ok(HttpResponse::Ok().json(json!({
        "status": "success",
        "message": "Project deleted successfully",
    })))
}

pub async fn delete_document(
    principal: Principal,
    state: web::Data<AppState>,
    path: web::Path<(i64, i64)>,
) -> Result<HttpResponse, AppError> {
    const FAILED: &str = "An error occurred while deleting document";
    principal.require(Capability::ManageProjects)?;
    let (project_id, document_id) = path.into_inner();

    let document = state
        .store
        .find_document(project_id, document_id)
        .await
        .map_err(state.internal(FAILED))?
        .ok_or_else(|| AppError::not_found("Document not found"))?;

    uploads::discard(state.blobs.as_ref(), &document.file_path)
        .await
        .map_err(state.internal(FAILED))?;
    state
        .store
        .delete_document(document.id)
        .await
        .map_err(state.internal(FAILED))?;

    Ok(HttpResponse::Ok().json(json!({
        "status": "success",
        "message": "Document deleted successfully",
    })))
}
