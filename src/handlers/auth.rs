use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use validator::{Validate, ValidationError};

use super::{store_failure, taken_message};
use crate::auth::gate::{self, Capability};
use crate::auth::{session, Principal};
use crate::errors::AppError;
use crate::models::user::{NewUser, PublicUser, Role};
use crate::state::AppState;
use crate::utils::form::{flag, FormData, AVATAR_RULE};
use crate::utils::password::{hash_password, verify_password};
use crate::utils::uploads;
use crate::utils::validation::{self, non_blank};

#[derive(Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(required, custom = "non_blank", length(max = 255))]
    name: Option<String>,
    #[validate(required, email)]
    email: Option<String>,
    #[validate(required, length(min = 8))]
    password: Option<String>,
    #[validate(required, custom = "validate_registration_role")]
    role: Option<String>,
}

#[derive(Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(required, email)]
    email: Option<String>,
    #[validate(required, custom = "non_blank")]
    password: Option<String>,
    #[serde(default, deserialize_with = "flag")]
    remember: bool,
}

fn validate_registration_role(role: &str) -> Result<(), ValidationError> {
    match role.parse::<Role>() {
        Ok(role) if role.is_registrable() => Ok(()),
        _ => Err(ValidationError::new("role")),
    }
}

pub async fn register(
    req: HttpRequest,
    state: web::Data<AppState>,
    payload: web::Payload,
) -> Result<HttpResponse, AppError> {
    const FAILED: &str = "An error occurred during registration";
    let form = FormData::read(&req, payload).await?;

    let input: RegisterRequest = form.parse()?;
    let mut report = validation::check(&input);
    if let Some(avatar) = form.file("avatar") {
        AVATAR_RULE.check("avatar", avatar, &mut report);
    }
    if let Some(email) = input.email.as_deref() {
        if !report.has("email")
            && state
                .store
                .user_email_taken(email, None)
                .await
                .map_err(state.internal(FAILED))?
        {
            report.push("email", taken_message("email"));
        }
    }
    report.into_result()?;

    let RegisterRequest {
        name: Some(name),
        email: Some(email),
        password: Some(password),
        role: Some(role),
    } = input
    else {
        return Err(AppError::field("body", "The given data was invalid."));
    };
    let role: Role = role
        .parse()
        .map_err(|_| AppError::field("role", "The selected role is invalid."))?;

    let password_hash = hash_password(&password).map_err(state.internal(FAILED))?;
    let avatar = match form.file("avatar") {
        Some(file) => Some(
            uploads::save(
                state.blobs.as_ref(),
                &uploads::base_url(&req),
                uploads::AVATAR_DIR,
                uploads::generated_name(file),
                file,
            )
            .await
            .map_err(state.internal(FAILED))?,
        ),
        None => None,
    };

    let user = state
        .store
        .insert_user(&NewUser {
            name,
            email,
            password_hash,
            role,
            avatar,
        })
        .await
        .map_err(store_failure(&state, FAILED))?;

    log::info!("registered user {} with role {}", user.id, user.role);
    Ok(HttpResponse::Created().json(json!({
        "status": "success",
        "message": "Account created successfully",
        "user": PublicUser::from(&user),
    })))
}

pub async fn login(
    req: HttpRequest,
    state: web::Data<AppState>,
    payload: web::Payload,
) -> Result<HttpResponse, AppError> {
    const FAILED: &str = "An error occurred during login";
    let form = FormData::read(&req, payload).await?;

    let input: LoginRequest = form.parse()?;
    validation::validate_payload(&input)?;
    let (Some(email), Some(password)) = (input.email.as_deref(), input.password.as_deref()) else {
        return Err(AppError::field("body", "The given data was invalid."));
    };

    let invalid = || AppError::Unauthenticated("Invalid credentials".to_string());
    let user = state
        .store
        .find_user_by_email(email)
        .await
        .map_err(state.internal(FAILED))?
        .ok_or_else(invalid)?;
    if !verify_password(password, &user.password) {
        return Err(invalid());
    }

    gate::check_role(user.role, Capability::Login)?;

    let previous = session::token_from_request(&req);
    let cookie = session::start(&state, user.id, previous.as_deref(), input.remember)
        .await
        .map_err(state.internal(FAILED))?;

    log::info!("user {} logged in", user.id);
    Ok(HttpResponse::Ok().cookie(cookie).json(json!({
        "status": "success",
        "message": "Login successful",
        "user": PublicUser::from(&user),
    })))
}

/// Always succeeds; a live session, if any, is destroyed.
pub async fn logout(state: web::Data<AppState>, principal: Option<Principal>) -> Result<HttpResponse, AppError> {
    if let Some(principal) = principal {
        state
            .store
            .delete_session(&principal.session_token)
            .await
            .map_err(state.internal("An error occurred during logout"))?;
        log::info!("user {} logged out", principal.user.id);
    }

    Ok(HttpResponse::Ok()
        .cookie(session::removal_cookie())
        .json(json!({
            "status": "success",
            "message": "Logged out successfully",
        })))
}
