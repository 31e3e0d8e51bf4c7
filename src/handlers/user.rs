use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use super::{store_failure, taken_message};
use crate::auth::{Capability, Principal};
use crate::errors::AppError;
use crate::models::user::{PublicUser, UserChanges};
use crate::state::AppState;
use crate::utils::form::{FormData, AVATAR_RULE};
use crate::utils::password::hash_password;
use crate::utils::uploads;
use crate::utils::validation::{self, blank_to_none, non_blank};

#[derive(Deserialize, Validate)]
pub struct ProfileUpdate {
    #[validate(custom = "non_blank", length(max = 255))]
    name: Option<String>,
    #[validate(custom = "non_blank", email)]
    email: Option<String>,
    #[validate(length(min = 8))]
    password: Option<String>,
}

pub async fn me(principal: Principal) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(json!({
        "status": "success",
        "user": principal.public(),
    })))
}

pub async fn update_profile(
    req: HttpRequest,
    state: web::Data<AppState>,
    principal: Principal,
    payload: web::Payload,
) -> Result<HttpResponse, AppError> {
    const FAILED: &str = "An error occurred while updating the profile";
    principal.require(Capability::ManageProfile)?;
    let user_id = principal.user.id;
    let form = FormData::read(&req, payload).await?;

    let mut input: ProfileUpdate = form.parse()?;
    input.password = blank_to_none(input.password);

    let mut report = validation::check(&input);
    if let Some(avatar) = form.file("avatar") {
        AVATAR_RULE.check("avatar", avatar, &mut report);
    }
    if let Some(email) = input.email.as_deref() {
        if !report.has("email")
            && state
                .store
                .user_email_taken(email, Some(user_id))
                .await
                .map_err(state.internal(FAILED))?
        {
            report.push("email", taken_message("email"));
        }
    }
    report.into_result()?;

    let password_hash = match input.password.as_deref() {
        Some(password) => Some(hash_password(password).map_err(state.internal(FAILED))?),
        None => None,
    };
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

    let changes = UserChanges {
        name: input.name,
        email: input.email,
        password_hash,
        avatar,
    };
    let user = state
        .store
        .update_user(user_id, &changes)
        .await
        .map_err(store_failure(&state, FAILED))?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    // A replaced avatar file stays on disk; only the URL moves.
    Ok(HttpResponse::Ok().json(json!({
        "status": "success",
        "message": "Profile updated successfully",
        "user": PublicUser::from(&user),
    })))
}
