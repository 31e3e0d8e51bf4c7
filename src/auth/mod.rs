use actix_web::dev::Payload;
use actix_web::{web, FromRequest, HttpRequest};
use futures_util::future::LocalBoxFuture;

use crate::errors::AppError;
use crate::models::user::{PublicUser, User};
use crate::state::AppState;

pub mod gate;
pub mod session;

pub use gate::{authorize, Capability, Denial};

/// The authenticated actor behind a request, resolved from its session cookie.
#[derive(Debug, Clone)]
pub struct Principal {
    pub user: User,
    pub session_token: String,
}

impl Principal {
    pub fn require(&self, capability: Capability) -> Result<(), AppError> {
        authorize(Some(self), capability).map_err(AppError::from)
    }

    pub fn public(&self) -> PublicUser {
        PublicUser::from(&self.user)
    }
}

impl FromRequest for Principal {
    type Error = AppError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let state = req.app_data::<web::Data<AppState>>().cloned();
        let token = session::token_from_request(req);

        Box::pin(async move {
            let state = state.ok_or_else(|| AppError::internal("Application state is not configured", None))?;
            let token = token.ok_or(Denial::NotAuthenticated)?;
            session::resolve(&state, &token)
                .await?
                .ok_or_else(|| AppError::from(Denial::NotAuthenticated))
        })
    }
}
