use actix_web::{dev::Payload, FromRequest, HttpRequest};
use serde::{Deserialize, Serialize};
use std::future::{ready, Ready};

use crate::error::AppError;
use crate::middleware::identity_context::IdentityContext;
use crate::models::role::{Role, UserId};

/// Handler-side view of the request identity. Extracting it from a request
/// without an attached identity fails with `Unauthorized`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub user_id: UserId,
    pub role: Role,
}

impl AuthenticatedUser {
    pub fn from_context(context: &IdentityContext) -> Result<Self, AppError> {
        match (context.identity(), context.role()) {
            (Some(user_id), Some(role)) => Ok(Self { user_id, role }),
            _ => Err(AppError::Unauthorized("Not authenticated".to_string())),
        }
    }
}

impl FromRequest for AuthenticatedUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let context = IdentityContext::of(req);
        if !context.is_authenticated() {
            log::warn!("No identity attached for path: {}", req.path());
        }
        ready(Self::from_context(&context))
    }
}
