use actix_web::dev::ServiceRequest;
use actix_web::{HttpMessage, HttpRequest};

use crate::error::AppError;
use crate::models::role::{Role, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Attached {
    user_id: UserId,
    role: Role,
}

/// Identity of whoever is making the current request.
///
/// The value is immutable: `attach` hands back a new context and refuses to
/// overwrite one that already carries an identity. An empty context means the
/// request is unauthenticated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IdentityContext {
    attached: Option<Attached>,
}

impl IdentityContext {
    pub fn unauthenticated() -> Self {
        Self::default()
    }

    pub fn attach(&self, user_id: UserId, role: Role) -> Result<Self, AppError> {
        if let Some(existing) = self.attached {
            log::error!(
                "Refusing to replace identity {} with {} on the same request",
                existing.user_id, user_id
            );
            return Err(AppError::Internal("Request identity was already attached".to_string()));
        }
        Ok(Self {
            attached: Some(Attached { user_id, role }),
        })
    }

    pub fn identity(&self) -> Option<UserId> {
        self.attached.map(|a| a.user_id)
    }

    pub fn role(&self) -> Option<Role> {
        self.attached.map(|a| a.role)
    }

    pub fn is_authenticated(&self) -> bool {
        self.attached.is_some()
    }

    /// Context bound to an in-flight request (empty if nothing was attached).
    pub fn of(req: &HttpRequest) -> Self {
        req.extensions().get::<IdentityContext>().copied().unwrap_or_default()
    }

    pub fn of_service_request(req: &ServiceRequest) -> Self {
        req.extensions().get::<IdentityContext>().copied().unwrap_or_default()
    }
}

/// Binds an identity to one request. Fails if the request already has one.
pub fn attach_to_request(req: &ServiceRequest, user_id: UserId, role: Role) -> Result<IdentityContext, AppError> {
    let context = IdentityContext::of_service_request(req).attach(user_id, role)?;
    req.extensions_mut().insert(context);
    Ok(context)
}
