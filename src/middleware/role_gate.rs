use actix_web::{
    dev::{Service, ServiceRequest, ServiceResponse, Transform},
    Error,
};
use futures_util::future::{ok, Ready};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use log::{debug, error, warn};

use crate::auth_stores::SharedUserStore;
use crate::error::AppError;
use crate::middleware::identity_context::IdentityContext;
use crate::models::role::{Role, UserId};

/// Where the gate gets the role it compares against.
#[derive(Clone)]
pub enum RolePolicy {
    /// Trust the role embedded in the validated access token. No I/O, but a
    /// demotion only takes effect once that token expires.
    ClaimTrusting,
    /// Re-read the role from the user store on every request.
    StoreVerifying(SharedUserStore),
}

impl fmt::Debug for RolePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RolePolicy::ClaimTrusting => f.write_str("ClaimTrusting"),
            RolePolicy::StoreVerifying(_) => f.write_str("StoreVerifying"),
        }
    }
}

impl RolePolicy {
    /// Decide whether the identity in `context` may proceed.
    pub async fn authorize(&self, context: &IdentityContext, required: Role) -> Result<UserId, AppError> {
        let user_id = context
            .identity()
            .ok_or_else(|| AppError::Unauthorized("User not authenticated".to_string()))?;

        let actual = match self {
            RolePolicy::ClaimTrusting => context
                .role()
                .ok_or_else(|| AppError::Unauthorized("User not authenticated".to_string()))?,
            RolePolicy::StoreVerifying(store) => match store.lookup_role(user_id).await {
                Ok(Some(role)) => role,
                Ok(None) => {
                    error!("User {} has a valid token but no longer exists", user_id);
                    return Err(AppError::Internal("Failed to verify user role".to_string()));
                }
                Err(e) => {
                    error!("Failed to get user role from store for user {}: {}", user_id, e);
                    return Err(AppError::Internal("Failed to verify user role".to_string()));
                }
            },
        };

        if !actual.satisfies(required) {
            warn!("User {} with role {} denied; {} required", user_id, actual, required);
            return Err(AppError::Forbidden("Insufficient permissions".to_string()));
        }

        debug!("User {} authorized as {} ({:?})", user_id, actual, self);
        Ok(user_id)
    }
}

/// Rejects requests whose identity does not hold `required`.
/// Must sit inside `SecureAuthentication` so an identity can be present.
#[derive(Clone, Debug)]
pub struct RequireRole {
    required: Role,
    policy: RolePolicy,
}

impl RequireRole {
    pub fn new(required: Role, policy: RolePolicy) -> Self {
        Self { required, policy }
    }

    /// Admin gate that consults the store on every call.
    pub fn admin(store: SharedUserStore) -> Self {
        Self::new(Role::Admin, RolePolicy::StoreVerifying(store))
    }

    /// User gate that trusts the token's role claim.
    pub fn user() -> Self {
        Self::new(Role::User, RolePolicy::ClaimTrusting)
    }
}

impl<S, B> Transform<S, ServiceRequest> for RequireRole
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = RequireRoleMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(RequireRoleMiddleware {
            service: Arc::new(service),
            required: self.required,
            policy: self.policy.clone(),
        })
    }
}

pub struct RequireRoleMiddleware<S> {
    service: Arc<S>,
    required: Role,
    policy: RolePolicy,
}

impl<S, B> Service<ServiceRequest> for RequireRoleMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let policy = self.policy.clone();
        let required = self.required;

        if req.method() == actix_web::http::Method::OPTIONS {
            return Box::pin(service.call(req));
        }

        let context = IdentityContext::of_service_request(&req);

        Box::pin(async move {
            policy.authorize(&context, required).await.map_err(Error::from)?;
            service.call(req).await
        })
    }
}
