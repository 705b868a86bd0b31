use actix_web::{
    dev::{Service, ServiceRequest, ServiceResponse, Transform},
    http::header::AUTHORIZATION,
    Error,
};
use futures_util::future::{ok, ready, Ready};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use log::{debug, warn};

use crate::error::AppError;
use crate::middleware::identity_context::{attach_to_request, IdentityContext};
use crate::services::auth::JwtManager;

/// Pulls the token out of an `Authorization: Bearer <token>` header value.
pub fn extract_bearer_token(header_value: Option<&str>) -> Result<&str, AppError> {
    let value = header_value
        .ok_or_else(|| AppError::Unauthorized("Missing bearer token".to_string()))?;

    // Scheme name is case-insensitive (RFC 6750)
    let token = value
        .split_once(' ')
        .filter(|(scheme, _)| scheme.eq_ignore_ascii_case("Bearer"))
        .map(|(_, token)| token.trim())
        .ok_or_else(|| AppError::Unauthorized("Invalid Authorization format, expected Bearer token".to_string()))?;

    if token.is_empty() {
        return Err(AppError::Unauthorized("Empty Bearer token".to_string()));
    }
    Ok(token)
}

/// Authentication middleware: validates the bearer access token and binds the
/// identity and role from its claims to the request.
#[derive(Clone)]
pub struct SecureAuthentication {
    jwt: JwtManager,
}

impl SecureAuthentication {
    pub fn new(jwt: JwtManager) -> Self {
        Self { jwt }
    }
}

impl<S, B> Transform<S, ServiceRequest> for SecureAuthentication
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = SecureAuthenticationMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(SecureAuthenticationMiddleware {
            service: Arc::new(service),
            jwt: self.jwt.clone(),
        })
    }
}

pub struct SecureAuthenticationMiddleware<S> {
    service: Arc<S>,
    jwt: JwtManager,
}

impl<S, B> Service<ServiceRequest> for SecureAuthenticationMiddleware<S>
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
        let path = req.path().to_string();

        // Skip auth check for OPTIONS requests (CORS pre-flight)
        if req.method() == actix_web::http::Method::OPTIONS {
            debug!("Skipping authentication for OPTIONS request to: {}", path);
            return Box::pin(service.call(req));
        }

        // Nested scopes wrapped twice must not re-attach
        if IdentityContext::of_service_request(&req).is_authenticated() {
            debug!("Identity already attached for {}, skipping", path);
            return Box::pin(service.call(req));
        }

        let header_value = req.headers().get(AUTHORIZATION).map(|h| h.to_str());
        let header_value = match header_value {
            Some(Ok(value)) => Some(value),
            Some(Err(_)) => {
                warn!("Invalid Authorization header encoding for path: {}", path);
                return Box::pin(ready(Err(Error::from(AppError::Unauthorized(
                    "Invalid Authorization header".to_string(),
                )))));
            }
            None => None,
        };

        let claims = match extract_bearer_token(header_value).and_then(|token| self.jwt.parse_access_token(token)) {
            Ok(claims) => claims,
            Err(e) => {
                warn!("Rejected request to {}: {}", path, e);
                return Box::pin(ready(Err(Error::from(e))));
            }
        };

        if let Err(e) = attach_to_request(&req, claims.user_id, claims.role) {
            return Box::pin(ready(Err(Error::from(e))));
        }

        debug!("JWT valid for user {} (Role: {}) for route {}", claims.user_id, claims.role, path);
        Box::pin(async move { service.call(req).await })
    }
}
