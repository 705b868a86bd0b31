use actix_web::{web, HttpResponse};
use log::info;

use crate::auth_stores::{NewUser, UserStore};
use crate::error::AppError;
use crate::models::auth_requests::RegisterRequest;
use crate::models::role::Role;
use crate::security::password::hash_password;

fn validate(req: &RegisterRequest) -> Result<(), AppError> {
    if req.email.trim().is_empty() || req.username.trim().is_empty() || req.password.is_empty() {
        return Err(AppError::BadRequest("Missing fields".to_string()));
    }
    if !req.email.contains('@') {
        return Err(AppError::BadRequest("Invalid email address".to_string()));
    }
    Ok(())
}

/// `POST /auth/register`: creates a regular user account.
///
/// New accounts always get `Role::User`; promotion to admin is an
/// administrative action on the store, never something a caller can ask for.
pub async fn register(
    store: web::Data<dyn UserStore>,
    body: web::Json<RegisterRequest>,
) -> Result<HttpResponse, AppError> {
    let req = body.into_inner();
    validate(&req)?;

    let password = req.password;
    let password_hash = web::block(move || hash_password(&password))
        .await
        .map_err(|e| AppError::Internal(format!("Password hashing task failed: {}", e)))??;

    let profile = store
        .create_user(NewUser {
            email: req.email.trim().to_string(),
            username: req.username.trim().to_string(),
            password_hash,
            role: Role::User,
        })
        .await?;

    info!("Registered user {}", profile.id);
    Ok(HttpResponse::Created().json(profile))
}
