use actix_web::{web, HttpResponse};

use crate::auth_stores::UserStore;
use crate::error::AppError;
use crate::models::AuthenticatedUser;

/// `GET /api/me`: profile of the user the access token was issued to.
pub async fn get_user_info(
    user: AuthenticatedUser,
    store: web::Data<dyn UserStore>,
) -> Result<HttpResponse, AppError> {
    let profile = store
        .lookup_profile(user.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("user not found".to_string()))?;

    Ok(HttpResponse::Ok().json(profile))
}
