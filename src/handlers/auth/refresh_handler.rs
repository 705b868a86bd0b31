use actix_web::{web, HttpResponse};

use crate::error::AppError;
use crate::models::auth_requests::RefreshRequest;
use crate::services::auth::SessionService;

/// `POST /auth/refresh`: rotates both tokens using a valid refresh token.
pub async fn refresh(
    sessions: web::Data<SessionService>,
    body: web::Json<RefreshRequest>,
) -> Result<HttpResponse, AppError> {
    let pair = sessions.refresh(body.refresh_token.trim()).await?;
    Ok(HttpResponse::Ok().json(pair))
}
