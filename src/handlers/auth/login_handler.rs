use actix_web::{web, HttpResponse};

use crate::error::AppError;
use crate::models::auth_requests::LoginRequest;
use crate::services::auth::SessionService;

/// `POST /auth/login`: exchanges an email and password for a token pair.
pub async fn login(
    sessions: web::Data<SessionService>,
    body: web::Json<LoginRequest>,
) -> Result<HttpResponse, AppError> {
    let LoginRequest { email, password } = body.into_inner();
    let pair = sessions.login(email.trim(), &password).await?;
    Ok(HttpResponse::Ok().json(pair))
}
