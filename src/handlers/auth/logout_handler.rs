use actix_web::HttpResponse;

use crate::models::auth_requests::MessageResponse;

/// `POST /auth/logout`. Sessions live only in the client's tokens, so there is
/// nothing to tear down here; the client discards its pair.
pub async fn logout() -> HttpResponse {
    HttpResponse::Ok().json(MessageResponse {
        message: "Logged out successfully".to_string(),
    })
}
