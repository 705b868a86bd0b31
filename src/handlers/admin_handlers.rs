use actix_web::HttpResponse;
use serde::Serialize;

use crate::models::role::{Role, UserId};
use crate::models::AuthenticatedUser;

#[derive(Debug, Serialize)]
struct AdminSession {
    user_id: UserId,
    /// Role the access token was issued with
    token_role: Role,
    /// Role confirmed against the user store by the admin gate
    verified_role: Role,
}

/// `GET /api/admin/session`: reachable only through the store-verifying
/// admin gate, so reaching the handler means the store says "admin" right now.
pub async fn get_admin_session(user: AuthenticatedUser) -> HttpResponse {
    HttpResponse::Ok().json(AdminSession {
        user_id: user.user_id,
        token_role: user.role,
        verified_role: Role::Admin,
    })
}
