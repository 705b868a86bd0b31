pub mod auth_jwt_claims;
pub mod auth_requests;
pub mod authenticated_user;
pub mod role;

pub use auth_jwt_claims::*;
pub use auth_requests::*;
pub use authenticated_user::AuthenticatedUser;
pub use role::{Role, UserId};
