pub mod identity_context;
pub mod role_gate;
pub mod secure_auth;

pub use identity_context::{attach_to_request, IdentityContext};
pub use role_gate::{RequireRole, RolePolicy};
pub use secure_auth::SecureAuthentication;
