pub mod credentials;
pub mod jwt;
pub mod session;

pub use credentials::{CredentialVerifier, VerifiedUser};
pub use jwt::JwtManager;
pub use session::SessionService;
