use serde::{Deserialize, Serialize};

use crate::models::role::{Role, UserId};

/// Claims carried by a short-lived access token.
///
/// `role` is a snapshot of the store's value at issuance time and may lag the
/// store until the token expires or the session is refreshed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    #[serde(rename = "userId")]
    pub user_id: UserId,
    pub email: String,
    pub role: Role,
    /// Issuer
    pub iss: String,
    /// Subject (stringified user ID)
    pub sub: String,
    /// Audience (the frontend client)
    pub aud: String,
    /// Issued at (UTC timestamp)
    pub iat: i64,
    /// Expiration time (UTC timestamp)
    pub exp: i64,
    /// Not before (UTC timestamp)
    pub nbf: i64,
}

/// Marker stored in the `typ` claim of refresh tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Refresh,
}

/// Claims carried by a refresh token. Never includes email or role, so a
/// refresh always has to go back to the store for them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RefreshClaims {
    #[serde(rename = "userId")]
    pub user_id: UserId,
    pub typ: TokenType,
    pub iat: i64,
    pub exp: i64,
}
