use crate::config::AuthConfig;
use crate::error::AppError;
use crate::models::auth_jwt_claims::{AccessClaims, RefreshClaims, TokenType};
use crate::models::role::{Role, UserId};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use log::{debug, error, trace};
use std::fmt;

// Issuer name for access tokens
pub const JWT_ISSUER: &str = "music-app-backend";

// The only client access tokens are minted for
pub const JWT_AUDIENCE: &str = "music-app-frontend";

// Tokens are signed and verified with this algorithm only
const JWT_ALGORITHM: Algorithm = Algorithm::HS256;

/// Issues and validates access and refresh tokens with one shared HMAC secret.
///
/// Built once at startup from [`AuthConfig`] and cloned into every worker;
/// nothing in here changes after construction.
#[derive(Clone)]
pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl fmt::Debug for JwtManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtManager")
            .field("algorithm", &JWT_ALGORITHM)
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish_non_exhaustive()
    }
}

impl JwtManager {
    pub fn new(config: &AuthConfig) -> Result<Self, AppError> {
        let secret = config.jwt_secret.as_bytes();
        if secret.is_empty() {
            return Err(AppError::Configuration("JWT secret is empty; refusing to sign tokens".to_string()));
        }

        let access_ttl = usable_lifetime("access", Duration::try_minutes(config.access_token_ttl_minutes))?;
        let refresh_ttl = usable_lifetime("refresh", Duration::try_days(config.refresh_token_ttl_days))?;

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            access_ttl,
            refresh_ttl,
        })
    }

    /// Upper bound on how long an embedded role claim can lag the store.
    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    /// Mint a signed access token carrying a snapshot of the user's role.
    pub fn issue_access_token(&self, user_id: UserId, email: &str, role: Role) -> Result<String, AppError> {
        self.issue_access_token_at(user_id, email, role, Utc::now())
    }

    pub(crate) fn issue_access_token_at(
        &self,
        user_id: UserId,
        email: &str,
        role: Role,
        now: DateTime<Utc>,
    ) -> Result<String, AppError> {
        let exp = now
            .checked_add_signed(self.access_ttl)
            .ok_or_else(|| AppError::Internal("Failed to calculate access token expiration time".to_string()))?;

        let claims = AccessClaims {
            user_id,
            email: email.to_string(),
            role,
            iss: JWT_ISSUER.to_string(),
            sub: user_id.to_string(),
            aud: JWT_AUDIENCE.to_string(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
            nbf: now.timestamp(),
        };

        debug!("Issuing access token for user {} (role: {}, exp: {})", user_id, role, exp);
        self.sign(&claims)
    }

    /// Mint a signed refresh token. It carries the identity only.
    pub fn issue_refresh_token(&self, user_id: UserId) -> Result<String, AppError> {
        self.issue_refresh_token_at(user_id, Utc::now())
    }

    pub(crate) fn issue_refresh_token_at(&self, user_id: UserId, now: DateTime<Utc>) -> Result<String, AppError> {
        let exp = now
            .checked_add_signed(self.refresh_ttl)
            .ok_or_else(|| AppError::Internal("Failed to calculate refresh token expiration time".to_string()))?;

        let claims = RefreshClaims {
            user_id,
            typ: TokenType::Refresh,
            iat: now.timestamp(),
            exp: exp.timestamp(),
        };

        debug!("Issuing refresh token for user {} (exp: {})", user_id, exp);
        self.sign(&claims)
    }

    fn sign<T: serde::Serialize>(&self, claims: &T) -> Result<String, AppError> {
        encode(&Header::new(JWT_ALGORITHM), claims, &self.encoding_key).map_err(|e| {
            error!("Failed to sign JWT: {}", e);
            AppError::Internal(format!("Token signing failed: {}", e))
        })
    }

    /// Verify an access token and return its claims.
    pub fn parse_access_token(&self, token: &str) -> Result<AccessClaims, AppError> {
        trace!("Verifying access token");

        let mut validation = Validation::new(JWT_ALGORITHM);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.validate_nbf = true;
        validation.set_issuer(&[JWT_ISSUER]);
        validation.set_audience(&[JWT_AUDIENCE]);
        validation.set_required_spec_claims(&["exp", "nbf", "iat", "iss", "sub", "aud"]);

        let claims = decode::<AccessClaims>(token, &self.decoding_key, &validation)
            .map_err(|err| map_jwt_error("access", err))?
            .claims;

        if claims.sub != claims.user_id.to_string() {
            debug!("Access token subject does not match its userId claim");
            return Err(AppError::InvalidToken("Token subject does not match user".to_string()));
        }

        debug!("Access token verified for user {}", claims.user_id);
        Ok(claims)
    }

    /// Verify a refresh token and return the identity it was issued for.
    pub fn parse_refresh_token(&self, token: &str) -> Result<UserId, AppError> {
        trace!("Verifying refresh token");

        let mut validation = Validation::new(JWT_ALGORITHM);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp"]);

        // Missing `typ`/`userId` or any extra claim fails deserialization
        let claims = decode::<RefreshClaims>(token, &self.decoding_key, &validation)
            .map_err(|err| map_jwt_error("refresh", err))?
            .claims;

        debug!("Refresh token verified for user {}", claims.user_id);
        Ok(claims.user_id)
    }
}

/// A lifetime must be positive and small enough that `now + ttl` is still a
/// representable timestamp, otherwise every issue call would fail later.
fn usable_lifetime(kind: &str, ttl: Option<Duration>) -> Result<Duration, AppError> {
    ttl.filter(|d| *d > Duration::zero())
        .filter(|d| Utc::now().checked_add_signed(*d).is_some())
        .ok_or_else(|| AppError::Configuration(format!("Invalid {} token lifetime", kind)))
}

/// Collapse `jsonwebtoken` failures into the two token outcomes callers see.
/// The time window is only checked after the signature, so `TokenExpired`
/// always means "genuine but too old or too early".
fn map_jwt_error(kind: &str, err: jsonwebtoken::errors::Error) -> AppError {
    match err.kind() {
        ErrorKind::ExpiredSignature => {
            debug!("Rejected expired {} token", kind);
            AppError::TokenExpired(format!("The {} token has expired", kind))
        }
        ErrorKind::ImmatureSignature => {
            debug!("Rejected {} token used before its nbf", kind);
            AppError::TokenExpired(format!("The {} token is not valid yet", kind))
        }
        other => {
            debug!("Rejected {} token: {:?}", kind, other);
            AppError::InvalidToken(format!("The {} token is invalid", kind))
        }
    }
}
