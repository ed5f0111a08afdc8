//! Credential hashing and bearer token module.
//!
//! ## Login Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  login(email, password)                                                 │
//! │     │                                                                   │
//! │     ├── users.find_by_email ──► none ──────────────┐                    │
//! │     ├── CredentialHasher::verify ──► false ────────┼──► InvalidCredentials
//! │     │                                              │                    │
//! │     └── TokenIssuer::issue(user) ──► HS256 JWT     │                    │
//! │            sub, email, role, iss, aud, iat, exp, jti                    │
//! │                                                                         │
//! │  later request                                                          │
//! │     TokenIssuer::validate(token) ──► CallerContext::Authenticated       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm as JwtAlgorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use fcg_core::{CredentialHash, Password, Role, User};

use crate::config::JwtConfig;
use crate::context::CallerContext;
use crate::error::{ServiceError, ServiceResult};

// =============================================================================
// Credential Hashing
// =============================================================================

/// Salted one-way password derivation.
pub trait CredentialHasher: Send + Sync {
    /// Hashes with a fresh random salt.
    fn hash(&self, password: &Password) -> ServiceResult<CredentialHash>;

    /// `false` for a mismatch and for a stored form that cannot be parsed.
    fn verify(&self, plaintext: &str, stored: &CredentialHash) -> bool;
}

/// Argon2id in PHC string format.
#[derive(Clone, Default)]
pub struct Argon2Hasher {
    argon2: Argon2<'static>,
}

impl Argon2Hasher {
    /// Library default cost parameters.
    pub fn new() -> Self {
        Argon2Hasher::default()
    }

    /// Custom cost: memory in KiB, iterations, lanes.
    pub fn with_params(m_cost: u32, t_cost: u32, p_cost: u32) -> ServiceResult<Self> {
        let params = Params::new(m_cost, t_cost, p_cost, None)
            .map_err(|e| ServiceError::Internal(format!("Invalid Argon2 parameters: {}", e)))?;

        Ok(Argon2Hasher {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }
}

impl CredentialHasher for Argon2Hasher {
    fn hash(&self, password: &Password) -> ServiceResult<CredentialHash> {
        let salt = SaltString::generate(&mut OsRng);

        let hash = self
            .argon2
            .hash_password(password.expose().as_bytes(), &salt)
            .map_err(|e| ServiceError::Internal(format!("Failed to hash password: {}", e)))?;

        Ok(CredentialHash::new(hash.to_string()))
    }

    fn verify(&self, plaintext: &str, stored: &CredentialHash) -> bool {
        let parsed_hash = match PasswordHash::new(stored.as_str()) {
            Ok(h) => h,
            Err(_) => return false,
        };

        // Parameters come from the PHC string, not from `self`
        self.argon2
            .verify_password(plaintext.as_bytes(), &parsed_hash)
            .is_ok()
    }
}

// =============================================================================
// Tokens
// =============================================================================

/// JWT claims structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id)
    pub sub: String,

    pub email: String,

    pub role: Role,

    pub iss: String,

    pub aud: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration (Unix timestamp)
    pub exp: i64,

    /// JWT ID (unique identifier for this token)
    pub jti: String,
}

/// Issues and checks bearer credentials.
pub trait TokenIssuer: Send + Sync {
    fn issue(&self, user: &User) -> ServiceResult<String>;

    /// Checks signature, issuer, audience and expiry.
    fn validate(&self, token: &str) -> ServiceResult<CallerContext>;
}

/// HS256 JWT token manager.
pub struct JwtManager {
    secret: String,
    issuer: String,
    audience: String,
    lifetime_secs: i64,
}

impl JwtManager {
    pub fn new(config: &JwtConfig) -> Self {
        JwtManager {
            secret: config.secret.clone(),
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
            lifetime_secs: config.lifetime_secs,
        }
    }

    /// Decodes a token into its claims.
    pub fn decode_claims(&self, token: &str) -> ServiceResult<Claims> {
        let mut validation = Validation::new(JwtAlgorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);

        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map_err(|e| ServiceError::InvalidToken(e.to_string()))?;

        Ok(token_data.claims)
    }
}

impl TokenIssuer for JwtManager {
    fn issue(&self, user: &User) -> ServiceResult<String> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.lifetime_secs);

        let claims = Claims {
            sub: user.id().to_string(),
            email: user.email().to_string(),
            role: user.role(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        encode(
            &Header::new(JwtAlgorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| ServiceError::Internal(format!("Failed to generate token: {}", e)))
    }

    fn validate(&self, token: &str) -> ServiceResult<CallerContext> {
        let claims = self.decode_claims(token)?;
        Ok(CallerContext::authenticated(claims.sub, claims.role))
    }
}

/// Extract bearer token from authorization header.
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header.strip_prefix("Bearer ").map(str::trim).filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServiceConfig;
    use fcg_core::{Email, Name};

    fn hasher() -> Argon2Hasher {
        Argon2Hasher::with_params(8, 1, 1).unwrap()
    }

    fn user() -> User {
        User::register(
            Name::parse("Ana").unwrap(),
            Email::parse("ana@example.com").unwrap(),
            CredentialHash::new("x"),
            Utc::now(),
        )
    }

    fn manager(config: JwtConfig) -> JwtManager {
        JwtManager::new(&config)
    }

    #[test]
    fn test_hash_and_verify() {
        let hasher = hasher();
        let password = Password::parse("Str0ng!pass").unwrap();

        let stored = hasher.hash(&password).unwrap();
        assert!(stored.as_str().starts_with("$argon2id$"));
        assert!(hasher.verify("Str0ng!pass", &stored));
        assert!(!hasher.verify("Str0ng!pasS", &stored));
    }

    #[test]
    fn test_salt_differs_per_call() {
        let hasher = hasher();
        let password = Password::parse("Str0ng!pass").unwrap();
        assert_ne!(hasher.hash(&password).unwrap(), hasher.hash(&password).unwrap());
    }

    #[test]
    fn test_garbage_stored_hash_never_verifies() {
        assert!(!hasher().verify("anything", &CredentialHash::new("not-a-phc-string")));
    }

    #[test]
    fn test_jwt_roundtrip() {
        let manager = manager(ServiceConfig::for_tests().jwt);
        let user = user();

        let token = manager.issue(&user).unwrap();
        let claims = manager.decode_claims(&token).unwrap();
        assert_eq!(claims.sub, user.id());
        assert_eq!(claims.email, "ana@example.com");
        assert_eq!(claims.role, Role::Standard);
        assert_eq!(claims.exp - claims.iat, 7200);

        let caller = manager.validate(&token).unwrap();
        assert_eq!(caller, CallerContext::authenticated(user.id(), Role::Standard));
    }

    #[test]
    fn test_wrong_audience_or_secret_rejected() {
        let config = ServiceConfig::for_tests().jwt;
        let token = manager(config.clone()).issue(&user()).unwrap();

        let other_audience = manager(JwtConfig {
            audience: "someone-else".into(),
            ..config.clone()
        });
        assert!(matches!(
            other_audience.validate(&token),
            Err(ServiceError::InvalidToken(_))
        ));

        let other_secret = manager(JwtConfig {
            secret: "another-secret".into(),
            ..config
        });
        assert!(other_secret.validate(&token).is_err());
    }

    #[test]
    fn test_expired_token_rejected() {
        let expired = manager(JwtConfig {
            lifetime_secs: -3600,
            ..ServiceConfig::for_tests().jwt
        });
        let token = expired.issue(&user()).unwrap();
        assert!(expired.validate(&token).is_err());
    }

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(extract_bearer_token("Bearer abc.def"), Some("abc.def"));
        assert_eq!(extract_bearer_token("Basic abc"), None);
        assert_eq!(extract_bearer_token("Bearer "), None);
    }
}
