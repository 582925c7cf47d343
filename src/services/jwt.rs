use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use crate::services::hashing;

pub const RESET_TOKEN_TYPE: &str = "reset";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenClaims {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub email: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    pub iat: i64,
    pub exp: i64,
    /// Set on reset tokens so two issued in the same second still differ.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
}

impl TokenClaims {
    pub fn is_reset(&self) -> bool {
        self.token_type.as_deref() == Some(RESET_TOKEN_TYPE)
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.exp, 0).single()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("Failed to sign token: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),
}

/// Signs and verifies HS256 tokens. Access and reset tokens share the
/// secret and differ only by the `type` claim and lifetime.
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_token_duration: Duration,
    reset_token_duration: Duration,
}

impl JwtService {
    pub fn new(secret: impl AsRef<str>) -> Result<Self, ConfigError> {
        let secret = secret.as_ref();
        if secret.trim().is_empty() {
            return Err(ConfigError::Missing("JWT_SECRET"));
        }

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            access_token_duration: Duration::days(7),
            reset_token_duration: Duration::minutes(15),
        })
    }

    pub fn issue_access_token(&self, user_id: &str, email: &str) -> Result<String, TokenError> {
        self.sign(user_id, email, None, self.access_token_duration)
    }

    pub fn issue_reset_token(&self, user_id: &str, email: &str) -> Result<String, TokenError> {
        self.sign(
            user_id,
            email,
            Some(RESET_TOKEN_TYPE.to_string()),
            self.reset_token_duration,
        )
    }

    fn sign(
        &self,
        user_id: &str,
        email: &str,
        token_type: Option<String>,
        ttl: Duration,
    ) -> Result<String, TokenError> {
        let now = Utc::now();
        let jti = token_type.as_ref().map(|_| hashing::random_token());
        let claims = TokenClaims {
            user_id: user_id.to_string(),
            email: email.to_string(),
            token_type,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            jti,
        };
        self.encode_claims(&claims)
    }

    fn encode_claims(&self, claims: &TokenClaims) -> Result<String, TokenError> {
        Ok(encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)?)
    }

    /// Signature and expiry check. Every failure collapses to `None`.
    pub fn verify(&self, token: &str) -> Option<TokenClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        match decode::<TokenClaims>(token, &self.decoding_key, &validation) {
            Ok(data) => Some(data.claims),
            Err(e) => {
                tracing::debug!(error = %e, "token verification failed");
                None
            }
        }
    }

    /// Reads the payload without checking the signature. Never use the
    /// result to grant access.
    pub fn decode(&self, token: &str) -> Option<TokenClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        decode::<TokenClaims>(token, &self.decoding_key, &validation)
            .ok()
            .map(|data| data.claims)
    }

    pub fn expiry_of(&self, token: &str) -> Option<DateTime<Utc>> {
        self.decode(token).and_then(|claims| claims.expires_at())
    }

    /// Undecodable tokens count as expired.
    pub fn is_expired(&self, token: &str) -> bool {
        match self.expiry_of(token) {
            Some(exp) => exp <= Utc::now(),
            None => true,
        }
    }
}
