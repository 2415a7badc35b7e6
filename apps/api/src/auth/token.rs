use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

/// Issues and verifies HS256 bearer tokens.
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(secret: &str, ttl_minutes: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
            ttl: Duration::minutes(ttl_minutes),
        }
    }

    pub fn issue(&self, user_id: i64) -> Result<String, AppError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to sign token: {e}")))
    }

    /// Returns the user id carried by a valid, unexpired token.
    pub fn verify(&self, token: &str) -> Result<i64, AppError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|_| AppError::Unauthorized("Could not validate credentials".to_string()))?;
        data.claims
            .sub
            .parse()
            .map_err(|_| AppError::Unauthorized("Could not validate credentials".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_then_verify() {
        let issuer = TokenIssuer::new("test-secret", 60);
        let token = issuer.issue(42).unwrap();
        assert_eq!(issuer.verify(&token).unwrap(), 42);
    }

    #[test]
    fn test_token_from_other_secret_rejected() {
        let token = TokenIssuer::new("secret-a", 60).issue(1).unwrap();
        let result = TokenIssuer::new("secret-b", 60).verify(&token);
        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }

    #[test]
    fn test_expired_token_rejected() {
        // Well past the default 60s validation leeway.
        let issuer = TokenIssuer::new("test-secret", -10);
        let token = issuer.issue(1).unwrap();
        assert!(matches!(issuer.verify(&token), Err(AppError::Unauthorized(_))));
    }

    #[test]
    fn test_garbage_rejected() {
        let issuer = TokenIssuer::new("test-secret", 60);
        assert!(issuer.verify("not.a.token").is_err());
    }
}
