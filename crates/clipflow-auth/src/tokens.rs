//! RS256 token issuance and validation.
//!
//! Claims carry the owning user (`sub`), a unique token id (`jti`) for the
//! blacklist, the user's `token_version` at mint time, and the token kind.
//! Validation requires `exp` and `nbf`; a token without an expiry is
//! rejected outright rather than being allowed to linger unrevokable.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use clipflow_core::models::User;
use clipflow_core::{AppError, RsaKeySettings};

pub const ACCESS_TOKEN_EXPIRE_MINUTES: i64 = 30;
pub const REFRESH_TOKEN_EXPIRE_MINUTES: i64 = 60 * 2 * 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub jti: String,
    pub version: String,
    pub token_type: TokenType,
    pub exp: i64,
    pub nbf: i64,
    pub iat: i64,
}

impl Claims {
    pub fn user_id(&self) -> Result<i64, AppError> {
        self.sub
            .parse()
            .map_err(|_| AppError::Unauthorized("malformed subject claim".to_string()))
    }
}

pub struct TokenSigner {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl TokenSigner {
    pub fn from_pem(settings: &RsaKeySettings) -> Result<Self, anyhow::Error> {
        Ok(Self {
            encoding: EncodingKey::from_rsa_pem(settings.private_key_pem.as_bytes())
                .map_err(|e| anyhow::anyhow!("invalid RSA private key: {}", e))?,
            decoding: DecodingKey::from_rsa_pem(settings.public_key_pem.as_bytes())
                .map_err(|e| anyhow::anyhow!("invalid RSA public key: {}", e))?,
        })
    }

    pub fn issue(&self, user: &User, token_type: TokenType) -> Result<String, AppError> {
        let now = Utc::now();
        let ttl = match token_type {
            TokenType::Access => Duration::minutes(ACCESS_TOKEN_EXPIRE_MINUTES),
            TokenType::Refresh => Duration::minutes(REFRESH_TOKEN_EXPIRE_MINUTES),
        };
        let claims = Claims {
            sub: user.id.to_string(),
            jti: Uuid::new_v4().to_string(),
            version: user.token_version.to_string(),
            token_type,
            exp: (now + ttl).timestamp(),
            nbf: now.timestamp(),
            iat: now.timestamp(),
        };

        encode(&Header::new(Algorithm::RS256), &claims, &self.encoding)
            .map_err(|e| AppError::Internal(format!("failed to sign token: {}", e)))
    }

    /// Decode and validate a token. Signature, `exp` and `nbf` are all
    /// enforced; `exp` is a required claim.
    pub fn verify(&self, token: &str) -> Result<Claims, AppError> {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.validate_nbf = true;
        validation.set_required_spec_claims(&["exp", "nbf"]);

        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| AppError::Unauthorized(format!("invalid token: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn signer() -> TokenSigner {
        TokenSigner::from_pem(&RsaKeySettings {
            public_key_pem: include_str!("../testdata/test_rsa_public.pem").to_string(),
            private_key_pem: include_str!("../testdata/test_rsa_private.pem").to_string(),
        })
        .unwrap()
    }

    fn user() -> User {
        User {
            id: 7,
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            password_hash: "x".to_string(),
            created_at: Utc::now(),
            avatar_path: None,
            token_version: 3,
        }
    }

    #[test]
    fn issued_tokens_round_trip() {
        let signer = signer();
        let token = signer.issue(&user(), TokenType::Access).unwrap();
        let claims = signer.verify(&token).unwrap();

        assert_eq!(claims.user_id().unwrap(), 7);
        assert_eq!(claims.version, "3");
        assert_eq!(claims.token_type, TokenType::Access);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn refresh_tokens_outlive_access_tokens() {
        let signer = signer();
        let access = signer.verify(&signer.issue(&user(), TokenType::Access).unwrap()).unwrap();
        let refresh = signer.verify(&signer.issue(&user(), TokenType::Refresh).unwrap()).unwrap();
        assert!(refresh.exp > access.exp);
    }

    #[test]
    fn tokens_without_exp_are_rejected() {
        #[derive(Serialize)]
        struct NoExpiry {
            sub: String,
            jti: String,
            version: String,
            token_type: TokenType,
            nbf: i64,
            iat: i64,
        }

        let signer = signer();
        let now = Utc::now().timestamp();
        let bogus = NoExpiry {
            sub: "7".to_string(),
            jti: Uuid::new_v4().to_string(),
            version: "0".to_string(),
            token_type: TokenType::Access,
            nbf: now,
            iat: now,
        };
        let token = encode(
            &Header::new(Algorithm::RS256),
            &bogus,
            &signer.encoding,
        )
        .unwrap();

        assert!(signer.verify(&token).is_err());
    }

    #[test]
    fn garbage_tokens_are_rejected() {
        assert!(signer().verify("not.a.token").is_err());
    }
}
