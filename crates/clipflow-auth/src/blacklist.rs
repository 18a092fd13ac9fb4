//! Redis-backed token blacklist.
//!
//! A revoked token's `jti` is stored with an absolute expiry at the token's
//! own `exp`, so the key disappears exactly when the token would have died
//! anyway. Only validated claims reach this module, which guarantees `exp`
//! is present.

use redis::aio::MultiplexedConnection;

use clipflow_core::AppError;

use crate::tokens::Claims;

#[derive(Clone)]
pub struct TokenBlacklist {
    connection: MultiplexedConnection,
}

pub(crate) fn blacklist_key(jti: &str) -> String {
    format!("blacklisted_token:{}", jti)
}

impl TokenBlacklist {
    pub async fn connect(url: &str) -> Result<Self, anyhow::Error> {
        let client = redis::Client::open(url)?;
        let connection = client.get_multiplexed_async_connection().await?;
        tracing::info!("Connected to token blacklist");
        Ok(Self { connection })
    }

    pub async fn add(&self, claims: &Claims) -> Result<(), AppError> {
        let mut connection = self.connection.clone();
        let _: () = redis::cmd("SET")
            .arg(blacklist_key(&claims.jti))
            .arg(1)
            .arg("EXAT")
            .arg(claims.exp)
            .query_async(&mut connection)
            .await
            .map_err(|e| AppError::Internal(format!("blacklist write failed: {}", e)))?;

        tracing::debug!(jti = %claims.jti, "Token blacklisted");
        Ok(())
    }

    pub async fn contains(&self, jti: &str) -> Result<bool, AppError> {
        let mut connection = self.connection.clone();
        let exists: i64 = redis::cmd("EXISTS")
            .arg(blacklist_key(jti))
            .query_async(&mut connection)
            .await
            .map_err(|e| AppError::Internal(format!("blacklist read failed: {}", e)))?;
        Ok(exists > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_namespaced_by_jti() {
        assert_eq!(
            blacklist_key("3f1c9a52-1111-4111-8111-111111111111"),
            "blacklisted_token:3f1c9a52-1111-4111-8111-111111111111"
        );
    }
}
