//! Access/refresh token pairs signed with HS256.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind as JwtErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::config::JwtConfig;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User id, as a string.
    pub sub: String,
    pub iss: String,
    pub exp: i64,
    pub iat: i64,
    pub token_type: TokenType,
    pub username: String,
    /// Unique per token so that two pairs issued in the same second differ.
    pub jti: String,
}

impl Claims {
    pub fn user_id(&self) -> Result<i64> {
        self.sub.parse().map_err(|_| Error::InvalidToken)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
    pub refresh_expires_at: DateTime<Utc>,
}

pub struct JwtIssuer {
    issuer: String,
    access_ttl: Duration,
    refresh_ttl: Duration,
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl JwtIssuer {
    pub fn new(config: &JwtConfig) -> Result<Self> {
        if config.secret.is_empty() {
            return Err(Error::Config("jwt.secret must be set".into()));
        }
        Ok(Self {
            issuer: config.issuer.clone(),
            access_ttl: Duration::seconds(config.access_token_ttl_secs),
            refresh_ttl: Duration::seconds(config.refresh_token_ttl_secs),
            encoding: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.secret.as_bytes()),
        })
    }

    pub fn issue_pair(&self, user_id: i64, username: &str) -> Result<TokenPair> {
        let now = Utc::now();
        let expires_at = now + self.access_ttl;
        let refresh_expires_at = now + self.refresh_ttl;
        Ok(TokenPair {
            access_token: self.sign(user_id, username, TokenType::Access, now, expires_at)?,
            refresh_token: self.sign(user_id, username, TokenType::Refresh, now, refresh_expires_at)?,
            expires_at,
            refresh_expires_at,
        })
    }

    fn sign(
        &self,
        user_id: i64,
        username: &str,
        token_type: TokenType,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<String> {
        let claims = Claims {
            sub: user_id.to_string(),
            iss: self.issuer.clone(),
            exp: expires_at.timestamp(),
            iat: issued_at.timestamp(),
            token_type,
            username: username.to_string(),
            jti: uuid::Uuid::new_v4().to_string(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| Error::Internal(format!("failed to sign token: {e}")))
    }

    /// Verifies signature, issuer and expiry.
    pub fn parse(&self, token: &str) -> Result<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_issuer(&[self.issuer.as_str()]);

        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                JwtErrorKind::ExpiredSignature => Error::TokenExpired,
                _ => Error::InvalidToken,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> JwtConfig {
        JwtConfig {
            secret: "test-secret".into(),
            ..JwtConfig::default()
        }
    }

    #[test]
    fn test_issue_and_parse_pair() {
        let issuer = JwtIssuer::new(&config()).unwrap();
        let pair = issuer.issue_pair(7, "jane").unwrap();

        let access = issuer.parse(&pair.access_token).unwrap();
        assert_eq!(access.token_type, TokenType::Access);
        assert_eq!(access.user_id().unwrap(), 7);
        assert_eq!(access.username, "jane");
        assert_eq!(access.iss, "flecto");

        let refresh = issuer.parse(&pair.refresh_token).unwrap();
        assert_eq!(refresh.token_type, TokenType::Refresh);
        assert!(pair.refresh_expires_at > pair.expires_at);
    }

    #[test]
    fn test_pairs_are_unique() {
        let issuer = JwtIssuer::new(&config()).unwrap();
        let a = issuer.issue_pair(1, "a").unwrap();
        let b = issuer.issue_pair(1, "a").unwrap();
        assert_ne!(a.refresh_token, b.refresh_token);
    }

    #[test]
    fn test_expired_token() {
        let issuer = JwtIssuer::new(&JwtConfig {
            access_token_ttl_secs: -60,
            ..config()
        })
        .unwrap();
        let pair = issuer.issue_pair(1, "a").unwrap();
        assert!(matches!(issuer.parse(&pair.access_token), Err(Error::TokenExpired)));
    }

    #[test]
    fn test_wrong_secret_or_issuer() {
        let issuer = JwtIssuer::new(&config()).unwrap();
        let pair = issuer.issue_pair(1, "a").unwrap();

        let other = JwtIssuer::new(&JwtConfig {
            secret: "other".into(),
            ..config()
        })
        .unwrap();
        assert!(matches!(other.parse(&pair.access_token), Err(Error::InvalidToken)));

        let foreign = JwtIssuer::new(&JwtConfig {
            issuer: "someone-else".into(),
            ..config()
        })
        .unwrap();
        assert!(matches!(foreign.parse(&pair.access_token), Err(Error::InvalidToken)));
        assert!(matches!(issuer.parse("garbage"), Err(Error::InvalidToken)));
    }

    #[test]
    fn test_missing_secret_is_rejected() {
        assert!(matches!(
            JwtIssuer::new(&JwtConfig::default()),
            Err(Error::Config(_))
        ));
    }
}
