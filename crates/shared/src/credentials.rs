//! Google 服务账号凭证
//!
//! 使用服务账号私钥签发 RS256 JWT 断言，向 OAuth 端点换取访问令牌，
//! 供 FCM 推送和 Firestore 查询共用。令牌在过期前 60 秒内视为失效并刷新。

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::config::FirebaseConfig;
use crate::error::{PushError, Result};

/// FCM 发送与 Firestore 读取所需的 OAuth scope
pub const FIREBASE_SCOPES: &str = "https://www.googleapis.com/auth/firebase.messaging \
https://www.googleapis.com/auth/datastore";

/// 令牌提前刷新的余量
const REFRESH_MARGIN_SECS: i64 = 60;

/// JWT 断言有效期（Google 允许的上限为 1 小时）
const ASSERTION_TTL_SECS: i64 = 3600;

/// 访问令牌来源
#[async_trait]
pub trait AccessTokenSource: Send + Sync {
    async fn access_token(&self) -> Result<String>;
}

/// 固定令牌，用于模拟器和测试
pub struct StaticTokenSource(String);

impl StaticTokenSource {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

#[async_trait]
impl AccessTokenSource for StaticTokenSource {
    async fn access_token(&self) -> Result<String> {
        Ok(self.0.clone())
    }
}

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - chrono::Duration::seconds(REFRESH_MARGIN_SECS) > now
    }
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

/// 服务账号令牌来源
///
/// 令牌缓存放在异步锁内，并发请求在刷新期间会排队等待同一次刷新结果，
/// 不会对 OAuth 端点产生重复请求。
pub struct ServiceAccountTokenSource {
    client: reqwest::Client,
    client_email: String,
    private_key_id: Option<String>,
    encoding_key: EncodingKey,
    token_uri: String,
    cached: Mutex<Option<CachedToken>>,
}

impl ServiceAccountTokenSource {
    pub fn new(config: &FirebaseConfig) -> Result<Self> {
        if !config.has_credentials() {
            return Err(PushError::Credentials(
                "project_id / client_email / private_key 未配置".to_string(),
            ));
        }

        let encoding_key = EncodingKey::from_rsa_pem(config.private_key.as_bytes())
            .map_err(|e| PushError::Credentials(format!("私钥解析失败: {e}")))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            client_email: config.client_email.clone(),
            private_key_id: config.private_key_id.clone(),
            encoding_key,
            token_uri: config.token_uri.clone(),
            cached: Mutex::new(None),
        })
    }

    fn build_assertion(&self, now: DateTime<Utc>) -> Result<String> {
        let claims = AssertionClaims {
            iss: &self.client_email,
            scope: FIREBASE_SCOPES,
            aud: &self.token_uri,
            iat: now.timestamp(),
            exp: now.timestamp() + ASSERTION_TTL_SECS,
        };

        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.private_key_id.clone();

        encode(&header, &claims, &self.encoding_key)
            .map_err(|e| PushError::Credentials(format!("JWT 断言签名失败: {e}")))
    }

    async fn fetch_token(&self, now: DateTime<Utc>) -> Result<CachedToken> {
        let assertion = self.build_assertion(now)?;

        let response = self
            .client
            .post(&self.token_uri)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await
            .map_err(|e| PushError::from_transport("oauth", e))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(PushError::ExternalService {
                service: "oauth".to_string(),
                message: format!("{status}: {message}"),
            });
        }

        let body: TokenResponse = response.json().await?;
        info!(expires_in = body.expires_in, "访问令牌已刷新");

        Ok(CachedToken {
            token: body.access_token,
            expires_at: now + chrono::Duration::seconds(body.expires_in),
        })
    }
}

#[async_trait]
impl AccessTokenSource for ServiceAccountTokenSource {
    async fn access_token(&self) -> Result<String> {
        let mut cached = self.cached.lock().await;
        let now = Utc::now();

        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh(now)) {
            debug!("复用缓存的访问令牌");
            return Ok(token.token.clone());
        }

        let fresh = self.fetch_token(now).await?;
        let token = fresh.token.clone();
        *cached = Some(fresh);
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_token_source() {
        let source = StaticTokenSource::new("emulator-token");
        let token = tokio_test::block_on(source.access_token()).unwrap();
        assert_eq!(token, "emulator-token");
    }

    #[test]
    fn test_cached_token_freshness() {
        let now = Utc::now();
        let token = CachedToken {
            token: "t".to_string(),
            expires_at: now + chrono::Duration::seconds(3600),
        };
        assert!(token.is_fresh(now));

        // 进入刷新余量窗口后视为过期
        let almost_expired = CachedToken {
            token: "t".to_string(),
            expires_at: now + chrono::Duration::seconds(30),
        };
        assert!(!almost_expired.is_fresh(now));
    }

    #[test]
    fn test_missing_credentials_rejected() {
        let result = ServiceAccountTokenSource::new(&FirebaseConfig::default());
        assert!(matches!(result, Err(PushError::Credentials(_))));
    }

    #[test]
    fn test_invalid_private_key_rejected() {
        let config = FirebaseConfig {
            project_id: "whisp".to_string(),
            client_email: "svc@whisp.iam.gserviceaccount.com".to_string(),
            private_key: "not a pem".to_string(),
            ..Default::default()
        };
        let result = ServiceAccountTokenSource::new(&config);
        assert!(matches!(result, Err(PushError::Credentials(_))));
    }
}
