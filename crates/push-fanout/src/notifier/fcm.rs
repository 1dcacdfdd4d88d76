//! Firebase Cloud Messaging（HTTP v1）推送提供方

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use push_shared::config::FirebaseConfig;
use push_shared::credentials::AccessTokenSource;
use push_shared::error::PushError;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

use super::{Notifier, PushMessage, redact_token};

const ANDROID_PRIORITY: &str = "HIGH";

pub struct FcmNotifier {
    client: reqwest::Client,
    send_url: String,
    tokens: Arc<dyn AccessTokenSource>,
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    status: String,
    #[serde(default)]
    message: String,
}

impl FcmNotifier {
    pub fn new(config: &FirebaseConfig, tokens: Arc<dyn AccessTokenSource>) -> Result<Self, PushError> {
        if config.project_id.is_empty() {
            return Err(PushError::Credentials("firebase.project_id 未配置".to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            send_url: send_url(&config.fcm_endpoint, &config.project_id),
            tokens,
        })
    }
}

fn send_url(endpoint: &str, project_id: &str) -> String {
    format!(
        "{}/v1/projects/{}/messages:send",
        endpoint.trim_end_matches('/'),
        project_id
    )
}

/// 转换为 FCM v1 的请求体
fn to_fcm_body(message: &PushMessage) -> Value {
    json!({
        "message": {
            "token": message.token,
            "notification": {
                "title": message.title,
                "body": message.body,
            },
            "data": message.data,
            "android": {
                "priority": ANDROID_PRIORITY,
                "notification": {
                    "channel_id": message.channel_id,
                    "sound": message.sound,
                },
            },
            "apns": {
                "payload": {
                    "aps": { "sound": message.sound },
                },
            },
        }
    })
}

/// 尽量从错误响应中提取 `status: message`，解析失败时保留原文
fn describe_error(status: reqwest::StatusCode, body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => format!(
            "{} {}: {}",
            status.as_u16(),
            envelope.error.status,
            envelope.error.message
        ),
        Err(_) => format!("{}: {}", status.as_u16(), body),
    }
}

#[async_trait]
impl Notifier for FcmNotifier {
    async fn send(&self, message: &PushMessage) -> Result<String, PushError> {
        let access_token = self.tokens.access_token().await?;

        let response = self
            .client
            .post(&self.send_url)
            .bearer_auth(access_token)
            .json(&to_fcm_body(message))
            .send()
            .await
            .map_err(|e| PushError::from_transport("fcm", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PushError::ExternalService {
                service: "fcm".to_string(),
                message: describe_error(status, &body),
            });
        }

        let accepted: SendResponse = response.json().await?;
        debug!(
            token = %redact_token(&message.token),
            message_name = %accepted.name,
            "FCM 已接受推送"
        );

        Ok(accepted.name)
    }

    fn provider(&self) -> &'static str {
        "fcm"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use push_shared::credentials::StaticTokenSource;
    use std::collections::BTreeMap;

    fn make_message() -> PushMessage {
        PushMessage {
            token: "device-token-001".to_string(),
            title: "Family".to_string(),
            body: "Alice: hi".to_string(),
            data: BTreeMap::from([("type".to_string(), "group".to_string())]),
            channel_id: "default_channel".to_string(),
            sound: "default".to_string(),
        }
    }

    #[test]
    fn test_send_url() {
        assert_eq!(
            send_url("https://fcm.googleapis.com/", "whisp-app"),
            "https://fcm.googleapis.com/v1/projects/whisp-app/messages:send"
        );
    }

    #[test]
    fn test_fcm_body_shape() {
        let body = to_fcm_body(&make_message());
        let message = &body["message"];

        assert_eq!(message["token"], "device-token-001");
        assert_eq!(message["notification"]["title"], "Family");
        assert_eq!(message["notification"]["body"], "Alice: hi");
        assert_eq!(message["data"]["type"], "group");
        assert_eq!(message["android"]["priority"], "HIGH");
        assert_eq!(
            message["android"]["notification"]["channel_id"],
            "default_channel"
        );
        assert_eq!(message["android"]["notification"]["sound"], "default");
        assert_eq!(message["apns"]["payload"]["aps"]["sound"], "default");
    }

    #[test]
    fn test_describe_error() {
        let body = r#"{"error":{"code":404,"status":"NOT_FOUND","message":"Requested entity was not found."}}"#;
        assert_eq!(
            describe_error(reqwest::StatusCode::NOT_FOUND, body),
            "404 NOT_FOUND: Requested entity was not found."
        );
        assert_eq!(
            describe_error(reqwest::StatusCode::BAD_GATEWAY, "upstream"),
            "502: upstream"
        );
    }

    #[test]
    fn test_new_requires_project_id() {
        let tokens: Arc<dyn AccessTokenSource> = Arc::new(StaticTokenSource::new("t"));
        let result = FcmNotifier::new(&FirebaseConfig::default(), tokens.clone());
        assert!(matches!(result, Err(PushError::Credentials(_))));

        let config = FirebaseConfig {
            project_id: "whisp-app".to_string(),
            ..Default::default()
        };
        let notifier = FcmNotifier::new(&config, tokens).unwrap();
        assert_eq!(notifier.provider(), "fcm");
        assert!(notifier.send_url.ends_with("/v1/projects/whisp-app/messages:send"));
    }
}
