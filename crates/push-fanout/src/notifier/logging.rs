//! 仅记录日志的推送提供方
//!
//! 本地开发或未配置 Firebase 凭证时使用，所有消息都视为发送成功。

use async_trait::async_trait;
use push_shared::error::PushError;
use tracing::info;
use uuid::Uuid;

use super::{Notifier, PushMessage, redact_token};

pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, message: &PushMessage) -> Result<String, PushError> {
        let message_id = Uuid::now_v7().to_string();

        info!(
            provider = "log",
            message_id = %message_id,
            token = %redact_token(&message.token),
            title = %message.title,
            body = %message.body,
            data = ?message.data,
            "模拟发送推送通知"
        );

        Ok(message_id)
    }

    fn provider(&self) -> &'static str {
        "log"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[tokio::test]
    async fn test_log_notifier_always_accepts() {
        let message = PushMessage {
            token: "device-token-001".to_string(),
            title: "Alice".to_string(),
            body: "Sent you a photo".to_string(),
            data: BTreeMap::from([("type".to_string(), "image".to_string())]),
            channel_id: "default_channel".to_string(),
            sound: "default".to_string(),
        };

        let message_id = LogNotifier.send(&message).await.unwrap();
        assert!(!message_id.is_empty());
        assert_eq!(LogNotifier.provider(), "log");
    }
}
