//! 单条推送分发器
//!
//! 把标题、正文和消息类型组装成提供方消息，调用一次 `Notifier`。
//! 提供方失败在这一层被捕获并转成布尔/报告，扇出流程因此不会被单个失败打断；
//! 失败由调用方写入汇总结果。

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use push_shared::observability::metrics;
use tracing::{info, warn};

use crate::notifier::{Notifier, PushMessage, redact_token};
use crate::templates::CHAT_MESSAGE_TYPE;

/// Android 默认通知渠道
pub const DEFAULT_CHANNEL_ID: &str = "default_channel";

/// 默认提示音
pub const DEFAULT_SOUND: &str = "default";

/// 单次发送报告
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReport {
    pub sent: bool,
    /// 提供方返回的消息标识
    pub message_id: Option<String>,
    pub error: Option<String>,
}

#[derive(Clone)]
pub struct Dispatcher {
    notifier: Arc<dyn Notifier>,
}

impl Dispatcher {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self { notifier }
    }

    /// 组装提供方消息：高优先级投递、默认渠道与提示音
    pub fn build_message(token: &str, title: &str, body: &str, message_type: &str) -> PushMessage {
        let message_type = if message_type.trim().is_empty() {
            CHAT_MESSAGE_TYPE
        } else {
            message_type
        };

        PushMessage {
            token: token.to_string(),
            title: title.to_string(),
            body: body.to_string(),
            data: BTreeMap::from([("type".to_string(), message_type.to_string())]),
            channel_id: DEFAULT_CHANNEL_ID.to_string(),
            sound: DEFAULT_SOUND.to_string(),
        }
    }

    /// 发送并返回详细报告，永不返回错误
    pub async fn deliver(
        &self,
        token: &str,
        title: &str,
        body: &str,
        message_type: &str,
    ) -> DeliveryReport {
        let message = Self::build_message(token, title, body, message_type);
        let provider = self.notifier.provider();
        let start = Instant::now();

        let result = self.notifier.send(&message).await;
        let elapsed = start.elapsed().as_secs_f64();
        metrics::record_push_send(provider, result.is_ok(), elapsed);

        match result {
            Ok(message_id) => {
                info!(
                    provider,
                    token = %redact_token(token),
                    message_id = %message_id,
                    message_type = %message.data["type"],
                    "推送发送成功"
                );
                DeliveryReport {
                    sent: true,
                    message_id: Some(message_id),
                    error: None,
                }
            }
            Err(e) => {
                warn!(
                    provider,
                    token = %redact_token(token),
                    error = %e,
                    "推送发送失败"
                );
                DeliveryReport {
                    sent: false,
                    message_id: None,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    /// 发送一条推送，提供方接受时返回 true
    pub async fn send(&self, token: &str, title: &str, body: &str, message_type: &str) -> bool {
        self.deliver(token, title, body, message_type).await.sent
    }
}
