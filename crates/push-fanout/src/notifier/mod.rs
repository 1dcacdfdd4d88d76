//! 推送提供方抽象
//!
//! 通过 `Notifier` trait 抽象"向一个设备令牌发送一条推送"的能力。
//! 引擎不解读提供方的错误码，只区分成功与失败。

mod fcm;
mod logging;

pub use fcm::FcmNotifier;
pub use logging::LogNotifier;

use std::collections::BTreeMap;

use async_trait::async_trait;
use push_shared::error::PushError;
use serde::Serialize;

/// 提供方无关的推送消息，一律按高优先级投递
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PushMessage {
    pub token: String,
    pub title: String,
    pub body: String,
    /// 透传给客户端的数据字段，其中 `type` 用于客户端路由界面行为
    pub data: BTreeMap<String, String>,
    pub channel_id: String,
    pub sound: String,
}

/// 推送提供方
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    /// 发送一条推送，成功时返回提供方的消息标识
    async fn send(&self, message: &PushMessage) -> Result<String, PushError>;

    /// 提供方名称，用于日志和指标标签
    fn provider(&self) -> &'static str;
}

/// 日志中只保留令牌前缀
pub fn redact_token(token: &str) -> String {
    let prefix: String = token.chars().take(8).collect();
    if prefix.len() < token.len() {
        format!("{prefix}…")
    } else {
        prefix
    }
}
