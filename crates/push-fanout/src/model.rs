//! 数据模型
//!
//! `User` / `Group` 由外部目录持有，引擎只读；其余类型都在单次调度中创建，
//! 响应生成后即丢弃，不跨请求保存任何状态。

use serde::{Deserialize, Serialize};

use crate::dispatcher::DeliveryReport;
use crate::error::ErrorKind;

// ---------------------------------------------------------------------------
// 目录实体
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    /// 设备推送令牌，缺失表示该用户无法接收推送
    #[serde(default)]
    pub device_token: Option<String>,
}

impl User {
    pub fn new(id: impl Into<String>, device_token: Option<&str>) -> Self {
        Self {
            id: id.into(),
            device_token: device_token.map(str::to_string),
        }
    }

    /// 可用的推送令牌；空白字符串与缺失同等对待
    pub fn push_token(&self) -> Option<&str> {
        self.device_token
            .as_deref()
            .filter(|token| !token.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    /// 成员用户 ID，假定不重复，不做二次校验
    #[serde(default)]
    pub members: Vec<String>,
}

impl Group {
    /// 去掉发送者本人后的接收者列表，保留原有顺序
    pub fn receivers_excluding(&self, sender_id: &str) -> Vec<String> {
        self.members
            .iter()
            .filter(|member| member.as_str() != sender_id)
            .cloned()
            .collect()
    }
}

// ---------------------------------------------------------------------------
// 调度请求
// ---------------------------------------------------------------------------

/// 单聊通知
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectNotification {
    pub recipient_id: String,
    /// 通常是发送者的显示名
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub message_type: Option<String>,
}

/// 群组通知
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupNotification {
    pub group_id: String,
    pub sender_id: String,
    #[serde(default)]
    pub sender_name: Option<String>,
    #[serde(default)]
    pub group_name: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    /// 正文为空时用于生成默认文案
    #[serde(default)]
    pub message_type: Option<String>,
}

/// 附件上传后触发的通知
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentNotification {
    pub receiver_id: String,
    pub sender_id: Option<String>,
    #[serde(default)]
    pub sender_name: Option<String>,
    #[serde(default)]
    pub message_type: Option<String>,
    /// 上传存储返回的文件引用，引擎只原样透传
    pub file_ref: String,
}

/// 调度请求，按目标类型区分
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "target", rename_all = "camelCase")]
pub enum NotificationRequest {
    Direct(DirectNotification),
    Group(GroupNotification),
}

impl NotificationRequest {
    pub fn target(&self) -> &'static str {
        match self {
            Self::Direct(_) => "direct",
            Self::Group(_) => "group",
        }
    }
}

// ---------------------------------------------------------------------------
// 调度结果
// ---------------------------------------------------------------------------

/// 单个接收者的投递结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchOutcome {
    pub recipient_id: String,
    pub token_found: bool,
    pub sent: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorKind>,
    /// 提供方返回的失败原因，仅用于排查
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl DispatchOutcome {
    /// 未能解析到令牌（用户不存在或没有令牌），未尝试发送
    pub fn unreachable(recipient_id: impl Into<String>, reason: ErrorKind) -> Self {
        Self {
            recipient_id: recipient_id.into(),
            token_found: false,
            sent: false,
            error: Some(reason),
            detail: None,
        }
    }

    /// 已尝试发送，结果取自发送报告
    pub fn delivered(recipient_id: impl Into<String>, report: DeliveryReport) -> Self {
        Self {
            recipient_id: recipient_id.into(),
            token_found: true,
            sent: report.sent,
            error: (!report.sent).then_some(ErrorKind::ProviderSendFailure),
            detail: report.error,
        }
    }
}

/// 一次调度的汇总结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResult {
    pub overall_success: bool,
    pub outcomes: Vec<DispatchOutcome>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorKind>,
}

impl BatchResult {
    /// 单聊：整体结果即唯一一次发送的结果
    pub fn direct(outcome: DispatchOutcome) -> Self {
        Self {
            overall_success: outcome.sent,
            outcomes: vec![outcome],
            error: None,
        }
    }

    /// 群组：群组存在即视为成功，成员结果逐个记录
    pub fn group(outcomes: Vec<DispatchOutcome>) -> Self {
        Self {
            overall_success: true,
            outcomes,
            error: None,
        }
    }

    /// 什么都无法尝试时的结果
    pub fn rejected(kind: ErrorKind) -> Self {
        Self {
            overall_success: false,
            outcomes: Vec::new(),
            error: Some(kind),
        }
    }

    pub fn sent_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.sent).count()
    }
}

/// 附件通知结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentReceipt {
    pub file_ref: String,
    pub notified: bool,
    pub outcome: DispatchOutcome,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_token_treats_blank_as_missing() {
        assert_eq!(User::new("a", Some("tok")).push_token(), Some("tok"));
        assert_eq!(User::new("a", Some("   ")).push_token(), None);
        assert_eq!(User::new("a", None).push_token(), None);
    }

    #[test]
    fn test_receivers_excluding_sender() {
        let group = Group {
            id: "g1".to_string(),
            name: None,
            members: vec!["a".to_string(), "b".to_string(), "c".to_string()],
        };
        assert_eq!(group.receivers_excluding("a"), vec!["b", "c"]);
        assert_eq!(group.receivers_excluding("z").len(), 3);
    }

    #[test]
    fn test_delivered_outcome_marks_provider_failure() {
        let failed = DispatchOutcome::delivered(
            "b",
            DeliveryReport {
                sent: false,
                message_id: None,
                error: Some("UNREGISTERED".to_string()),
            },
        );
        assert!(failed.token_found);
        assert!(!failed.sent);
        assert_eq!(failed.error, Some(ErrorKind::ProviderSendFailure));
        assert_eq!(failed.detail.as_deref(), Some("UNREGISTERED"));

        let ok = DispatchOutcome::delivered(
            "c",
            DeliveryReport {
                sent: true,
                message_id: Some("projects/p/messages/1".to_string()),
                error: None,
            },
        );
        assert!(ok.sent);
        assert!(ok.error.is_none());
    }

    #[test]
    fn test_rejected_batch_serialization() {
        let result = BatchResult::rejected(ErrorKind::GroupNotFound);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "overallSuccess": false,
                "outcomes": [],
                "error": "GroupNotFound"
            })
        );
    }

    #[test]
    fn test_request_tagged_deserialize() {
        let request: NotificationRequest = serde_json::from_value(serde_json::json!({
            "target": "group",
            "groupId": "g1",
            "senderId": "a",
            "body": "hi"
        }))
        .unwrap();
        assert_eq!(request.target(), "group");
        match request {
            NotificationRequest::Group(group) => {
                assert_eq!(group.group_id, "g1");
                assert!(group.sender_name.is_none());
            }
            NotificationRequest::Direct(_) => panic!("应解析为群组请求"),
        }
    }
}
