//! 请求 DTO 定义
//!
//! 必填字段声明为 `Option`，缺失与空字符串统一由 validator 报告为缺少字段，
//! 而不是让 JSON 反序列化直接失败。

use push_fanout::{DirectNotification, GroupNotification};
use serde::Deserialize;
use validator::Validate;

/// 直接按设备令牌发送
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SendNotificationRequest {
    #[validate(required(message = "token 不能为空"), length(min = 1, message = "token 不能为空"))]
    pub token: Option<String>,
    #[validate(required(message = "title 不能为空"), length(min = 1, message = "title 不能为空"))]
    pub title: Option<String>,
    #[validate(required(message = "body 不能为空"), length(min = 1, message = "body 不能为空"))]
    pub body: Option<String>,
}

/// 单聊通知
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChatNotificationRequest {
    #[validate(required(message = "toUid 不能为空"), length(min = 1, message = "toUid 不能为空"))]
    pub to_uid: Option<String>,
    /// 通常是发送者的显示名
    #[validate(required(message = "title 不能为空"), length(min = 1, message = "title 不能为空"))]
    pub title: Option<String>,
    pub body: Option<String>,
    pub message_type: Option<String>,
}

impl ChatNotificationRequest {
    /// 校验通过后转换为引擎请求
    pub fn into_notification(self) -> DirectNotification {
        DirectNotification {
            recipient_id: self.to_uid.unwrap_or_default(),
            title: self.title.unwrap_or_default(),
            body: self.body,
            message_type: self.message_type,
        }
    }
}

/// 群组通知
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GroupNotificationRequest {
    #[validate(required(message = "groupId 不能为空"), length(min = 1, message = "groupId 不能为空"))]
    pub group_id: Option<String>,
    #[validate(required(message = "senderId 不能为空"), length(min = 1, message = "senderId 不能为空"))]
    pub sender_id: Option<String>,
    pub sender_name: Option<String>,
    pub group_name: Option<String>,
    pub body: Option<String>,
    pub message_type: Option<String>,
}

impl GroupNotificationRequest {
    pub fn into_notification(self) -> GroupNotification {
        GroupNotification {
            group_id: self.group_id.unwrap_or_default(),
            sender_id: self.sender_id.unwrap_or_default(),
            sender_name: self.sender_name,
            group_name: self.group_name,
            body: self.body,
            message_type: self.message_type,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_notification_missing_fields() {
        let request: SendNotificationRequest =
            serde_json::from_value(serde_json::json!({ "token": "tok", "title": "" })).unwrap();
        let errors = request.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("title"));
        assert!(fields.contains_key("body"));
        assert!(!fields.contains_key("token"));
    }

    #[test]
    fn test_chat_request_conversion() {
        let request: ChatNotificationRequest = serde_json::from_value(serde_json::json!({
            "toUid": "b",
            "title": "Alice",
            "messageType": "image"
        }))
        .unwrap();
        assert!(request.validate().is_ok());

        let notification = request.into_notification();
        assert_eq!(notification.recipient_id, "b");
        assert_eq!(notification.title, "Alice");
        assert!(notification.body.is_none());
        assert_eq!(notification.message_type.as_deref(), Some("image"));
    }

    #[test]
    fn test_group_request_requires_group_and_sender() {
        let request: GroupNotificationRequest =
            serde_json::from_value(serde_json::json!({ "body": "hi" })).unwrap();
        let errors = request.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("group_id"));
        assert!(errors.field_errors().contains_key("sender_id"));
    }
}
