//! 通知文案模板
//!
//! 根据消息类型生成默认正文，以及群组标题、发送者显示名等默认值。
//! 所有默认文案只在此处定义一次。

/// 未知或缺失消息类型时的默认正文
pub const DEFAULT_BODY: &str = "Sent you a message";

/// 群组没有显示名时使用的标题
pub const DEFAULT_GROUP_TITLE: &str = "Group Message";

/// 未提供发送者名字时使用的显示名
pub const DEFAULT_SENDER_NAME: &str = "Someone";

/// 附件上传触发的通知标题
pub const ATTACHMENT_TITLE: &str = "New Message";

/// 单聊推送的 `type` 数据字段默认值
pub const CHAT_MESSAGE_TYPE: &str = "chat";

/// 群组推送的 `type` 数据字段
pub const GROUP_MESSAGE_TYPE: &str = "group";

/// 有默认文案的消息类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    Audio,
    Image,
    Video,
    Document,
}

impl MessageType {
    /// 按标签解析，大小写敏感；不在固定词表中的返回 None
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "audio" => Some(Self::Audio),
            "image" => Some(Self::Image),
            "video" => Some(Self::Video),
            "document" => Some(Self::Document),
            _ => None,
        }
    }

    pub fn default_body(&self) -> &'static str {
        match self {
            Self::Audio => "Sent you a voice message",
            Self::Image => "Sent you a photo",
            Self::Video => "Sent you a video",
            Self::Document => "Sent you a document",
        }
    }
}

/// 正文模板
///
/// 纯函数，没有失败分支。
pub struct BodyTemplater;

impl BodyTemplater {
    /// 显式正文去除空白后非空则原样返回，否则按消息类型取默认文案
    pub fn resolve(explicit_body: Option<&str>, message_type: Option<&str>) -> String {
        match explicit_body {
            Some(body) if !body.trim().is_empty() => body.to_string(),
            _ => Self::default_for(message_type).to_string(),
        }
    }

    pub fn default_for(message_type: Option<&str>) -> &'static str {
        message_type
            .and_then(MessageType::from_tag)
            .map(|t| t.default_body())
            .unwrap_or(DEFAULT_BODY)
    }
}

/// 群组标题：请求中的群名优先，其次目录中的群名
pub fn group_title(requested: Option<&str>, directory_name: Option<&str>) -> String {
    first_non_blank(&[requested, directory_name])
        .unwrap_or(DEFAULT_GROUP_TITLE)
        .to_string()
}

pub fn sender_display_name(sender_name: Option<&str>) -> &str {
    first_non_blank(&[sender_name]).unwrap_or(DEFAULT_SENDER_NAME)
}

/// 群组正文：`<发送者>: <消息>`
pub fn group_body(sender_name: &str, text: &str) -> String {
    format!("{sender_name}: {text}")
}

fn first_non_blank<'a>(candidates: &[Option<&'a str>]) -> Option<&'a str> {
    candidates
        .iter()
        .flatten()
        .copied()
        .find(|s| !s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_body_per_message_type() {
        let cases = [
            ("audio", "Sent you a voice message"),
            ("image", "Sent you a photo"),
            ("video", "Sent you a video"),
            ("document", "Sent you a document"),
        ];
        for (tag, expected) in cases {
            assert_eq!(BodyTemplater::resolve(None, Some(tag)), expected, "tag={tag}");
            assert_eq!(BodyTemplater::resolve(Some("  "), Some(tag)), expected, "tag={tag}");
        }
    }

    #[test]
    fn test_unknown_or_missing_type_uses_generic_default() {
        assert_eq!(BodyTemplater::resolve(None, None), DEFAULT_BODY);
        assert_eq!(BodyTemplater::resolve(None, Some("sticker")), DEFAULT_BODY);
        assert_eq!(BodyTemplater::resolve(Some(""), Some("chat")), DEFAULT_BODY);
        // 大小写敏感
        assert_eq!(BodyTemplater::resolve(None, Some("IMAGE")), DEFAULT_BODY);
    }

    #[test]
    fn test_explicit_body_returned_unchanged() {
        let body = "  see you at 8  ";
        assert_eq!(BodyTemplater::resolve(Some(body), Some("image")), body);

        // 再次应用结果不变
        let once = BodyTemplater::resolve(Some("hi"), Some("audio"));
        let twice = BodyTemplater::resolve(Some(&once), Some("audio"));
        assert_eq!(once, twice);
    }

    #[test]
    fn test_group_title_fallbacks() {
        assert_eq!(group_title(Some("Family"), Some("Dir")), "Family");
        assert_eq!(group_title(Some(" "), Some("Dir")), "Dir");
        assert_eq!(group_title(None, None), DEFAULT_GROUP_TITLE);
    }

    #[test]
    fn test_sender_display_name_and_group_body() {
        assert_eq!(sender_display_name(Some("Alice")), "Alice");
        assert_eq!(sender_display_name(Some("")), DEFAULT_SENDER_NAME);
        assert_eq!(sender_display_name(None), DEFAULT_SENDER_NAME);
        assert_eq!(group_body("Alice", "hi"), "Alice: hi");
    }
}
