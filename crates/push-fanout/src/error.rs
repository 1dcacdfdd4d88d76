//! 扇出引擎错误类型
//!
//! `FanoutError` 只用于"什么都无法尝试"的硬错误（接收者/群组不存在、没有令牌等）；
//! 单个接收者的推送失败记录在 `DispatchOutcome` 中，不会以错误形式抛出。

use push_shared::error::PushError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 对外暴露的错误分类
///
/// 按变体名序列化（如 `"NoDeviceToken"`），调用方可直接据此分支。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    RecipientNotFound,
    GroupNotFound,
    NoDeviceToken,
    ProviderSendFailure,
    MissingRequiredField,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RecipientNotFound => "RecipientNotFound",
            Self::GroupNotFound => "GroupNotFound",
            Self::NoDeviceToken => "NoDeviceToken",
            Self::ProviderSendFailure => "ProviderSendFailure",
            Self::MissingRequiredField => "MissingRequiredField",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum FanoutError {
    #[error("接收者不存在: {recipient_id}")]
    RecipientNotFound { recipient_id: String },

    #[error("群组不存在: {group_id}")]
    GroupNotFound { group_id: String },

    #[error("用户没有可用的推送令牌: {recipient_id}")]
    NoDeviceToken { recipient_id: String },

    #[error("缺少必填字段: {field}")]
    MissingRequiredField { field: String },

    #[error(transparent)]
    Shared(#[from] PushError),
}

impl FanoutError {
    /// 业务错误对应的分类；基础设施错误没有对外分类
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::RecipientNotFound { .. } => Some(ErrorKind::RecipientNotFound),
            Self::GroupNotFound { .. } => Some(ErrorKind::GroupNotFound),
            Self::NoDeviceToken { .. } => Some(ErrorKind::NoDeviceToken),
            Self::MissingRequiredField { .. } => Some(ErrorKind::MissingRequiredField),
            Self::Shared(_) => None,
        }
    }

    pub fn missing(field: &str) -> Self {
        Self::MissingRequiredField {
            field: field.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, FanoutError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FanoutError::NoDeviceToken {
            recipient_id: "user-001".to_string(),
        };
        assert_eq!(err.to_string(), "用户没有可用的推送令牌: user-001");
        assert_eq!(err.kind(), Some(ErrorKind::NoDeviceToken));

        let group_err = FanoutError::GroupNotFound {
            group_id: "g1".to_string(),
        };
        assert_eq!(group_err.to_string(), "群组不存在: g1");
        assert_eq!(group_err.kind(), Some(ErrorKind::GroupNotFound));

        assert_eq!(
            FanoutError::missing("toUid").to_string(),
            "缺少必填字段: toUid"
        );
    }

    #[test]
    fn test_shared_error_has_no_kind() {
        let err: FanoutError = PushError::Internal("boom".to_string()).into();
        assert_eq!(err.kind(), None);
        assert_eq!(err.to_string(), "内部错误: boom");
    }

    #[test]
    fn test_error_kind_serializes_by_variant_name() {
        let json = serde_json::to_string(&ErrorKind::NoDeviceToken).unwrap();
        assert_eq!(json, "\"NoDeviceToken\"");
        assert_eq!(ErrorKind::GroupNotFound.to_string(), "GroupNotFound");
    }
}
