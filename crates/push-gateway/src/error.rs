//! 推送网关错误类型定义
//!
//! 把引擎错误、请求校验错误和附件存储错误统一映射为 HTTP 响应。

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use push_fanout::{BatchResult, ErrorKind, FanoutError};
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("缺少必填字段: {0}")]
    MissingField(String),

    #[error("请求格式无效: {0}")]
    InvalidRequest(String),

    #[error("User not found: {0}")]
    RecipientNotFound(String),

    #[error("Group not found: {0}")]
    GroupNotFound(String),

    #[error("User has no FCM token: {0}")]
    NoDeviceToken(String),

    #[error("附件超过大小限制: {limit} 字节")]
    PayloadTooLarge { limit: usize },

    #[error("附件存储失败: {0}")]
    Storage(#[from] std::io::Error),

    #[error("内部错误: {0}")]
    Internal(String),
}

impl GatewayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingField(_) | Self::InvalidRequest(_) | Self::NoDeviceToken(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::RecipientNotFound(_) | Self::GroupNotFound(_) => StatusCode::NOT_FOUND,
            Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Storage(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 对外的错误分类，仅业务错误有
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::MissingField(_) => Some(ErrorKind::MissingRequiredField),
            Self::RecipientNotFound(_) => Some(ErrorKind::RecipientNotFound),
            Self::GroupNotFound(_) => Some(ErrorKind::GroupNotFound),
            Self::NoDeviceToken(_) => Some(ErrorKind::NoDeviceToken),
            _ => None,
        }
    }

    pub fn error_code(&self) -> &'static str {
        if let Some(kind) = self.kind() {
            return kind.as_str();
        }
        match self {
            Self::InvalidRequest(_) => "InvalidRequest",
            Self::PayloadTooLarge { .. } => "PayloadTooLarge",
            Self::Storage(_) => "StorageError",
            _ => "InternalError",
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // 系统级错误只返回通用提示，详细信息仅记录日志
        let message = match &self {
            Self::Storage(e) => {
                tracing::error!(error = %e, "附件存储失败");
                "服务内部错误，请稍后重试".to_string()
            }
            Self::Internal(e) => {
                tracing::error!(error = %e, "内部错误");
                "服务内部错误，请稍后重试".to_string()
            }
            other => other.to_string(),
        };

        let mut body = json!({
            "success": false,
            "code": self.error_code(),
            "message": message,
        });

        // 业务拒绝同时带上批量结果的形状，便于调用方统一解析
        if let Some(kind) = self.kind() {
            let batch = BatchResult::rejected(kind);
            body["outcomes"] = json!(batch.outcomes);
            body["error"] = json!(batch.error);
        }

        (status, axum::Json(body)).into_response()
    }
}

impl From<FanoutError> for GatewayError {
    fn from(err: FanoutError) -> Self {
        match err {
            FanoutError::RecipientNotFound { recipient_id } => Self::RecipientNotFound(recipient_id),
            FanoutError::GroupNotFound { group_id } => Self::GroupNotFound(group_id),
            FanoutError::NoDeviceToken { recipient_id } => Self::NoDeviceToken(recipient_id),
            FanoutError::MissingRequiredField { field } => Self::MissingField(field),
            FanoutError::Shared(e) => Self::Internal(e.to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for GatewayError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let field_errors = errors.field_errors();
        let mut fields: Vec<&str> = field_errors.keys().map(|k| k.as_ref()).collect();
        fields.sort_unstable();
        Self::MissingField(fields.join(", "))
    }
}

impl From<axum::extract::rejection::JsonRejection> for GatewayError {
    fn from(rejection: axum::extract::rejection::JsonRejection) -> Self {
        Self::InvalidRequest(rejection.body_text())
    }
}

impl From<axum::extract::multipart::MultipartError> for GatewayError {
    fn from(err: axum::extract::multipart::MultipartError) -> Self {
        Self::InvalidRequest(err.body_text())
    }
}

pub type Result<T> = std::result::Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;
    use push_shared::error::PushError;

    fn all_error_variants() -> Vec<(GatewayError, StatusCode, &'static str)> {
        vec![
            (GatewayError::MissingField("token".into()), StatusCode::BAD_REQUEST, "MissingRequiredField"),
            (GatewayError::InvalidRequest("EOF".into()), StatusCode::BAD_REQUEST, "InvalidRequest"),
            (GatewayError::RecipientNotFound("b".into()), StatusCode::NOT_FOUND, "RecipientNotFound"),
            (GatewayError::GroupNotFound("g".into()), StatusCode::NOT_FOUND, "GroupNotFound"),
            (GatewayError::NoDeviceToken("b".into()), StatusCode::BAD_REQUEST, "NoDeviceToken"),
            (GatewayError::PayloadTooLarge { limit: 10 }, StatusCode::PAYLOAD_TOO_LARGE, "PayloadTooLarge"),
            (GatewayError::Internal("boom".into()), StatusCode::INTERNAL_SERVER_ERROR, "InternalError"),
        ]
    }

    #[test]
    fn test_status_codes_and_error_codes() {
        for (err, status, code) in all_error_variants() {
            assert_eq!(err.status_code(), status, "{err:?}");
            assert_eq!(err.error_code(), code, "{err:?}");
        }
    }

    #[test]
    fn test_from_fanout_error() {
        let err: GatewayError = FanoutError::GroupNotFound {
            group_id: "g9".to_string(),
        }
        .into();
        assert!(matches!(err, GatewayError::GroupNotFound(ref id) if id == "g9"));

        let err: GatewayError = FanoutError::Shared(PushError::Internal("x".into())).into();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_group_not_found_body_shape() {
        let response = GatewayError::GroupNotFound("g9".into()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "GroupNotFound");
        assert_eq!(json["outcomes"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_internal_error_hides_detail() {
        let response = GatewayError::Internal("secret path".into()).into_response();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(!json["message"].as_str().unwrap().contains("secret"));
        assert!(json.get("outcomes").is_none());
    }
}
