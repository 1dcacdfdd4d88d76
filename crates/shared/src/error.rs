//! 统一错误处理模块
//!
//! 定义基础设施层（配置、HTTP 调用、凭证、外部服务）共享的错误类型。
//! 业务层错误在各自 crate 中定义，并通过 `#[from]` 包装本类型。

use thiserror::Error;

/// 基础设施错误类型
#[derive(Debug, Error)]
pub enum PushError {
    // ==================== 配置错误 ====================
    #[error("配置错误: {0}")]
    Config(#[from] config::ConfigError),

    // ==================== 外部服务错误 ====================
    #[error("HTTP 请求失败: {0}")]
    Http(#[from] reqwest::Error),

    #[error("外部服务错误: {service} - {message}")]
    ExternalService { service: String, message: String },

    #[error("外部服务超时: {service}")]
    ExternalServiceTimeout { service: String },

    // ==================== 凭证错误 ====================
    #[error("凭证无效: {0}")]
    Credentials(String),

    // ==================== 验证错误 ====================
    #[error("参数验证失败: {0}")]
    Validation(String),

    // ==================== 通用错误 ====================
    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON 处理错误: {0}")]
    Json(#[from] serde_json::Error),

    #[error("内部错误: {0}")]
    Internal(String),
}

/// 错误结果类型别名
pub type Result<T> = std::result::Result<T, PushError>;

impl PushError {
    /// 获取错误码
    pub fn code(&self) -> &'static str {
        match self {
            Self::Config(_) => "CONFIG_ERROR",
            Self::Http(_) => "HTTP_ERROR",
            Self::ExternalService { .. } => "EXTERNAL_SERVICE_ERROR",
            Self::ExternalServiceTimeout { .. } => "EXTERNAL_SERVICE_TIMEOUT",
            Self::Credentials(_) => "INVALID_CREDENTIALS",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// 将 reqwest 错误按是否超时归类，便于日志和指标区分
    pub fn from_transport(service: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::ExternalServiceTimeout {
                service: service.to_string(),
            }
        } else {
            Self::Http(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        let err = PushError::ExternalService {
            service: "fcm".to_string(),
            message: "UNREGISTERED".to_string(),
        };
        assert_eq!(err.code(), "EXTERNAL_SERVICE_ERROR");
        assert_eq!(err.to_string(), "外部服务错误: fcm - UNREGISTERED");

        let timeout = PushError::ExternalServiceTimeout {
            service: "firestore".to_string(),
        };
        assert_eq!(timeout.code(), "EXTERNAL_SERVICE_TIMEOUT");
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: PushError = json_err.into();
        assert_eq!(err.code(), "JSON_ERROR");
    }
}
