//! 响应 DTO 定义

use push_fanout::{AttachmentReceipt, BatchResult, DispatchOutcome};
use serde::Serialize;

/// `/send-notification` 响应
#[derive(Debug, Serialize)]
pub struct SendResponse {
    pub success: bool,
}

/// 单聊/群组通知响应
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResponse {
    pub success: bool,
    pub outcomes: Vec<DispatchOutcome>,
}

impl From<BatchResult> for BatchResponse {
    fn from(result: BatchResult) -> Self {
        Self {
            success: result.overall_success,
            outcomes: result.outcomes,
        }
    }
}

/// 附件上传响应
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub success: bool,
    pub file_url: String,
    /// 接收者是否收到了推送
    pub notified: bool,
}

impl From<AttachmentReceipt> for UploadResponse {
    fn from(receipt: AttachmentReceipt) -> Self {
        Self {
            success: true,
            file_url: receipt.file_ref,
            notified: receipt.notified,
        }
    }
}
