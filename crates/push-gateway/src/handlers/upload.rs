//! 附件上传处理器
//!
//! 先保存附件，再向接收者发送"新消息"推送；接收者没有令牌时上传仍视为成功。

use axum::{
    Json,
    extract::{Multipart, State},
};
use push_fanout::AttachmentNotification;
use tracing::info;

use crate::{
    dto::UploadResponse,
    error::{GatewayError, Result},
    state::AppState,
};

/// 解析后的上传表单
#[derive(Debug, Default)]
struct UploadForm {
    file: Option<(String, Vec<u8>)>,
    sender_id: Option<String>,
    sender_name: Option<String>,
    receiver_id: Option<String>,
    message_type: Option<String>,
}

impl UploadForm {
    async fn parse(mut multipart: Multipart) -> Result<Self> {
        let mut form = Self::default();

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "file" => {
                    let file_name = field.file_name().unwrap_or("file").to_string();
                    let bytes = field.bytes().await?;
                    form.file = Some((file_name, bytes.to_vec()));
                }
                "senderId" => form.sender_id = non_blank(field.text().await?),
                "senderName" => form.sender_name = non_blank(field.text().await?),
                "receiverId" => form.receiver_id = non_blank(field.text().await?),
                "messageType" => form.message_type = non_blank(field.text().await?),
                _ => {}
            }
        }

        Ok(form)
    }
}

fn non_blank(value: String) -> Option<String> {
    (!value.trim().is_empty()).then_some(value)
}

/// 上传附件并通知接收者
///
/// POST /upload-message
pub async fn upload_message(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<UploadResponse>> {
    let form = UploadForm::parse(multipart).await?;

    let (file_name, bytes) = form
        .file
        .ok_or_else(|| GatewayError::MissingField("file".to_string()))?;
    let receiver_id = form
        .receiver_id
        .ok_or_else(|| GatewayError::MissingField("receiverId".to_string()))?;

    let stored = state.uploads.save(&file_name, &bytes).await?;
    info!(
        receiver_id = %receiver_id,
        file = %stored.file_name,
        size = stored.size,
        "收到附件上传"
    );

    let receipt = state
        .engine
        .dispatch_attachment(&AttachmentNotification {
            receiver_id,
            sender_id: form.sender_id,
            sender_name: form.sender_name,
            message_type: form.message_type,
            file_ref: stored.public_url,
        })
        .await?;

    Ok(Json(receipt.into()))
}
