//! 通知发送处理器

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use push_fanout::NotificationRequest;
use tracing::info;
use validator::Validate;

use crate::{
    dto::{
        BatchResponse, ChatNotificationRequest, GroupNotificationRequest, SendNotificationRequest,
        SendResponse,
    },
    error::Result,
    state::AppState,
};

/// 直接按设备令牌发送
///
/// POST /send-notification
pub async fn send_notification(
    State(state): State<AppState>,
    payload: std::result::Result<Json<SendNotificationRequest>, JsonRejection>,
) -> Result<Json<SendResponse>> {
    let Json(req) = payload?;
    req.validate()?;

    let token = req.token.unwrap_or_default();
    let title = req.title.unwrap_or_default();
    let body = req.body.unwrap_or_default();

    let success = state.engine.notify_token(&token, &title, &body).await;

    Ok(Json(SendResponse { success }))
}

/// 单聊通知
///
/// POST /send-chat-notification
pub async fn send_chat_notification(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ChatNotificationRequest>, JsonRejection>,
) -> Result<Json<BatchResponse>> {
    let Json(req) = payload?;
    req.validate()?;

    let notification = req.into_notification();
    info!(to_uid = %notification.recipient_id, "收到单聊通知请求");

    let result = state
        .engine
        .dispatch(&NotificationRequest::Direct(notification))
        .await?;

    Ok(Json(result.into()))
}

/// 群组通知
///
/// POST /send-group-notification
pub async fn send_group_notification(
    State(state): State<AppState>,
    payload: std::result::Result<Json<GroupNotificationRequest>, JsonRejection>,
) -> Result<Json<BatchResponse>> {
    let Json(req) = payload?;
    req.validate()?;

    let notification = req.into_notification();
    info!(
        group_id = %notification.group_id,
        sender_id = %notification.sender_id,
        "收到群组通知请求"
    );

    let result = state
        .engine
        .dispatch(&NotificationRequest::Group(notification))
        .await?;

    Ok(Json(result.into()))
}
