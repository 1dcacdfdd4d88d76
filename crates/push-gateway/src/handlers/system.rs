//! 服务探针

use axum::{Json, extract::State};

use crate::state::AppState;

/// 首页横幅
pub async fn index() -> &'static str {
    "Push gateway is running"
}

/// 存活探针：服务进程正常即返回 ok
pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": state.service_name,
    }))
}
