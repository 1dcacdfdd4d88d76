//! 路由配置模块

use std::time::Duration;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware,
    routing::{get, post},
};
use push_shared::config::ServerConfig;
use push_shared::observability::middleware as obs_middleware;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::timeout::TimeoutLayer;
use tracing::info;

use crate::{handlers, state::AppState};

/// multipart 表单字段和边界的额外开销
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// 通知相关路由
pub fn notification_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/send-notification",
            post(handlers::notification::send_notification),
        )
        .route(
            "/send-chat-notification",
            post(handlers::notification::send_chat_notification),
        )
        .route(
            "/send-group-notification",
            post(handlers::notification::send_group_notification),
        )
}

/// 附件上传路由，请求体上限跟随附件配置
pub fn upload_routes(max_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/upload-message", post(handlers::upload::upload_message))
        .layer(DefaultBodyLimit::max(
            max_bytes.saturating_add(MULTIPART_OVERHEAD_BYTES),
        ))
}

/// 组装完整应用：业务路由、静态附件、CORS、超时与可观测性中间件
pub fn build_router(state: AppState, server: &ServerConfig) -> Router {
    let uploads = ServeDir::new(state.uploads.dir());
    let public_prefix = state.uploads.public_prefix().to_string();

    Router::new()
        .route("/", get(handlers::system::index))
        .route("/health", get(handlers::system::health))
        .merge(notification_routes())
        .merge(upload_routes(state.uploads.max_bytes()))
        .nest_service(&public_prefix, uploads)
        .layer(TimeoutLayer::new(Duration::from_secs(
            server.request_timeout_seconds,
        )))
        .layer(cors_layer(&server.cors_origins))
        .layer(middleware::from_fn(obs_middleware::http_tracing))
        .layer(middleware::from_fn(obs_middleware::request_id))
        .with_state(state)
}

/// CORS 配置：`*` 表示允许所有来源，否则为逗号分隔的来源列表
fn cors_layer(allowed_origins: &str) -> CorsLayer {
    if allowed_origins.trim() == "*" {
        info!("CORS allowed_origins: * (all origins)");
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    info!("CORS allowed_origins: {}", allowed_origins);
    let origins: Vec<_> = allowed_origins
        .split(',')
        .filter_map(|s| s.trim().parse::<HeaderValue>().ok())
        .collect();
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
}
