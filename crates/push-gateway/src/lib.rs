//! 推送网关（HTTP 服务）
//!
//! 对外提供单聊、群组、直接令牌推送以及附件上传通知的 REST API，
//! 业务逻辑全部委托给 `push-fanout` 的扇出引擎。
//!
//! ## 模块结构
//!
//! - `dto`: 请求和响应的数据传输对象
//! - `error`: 错误类型及 HTTP 映射
//! - `handlers`: HTTP 请求处理器
//! - `routes`: 路由与中间件组装
//! - `state`: 应用状态及依赖组装
//! - `uploads`: 附件本地存储

pub mod dto;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;
pub mod uploads;

pub use error::{GatewayError, Result};
pub use routes::build_router;
pub use state::AppState;
pub use uploads::UploadStore;
