//! 请求和响应 DTO
//!
//! 字段名沿用现有客户端的 camelCase 约定。

pub mod request;
pub mod response;

pub use request::{ChatNotificationRequest, GroupNotificationRequest, SendNotificationRequest};
pub use response::{BatchResponse, SendResponse, UploadResponse};
