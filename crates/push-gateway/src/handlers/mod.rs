//! HTTP 请求处理器

pub mod notification;
pub mod system;
pub mod upload;
