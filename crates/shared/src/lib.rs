//! 共享库
//!
//! 包含所有服务共用的配置、错误处理、可观测性以及 Google 服务账号凭证等基础设施代码。

pub mod config;
pub mod credentials;
pub mod error;
pub mod observability;
