//! 用户与群组目录
//!
//! 目录由外部系统持有，引擎只读。"不存在" 通过 `Ok(None)` 表达，
//! 只有传输层失败才返回错误；引擎把错误同样视为不存在，仅额外记录日志。

mod firestore;
mod memory;

pub use firestore::FirestoreDirectory;
pub use memory::{DirectorySeed, MemoryDirectory};

use async_trait::async_trait;
use push_shared::error::PushError;

use crate::model::{Group, User};

/// 用户目录：按用户 ID 查询当前设备令牌
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn get_user(&self, id: &str) -> Result<Option<User>, PushError>;
}

/// 群组目录：按群组 ID 查询成员列表
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GroupDirectory: Send + Sync {
    async fn get_group(&self, id: &str) -> Result<Option<Group>, PushError>;
}
