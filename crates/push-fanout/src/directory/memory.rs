//! 内存目录
//!
//! 使用 DashMap 实现的高并发内存目录，适用于测试和本地开发环境；
//! 可从 JSON 种子文件加载初始用户和群组。

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use push_shared::error::PushError;
use serde::Deserialize;
use tracing::info;

use super::{GroupDirectory, UserDirectory};
use crate::model::{Group, User};

/// 种子文件格式
///
/// ```json
/// { "users": [{ "id": "a", "deviceToken": "..." }], "groups": [{ "id": "g1", "members": ["a"] }] }
/// ```
#[derive(Debug, Default, Deserialize)]
pub struct DirectorySeed {
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub groups: Vec<Group>,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryDirectory {
    users: Arc<DashMap<String, User>>,
    groups: Arc<DashMap<String, Group>>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_seed(seed: DirectorySeed) -> Self {
        let directory = Self::new();
        for user in seed.users {
            directory.insert_user(user);
        }
        for group in seed.groups {
            directory.insert_group(group);
        }
        directory
    }

    /// 从 JSON 种子文件加载
    pub async fn load_seed_file(path: impl AsRef<Path>) -> Result<Self, PushError> {
        let path = path.as_ref();
        let raw = tokio::fs::read(path).await?;
        let seed: DirectorySeed = serde_json::from_slice(&raw)?;

        info!(
            path = %path.display(),
            users = seed.users.len(),
            groups = seed.groups.len(),
            "已加载目录种子数据"
        );

        Ok(Self::from_seed(seed))
    }

    /// 插入或覆盖用户
    pub fn insert_user(&self, user: User) {
        self.users.insert(user.id.clone(), user);
    }

    /// 插入或覆盖群组
    pub fn insert_group(&self, group: Group) {
        self.groups.insert(group.id.clone(), group);
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }
}

#[async_trait]
impl UserDirectory for MemoryDirectory {
    async fn get_user(&self, id: &str) -> Result<Option<User>, PushError> {
        Ok(self.users.get(id).map(|v| v.clone()))
    }
}

#[async_trait]
impl GroupDirectory for MemoryDirectory {
    async fn get_group(&self, id: &str) -> Result<Option<Group>, PushError> {
        Ok(self.groups.get(id).map(|v| v.clone()))
    }
}
