//! Firestore 目录
//!
//! 通过 Firestore REST 接口读取 `users/{id}` 与 `groups/{id}` 文档：
//! 用户令牌取 `deviceToken` 字段，群组取 `name` 与 `members` 字段。

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use push_shared::config::{DirectoryConfig, FirebaseConfig};
use push_shared::credentials::AccessTokenSource;
use push_shared::error::PushError;
use push_shared::observability::metrics;
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use tracing::debug;

use super::{GroupDirectory, UserDirectory};
use crate::model::{Group, User};

pub struct FirestoreDirectory {
    client: reqwest::Client,
    documents_url: Url,
    users_collection: String,
    groups_collection: String,
    tokens: Arc<dyn AccessTokenSource>,
}

#[derive(Debug, Default, Deserialize)]
struct Document {
    #[serde(default)]
    fields: HashMap<String, FieldValue>,
}

/// Firestore 类型化字段值，只解析用到的类型
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FieldValue {
    string_value: Option<String>,
    array_value: Option<ArrayValue>,
}

#[derive(Debug, Default, Deserialize)]
struct ArrayValue {
    #[serde(default)]
    values: Vec<FieldValue>,
}

impl Document {
    fn string_field(&self, name: &str) -> Option<String> {
        self.fields.get(name).and_then(|v| v.string_value.clone())
    }

    fn string_array_field(&self, name: &str) -> Vec<String> {
        self.fields
            .get(name)
            .and_then(|v| v.array_value.as_ref())
            .map(|array| {
                array
                    .values
                    .iter()
                    .filter_map(|v| v.string_value.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn into_user(self, id: &str) -> User {
        User {
            id: id.to_string(),
            device_token: self.string_field("deviceToken"),
        }
    }

    fn into_group(self, id: &str) -> Group {
        Group {
            id: id.to_string(),
            name: self.string_field("name"),
            members: self.string_array_field("members"),
        }
    }
}

impl FirestoreDirectory {
    pub fn new(
        firebase: &FirebaseConfig,
        directory: &DirectoryConfig,
        tokens: Arc<dyn AccessTokenSource>,
    ) -> Result<Self, PushError> {
        if firebase.project_id.is_empty() {
            return Err(PushError::Credentials("firebase.project_id 未配置".to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(firebase.request_timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            documents_url: documents_url(&firebase.firestore_endpoint, &firebase.project_id)?,
            users_collection: directory.users_collection.clone(),
            groups_collection: directory.groups_collection.clone(),
            tokens,
        })
    }

    /// 读取单个文档，404 视为不存在
    async fn get_document(&self, collection: &str, id: &str) -> Result<Option<Document>, PushError> {
        if !is_valid_document_id(id) {
            return Ok(None);
        }

        let access_token = self.tokens.access_token().await?;
        let url = self.document_url(collection, id)?;

        let response = self
            .client
            .get(url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| PushError::from_transport("firestore", e))?;

        match response.status() {
            StatusCode::NOT_FOUND => {
                debug!(collection, id, "Firestore 文档不存在");
                Ok(None)
            }
            status if status.is_success() => Ok(Some(response.json().await?)),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(PushError::ExternalService {
                    service: "firestore".to_string(),
                    message: format!("{}: {}", status.as_u16(), body),
                })
            }
        }
    }

    /// 集合名与文档 ID 各占一个路径段，`?`、`#`、`%` 等字符按路径段编码
    fn document_url(&self, collection: &str, id: &str) -> Result<Url, PushError> {
        let mut url = self.documents_url.clone();
        url.path_segments_mut()
            .map_err(|_| PushError::Internal("Firestore 地址不能作为路径前缀".to_string()))?
            .push(collection)
            .push(id);
        Ok(url)
    }
}

fn documents_url(endpoint: &str, project_id: &str) -> Result<Url, PushError> {
    let raw = format!(
        "{}/v1/projects/{}/databases/(default)/documents",
        endpoint.trim_end_matches('/'),
        project_id
    );
    Url::parse(&raw).map_err(|e| PushError::Validation(format!("Firestore 地址无效 {raw}: {e}")))
}

/// 文档 ID 不能为空，也不能包含路径分隔符
fn is_valid_document_id(id: &str) -> bool {
    !id.trim().is_empty() && !id.contains('/') && id != "." && id != ".."
}

#[async_trait]
impl UserDirectory for FirestoreDirectory {
    async fn get_user(&self, id: &str) -> Result<Option<User>, PushError> {
        let document = self.get_document(&self.users_collection, id).await?;
        metrics::record_directory_lookup("user", document.is_some());
        Ok(document.map(|d| d.into_user(id)))
    }
}

#[async_trait]
impl GroupDirectory for FirestoreDirectory {
    async fn get_group(&self, id: &str) -> Result<Option<Group>, PushError> {
        let document = self.get_document(&self.groups_collection, id).await?;
        metrics::record_directory_lookup("group", document.is_some());
        Ok(document.map(|d| d.into_group(id)))
    }
}
