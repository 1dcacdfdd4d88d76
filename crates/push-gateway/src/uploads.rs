//! 附件存储
//!
//! 上传的文件保存到本地目录，文件名为 `<毫秒时间戳>_<随机后缀>_<清洗后的原始文件名>`，
//! 对外引用为 `<public_prefix>/<文件名>`，由静态文件服务提供下载。

use std::path::{Path, PathBuf};

use push_shared::config::UploadConfig;
use tokio::io::AsyncWriteExt;
use tracing::info;

use crate::error::{GatewayError, Result};

/// 已保存的附件
#[derive(Debug, Clone)]
pub struct StoredFile {
    pub file_name: String,
    /// 对外引用，如 `/uploads/1718000000000_3f2a9c1e_photo.jpg`
    pub public_url: String,
    pub path: PathBuf,
    pub size: usize,
}

const DEFAULT_PUBLIC_PREFIX: &str = "/uploads";

#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
    public_prefix: String,
    max_bytes: usize,
}

impl UploadStore {
    pub fn new(config: &UploadConfig) -> Self {
        Self {
            dir: PathBuf::from(&config.dir),
            public_prefix: normalize_prefix(&config.public_prefix),
            max_bytes: config.max_bytes,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// 以 `/` 开头、不以 `/` 结尾的挂载路径，静态文件路由与对外引用共用
    pub fn public_prefix(&self) -> &str {
        &self.public_prefix
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// 确保存储目录存在
    pub async fn ensure_dir(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        Ok(())
    }

    /// 保存附件并返回对外引用
    pub async fn save(&self, original_name: &str, bytes: &[u8]) -> Result<StoredFile> {
        if bytes.len() > self.max_bytes {
            return Err(GatewayError::PayloadTooLarge {
                limit: self.max_bytes,
            });
        }

        self.ensure_dir().await?;

        let suffix = uuid::Uuid::new_v4().simple().to_string();
        let file_name = format!(
            "{}_{}_{}",
            chrono::Utc::now().timestamp_millis(),
            &suffix[..8],
            sanitize_file_name(original_name)
        );
        let path = self.dir.join(&file_name);

        // create_new：即使文件名碰撞也不会覆盖已有附件
        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await?;
        file.write_all(bytes).await?;
        file.flush().await?;

        info!(file = %file_name, size = bytes.len(), "附件已保存");

        Ok(StoredFile {
            public_url: format!("{}/{}", self.public_prefix, file_name),
            file_name,
            path,
            size: bytes.len(),
        })
    }
}

/// 空前缀或 `/` 回落到 `/uploads`
fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_matches('/');
    if trimmed.is_empty() {
        DEFAULT_PUBLIC_PREFIX.to_string()
    } else {
        format!("/{trimmed}")
    }
}

/// 只保留最后一段路径，非常规字符替换为下划线
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store(max_bytes: usize) -> UploadStore {
        let dir = std::env::temp_dir().join(format!(
            "push-gateway-uploads-{}-{}",
            std::process::id(),
            chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default()
        ));
        UploadStore::new(&UploadConfig {
            dir: dir.to_string_lossy().into_owned(),
            public_prefix: "/uploads/".to_string(),
            max_bytes,
        })
    }

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("photo.jpg"), "photo.jpg");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\Users\\a\\my doc.pdf"), "my_doc.pdf");
        assert_eq!(sanitize_file_name(".hidden"), "hidden");
        assert_eq!(sanitize_file_name(""), "file");
        assert_eq!(sanitize_file_name("语音.m4a"), "__.m4a");
    }

    #[tokio::test]
    async fn test_save_writes_file_and_builds_url() {
        let store = temp_store(1024);
        let stored = store.save("voice note.m4a", b"abc").await.unwrap();

        assert!(stored.file_name.ends_with("_voice_note.m4a"));
        assert_eq!(stored.file_name.split('_').count(), 4);
        assert_eq!(stored.public_url, format!("/uploads/{}", stored.file_name));
        assert_eq!(stored.size, 3);
        assert_eq!(tokio::fs::read(&stored.path).await.unwrap(), b"abc");

        let _ = tokio::fs::remove_dir_all(store.dir()).await;
    }

    #[tokio::test]
    async fn test_same_name_uploads_do_not_overwrite() {
        let store = temp_store(1024);
        let first = store.save("photo.jpg", b"first").await.unwrap();
        let second = store.save("photo.jpg", b"second").await.unwrap();

        assert_ne!(first.file_name, second.file_name);
        assert_eq!(tokio::fs::read(&first.path).await.unwrap(), b"first");
        assert_eq!(tokio::fs::read(&second.path).await.unwrap(), b"second");

        let _ = tokio::fs::remove_dir_all(store.dir()).await;
    }

    #[test]
    fn test_public_prefix_normalization() {
        let store_with = |prefix: &str| {
            UploadStore::new(&UploadConfig {
                dir: "unused".to_string(),
                public_prefix: prefix.to_string(),
                max_bytes: 1,
            })
        };

        assert_eq!(store_with("/uploads/").public_prefix(), "/uploads");
        assert_eq!(store_with("/").public_prefix(), "/uploads");
        assert_eq!(store_with("").public_prefix(), "/uploads");
        assert_eq!(store_with("files").public_prefix(), "/files");
        assert_eq!(store_with("/media/chat/").public_prefix(), "/media/chat");
    }

    #[tokio::test]
    async fn test_save_rejects_oversized_payload() {
        let store = temp_store(2);
        let err = store.save("big.bin", b"abc").await.unwrap_err();
        assert!(matches!(err, GatewayError::PayloadTooLarge { limit: 2 }));
    }
}
