//! 应用状态定义
//!
//! 按配置组装推送提供方、目录和扇出引擎，通过 Arc 在 handler 间共享。

use std::sync::Arc;

use anyhow::{Context, bail};
use push_fanout::directory::FirestoreDirectory;
use push_fanout::notifier::{FcmNotifier, LogNotifier};
use push_fanout::{
    Dispatcher, FanoutEngine, FanoutOptions, GroupDirectory, MemoryDirectory, Notifier,
    UserDirectory,
};
use push_shared::config::{AppConfig, DirectoryBackend, NotifierBackend};
use push_shared::credentials::{AccessTokenSource, ServiceAccountTokenSource};
use tracing::{info, warn};

use crate::uploads::UploadStore;

/// Axum 应用共享状态
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<FanoutEngine>,
    pub uploads: Arc<UploadStore>,
    pub service_name: String,
}

impl AppState {
    pub fn new(engine: FanoutEngine, uploads: UploadStore, service_name: &str) -> Self {
        Self {
            engine: Arc::new(engine),
            uploads: Arc::new(uploads),
            service_name: service_name.to_string(),
        }
    }

    /// 按配置组装全部依赖
    ///
    /// 缺少服务账号凭据时，非生产环境退化为日志推送和内存目录，生产环境直接失败。
    pub async fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let tokens = credentials(config)?;

        let notifier = build_notifier(config, tokens.clone())?;
        let (users, groups) = build_directory(config, tokens).await?;

        let engine = FanoutEngine::new(
            users,
            groups,
            Dispatcher::new(notifier),
            FanoutOptions::from(&config.fanout),
        );

        let uploads = UploadStore::new(&config.uploads);
        uploads
            .ensure_dir()
            .await
            .with_context(|| format!("无法创建附件目录 {}", config.uploads.dir))?;

        Ok(Self::new(engine, uploads, &config.service_name))
    }
}

fn credentials(config: &AppConfig) -> anyhow::Result<Option<Arc<dyn AccessTokenSource>>> {
    let needs_credentials = config.notifier.backend == NotifierBackend::Fcm
        || config.directory.backend == DirectoryBackend::Firestore;

    if !needs_credentials {
        return Ok(None);
    }

    if !config.firebase.has_credentials() {
        if config.is_production() {
            bail!("生产环境必须配置 firebase 服务账号 (PROJECT_ID / CLIENT_EMAIL / PRIVATE_KEY)");
        }
        warn!("未配置 firebase 服务账号，推送与目录将使用本地替代实现");
        return Ok(None);
    }

    let source = ServiceAccountTokenSource::new(&config.firebase)
        .context("firebase 服务账号凭据无效")?;
    Ok(Some(Arc::new(source)))
}

fn build_notifier(
    config: &AppConfig,
    tokens: Option<Arc<dyn AccessTokenSource>>,
) -> anyhow::Result<Arc<dyn Notifier>> {
    match (config.notifier.backend, tokens) {
        (NotifierBackend::Fcm, Some(tokens)) => {
            let notifier = FcmNotifier::new(&config.firebase, tokens)?;
            info!(project_id = %config.firebase.project_id, "使用 FCM 推送");
            Ok(Arc::new(notifier))
        }
        (NotifierBackend::Fcm, None) => {
            warn!("FCM 凭据缺失，推送只写入日志");
            Ok(Arc::new(LogNotifier))
        }
        (NotifierBackend::Log, _) => {
            info!("使用日志推送");
            Ok(Arc::new(LogNotifier))
        }
    }
}

async fn build_directory(
    config: &AppConfig,
    tokens: Option<Arc<dyn AccessTokenSource>>,
) -> anyhow::Result<(Arc<dyn UserDirectory>, Arc<dyn GroupDirectory>)> {
    if let (DirectoryBackend::Firestore, Some(tokens)) = (config.directory.backend, tokens) {
        let directory = Arc::new(FirestoreDirectory::new(
            &config.firebase,
            &config.directory,
            tokens,
        )?);
        info!("使用 Firestore 目录");
        let users: Arc<dyn UserDirectory> = directory.clone();
        let groups: Arc<dyn GroupDirectory> = directory;
        return Ok((users, groups));
    }

    if config.directory.backend == DirectoryBackend::Firestore {
        warn!("Firestore 凭据缺失，使用内存目录");
    }

    let directory = match &config.directory.seed_file {
        Some(path) => MemoryDirectory::load_seed_file(path)
            .await
            .with_context(|| format!("无法加载目录种子文件 {path}"))?,
        None => MemoryDirectory::new(),
    };
    let directory = Arc::new(directory);
    info!(
        users = directory.user_count(),
        groups = directory.group_count(),
        "使用内存目录"
    );

    let users: Arc<dyn UserDirectory> = directory.clone();
    let groups: Arc<dyn GroupDirectory> = directory;
    Ok((users, groups))
}

#[cfg(test)]
mod tests {
    use super::*;
    use push_shared::config::UploadConfig;

    fn local_config() -> AppConfig {
        let mut config = AppConfig {
            service_name: "push-gateway".to_string(),
            environment: "test".to_string(),
            ..Default::default()
        };
        config.notifier.backend = NotifierBackend::Log;
        config.directory.backend = DirectoryBackend::Memory;
        config.uploads = UploadConfig {
            dir: std::env::temp_dir()
                .join(format!("push-gateway-state-{}", std::process::id()))
                .to_string_lossy()
                .into_owned(),
            ..Default::default()
        };
        config
    }

    #[tokio::test]
    async fn test_from_config_local_backends() {
        let config = local_config();
        let state = AppState::from_config(&config).await.unwrap();

        assert_eq!(state.service_name, "push-gateway");
        assert!(state.uploads.dir().exists());
        assert_eq!(
            state.engine.options().max_concurrency,
            config.fanout.max_concurrency
        );
    }

    #[tokio::test]
    async fn test_missing_credentials_fall_back_outside_production() {
        let mut config = local_config();
        config.notifier.backend = NotifierBackend::Fcm;
        config.directory.backend = DirectoryBackend::Firestore;

        assert!(AppState::from_config(&config).await.is_ok());
    }

    #[tokio::test]
    async fn test_missing_credentials_fail_in_production() {
        let mut config = local_config();
        config.environment = "production".to_string();
        config.notifier.backend = NotifierBackend::Fcm;

        assert!(AppState::from_config(&config).await.is_err());
    }

    #[tokio::test]
    async fn test_missing_seed_file_is_an_error() {
        let mut config = local_config();
        config.directory.seed_file = Some("/nonexistent/seed.json".to_string());

        assert!(AppState::from_config(&config).await.is_err());
    }
}
