//! 配置管理模块
//!
//! 支持多格式配置文件加载，环境变量覆盖，以及类型安全的配置访问。
//! 同时兼容旧版部署使用的无前缀环境变量（PORT、PROJECT_ID、PRIVATE_KEY 等）。

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

/// 服务配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// 单个 HTTP 请求的处理超时（秒）
    pub request_timeout_seconds: u64,
    /// 允许的 CORS 来源，逗号分隔，"*" 表示全部
    pub cors_origins: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            request_timeout_seconds: 30,
            cors_origins: "*".to_string(),
        }
    }
}

/// 可观测性配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// 服务名称，用于标识日志和指标的来源
    pub service_name: String,
    pub log_level: String,
    /// 日志输出格式：json（结构化）或 pretty（人类可读）
    pub log_format: String,
    pub metrics_enabled: bool,
    pub metrics_port: u16,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            service_name: "unknown-service".to_string(),
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            metrics_enabled: false,
            metrics_port: 9090,
        }
    }
}

impl ObservabilityConfig {
    /// 注入服务名（配置文件中通常不重复填写）
    pub fn with_service_name(mut self, service_name: &str) -> Self {
        self.service_name = service_name.to_string();
        self
    }

    pub fn json_logs(&self) -> bool {
        self.log_format.eq_ignore_ascii_case("json")
    }
}

/// Firebase 服务账号与端点配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FirebaseConfig {
    pub project_id: String,
    pub client_email: String,
    /// PEM 格式私钥，允许以字面量 `\n` 书写换行
    pub private_key: String,
    pub private_key_id: Option<String>,
    pub token_uri: String,
    pub fcm_endpoint: String,
    pub firestore_endpoint: String,
    pub request_timeout_seconds: u64,
}

impl Default for FirebaseConfig {
    fn default() -> Self {
        Self {
            project_id: String::new(),
            client_email: String::new(),
            private_key: String::new(),
            private_key_id: None,
            token_uri: "https://oauth2.googleapis.com/token".to_string(),
            fcm_endpoint: "https://fcm.googleapis.com".to_string(),
            firestore_endpoint: "https://firestore.googleapis.com".to_string(),
            request_timeout_seconds: 10,
        }
    }
}

impl FirebaseConfig {
    /// 服务账号三要素是否齐全
    pub fn has_credentials(&self) -> bool {
        !self.project_id.is_empty()
            && !self.client_email.is_empty()
            && !self.private_key.is_empty()
    }
}

/// 推送提供方
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum NotifierBackend {
    /// Firebase Cloud Messaging HTTP v1
    #[default]
    Fcm,
    /// 只记录日志，不真正推送（本地开发用）
    Log,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct NotifierConfig {
    pub backend: NotifierBackend,
}

/// 用户/群组目录来源
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DirectoryBackend {
    #[default]
    Firestore,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DirectoryConfig {
    pub backend: DirectoryBackend,
    pub users_collection: String,
    pub groups_collection: String,
    /// 内存目录的初始数据文件（JSON）
    pub seed_file: Option<String>,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            backend: DirectoryBackend::Firestore,
            users_collection: "users".to_string(),
            groups_collection: "groups".to_string(),
            seed_file: None,
        }
    }
}

/// 扇出调度配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FanoutConfig {
    /// 群组扇出时同时进行的成员发送数上限
    pub max_concurrency: usize,
    /// 单次调度的整体截止时间（毫秒）
    pub deadline_ms: u64,
}

impl Default for FanoutConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 16,
            deadline_ms: 10_000,
        }
    }
}

/// 附件上传存储配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    pub dir: String,
    /// 对外暴露的 URL 前缀
    pub public_prefix: String,
    pub max_bytes: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            dir: "uploads".to_string(),
            public_prefix: "/uploads".to_string(),
            max_bytes: 25 * 1024 * 1024,
        }
    }
}

/// 应用配置
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub service_name: String,
    pub environment: String,
    pub server: ServerConfig,
    pub observability: ObservabilityConfig,
    pub firebase: FirebaseConfig,
    pub notifier: NotifierConfig,
    pub directory: DirectoryConfig,
    pub fanout: FanoutConfig,
    pub uploads: UploadConfig,
}

/// 旧版部署直接使用的无前缀环境变量 -> 配置键
const LEGACY_ENV_OVERRIDES: &[(&str, &str)] = &[
    ("PROJECT_ID", "firebase.project_id"),
    ("CLIENT_EMAIL", "firebase.client_email"),
    ("PRIVATE_KEY", "firebase.private_key"),
    ("PRIVATE_KEY_ID", "firebase.private_key_id"),
    ("TOKEN_URI", "firebase.token_uri"),
];

impl AppConfig {
    /// 从配置文件和环境变量加载配置
    ///
    /// 加载顺序（后加载的会覆盖先加载的同名配置项）：
    /// 1. `.env` 文件（若存在，仅填充尚未设置的环境变量）
    /// 2. config/default.toml（默认配置）
    /// 3. config/{environment}.toml（环境特定配置）
    /// 4. config/{service_name}.toml（服务特定配置）
    /// 5. 环境变量（PUSH_ 前缀，如 PUSH_FANOUT__MAX_CONCURRENCY -> fanout.max_concurrency）
    /// 6. 旧版无前缀变量（PROJECT_ID、CLIENT_EMAIL、PRIVATE_KEY 等）
    /// 7. 服务端口环境变量（PUSH_GATEWAY_PORT，回退到 PORT）
    pub fn load(service_name: &str) -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let env = std::env::var("PUSH_ENV").unwrap_or_else(|_| "development".to_string());
        let config_dir = std::env::var("CONFIG_DIR").unwrap_or_else(|_| "config".to_string());

        let mut builder = Config::builder()
            .set_default("service_name", service_name)?
            .set_default("environment", env.clone())?
            .add_source(File::from(Path::new(&config_dir).join("default.toml")).required(false))
            .add_source(
                File::from(Path::new(&config_dir).join(format!("{}.toml", env))).required(false),
            )
            .add_source(
                File::from(Path::new(&config_dir).join(format!("{}.toml", service_name)))
                    .required(false),
            )
            .add_source(
                Environment::with_prefix("PUSH")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        for (var, key) in LEGACY_ENV_OVERRIDES {
            builder = builder.set_override_option(*key, std::env::var(var).ok())?;
        }

        let mut config: Self = builder.build()?.try_deserialize()?;

        config.firebase.private_key = normalize_private_key(&config.firebase.private_key);

        if let Some(port) = Self::get_service_port_from_env(service_name) {
            config.server.port = port;
        }

        Ok(config)
    }

    /// 从环境变量获取服务端口
    ///
    /// 服务名到环境变量的映射规则：
    /// - push-gateway -> PUSH_GATEWAY_PORT
    /// - 其余服务 -> 大写下划线格式 + _PORT
    ///
    /// 均未设置时回退到通用的 PORT（托管平台常用约定）。
    fn get_service_port_from_env(service_name: &str) -> Option<u16> {
        let env_var_name = match service_name {
            "push-gateway" => "PUSH_GATEWAY_PORT".to_string(),
            _ => format!("{}_PORT", service_name.to_uppercase().replace('-', "_")),
        };

        std::env::var(&env_var_name)
            .ok()
            .or_else(|| std::env::var("PORT").ok())
            .and_then(|v| v.parse().ok())
    }

    /// 获取服务地址
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// 是否为生产环境
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

/// 将环境变量中转义的 `\n` 还原为真实换行
///
/// 私钥经常以单行形式写进 .env 或 CI 密钥，PEM 解析要求真实换行。
pub fn normalize_private_key(raw: &str) -> String {
    raw.replace("\\n", "\n")
}
