// 配置管理模块

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

/// 默认配置文件路径
pub const DEFAULT_CONFIG_PATH: &str = "config/app.toml";

/// 应用名称
pub const APP_NAME: &str = "ddownload-relay";

/// 应用配置
///
/// 启动时加载一次，之后以 `Arc<AppConfig>` 只读共享
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// 服务器配置
    #[serde(default)]
    pub server: ServerConfig,
    /// DDownload API 配置
    #[serde(default)]
    pub ddownload: DdownloadConfig,
    /// 上传配置
    #[serde(default)]
    pub upload: UploadConfig,
    /// 🔥 日志配置
    #[serde(default)]
    pub log: LogConfig,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// 是否启用日志文件持久化
    #[serde(default = "default_log_enabled")]
    pub enabled: bool,
    /// 日志文件保存目录
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
    /// 日志保留天数（默认 30 天）
    #[serde(default = "default_log_retention_days")]
    pub retention_days: u32,
    /// 日志级别（默认 info）
    #[serde(default = "default_log_level")]
    pub level: String,
    /// 单个日志文件最大大小（字节，默认 50MB）
    #[serde(default = "default_log_max_file_size")]
    pub max_file_size: u64,
    /// 是否单独输出 ERROR 级别日志文件
    #[serde(default = "default_log_error_file")]
    pub error_file: bool,
}

fn default_log_enabled() -> bool {
    true
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_log_retention_days() -> u32 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_max_file_size() -> u64 {
    50 * 1024 * 1024 // 50MB
}

fn default_log_error_file() -> bool {
    true
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            enabled: default_log_enabled(),
            log_dir: default_log_dir(),
            retention_days: default_log_retention_days(),
            level: default_log_level(),
            max_file_size: default_log_max_file_size(),
            error_file: default_log_error_file(),
        }
    }
}

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// 监听地址
    #[serde(default = "default_host")]
    pub host: String,
    /// 监听端口
    #[serde(default = "default_port")]
    pub port: u16,
    /// 前端静态资源目录（不存在时不挂载）
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("static")
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            static_dir: default_static_dir(),
        }
    }
}

/// DDownload API 配置
#[derive(Clone, Serialize, Deserialize)]
pub struct DdownloadConfig {
    /// API Key（不会写回配置文件，推荐通过 DDOWNLOAD_API_KEY 环境变量提供）
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    /// API 基础地址
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// 公开下载链接前缀
    #[serde(default = "default_download_url")]
    pub download_url: String,
    /// 获取上传服务器超时（秒）
    #[serde(default = "default_negotiate_timeout_secs")]
    pub negotiate_timeout_secs: u64,
    /// 文件推送超时（秒）
    #[serde(default = "default_transfer_timeout_secs")]
    pub transfer_timeout_secs: u64,
}

fn default_api_url() -> String {
    "https://api-v2.ddownload.com/api".to_string()
}

fn default_download_url() -> String {
    "https://ddownload.com".to_string()
}

fn default_negotiate_timeout_secs() -> u64 {
    30
}

fn default_transfer_timeout_secs() -> u64 {
    300 // 大文件上传，5 分钟
}

impl Default for DdownloadConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: default_api_url(),
            download_url: default_download_url(),
            negotiate_timeout_secs: default_negotiate_timeout_secs(),
            transfer_timeout_secs: default_transfer_timeout_secs(),
        }
    }
}

// API Key 不进入 Debug 输出
impl std::fmt::Debug for DdownloadConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DdownloadConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("api_url", &self.api_url)
            .field("download_url", &self.download_url)
            .field("negotiate_timeout_secs", &self.negotiate_timeout_secs)
            .field("transfer_timeout_secs", &self.transfer_timeout_secs)
            .finish()
    }
}

impl DdownloadConfig {
    /// 有效的 API Key（空白视为未配置）
    pub fn api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }

    pub fn negotiate_timeout(&self) -> Duration {
        Duration::from_secs(self.negotiate_timeout_secs)
    }

    pub fn transfer_timeout(&self) -> Duration {
        Duration::from_secs(self.transfer_timeout_secs)
    }
}

/// 上传配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// 允许上传的扩展名（不含点号，大小写不敏感）
    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: Vec<String>,
    /// 单次请求最大字节数（默认 500MB）
    #[serde(default = "default_max_content_length")]
    pub max_content_length: u64,
    /// 同时进行的文件推送数上限（阻塞线程池容量）
    #[serde(default = "default_max_concurrent_transfers")]
    pub max_concurrent_transfers: usize,
}

fn default_allowed_extensions() -> Vec<String> {
    [
        "txt", "pdf", "png", "jpg", "jpeg", "gif", "zip", "rar", "doc", "docx", "xls", "xlsx",
    ]
    .iter()
    .map(|ext| ext.to_string())
    .collect()
}

fn default_max_content_length() -> u64 {
    500 * 1024 * 1024 // 500MB
}

fn default_max_concurrent_transfers() -> usize {
    4
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            allowed_extensions: default_allowed_extensions(),
            max_content_length: default_max_content_length(),
            max_concurrent_transfers: default_max_concurrent_transfers(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            ddownload: DdownloadConfig::default(),
            upload: UploadConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl AppConfig {
    /// 从文件加载配置
    pub async fn load_from_file(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .context("Failed to read config file")?;

        let config: AppConfig = toml::from_str(&content).context("Failed to parse config file")?;

        config.validate().context("配置文件校验失败")?;

        Ok(config)
    }

    /// 保存配置到文件（API Key 不会被写入）
    pub async fn save_to_file(&self, path: &str) -> Result<()> {
        self.validate().context("保存配置失败：配置无效")?;

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        // 确保父目录存在
        if let Some(parent) = Path::new(path).parent() {
            fs::create_dir_all(parent)
                .await
                .context("Failed to create config directory")?;
        }

        fs::write(path, content)
            .await
            .context("Failed to write config file")?;

        tracing::info!("✓ 配置已保存: {}", path);
        Ok(())
    }

    /// 加载或创建默认配置
    pub async fn load_or_default(path: &str) -> Self {
        match Self::load_from_file(path).await {
            Ok(config) => {
                tracing::info!("配置文件加载成功: {}", path);
                config
            }
            Err(e) => {
                tracing::warn!("配置文件加载失败，使用默认配置: {:#}", e);
                let default_config = Self::default();

                // 首次启动：写出默认配置，方便修改
                if !Path::new(path).exists() {
                    if let Err(e) = default_config.save_to_file(path).await {
                        tracing::error!("保存默认配置失败: {:#}", e);
                    }
                }

                default_config
            }
        }
    }

    /// 应用环境变量覆盖
    ///
    /// - `DDOWNLOAD_API_KEY`：覆盖 API Key
    /// - `DEBUG=true`：日志级别提升为 debug
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup("DDOWNLOAD_API_KEY").filter(|k| !k.trim().is_empty()) {
            self.ddownload.api_key = Some(key);
        }

        if lookup("DEBUG")
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
        {
            self.log.level = "debug".to_string();
        }
    }

    /// 是否处于调试模式
    pub fn is_debug(&self) -> bool {
        self.log.level.eq_ignore_ascii_case("debug") || self.log.level.eq_ignore_ascii_case("trace")
    }

    /// 校验配置
    pub fn validate(&self) -> Result<()> {
        if self.ddownload.api_url.trim().is_empty() {
            anyhow::bail!("ddownload.api_url 不能为空");
        }
        if self.ddownload.download_url.trim().is_empty() {
            anyhow::bail!("ddownload.download_url 不能为空");
        }
        if self.ddownload.negotiate_timeout_secs == 0 || self.ddownload.transfer_timeout_secs == 0
        {
            anyhow::bail!("超时时间必须至少为 1 秒");
        }
        if self.upload.max_concurrent_transfers == 0 {
            anyhow::bail!("upload.max_concurrent_transfers 必须大于 0");
        }
        if self.upload.max_content_length == 0 {
            anyhow::bail!("upload.max_content_length 必须大于 0");
        }
        Ok(())
    }
}
