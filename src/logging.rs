//! 日志系统配置
//!
//! 控制台输出 + 文件持久化（按大小和启动时间滚动），ERROR 级别额外写入独立文件，
//! 启动时清理过期日志

use crate::config::{LogConfig, APP_NAME};
use chrono::Local;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    filter::LevelFilter,
    fmt::{self, time::ChronoLocal},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// 主日志文件前缀
pub fn main_log_prefix() -> String {
    format!("{}.", APP_NAME)
}

/// 错误日志文件前缀
pub fn error_log_prefix() -> String {
    format!("{}-error.", APP_NAME)
}

/// 日志文件管理器（内部状态）
struct LogFileManagerInner {
    /// 文件名前缀（如 `ddownload-relay.`）
    prefix: String,
    /// 服务启动时间戳（格式：YYYY-MM-DD-HHMMSS）
    start_timestamp: String,
    log_dir: PathBuf,
    current_file: Option<File>,
    /// 当前文件序号（0 表示基础文件，1、2、3... 表示滚动文件）
    current_index: u32,
    max_file_size: u64,
    /// 当前文件已写入的字节数
    current_size: u64,
}

impl LogFileManagerInner {
    fn new(log_dir: PathBuf, prefix: String, max_file_size: u64) -> io::Result<Self> {
        let mut manager = Self {
            prefix,
            start_timestamp: Local::now().format("%Y-%m-%d-%H%M%S").to_string(),
            log_dir,
            current_file: None,
            current_index: 0,
            max_file_size,
            current_size: 0,
        };
        manager.create_new_file()?;
        Ok(manager)
    }

    /// 文件名格式：`{prefix}YYYY-MM-DD-HHMMSS.log`，滚动文件追加 `_N`
    fn generate_file_path(&self, index: u32) -> PathBuf {
        let filename = if index == 0 {
            format!("{}{}.log", self.prefix, self.start_timestamp)
        } else {
            format!("{}{}_{}.log", self.prefix, self.start_timestamp, index)
        };
        self.log_dir.join(filename)
    }

    fn create_new_file(&mut self) -> io::Result<()> {
        let file_path = self.generate_file_path(self.current_index);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&file_path)?;

        self.current_file = Some(file);
        self.current_size = 0;
        Ok(())
    }

    fn should_rotate(&self, incoming_size: usize) -> bool {
        // 空文件不滚动，避免单条超长日志产生大量空文件
        self.current_size > 0 && self.current_size + incoming_size as u64 > self.max_file_size
    }

    fn rotate(&mut self) -> io::Result<()> {
        if let Some(mut file) = self.current_file.take() {
            file.flush()?;
        }
        self.current_index += 1;
        self.create_new_file()
    }

    fn write_data(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.should_rotate(buf.len()) {
            self.rotate()?;
        }

        match &mut self.current_file {
            Some(file) => {
                let written = file.write(buf)?;
                self.current_size += written as u64;
                Ok(written)
            }
            None => Err(io::Error::new(io::ErrorKind::Other, "日志文件未打开")),
        }
    }

    fn flush_file(&mut self) -> io::Result<()> {
        if let Some(file) = &mut self.current_file {
            file.flush()?;
        }
        Ok(())
    }
}

/// 日志文件管理器（线程安全包装）
///
/// 实现了 Write trait，可以作为 tracing_appender 的输出目标
#[derive(Clone)]
pub struct LogFileManager {
    inner: Arc<Mutex<LogFileManagerInner>>,
}

impl LogFileManager {
    pub fn new(log_dir: PathBuf, prefix: impl Into<String>, max_file_size: u64) -> io::Result<Self> {
        let inner = LogFileManagerInner::new(log_dir, prefix.into(), max_file_size)?;
        Ok(Self {
            inner: Arc::new(Mutex::new(inner)),
        })
    }

    fn lock(&self) -> io::Result<MutexGuard<'_, LogFileManagerInner>> {
        self.inner
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "日志文件锁已损坏"))
    }
}

impl Write for LogFileManager {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.lock()?.write_data(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.lock()?.flush_file()
    }
}

/// 日志系统守卫
/// 必须保持存活，否则日志写入线程会终止
pub struct LogGuard {
    _file_guards: Vec<WorkerGuard>,
}

/// 初始化日志系统
///
/// 文件目录不可用时回退到仅控制台输出
pub fn init_logging(config: &LogConfig) -> LogGuard {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let console_layer = fmt::layer()
        .with_target(true)
        .with_level(true)
        .with_timer(ChronoLocal::new(TIME_FORMAT.to_string()))
        .with_ansi(true);

    let mut guards = Vec::new();
    let mut file_layer = None;
    let mut error_layer = None;

    if config.enabled {
        match open_log_writers(config) {
            Ok((main_writer, error_writer)) => {
                let (non_blocking, guard) = tracing_appender::non_blocking(main_writer);
                guards.push(guard);
                file_layer = Some(
                    fmt::layer()
                        .with_target(true)
                        .with_level(true)
                        .with_timer(ChronoLocal::new(TIME_FORMAT.to_string()))
                        .with_ansi(false)
                        .with_writer(non_blocking),
                );

                if let Some(error_writer) = error_writer {
                    let (non_blocking, guard) = tracing_appender::non_blocking(error_writer);
                    guards.push(guard);
                    error_layer = Some(
                        fmt::layer()
                            .with_target(true)
                            .with_level(true)
                            .with_timer(ChronoLocal::new(TIME_FORMAT.to_string()))
                            .with_ansi(false)
                            .with_writer(non_blocking)
                            .with_filter(LevelFilter::ERROR),
                    );
                }
            }
            Err(e) => {
                eprintln!(
                    "创建日志文件失败: {:?}, 错误: {}, 回退到仅控制台输出",
                    config.log_dir, e
                );
            }
        }
    }

    let file_enabled = file_layer.is_some();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .with(error_layer)
        .init();

    if file_enabled {
        info!(
            "日志系统初始化完成: 目录={:?}, 保留天数={}, 级别={}, 单文件最大={:.1}MB, 错误日志={}",
            config.log_dir,
            config.retention_days,
            config.level,
            config.max_file_size as f64 / 1024.0 / 1024.0,
            config.error_file
        );

        let deleted = cleanup_old_logs(&config.log_dir, config.retention_days);
        if deleted > 0 {
            info!("已清理 {} 个过期日志文件", deleted);
        }
    } else {
        info!("日志系统初始化完成（仅控制台输出）, 级别={}", config.level);
    }

    LogGuard {
        _file_guards: guards,
    }
}

/// 创建主日志和（可选的）错误日志写入器
fn open_log_writers(config: &LogConfig) -> io::Result<(LogFileManager, Option<LogFileManager>)> {
    fs::create_dir_all(&config.log_dir)?;

    let main_writer = LogFileManager::new(
        config.log_dir.clone(),
        main_log_prefix(),
        config.max_file_size,
    )?;

    let error_writer = if config.error_file {
        Some(LogFileManager::new(
            config.log_dir.clone(),
            error_log_prefix(),
            config.max_file_size,
        )?)
    } else {
        None
    };

    Ok((main_writer, error_writer))
}

/// 清理过期日志文件，返回删除数量
///
/// 只处理本服务生成的日志（主日志和错误日志），按文件名中的日期判断，
/// 无法解析日期时使用文件修改时间
pub fn cleanup_old_logs(log_dir: &Path, retention_days: u32) -> usize {
    let today = Local::now().date_naive();
    let retention = chrono::Duration::days(retention_days as i64);

    let entries = match fs::read_dir(log_dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("读取日志目录失败: {:?}, 错误: {}", log_dir, e);
            return 0;
        }
    };

    let prefixes = [error_log_prefix(), main_log_prefix()];
    let mut deleted_count = 0;

    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        let filename = match path.file_name().and_then(|s| s.to_str()) {
            Some(name) => name,
            None => continue,
        };

        let Some(prefix) = prefixes.iter().find(|p| filename.starts_with(p.as_str())) else {
            continue;
        };
        if !filename.ends_with(".log") {
            continue;
        }

        let should_delete = match extract_date_from_filename(filename, prefix)
            .and_then(|d| chrono::NaiveDate::parse_from_str(&d, "%Y-%m-%d").ok())
        {
            Some(file_date) => today.signed_duration_since(file_date) > retention,
            None => check_by_modified_time(&entry, retention_days),
        };

        if should_delete {
            match fs::remove_file(&path) {
                Ok(()) => {
                    deleted_count += 1;
                    tracing::debug!("已删除过期日志文件: {:?}", path);
                }
                Err(e) => warn!("删除过期日志文件失败: {:?}, 错误: {}", path, e),
            }
        }
    }

    deleted_count
}

/// 从文件名中提取日期部分 (YYYY-MM-DD)
///
/// - `{prefix}YYYY-MM-DD-HHMMSS.log`
/// - `{prefix}YYYY-MM-DD-HHMMSS_N.log`
fn extract_date_from_filename(filename: &str, prefix: &str) -> Option<String> {
    let name = filename.strip_prefix(prefix)?.strip_suffix(".log")?;
    let parts: Vec<&str> = name.split('-').collect();
    if parts.len() >= 3 {
        Some(format!("{}-{}-{}", parts[0], parts[1], parts[2]))
    } else {
        None
    }
}

/// 根据文件修改时间检查是否过期
fn check_by_modified_time(entry: &fs::DirEntry, retention_days: u32) -> bool {
    let retention = chrono::Duration::days(retention_days as i64);

    entry
        .metadata()
        .and_then(|m| m.modified())
        .map(|modified| {
            let modified: chrono::DateTime<chrono::Utc> = modified.into();
            chrono::Utc::now().signed_duration_since(modified) > retention
        })
        .unwrap_or(false)
}
