// 应用状态

use crate::config::AppConfig;
use crate::uploader::UploadEngine;
use anyhow::{Context, Result};
use std::sync::Arc;

/// 应用全局状态
///
/// 配置和上传引擎在启动时创建，之后只读共享
#[derive(Clone)]
pub struct AppState {
    /// 应用配置
    pub config: Arc<AppConfig>,
    /// 上传引擎
    pub engine: Arc<UploadEngine>,
}

impl AppState {
    /// 根据配置创建应用状态（使用 DDownload 上传引擎）
    pub fn new(config: AppConfig) -> Result<Self> {
        let engine = UploadEngine::from_config(&config).context("初始化上传引擎失败")?;
        Ok(Self::with_engine(config, engine))
    }

    /// 使用指定的上传引擎创建应用状态
    pub fn with_engine(config: AppConfig, engine: UploadEngine) -> Self {
        Self {
            config: Arc::new(config),
            engine: Arc::new(engine),
        }
    }
}
