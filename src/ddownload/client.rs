// DDownload 客户端实现

use crate::config::DdownloadConfig;
use crate::ddownload::UploadServerResponse;
use crate::uploader::{EndpointLease, EndpointNegotiator, UploadError};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, error, info};

/// DDownload API 客户端
///
/// 负责获取一次性上传地址（非阻塞）
#[derive(Debug, Clone)]
pub struct DdownloadClient {
    /// HTTP客户端
    client: Client,
    /// API Key
    api_key: Option<String>,
    /// API 基础地址
    api_url: String,
    /// 获取上传服务器超时
    timeout: Duration,
}

impl DdownloadClient {
    /// 创建新的客户端
    pub fn new(config: &DdownloadConfig) -> Result<Self> {
        let client = Client::builder()
            .build()
            .context("Failed to create HTTP client")?;

        info!(
            "初始化 DDownload 客户端, api_url={}, API Key={}",
            config.api_url,
            if config.api_key().is_some() {
                "已配置"
            } else {
                "未配置"
            }
        );

        Ok(Self {
            client,
            api_key: config.api_key().map(str::to_string),
            api_url: config.api_url.trim_end_matches('/').to_string(),
            timeout: config.negotiate_timeout(),
        })
    }

    /// 获取上传服务器
    ///
    /// 调用 `GET {api_url}/upload/server?key={API_KEY}`，单次请求，不重试
    ///
    /// # 返回
    /// 一次性上传租约（上传地址 + 可选会话 ID）
    pub async fn get_upload_server(&self) -> Result<EndpointLease, UploadError> {
        let api_key = match self.api_key.as_deref() {
            Some(key) => key,
            None => {
                error!("DDownload API Key 未配置");
                return Err(UploadError::Configuration(
                    "API Key 未配置".to_string(),
                ));
            }
        };

        let url = format!("{}/upload/server", self.api_url);
        debug!("请求上传服务器: {}", url);

        let response = self
            .client
            .get(&url)
            .query(&[("key", api_key)])
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                let err = UploadError::from_transport(e);
                error!("获取上传服务器网络错误: {}", err);
                err
            })?;

        let response = response.error_for_status().map_err(|e| {
            let err = UploadError::from_transport(e);
            error!("获取上传服务器 HTTP 错误: {}", err);
            err
        })?;

        let response_text = response.text().await.map_err(|e| {
            let err = UploadError::from_transport(e);
            error!("读取上传服务器响应失败: {}", err);
            err
        })?;

        debug!("上传服务器响应: {}", response_text);

        let lease = UploadServerResponse::from_body(&response_text)?.into_lease()?;
        info!(
            "成功获取上传服务器: session={}",
            if lease.session_id.is_some() {
                "有"
            } else {
                "无"
            }
        );

        Ok(lease)
    }
}

#[async_trait]
impl EndpointNegotiator for DdownloadClient {
    async fn negotiate(&self) -> Result<EndpointLease, UploadError> {
        self.get_upload_server().await
    }
}
