// 上传引擎
//
// 上传流程（线性，不回退、不重试）：
// 1. 校验文件名（失败时不发起任何网络请求）
// 2. 获取上传服务器（异步）
// 3. 检查租约中的上传地址
// 4. 在推送线程池中执行阻塞推送并等待结果
//
// 任何一步 panic 都会在这里被转换为 unexpected 错误

use crate::config::AppConfig;
use crate::ddownload::{BlockingUploader, DdownloadClient};
use crate::uploader::{
    EndpointLease, ExtensionValidator, TransferPool, TransferResult, UploadError, UploadRequest,
    UploadSource,
};
use anyhow::Result;
use async_trait::async_trait;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

/// 上传地址协商
#[async_trait]
pub trait EndpointNegotiator: Send + Sync {
    /// 获取一次性上传租约（单次网络往返）
    async fn negotiate(&self) -> Result<EndpointLease, UploadError>;
}

/// 文件推送执行器
///
/// 实现可以阻塞，引擎保证只在推送线程池中调用
pub trait TransferExecutor: Send + Sync {
    fn transfer(
        &self,
        source: UploadSource,
        filename: &str,
        lease: EndpointLease,
    ) -> Result<TransferResult, UploadError>;
}

/// 上传引擎
pub struct UploadEngine {
    /// 文件名校验器
    validator: ExtensionValidator,
    /// 上传地址协商
    negotiator: Arc<dyn EndpointNegotiator>,
    /// 推送执行器
    executor: Arc<dyn TransferExecutor>,
    /// 推送线程池
    pool: TransferPool,
}

impl UploadEngine {
    pub fn new(
        validator: ExtensionValidator,
        negotiator: Arc<dyn EndpointNegotiator>,
        executor: Arc<dyn TransferExecutor>,
        pool: TransferPool,
    ) -> Self {
        Self {
            validator,
            negotiator,
            executor,
            pool,
        }
    }

    /// 根据配置创建 DDownload 上传引擎
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let validator = ExtensionValidator::new(&config.upload.allowed_extensions);
        if validator.is_empty() {
            warn!("扩展名白名单为空，所有上传都会被拒绝");
        }

        let negotiator = Arc::new(DdownloadClient::new(&config.ddownload)?);
        let executor = Arc::new(BlockingUploader::new(
            config.ddownload.download_url.clone(),
            config.ddownload.transfer_timeout(),
        ));
        let pool = TransferPool::new(config.upload.max_concurrent_transfers);

        info!(
            "上传引擎初始化完成: 白名单={:?}, 推送并发={}",
            config.upload.allowed_extensions,
            pool.capacity()
        );

        Ok(Self::new(validator, negotiator, executor, pool))
    }

    /// 执行一次上传
    ///
    /// 返回值只会是下载结果或分类错误之一
    pub async fn run(&self, request: UploadRequest) -> Result<TransferResult, UploadError> {
        let upload_id = Uuid::new_v4();
        let span = info_span!("upload", id = %upload_id);
        self.run_steps(request).instrument(span).await
    }

    async fn run_steps(&self, request: UploadRequest) -> Result<TransferResult, UploadError> {
        let UploadRequest { source, filename } = request;

        // 1. 校验
        let verdict = self.validator.check(&filename);
        if !verdict.accepted {
            return Err(UploadError::Validation(verdict.rejection_message()));
        }

        info!("尝试上传文件: {}", filename);

        // 2. 获取上传服务器
        let lease = match AssertUnwindSafe(self.negotiator.negotiate())
            .catch_unwind()
            .await
        {
            Ok(Ok(lease)) => lease,
            Ok(Err(e)) => {
                warn!("获取上传服务器失败: file={}, error={}", filename, e);
                return Err(e);
            }
            Err(_) => {
                error!("获取上传服务器时发生 panic: file={}", filename);
                return Err(UploadError::Unexpected(
                    "获取上传服务器时发生内部错误".to_string(),
                ));
            }
        };

        // 3. 检查租约
        if !lease.has_usable_url() {
            error!(
                "上传服务器响应中没有可用的上传地址: {:?}",
                lease.upload_url
            );
            return Err(UploadError::Unexpected("未获取到上传地址".to_string()));
        }

        // 4. 在线程池中推送（租约按值移入，只能使用一次）
        let executor = Arc::clone(&self.executor);
        let job_filename = filename.clone();
        let result = self
            .pool
            .run(move || executor.transfer(source, &job_filename, lease))
            .await;

        match &result {
            Ok(transfer) => info!(
                "上传完成: file={}, link={}",
                filename, transfer.download_link
            ),
            Err(e) => error!(
                "上传失败: file={}, class={}, error={}",
                filename,
                e.class(),
                e
            ),
        }

        result
    }
}
