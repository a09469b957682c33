// 文件推送线程池
//
// 阻塞推送通过 spawn_blocking 执行，Semaphore 限制同时进行的推送数，
// 请求任务只在 await 处挂起，不占用调度线程

use crate::uploader::UploadError;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, error};

/// 有界阻塞任务池
#[derive(Debug, Clone)]
pub struct TransferPool {
    /// 并发许可
    semaphore: Arc<Semaphore>,
    /// 容量
    capacity: usize,
}

impl TransferPool {
    /// 创建线程池（容量至少为 1）
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// 当前空闲许可数
    #[cfg(test)]
    fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// 在阻塞线程中执行任务并等待结果
    ///
    /// 已派发的任务不会因调用方放弃等待而中止，许可在任务结束时释放。
    /// 任务 panic 会被转换为 unexpected 错误
    pub async fn run<F, T>(&self, job: F) -> Result<T, UploadError>
    where
        F: FnOnce() -> Result<T, UploadError> + Send + 'static,
        T: Send + 'static,
    {
        let permit = Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .map_err(|_| UploadError::Unexpected("推送线程池已关闭".to_string()))?;

        debug!(
            "派发推送任务, 剩余许可={}/{}",
            self.semaphore.available_permits(),
            self.capacity
        );

        let handle = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            job()
        });

        match handle.await {
            Ok(result) => result,
            Err(e) => {
                error!("推送任务异常终止: {}", e);
                Err(UploadError::Unexpected(format!("推送任务异常终止: {}", e)))
            }
        }
    }
}
