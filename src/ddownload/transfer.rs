// 文件推送（阻塞）
//
// 使用 reqwest::blocking 将文件以 multipart 方式推送到上传地址
// ⚠️ 只能在阻塞线程池中调用（见 uploader::pool），不要在异步上下文直接调用

use crate::ddownload::parse_upload_response;
use crate::uploader::{EndpointLease, TransferExecutor, TransferResult, UploadError, UploadSource};
use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::Client;
use std::time::Duration;
use tracing::{debug, error, info};

/// 账户类型字段
pub const UPLOAD_TYPE: &str = "prem";

/// 阻塞式上传执行器
#[derive(Debug, Clone)]
pub struct BlockingUploader {
    /// 公开下载链接前缀
    download_base: String,
    /// 推送超时
    timeout: Duration,
}

impl BlockingUploader {
    pub fn new(download_base: impl Into<String>, timeout: Duration) -> Self {
        Self {
            download_base: download_base.into(),
            timeout,
        }
    }

    /// 构建 multipart 表单
    ///
    /// 字段：`utype=prem`，可选 `sess_id`（仅在租约携带时加入），文件字段 `file`
    fn build_form(source: UploadSource, filename: &str, session_id: Option<String>) -> Form {
        let (reader, length) = source.into_parts();
        let part = match length {
            Some(len) => Part::reader_with_length(reader, len),
            None => Part::reader(reader),
        }
        .file_name(filename.to_string());

        let mut form = Form::new().text("utype", UPLOAD_TYPE);
        if let Some(sess_id) = session_id {
            form = form.text("sess_id", sess_id);
        }
        form.part("file", part)
    }
}

impl TransferExecutor for BlockingUploader {
    fn transfer(
        &self,
        source: UploadSource,
        filename: &str,
        lease: EndpointLease,
    ) -> Result<TransferResult, UploadError> {
        debug!(
            "开始推送文件: file={}, url={}, size={:?}",
            filename,
            lease.upload_url,
            source.length()
        );

        // 阻塞客户端在工作线程内创建和销毁，避免在异步上下文中 drop
        let client = Client::builder().timeout(self.timeout).build().map_err(|e| {
            error!("创建上传客户端失败: {}", e);
            UploadError::Unexpected(format!("创建上传客户端失败: {}", e))
        })?;

        let EndpointLease {
            upload_url,
            session_id,
        } = lease;
        let form = Self::build_form(source, filename, session_id);

        let response = client
            .post(&upload_url)
            .multipart(form)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| {
                let err = UploadError::from_transport(e);
                error!("文件推送网络错误: file={}, error={}", filename, err);
                err
            })?;

        let response_text = response.text().map_err(|e| {
            let err = UploadError::from_transport(e);
            error!("读取上传响应失败: file={}, error={}", filename, err);
            err
        })?;

        debug!("上传响应: file={}, body={}", filename, response_text);

        let result = parse_upload_response(&response_text, filename, &self.download_base)?;
        info!(
            "文件推送完成: file={}, file_code={}",
            filename, result.file_code
        );
        Ok(result)
    }
}
