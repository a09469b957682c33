// 上传数据类型

use crate::uploader::UploadError;
use serde::Serialize;
use std::fmt;
use std::io::{Cursor, Read};

/// 单次读取的上传数据源
///
/// 只保证顺序读取一次，不假设可 seek
pub struct UploadSource {
    reader: Box<dyn Read + Send + 'static>,
    /// 已知长度（有则以定长方式发送 multipart 分段）
    length: Option<u64>,
}

impl UploadSource {
    /// 从 Reader 创建并附带长度
    pub fn with_length<R>(reader: R, length: u64) -> Self
    where
        R: Read + Send + 'static,
    {
        Self {
            reader: Box::new(reader),
            length: Some(length),
        }
    }

    /// 从内存数据创建
    pub fn from_bytes(data: impl Into<Vec<u8>>) -> Self {
        let data = data.into();
        let length = data.len() as u64;
        Self::with_length(Cursor::new(data), length)
    }

    pub fn length(&self) -> Option<u64> {
        self.length
    }

    /// 拆出内部 Reader（由传输执行器消费）
    pub fn into_parts(self) -> (Box<dyn Read + Send + 'static>, Option<u64>) {
        (self.reader, self.length)
    }
}

impl fmt::Debug for UploadSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadSource")
            .field("length", &self.length)
            .finish_non_exhaustive()
    }
}

/// 上传请求
///
/// 由调用方构造，引擎在一次调用内消费，调用结束后不保留
#[derive(Debug)]
pub struct UploadRequest {
    /// 文件数据
    pub source: UploadSource,
    /// 文件名（调用方已做安全处理）
    pub filename: String,
}

impl UploadRequest {
    pub fn new(source: UploadSource, filename: impl Into<String>) -> Self {
        Self {
            source,
            filename: filename.into(),
        }
    }
}

/// 文件名校验结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationVerdict {
    /// 是否允许
    pub accepted: bool,
    /// 提取到的扩展名（小写；无扩展名时为 None）
    pub extension: Option<String>,
}

impl ValidationVerdict {
    /// 被拒绝时的提示信息
    pub fn rejection_message(&self) -> String {
        match &self.extension {
            Some(ext) => format!("不支持的文件类型: .{}", ext),
            None => "文件名无效或缺少扩展名".to_string(),
        }
    }
}

/// 上传端点租约
///
/// 一次性使用：不可 Clone，由传输执行器按值消费
#[derive(Debug, PartialEq, Eq)]
pub struct EndpointLease {
    /// 上传地址
    pub upload_url: String,
    /// 会话 ID（可能缺失）
    pub session_id: Option<String>,
}

impl EndpointLease {
    pub fn new(upload_url: impl Into<String>, session_id: Option<String>) -> Self {
        Self {
            upload_url: upload_url.into(),
            // 空字符串与缺失等价
            session_id: session_id.filter(|s| !s.trim().is_empty()),
        }
    }

    /// 上传地址是否可用
    pub fn has_usable_url(&self) -> bool {
        let url = self.upload_url.trim();
        !url.is_empty() && reqwest::Url::parse(url).is_ok()
    }
}

/// 上传成功结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferResult {
    /// 文件代码
    pub file_code: String,
    /// 公开下载链接
    pub download_link: String,
}

/// 面向调用方的上传结果
///
/// 成功：`{"success": true, "download_link": ...}`
/// 失败：`{"success": false, "error": ...}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl UploadOutcome {
    pub fn success(download_link: impl Into<String>) -> Self {
        Self {
            success: true,
            download_link: Some(download_link.into()),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            download_link: None,
            error: Some(error.into()),
        }
    }
}

impl From<&Result<TransferResult, UploadError>> for UploadOutcome {
    fn from(result: &Result<TransferResult, UploadError>) -> Self {
        match result {
            Ok(transfer) => UploadOutcome::success(transfer.download_link.clone()),
            Err(e) => UploadOutcome::failure(e.public_message()),
        }
    }
}
