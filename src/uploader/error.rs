// 上传错误类型
//
// 所有上传路径最终只会产生 TransferResult 或 UploadError 之一

use axum::http::StatusCode;
use serde::Serialize;
use std::fmt;

/// 错误分类
///
/// 用于选择响应状态码和提示语气，不携带调用栈
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorClass {
    /// 文件名/扩展名不合法（用户可修正，未发起任何网络请求）
    Validation,
    /// 缺少凭证（运维可修正）
    Configuration,
    /// 传输层失败或超时（不自动重试）
    Network,
    /// 上游返回了格式正确但失败的响应
    Api,
    /// 其他一切情况（包括响应格式异常和程序缺陷）
    Unexpected,
}

impl ErrorClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorClass::Validation => "validation",
            ErrorClass::Configuration => "configuration",
            ErrorClass::Network => "network",
            ErrorClass::Api => "api",
            ErrorClass::Unexpected => "unexpected",
        }
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 上传错误
///
/// `Display` 输出包含完整诊断信息，仅用于日志；
/// 返回给调用方的文本使用 [`UploadError::public_message`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UploadError {
    #[error("文件校验失败: {0}")]
    Validation(String),

    #[error("配置错误: {0}")]
    Configuration(String),

    #[error("网络错误: {0}")]
    Network(String),

    #[error("API 错误: {0}")]
    Api(String),

    #[error("意外错误: {0}")]
    Unexpected(String),
}

impl UploadError {
    /// 错误分类
    pub fn class(&self) -> ErrorClass {
        match self {
            UploadError::Validation(_) => ErrorClass::Validation,
            UploadError::Configuration(_) => ErrorClass::Configuration,
            UploadError::Network(_) => ErrorClass::Network,
            UploadError::Api(_) => ErrorClass::Api,
            UploadError::Unexpected(_) => ErrorClass::Unexpected,
        }
    }

    /// 原始错误信息（不带分类前缀）
    pub fn message(&self) -> &str {
        match self {
            UploadError::Validation(m)
            | UploadError::Configuration(m)
            | UploadError::Network(m)
            | UploadError::Api(m)
            | UploadError::Unexpected(m) => m,
        }
    }

    /// 返回给调用方的错误信息
    ///
    /// validation/api 可直接展示；network/unexpected/configuration 不暴露内部细节
    pub fn public_message(&self) -> String {
        match self {
            UploadError::Validation(m) => m.clone(),
            UploadError::Api(m) => format!("API 错误: {}", m),
            UploadError::Network(_) => "网络错误，请稍后重试".to_string(),
            UploadError::Configuration(_) => "服务未正确配置，请联系管理员".to_string(),
            UploadError::Unexpected(_) => "发生意外错误".to_string(),
        }
    }

    /// HTTP 状态码映射
    pub fn status_code(&self) -> StatusCode {
        match self.class() {
            ErrorClass::Validation | ErrorClass::Api => StatusCode::BAD_REQUEST,
            ErrorClass::Configuration | ErrorClass::Network | ErrorClass::Unexpected => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// 从 reqwest 错误构造网络错误
    ///
    /// 请求地址可能带有 `?key=`，先去掉 URL 再格式化
    pub(crate) fn from_transport(error: reqwest::Error) -> Self {
        let error = error.without_url();
        if error.is_timeout() {
            UploadError::Network(format!("请求超时: {}", error))
        } else if error.is_connect() {
            UploadError::Network(format!("连接失败: {}", error))
        } else {
            UploadError::Network(error.to_string())
        }
    }
}
