// DDownload API数据类型

use crate::uploader::{EndpointLease, TransferResult, UploadError};
use serde::Deserialize;
use serde_json::Value;
use tracing::{error, info};

/// 获取上传服务器成功时的状态码
pub const UPLOAD_SERVER_SUCCESS: i64 = 200;

/// 上传成功时的文件状态
pub const FILE_STATUS_OK: &str = "OK";

/// 获取上传服务器响应
///
/// 响应示例:
/// ```json
/// {
///   "msg": "OK",
///   "status": 200,
///   "sess_id": "3c7b0a1...",
///   "result": "https://wwwNNN.ddownload.com/cgi-bin/upload.cgi?upload_type=file"
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct UploadServerResponse {
    /// 状态码（200 表示成功）
    #[serde(default)]
    pub status: Option<i64>,

    /// 状态信息
    #[serde(default)]
    pub msg: Option<String>,

    /// 上传地址
    #[serde(default)]
    pub result: Option<String>,

    /// 会话 ID（并非总是存在）
    #[serde(default)]
    pub sess_id: Option<String>,
}

impl UploadServerResponse {
    /// 解析响应体
    ///
    /// 只接受 JSON 对象；数组等其他形状视为 unexpected
    pub fn from_body(body: &str) -> Result<Self, UploadError> {
        let value: Value = serde_json::from_str(body).map_err(|e| {
            error!("解析上传服务器响应失败: error={}, body={}", e, body);
            UploadError::Unexpected(format!("上传服务器响应解析失败: {}", e))
        })?;

        if !value.is_object() {
            error!("上传服务器响应格式异常: body={}", body);
            return Err(UploadError::Unexpected("上传服务器响应格式异常".to_string()));
        }

        serde_json::from_value(value).map_err(|e| {
            error!("上传服务器响应字段异常: error={}, body={}", e, body);
            UploadError::Unexpected(format!("上传服务器响应格式异常: {}", e))
        })
    }

    /// 是否成功（状态码为 200 且返回了非空上传地址）
    pub fn is_success(&self) -> bool {
        self.status == Some(UPLOAD_SERVER_SUCCESS)
            && self
                .result
                .as_deref()
                .map(|r| !r.trim().is_empty())
                .unwrap_or(false)
    }

    /// 转换为上传租约
    pub fn into_lease(self) -> Result<EndpointLease, UploadError> {
        if !self.is_success() {
            let error_msg = self
                .msg
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| "DDownload API 返回未知错误".to_string());
            error!(
                "获取上传服务器失败: {} (status={:?})",
                error_msg, self.status
            );
            return Err(UploadError::Api(error_msg));
        }

        let upload_url = self.result.unwrap_or_default();
        Ok(EndpointLease::new(upload_url.trim(), self.sess_id))
    }
}

/// 单个文件的上传结果
///
/// 上传接口返回数组，单文件上传时只有一个元素：
/// ```json
/// [{"file_code": "abc123", "file_status": "OK"}]
/// ```
#[derive(Debug, Deserialize)]
pub struct UploadFileResult {
    /// 文件状态（"OK" 表示成功）
    #[serde(default)]
    pub file_status: Option<String>,

    /// 文件代码
    #[serde(default)]
    pub file_code: Option<String>,

    /// 错误信息
    #[serde(default)]
    pub error: Option<String>,
}

impl UploadFileResult {
    /// 成功时返回文件代码
    pub fn success_code(&self) -> Option<&str> {
        if self.file_status.as_deref() != Some(FILE_STATUS_OK) {
            return None;
        }
        self.file_code
            .as_deref()
            .map(str::trim)
            .filter(|code| !code.is_empty())
    }
}

/// 拼接公开下载链接
pub fn build_download_link(download_base: &str, file_code: &str) -> String {
    format!("{}/{}", download_base.trim_end_matches('/'), file_code)
}

/// 解析上传接口响应
///
/// - 非空数组且首元素 `file_status == "OK"` 并带 `file_code` → 成功
/// - 首元素状态非 OK → api 错误
/// - 不是非空的对象数组 → unexpected
pub fn parse_upload_response(
    body: &str,
    filename: &str,
    download_base: &str,
) -> Result<TransferResult, UploadError> {
    let value: Value = serde_json::from_str(body).map_err(|e| {
        error!("上传响应不是合法 JSON: file={}, error={}, body={}", filename, e, body);
        UploadError::Unexpected(format!("上传响应解析失败: {}", e))
    })?;

    let first = match value {
        Value::Array(mut items) if matches!(items.first(), Some(Value::Object(_))) => {
            items.swap_remove(0)
        }
        other => {
            error!("上传响应格式异常: file={}, body={}", filename, other);
            return Err(UploadError::Unexpected("上传响应格式异常".to_string()));
        }
    };

    let result: UploadFileResult = serde_json::from_value(first).map_err(|e| {
        error!("上传结果字段异常: file={}, error={}, body={}", filename, e, body);
        UploadError::Unexpected(format!("上传响应格式异常: {}", e))
    })?;

    match result.success_code() {
        Some(file_code) => {
            let download_link = build_download_link(download_base, file_code);
            info!("文件 '{}' 上传成功, file_code={}", filename, file_code);
            Ok(TransferResult {
                file_code: file_code.to_string(),
                download_link,
            })
        }
        None => {
            let error_msg = result
                .error
                .filter(|e| !e.trim().is_empty())
                .unwrap_or_else(|| "上传失败（API 状态异常）".to_string());
            error!(
                "上传失败: file={}, file_status={:?}, error={}",
                filename, result.file_status, error_msg
            );
            Err(UploadError::Api(error_msg))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::uploader::ErrorClass;

    const BASE: &str = "https://ddownload.com";

    fn parse_server(body: &str) -> UploadServerResponse {
        serde_json::from_str(body).unwrap()
    }

    #[test]
    fn test_upload_server_success() {
        let resp = parse_server(
            r#"{"status":200,"msg":"OK","result":"http://upload.test/x","sess_id":"S1"}"#,
        );
        assert!(resp.is_success());
        let lease = resp.into_lease().unwrap();
        assert_eq!(lease.upload_url, "http://upload.test/x");
        assert_eq!(lease.session_id.as_deref(), Some("S1"));
    }

    #[test]
    fn test_upload_server_without_session() {
        let resp = parse_server(r#"{"status":200,"result":"http://upload.test/x"}"#);
        let lease = resp.into_lease().unwrap();
        assert_eq!(lease.session_id, None);
    }

    #[test]
    fn test_upload_server_api_error() {
        let resp = parse_server(r#"{"status":403,"msg":"Wrong auth"}"#);
        let err = resp.into_lease().unwrap_err();
        assert_eq!(err, UploadError::Api("Wrong auth".to_string()));
    }

    #[test]
    fn test_upload_server_missing_result() {
        let resp = parse_server(r#"{"status":200,"msg":"OK"}"#);
        assert!(!resp.is_success());
        assert_eq!(resp.into_lease().unwrap_err().class(), ErrorClass::Api);

        let resp = parse_server(r#"{"status":200,"result":""}"#);
        assert!(!resp.is_success());
    }

    #[test]
    fn test_upload_server_fallback_message() {
        let resp = parse_server(r#"{"status":500}"#);
        let err = resp.into_lease().unwrap_err();
        assert_eq!(err.class(), ErrorClass::Api);
        assert!(!err.message().is_empty());
    }

    #[test]
    fn test_upload_server_requires_object() {
        for body in [
            r#"[200,"OK","http://upload.test/x"]"#,
            "[]",
            "200",
            r#""http://upload.test/x""#,
            "not json",
        ] {
            let err = UploadServerResponse::from_body(body).unwrap_err();
            assert_eq!(err.class(), ErrorClass::Unexpected, "body: {}", body);
        }

        let lease = UploadServerResponse::from_body(
            r#"{"status":200,"result":"http://upload.test/x","sess_id":"S1"}"#,
        )
        .unwrap()
        .into_lease()
        .unwrap();
        assert_eq!(lease.upload_url, "http://upload.test/x");
    }

    #[test]
    fn test_parse_upload_success() {
        let result =
            parse_upload_response(r#"[{"file_status":"OK","file_code":"abc123"}]"#, "a.pdf", BASE)
                .unwrap();
        assert_eq!(result.file_code, "abc123");
        assert_eq!(result.download_link, "https://ddownload.com/abc123");
    }

    #[test]
    fn test_parse_upload_uses_first_element() {
        let body = r#"[{"file_status":"OK","file_code":"first"},{"file_status":"OK","file_code":"second"}]"#;
        let result = parse_upload_response(body, "a.pdf", BASE).unwrap();
        assert_eq!(result.file_code, "first");
    }

    #[test]
    fn test_parse_upload_api_error() {
        let err = parse_upload_response(
            r#"[{"file_status":"failed","error":"file too big"}]"#,
            "a.pdf",
            BASE,
        )
        .unwrap_err();
        assert_eq!(err, UploadError::Api("file too big".to_string()));

        // OK 但缺少 file_code 仍视为 API 失败
        let err = parse_upload_response(r#"[{"file_status":"OK"}]"#, "a.pdf", BASE).unwrap_err();
        assert_eq!(err.class(), ErrorClass::Api);
    }

    #[test]
    fn test_parse_upload_unexpected_shapes() {
        for body in [
            "[]",
            r#"{"file_status":"OK","file_code":"abc"}"#,
            "not json",
            "[1, 2]",
            "null",
            r#"[["OK","abc"]]"#,
            r#"[null, {"file_status":"OK","file_code":"abc"}]"#,
        ] {
            let err = parse_upload_response(body, "a.pdf", BASE).unwrap_err();
            assert_eq!(err.class(), ErrorClass::Unexpected, "body: {}", body);
        }
    }

    #[test]
    fn test_build_download_link() {
        assert_eq!(build_download_link(BASE, "Z9"), "https://ddownload.com/Z9");
        assert_eq!(
            build_download_link("https://ddownload.com/", "Z9"),
            "https://ddownload.com/Z9"
        );
    }
}
