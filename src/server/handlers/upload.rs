// 上传 API

use crate::server::AppState;
use crate::uploader::{UploadOutcome, UploadRequest, UploadSource};
use axum::{
    extract::{
        multipart::{Field, MultipartError, MultipartRejection},
        Multipart, State,
    },
    http::StatusCode,
    Json,
};
use std::io::SeekFrom;
use tokio::io::{AsyncSeekExt, AsyncWriteExt};
use tracing::{debug, error, info, warn};

/// 表单中的文件字段名
pub const FILE_FIELD: &str = "file";

/// 上传接口响应（状态码 + JSON）
pub type UploadResponse = (StatusCode, Json<UploadOutcome>);

/// 读取上传内容时的错误
#[derive(Debug, thiserror::Error)]
enum SpoolError {
    #[error("读取上传内容失败: {0}")]
    Multipart(#[from] MultipartError),

    #[error("写入临时文件失败: {0}")]
    Io(#[from] std::io::Error),

    #[error("临时文件任务失败: {0}")]
    Join(#[from] tokio::task::JoinError),
}

fn reject(status: StatusCode, message: impl Into<String>) -> UploadResponse {
    (status, Json(UploadOutcome::failure(message)))
}

/// 清理客户端提供的文件名
///
/// 只保留 ASCII 字母数字和 `_.-`，路径分隔符和空白替换为 `_`，
/// 去掉首尾的 `.` 和 `_`。结果可能为空串
pub fn sanitize_filename(filename: &str) -> String {
    let ascii: String = filename.chars().filter(char::is_ascii).collect();
    let separated = ascii.replace(['/', '\\'], " ");
    let joined = separated.split_whitespace().collect::<Vec<_>>().join("_");

    joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect::<String>()
        .trim_matches(|c| c == '.' || c == '_')
        .to_string()
}

/// POST /upload
/// 上传单个文件到 DDownload
pub async fn upload_file(
    State(app_state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> UploadResponse {
    let mut multipart = match multipart {
        Ok(multipart) => multipart,
        Err(e) => {
            warn!("上传请求不是合法的 multipart 表单: {}", e);
            return reject(StatusCode::BAD_REQUEST, "请求格式错误，需要 multipart/form-data");
        }
    };

    let max_size = app_state.config.upload.max_content_length;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return spool_failure(SpoolError::Multipart(e), max_size),
        };

        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let original_filename = field.file_name().unwrap_or_default().to_string();
        if original_filename.is_empty() {
            warn!("上传请求中的文件名为空");
            return reject(StatusCode::BAD_REQUEST, "请选择要上传的文件");
        }

        let filename = sanitize_filename(&original_filename);
        info!(
            "处理上传文件: '{}' (清理后: '{}')",
            original_filename, filename
        );

        let source = match spool_field(field).await {
            Ok(source) => source,
            Err(e) => return spool_failure(e, max_size),
        };

        let result = app_state
            .engine
            .run(UploadRequest::new(source, filename))
            .await;

        let status = match &result {
            Ok(_) => StatusCode::OK,
            Err(e) => e.status_code(),
        };
        return (status, Json(UploadOutcome::from(&result)));
    }

    warn!("上传请求中没有文件字段");
    reject(StatusCode::BAD_REQUEST, "未选择文件")
}

/// 将文件字段写入匿名临时文件，返回可单次读取的上传源
async fn spool_field(mut field: Field<'_>) -> Result<UploadSource, SpoolError> {
    let std_file = tokio::task::spawn_blocking(tempfile::tempfile).await??;
    let mut file = tokio::fs::File::from_std(std_file);

    let mut length = 0u64;
    while let Some(chunk) = field.chunk().await? {
        file.write_all(&chunk).await?;
        length += chunk.len() as u64;
    }
    file.flush().await?;
    file.seek(SeekFrom::Start(0)).await?;

    debug!("上传内容已写入临时文件: {} bytes", length);

    let std_file = file.into_std().await;
    Ok(UploadSource::with_length(std_file, length))
}

fn spool_failure(err: SpoolError, max_size: u64) -> UploadResponse {
    match err {
        SpoolError::Multipart(e) if e.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            warn!("413 上传文件过大: {}", e);
            reject(
                StatusCode::PAYLOAD_TOO_LARGE,
                format!("文件过大，最大允许 {} MB", max_size / (1024 * 1024)),
            )
        }
        SpoolError::Multipart(e) => {
            warn!("读取上传表单失败: {}", e);
            reject(e.status(), "读取上传内容失败")
        }
        other => {
            error!("暂存上传内容失败: {}", other);
            reject(StatusCode::INTERNAL_SERVER_ERROR, "发生意外错误")
        }
    }
}
