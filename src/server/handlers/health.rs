// 健康检查与兜底处理器

use crate::config::APP_NAME;
use crate::uploader::UploadOutcome;
use axum::{http::StatusCode, Json};
use serde::Serialize;
use tracing::debug;

/// 健康检查响应
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
}

/// GET /health
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        service: APP_NAME.to_string(),
    })
}

/// 未匹配的路由
pub async fn not_found() -> (StatusCode, Json<UploadOutcome>) {
    debug!("404 Not Found");
    (
        StatusCode::NOT_FOUND,
        Json(UploadOutcome::failure("页面不存在")),
    )
}
