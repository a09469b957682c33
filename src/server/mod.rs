// Web服务器模块

pub mod handlers;
pub mod state;

pub use state::AppState;

use axum::{
    extract::DefaultBodyLimit,
    handler::HandlerWithoutStateExt,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::{info, warn};

/// 构建应用路由
///
/// - `POST /upload`：上传文件（请求体大小受 `upload.max_content_length` 限制）
/// - `GET /health`：健康检查
/// - 其他路径：静态前端资源，不存在时返回 404 JSON
pub fn build_router(state: AppState) -> Router {
    let body_limit = usize::try_from(state.config.upload.max_content_length).unwrap_or(usize::MAX);

    // 配置中间件层
    let middleware = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http()) // HTTP 请求日志
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    let router = Router::new()
        .route(
            "/upload",
            post(handlers::upload_file).layer(DefaultBodyLimit::max(body_limit)),
        )
        .route("/health", get(handlers::health_check));

    let static_dir = &state.config.server.static_dir;
    let router = if static_dir.is_dir() {
        info!("静态资源目录: {:?}", static_dir);
        router.fallback_service(
            ServeDir::new(static_dir).not_found_service(handlers::not_found.into_service()),
        )
    } else {
        warn!("⚠️ 未找到静态资源目录: {:?}，仅提供 API", static_dir);
        router.fallback(handlers::not_found)
    };

    router.with_state(state).layer(middleware)
}
