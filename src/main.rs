use ddownload_relay::{
    config::{AppConfig, APP_NAME, DEFAULT_CONFIG_PATH},
    logging, server, AppState,
};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env 不存在时忽略
    let dotenv_loaded = dotenvy::dotenv().is_ok();

    let mut config = AppConfig::load_or_default(DEFAULT_CONFIG_PATH).await;
    config.apply_env_overrides();

    // 🔥 初始化日志系统（必须保持 _log_guard 存活）
    let _log_guard = logging::init_logging(&config.log);

    info!("{} v{} 启动中...", APP_NAME, env!("CARGO_PKG_VERSION"));
    if dotenv_loaded {
        info!("已加载 .env 环境变量");
    }
    info!("调试模式: {}", config.is_debug());
    info!(
        "最大上传大小: {} bytes ({} MB)",
        config.upload.max_content_length,
        config.upload.max_content_length / 1024 / 1024
    );
    if config.ddownload.api_key().is_some() {
        info!("DDownload API Key 已加载");
    } else {
        warn!("⚠️ 未配置 DDownload API Key（DDOWNLOAD_API_KEY），所有上传都会失败");
    }

    config.validate()?;

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let app_state = AppState::new(config)?;
    info!("应用状态初始化完成");

    let app = server::build_router(app_state);

    info!("服务器启动在: http://{}", addr);
    info!("上传接口: http://{}/upload", addr);
    info!("健康检查: http://{}/health", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    // 🔥 使用 select! 监听关闭信号，支持优雅关闭
    let server = axum::serve(listener, app);

    tokio::select! {
        result = server => {
            if let Err(e) = result {
                tracing::error!("服务器错误: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("收到 Ctrl+C，开始关闭...");
        }
    }

    info!("应用已安全退出");
    Ok(())
}
