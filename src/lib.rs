// DDownload Upload Relay
// DDownload 上传中继核心库

// 配置管理模块
pub mod config;

// DDownload API 模块
pub mod ddownload;

// 日志模块
pub mod logging;

// Web服务器模块
pub mod server;

// 上传模块
pub mod uploader;

// 导出常用类型
pub use config::AppConfig;
pub use ddownload::{BlockingUploader, DdownloadClient};
pub use server::{build_router, AppState};
pub use uploader::{
    EndpointLease, EndpointNegotiator, ErrorClass, ExtensionValidator, TransferExecutor,
    TransferPool, TransferResult, UploadEngine, UploadError, UploadOutcome, UploadRequest,
    UploadSource,
};
