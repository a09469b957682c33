// 上传模块
//
// 单文件上传流程：校验 → 获取上传服务器 → 阻塞推送
// - 校验失败不会发起任何网络请求
// - 推送在有界阻塞线程池中执行，不占用异步调度线程
// - 所有失败统一归类为 validation / configuration / network / api / unexpected

pub mod engine;
pub mod error;
pub mod pool;
pub mod types;
pub mod validator;

pub use engine::{EndpointNegotiator, TransferExecutor, UploadEngine};
pub use error::{ErrorClass, UploadError};
pub use pool::TransferPool;
pub use types::{
    EndpointLease, TransferResult, UploadOutcome, UploadRequest, UploadSource, ValidationVerdict,
};
pub use validator::ExtensionValidator;
