// DDownload API模块
//
// 上传分两步：
// 1. 获取一次性上传地址（异步，见 client）
// 2. 将文件推送到该地址（阻塞，见 transfer）

pub mod client;
pub mod transfer;
pub mod types;

pub use client::DdownloadClient;
pub use transfer::{BlockingUploader, UPLOAD_TYPE};
pub use types::*;
