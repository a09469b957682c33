// API处理器模块

pub mod health;
pub mod upload;

pub use health::*;
pub use upload::*;
