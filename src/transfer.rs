//! 传输流水线模块
//!
//! 此模块包含了从 Google Drive 到 S3 的传输流程：
//! - 带并发限制和重试的下载器
//! - 对象键命名
//! - 带并发限制的上传器
//! - 编排整个运行的编排器

pub mod fetcher;
pub mod naming;
pub mod orchestrator;
pub mod outcome;
pub mod retry;
pub mod uploader;

// 重新导出主要的公共接口
pub use fetcher::Fetcher;
pub use naming::{NamingMode, ObjectNamer};
pub use orchestrator::TransferOrchestrator;
pub use outcome::{FileFailure, Stage, TransferOutcome, TransferReport};
pub use retry::RetryPolicy;
pub use uploader::Uploader;
