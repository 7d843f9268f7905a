//! S3模块
//!
//! 该模块负责将文件内容写入目标存储桶。

pub mod store;

pub use store::S3ObjectStore;

use async_trait::async_trait;
use bytes::Bytes;

/// 对象存储接口
///
/// 写入同一个键会覆盖已有对象，不做存在性检查。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// 将内容写入指定键。
    ///
    /// # 参数
    ///
    /// * `key` - 目标对象键。
    /// * `content` - 文件内容。
    /// * `content_type` - 可选的 Content-Type。
    async fn put_object(
        &self,
        key: &str,
        content: Bytes,
        content_type: Option<String>,
    ) -> anyhow::Result<()>;
}
