//! S3 对象存储实现

use super::ObjectStore;
use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use std::sync::Arc;
use tracing::debug;

/// 写入单个存储桶的 S3 存储
pub struct S3ObjectStore {
    client: Arc<Client>,
    bucket: String,
}

impl S3ObjectStore {
    /// 创建存储实例。
    ///
    /// # 参数
    ///
    /// * `client` - S3 客户端实例。
    /// * `bucket` - 目标存储桶名称。
    pub fn new(client: Arc<Client>, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put_object(&self, key: &str, content: Bytes, content_type: Option<String>) -> Result<()> {
        debug!(bucket = %self.bucket, key, size = content.len(), "PutObject");

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .set_content_type(content_type)
            .body(ByteStream::from(content))
            .send()
            .await
            .with_context(|| format!("PutObject s3://{}/{} failed", self.bucket, key))?;

        Ok(())
    }
}
