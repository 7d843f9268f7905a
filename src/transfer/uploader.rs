use super::retry::RetryPolicy;
use crate::error::TransferError;
use crate::s3::ObjectStore;
use crate::utils::path::guess_content_type;
use bytes::Bytes;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{error, info};

/// 带并发限制的对象上传器
///
/// 默认只尝试一次，重试次数由 `RetryPolicy` 决定。
pub struct Uploader {
    store: Arc<dyn ObjectStore>,
    slots: Arc<Semaphore>,
    retry: RetryPolicy,
}

impl Uploader {
    pub fn new(store: Arc<dyn ObjectStore>, max_concurrent: usize, retry: RetryPolicy) -> Self {
        Self {
            store,
            slots: Arc::new(Semaphore::new(max_concurrent.max(1))),
            retry,
        }
    }

    /// 将内容写入指定键，已有对象会被覆盖。
    ///
    /// # 参数
    ///
    /// * `key` - 目标对象键。
    /// * `content` - 文件内容。
    /// * `file_name` - 用于猜测 Content-Type 的文件名。
    ///
    /// # 返回值
    ///
    /// 成功时返回写入的键，失败时返回 `TransferError::Upload`。
    pub async fn upload(&self, key: &str, content: Bytes, file_name: &str) -> Result<String, TransferError> {
        info!(key, "Attempting to upload {} to S3", file_name);

        let _permit = self
            .slots
            .acquire()
            .await
            .map_err(|e| TransferError::Upload {
                key: key.to_string(),
                attempts: 0,
                message: e.to_string(),
            })?;

        let content_type = guess_content_type(file_name);
        self.retry
            .run(key, |_| {
                self.store
                    .put_object(key, content.clone(), content_type.clone())
            })
            .await
            .map_err(|exhausted| {
                error!(key, "Error uploading file to S3: {:#}", exhausted.last_error);
                TransferError::Upload {
                    key: key.to_string(),
                    attempts: exhausted.attempts,
                    message: format!("{:#}", exhausted.last_error),
                }
            })?;

        info!(key, "Successfully uploaded to S3");
        Ok(key.to_string())
    }
}
