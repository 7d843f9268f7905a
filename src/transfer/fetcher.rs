use super::retry::RetryPolicy;
use crate::drive::{DriveSource, FetchedFile};
use crate::error::TransferError;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{error, info};

/// 带并发限制和重试的文件下载器
pub struct Fetcher {
    source: Arc<dyn DriveSource>,
    slots: Arc<Semaphore>,
    retry: RetryPolicy,
}

impl Fetcher {
    /// 创建下载器。
    ///
    /// # 参数
    ///
    /// * `source` - 文件来源。
    /// * `max_concurrent` - 同时进行的下载数上限。
    /// * `retry` - 下载重试策略。
    pub fn new(source: Arc<dyn DriveSource>, max_concurrent: usize, retry: RetryPolicy) -> Self {
        Self {
            source,
            slots: Arc::new(Semaphore::new(max_concurrent.max(1))),
            retry,
        }
    }

    /// 下载单个文件。
    ///
    /// 在所有尝试（包括重试前的等待）期间一直占用一个下载名额。
    ///
    /// # 返回值
    ///
    /// 完整的文件内容和显示名称；全部尝试失败时返回带最后一次错误的 `TransferError::Fetch`。
    pub async fn fetch(&self, file_id: &str) -> Result<FetchedFile, TransferError> {
        info!(file_id, "Downloading file from Google Drive");

        let _permit = self
            .slots
            .acquire()
            .await
            .map_err(|e| TransferError::Fetch {
                file_id: file_id.to_string(),
                attempts: 0,
                message: e.to_string(),
            })?;

        self.retry
            .run(file_id, |_| self.source.fetch_file(file_id))
            .await
            .map_err(|exhausted| {
                error!(
                    file_id,
                    attempts = exhausted.attempts,
                    "Error downloading file: {}",
                    exhausted.last_error
                );
                TransferError::Fetch {
                    file_id: file_id.to_string(),
                    attempts: exhausted.attempts,
                    message: exhausted.last_error.to_string(),
                }
            })
    }
}
