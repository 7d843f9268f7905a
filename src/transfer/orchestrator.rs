use super::fetcher::Fetcher;
use super::naming::{NamingMode, ObjectNamer, retained_names};
use super::outcome::{FileFailure, Stage, TransferOutcome, TransferReport};
use super::retry::RetryPolicy;
use super::uploader::Uploader;
use crate::config::{Config, TransferLimits};
use crate::drive::{DriveSource, SourceFile};
use crate::error::TransferError;
use crate::s3::ObjectStore;
use futures::future::join_all;
use std::sync::Arc;
use tracing::{error, info, warn};

/// 传输编排器
///
/// 先列举文件，再并发执行每个文件的 下载 → 命名 → 上传 流水线。
/// 单个文件失败只记录在该文件的结果中，不影响其他文件。
pub struct TransferOrchestrator {
    source: Arc<dyn DriveSource>,
    fetcher: Fetcher,
    namer: ObjectNamer,
    uploader: Uploader,
}

impl TransferOrchestrator {
    /// 创建编排器。
    ///
    /// # 参数
    ///
    /// * `source` - 文件来源，同时用于列举和下载。
    /// * `store` - 目标对象存储。
    /// * `namer` - 对象键命名器。
    /// * `limits` - 并发与重试限制。
    pub fn new(
        source: Arc<dyn DriveSource>,
        store: Arc<dyn ObjectStore>,
        namer: ObjectNamer,
        limits: &TransferLimits,
    ) -> Self {
        let fetcher = Fetcher::new(
            source.clone(),
            limits.max_concurrent_downloads,
            RetryPolicy::new(limits.fetch_attempts, limits.retry_delay),
        );
        let uploader = Uploader::new(
            store,
            limits.max_concurrent_uploads,
            RetryPolicy::new(limits.upload_attempts, limits.retry_delay),
        );

        Self {
            source,
            fetcher,
            namer,
            uploader,
        }
    }

    pub fn from_config(
        config: &Config,
        source: Arc<dyn DriveSource>,
        store: Arc<dyn ObjectStore>,
    ) -> Self {
        let namer = ObjectNamer::new(config.naming, config.s3.prefix.clone());
        Self::new(source, store, namer, &config.limits)
    }

    /// 列举文件夹中的图片，失败时返回 `TransferError::Listing`。
    pub async fn list_files(&self, folder_id: &str) -> Result<Vec<SourceFile>, TransferError> {
        self.source.list_images(folder_id).await.map_err(|e| {
            error!(folder_id, "Error listing files: {}", e);
            TransferError::Listing {
                folder_id: folder_id.to_string(),
                message: e.to_string(),
            }
        })
    }

    /// 执行一次完整传输。
    ///
    /// # 返回值
    ///
    /// 每个列举到的文件对应一个结果；只有列举失败时返回错误。
    pub async fn run(&self, folder_id: &str) -> Result<TransferReport, TransferError> {
        info!("Starting file processing...");
        let files = self.list_files(folder_id).await?;
        if files.is_empty() {
            info!("No files found in the specified folder");
            return Ok(TransferReport::default());
        }

        let total = files.len();
        info!("Found {} files to process.", total);

        // 保留原名模式下先按列举顺序分配名称，保证键互不相同
        let names: Vec<Option<String>> = match self.namer.mode() {
            NamingMode::Retain => retained_names(&files).into_iter().map(Some).collect(),
            NamingMode::Sequential => vec![None; total],
        };
        let pipelines = files
            .into_iter()
            .zip(names)
            .enumerate()
            .map(|(index, (file, name))| self.process_file(file, index + 1, total, name));

        let report = TransferReport::new(join_all(pipelines).await);
        report.log_summary();
        Ok(report)
    }

    async fn process_file(
        &self,
        file: SourceFile,
        position: usize,
        total: usize,
        retained_name: Option<String>,
    ) -> TransferOutcome {
        let display_name = file.display_name().to_string();
        info!(
            "Processing file {}/{}: {} (ID: {})",
            position, total, display_name, file.id
        );

        let result = self.run_pipeline(&file, position, retained_name).await;
        match &result {
            Ok(key) => info!(
                "Successfully processed and uploaded {} to S3 as {}",
                display_name, key
            ),
            Err(failure) => error!(
                file_id = %file.id,
                stage = %failure.stage,
                "Error processing file {}: {}",
                display_name,
                failure.error
            ),
        }

        TransferOutcome {
            source_id: file.id,
            display_name,
            position,
            result,
        }
    }

    async fn run_pipeline(
        &self,
        file: &SourceFile,
        position: usize,
        retained_name: Option<String>,
    ) -> Result<String, FileFailure> {
        let fetched = self
            .fetcher
            .fetch(&file.id)
            .await
            .map_err(|e| FileFailure::new(Stage::Fetching, e))?;

        let (name, counter) = match retained_name {
            Some(name) if name != file.name => {
                warn!(
                    file_id = %file.id,
                    "Duplicate file name {}, storing as {}",
                    file.name, name
                );
                (name, None)
            }
            Some(name) => (name, None),
            None => (fetched.original_name.clone(), Some(position)),
        };

        let key = self
            .namer
            .key_for(&name, counter)
            .map_err(|e| FileFailure::new(Stage::Naming, e))?;

        self.uploader
            .upload(&key, fetched.content, &name)
            .await
            .map_err(|e| FileFailure::new(Stage::Uploading, e))
    }
}
