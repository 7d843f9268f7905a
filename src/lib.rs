//! Google Drive 图片转存工具库
//!
//! 将 Google Drive 文件夹中的图片一次性转存到 S3 存储桶，主要功能包括：
//! - 分页列举文件夹中的图片文件
//! - 限制并发的下载，失败时按固定间隔重试
//! - 保留原文件名或按列举顺序编号生成对象键
//! - 限制并发的上传，并返回每个文件的传输结果

pub mod auth;
pub mod config;
pub mod drive;
pub mod error;
pub mod s3;
pub mod transfer;
pub mod utils;

use crate::config::{Config, create_s3_client};
use crate::drive::DriveClient;
use crate::error::TransferError;
use crate::s3::S3ObjectStore;
use crate::transfer::{TransferOrchestrator, TransferReport};
use std::sync::Arc;
use tracing::info;

/// 按配置执行一次完整传输
///
/// 此函数完成以下步骤：
/// - 创建凭据提供者并预先获取一次令牌，凭据无效时立即失败
/// - 初始化 Google Drive 客户端和 S3 存储
/// - 运行传输编排器
///
/// # 参数
///
/// * `config` - 启动时加载的配置
///
/// # 返回值
///
/// 每个文件的传输结果；认证或列举失败时返回错误
pub async fn run(config: &Config) -> Result<TransferReport, TransferError> {
    let http_client = reqwest::Client::new();

    let tokens = auth::token_provider_for(&config.credentials, http_client.clone())?;
    tokens.access_token().await?;
    info!("Google Drive credentials ready");

    let drive = Arc::new(DriveClient::new(http_client, tokens));

    let s3_client = Arc::new(create_s3_client(&config.s3).await);
    let store = Arc::new(S3ObjectStore::new(s3_client, config.s3.bucket.clone()));
    info!(
        "S3 store initialized. Bucket: {}, Region: {}",
        config.s3.bucket, config.s3.region
    );

    let orchestrator = TransferOrchestrator::from_config(config, drive, store);
    orchestrator.run(&config.folder_id).await
}
