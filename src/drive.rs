//! Google Drive 模块
//!
//! 该模块负责与 Google Drive v3 API 的交互，包括列举文件夹中的图片
//! 和下载单个文件。

pub mod client;
pub mod types;

pub use client::DriveClient;

use crate::error::DriveError;
use async_trait::async_trait;
use bytes::Bytes;
use serde::Deserialize;

/// 列举得到的源文件记录
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceFile {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub mime_type: String,
}

impl SourceFile {
    /// 用于日志的显示名称，没有名称时退回到文件 ID
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() { &self.id } else { &self.name }
    }
}

/// 下载完成的文件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedFile {
    pub content: Bytes,
    pub original_name: String,
}

/// 源文件接口
///
/// 每次调用只发起一次尝试，重试与并发控制由调用方负责。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DriveSource: Send + Sync {
    /// 列举文件夹中的所有图片文件，按 API 返回顺序。
    async fn list_images(&self, folder_id: &str) -> Result<Vec<SourceFile>, DriveError>;

    /// 下载单个文件的完整内容和显示名称。
    async fn fetch_file(&self, file_id: &str) -> Result<FetchedFile, DriveError>;
}
