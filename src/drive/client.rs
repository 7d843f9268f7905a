//! Google Drive v3 REST 客户端

use super::types::{FileMetadata, FilesListResponse};
use super::{DriveSource, FetchedFile, SourceFile};
use crate::auth::TokenProvider;
use crate::error::DriveError;
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Google Drive API 基础 URL
pub const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";

/// 每页最大条目数（Google Drive API 上限）
pub const MAX_PAGE_SIZE: u32 = 1000;

/// 列举时请求的字段
const LIST_FIELDS: &str = "nextPageToken,files(id,name,mimeType)";

/// 按 Content-Length 预分配下载缓冲区的上限，超出部分随下载增长
const MAX_PREALLOCATE: u64 = 8 * 1024 * 1024;

/// 下载缓冲区的初始容量
fn initial_capacity(content_length: Option<u64>) -> usize {
    content_length.map_or(0, |length| length.min(MAX_PREALLOCATE) as usize)
}

/// Google Drive 客户端
pub struct DriveClient {
    http: reqwest::Client,
    tokens: Arc<dyn TokenProvider>,
    base_url: String,
}

impl DriveClient {
    /// 创建客户端。
    ///
    /// # 参数
    ///
    /// * `http` - HTTP 客户端实例。
    /// * `tokens` - 访问令牌提供者。
    pub fn new(http: reqwest::Client, tokens: Arc<dyn TokenProvider>) -> Self {
        Self {
            http,
            tokens,
            base_url: DRIVE_API_BASE.to_string(),
        }
    }

    /// 替换 API 基础 URL，用于测试或代理。
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// 构建文件夹内图片的查询条件
    ///
    /// # 示例
    ///
    /// ```
    /// use drive_pictures_to_s3::drive::DriveClient;
    ///
    /// assert_eq!(
    ///     DriveClient::image_query("abc"),
    ///     "'abc' in parents and mimeType contains 'image/' and trashed = false"
    /// );
    /// ```
    pub fn image_query(folder_id: &str) -> String {
        let escaped = folder_id.replace('\\', "\\\\").replace('\'', "\\'");
        format!("'{escaped}' in parents and mimeType contains 'image/' and trashed = false")
    }

    /// 发送带认证的 GET 请求，非成功状态码转换为 `DriveError::Api`
    async fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<reqwest::Response, DriveError> {
        let token = self.tokens.access_token().await?;
        let url = format!("{}/{}", self.base_url, path);

        let response = self
            .http
            .get(&url)
            .bearer_auth(token)
            .query(query)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            let message = response.text().await.unwrap_or_default();
            Err(DriveError::Api {
                status: status.as_u16(),
                message,
            })
        }
    }

    async fn list_page(
        &self,
        query: &str,
        page_token: Option<&str>,
    ) -> Result<FilesListResponse, DriveError> {
        let page_size = MAX_PAGE_SIZE.to_string();
        let mut params = vec![
            ("q", query),
            ("fields", LIST_FIELDS),
            ("pageSize", page_size.as_str()),
        ];
        if let Some(page_token) = page_token {
            params.push(("pageToken", page_token));
        }

        let response = self.get("files", &params).await?;
        response
            .json::<FilesListResponse>()
            .await
            .map_err(|e| DriveError::Parse(format!("files list response: {e}")))
    }

    /// 获取文件的显示名称。
    #[instrument(skip(self))]
    pub async fn file_name(&self, file_id: &str) -> Result<String, DriveError> {
        let response = self
            .get(&format!("files/{file_id}"), &[("fields", "name")])
            .await?;
        let metadata = response
            .json::<FileMetadata>()
            .await
            .map_err(|e| DriveError::Parse(format!("file metadata: {e}")))?;

        let name = metadata
            .name
            .ok_or_else(|| DriveError::Parse(format!("file {file_id} has no name")))?;
        info!(file_id, name = %name, "Retrieved metadata");
        Ok(name)
    }

    /// 分块下载文件内容，下载完成前不会返回部分数据。
    #[instrument(skip(self))]
    pub async fn download_content(&self, file_id: &str, name: &str) -> Result<Bytes, DriveError> {
        let response = self
            .get(&format!("files/{file_id}"), &[("alt", "media")])
            .await?;

        let total = response.content_length();
        let mut buffer = BytesMut::with_capacity(initial_capacity(total));
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            buffer.extend_from_slice(&chunk);
            if let Some(total) = total.filter(|total| *total > 0) {
                debug!(
                    "Download progress for {}: {}%",
                    name,
                    buffer.len() as u64 * 100 / total
                );
            }
        }

        Ok(buffer.freeze())
    }
}

#[async_trait]
impl DriveSource for DriveClient {
    #[instrument(skip(self))]
    async fn list_images(&self, folder_id: &str) -> Result<Vec<SourceFile>, DriveError> {
        info!("Listing image files from Google Drive folder");
        let query = Self::image_query(folder_id);

        let mut files = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let page = self.list_page(&query, page_token.as_deref()).await?;
            debug!(count = page.files.len(), "Received listing page");
            files.extend(page.files);

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        info!("Found {} image files in the folder", files.len());
        Ok(files)
    }

    async fn fetch_file(&self, file_id: &str) -> Result<FetchedFile, DriveError> {
        let name = self.file_name(file_id).await?;
        let content = self.download_content(file_id, &name).await?;

        info!(
            file_id,
            "Successfully downloaded {} ({} bytes)",
            name,
            content.len()
        );
        Ok(FetchedFile {
            content,
            original_name: name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::MockTokenProvider;
    use crate::error::AuthError;

    fn client_with_failing_tokens() -> DriveClient {
        let mut tokens = MockTokenProvider::new();
        tokens
            .expect_access_token()
            .times(1)
            .returning(|| Err(AuthError::MissingTokenCache("token.json".to_string())));
        DriveClient::new(reqwest::Client::new(), Arc::new(tokens))
            .with_base_url("http://127.0.0.1:9")
    }

    #[test]
    fn test_initial_capacity_is_capped() {
        assert_eq!(initial_capacity(None), 0);
        assert_eq!(initial_capacity(Some(1024)), 1024);
        assert_eq!(initial_capacity(Some(u64::MAX)), MAX_PREALLOCATE as usize);
    }

    #[tokio::test]
    /// 测试取令牌失败时列举直接返回认证错误，不发出请求
    async fn test_list_images_token_failure() {
        let client = client_with_failing_tokens();
        let error = client.list_images("folder").await.unwrap_err();
        assert!(matches!(error, DriveError::Auth(AuthError::MissingTokenCache(_))));
    }

    #[tokio::test]
    async fn test_fetch_file_token_failure() {
        let client = client_with_failing_tokens();
        let error = client.fetch_file("abc").await.unwrap_err();
        assert!(matches!(error, DriveError::Auth(_)));
    }
}
