//! Google Drive API 响应类型

use super::SourceFile;
use serde::Deserialize;

/// files.list 响应
///
/// See: https://developers.google.com/drive/api/v3/reference/files/list
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilesListResponse {
    #[serde(default)]
    pub files: Vec<SourceFile>,

    /// 下一页的令牌，最后一页没有
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// files.get 仅请求 `name` 字段时的响应
#[derive(Debug, Deserialize)]
pub struct FileMetadata {
    #[serde(default)]
    pub name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_list_response() {
        let json = r#"{
            "nextPageToken": "token-2",
            "files": [
                {"id": "1", "name": "a.jpg", "mimeType": "image/jpeg"},
                {"id": "2", "name": "b.png", "mimeType": "image/png"}
            ]
        }"#;
        let response: FilesListResponse = serde_json::from_str(json).unwrap();

        assert_eq!(response.next_page_token.as_deref(), Some("token-2"));
        assert_eq!(response.files.len(), 2);
        assert_eq!(response.files[1].mime_type, "image/png");
    }

    #[test]
    fn test_parse_empty_list_response() {
        let response: FilesListResponse = serde_json::from_str("{}").unwrap();
        assert!(response.files.is_empty());
        assert!(response.next_page_token.is_none());
    }
}
