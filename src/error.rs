//! 错误类型模块
//!
//! 按照传输流程划分错误：启动阶段的认证与配置错误是致命的，
//! 列举错误会终止整个运行，而下载、命名、上传错误只影响单个文件。

use thiserror::Error;

/// 凭据获取或刷新失败。
#[derive(Error, Debug)]
pub enum AuthError {
    /// 凭据文件无法读取
    #[error("Failed to read credentials from {path}: {message}")]
    Io { path: String, message: String },

    /// 凭据内容无法解析
    #[error("Invalid credentials: {0}")]
    Invalid(String),

    /// OAuth 模式下缺少令牌缓存
    #[error("Token cache {0} not found, complete the OAuth consent flow first")]
    MissingTokenCache(String),

    /// 令牌端点返回错误
    #[error("Token endpoint error (status {status}): {message}")]
    TokenEndpoint { status: u16, message: String },

    /// 网络错误
    #[error("Token request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// 单次 Google Drive 请求失败。
#[derive(Error, Debug)]
pub enum DriveError {
    #[error("Drive request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Drive API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Failed to parse Drive response: {0}")]
    Parse(String),

    #[error(transparent)]
    Auth(#[from] AuthError),
}

/// 传输流程中的错误。
#[derive(Error, Debug)]
pub enum TransferError {
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Listing error for folder {folder_id}: {message}")]
    Listing { folder_id: String, message: String },

    #[error("Fetch error for file {file_id} after {attempts} attempt(s): {message}")]
    Fetch {
        file_id: String,
        attempts: u32,
        message: String,
    },

    #[error("Argument error: {0}")]
    Argument(String),

    #[error("Upload error for key {key} after {attempts} attempt(s): {message}")]
    Upload {
        key: String,
        attempts: u32,
        message: String,
    },
}

impl TransferError {
    /// 是否为会终止整个运行的错误
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            TransferError::Auth(_) | TransferError::Config(_) | TransferError::Listing { .. }
        )
    }
}
