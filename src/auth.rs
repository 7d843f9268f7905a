//! 凭据模块
//!
//! 为 Google Drive 请求提供有效的访问令牌。调用方只依赖 `TokenProvider`，
//! 不关心令牌来自服务账号还是 OAuth 令牌缓存。

pub mod authorized_user;
pub mod service_account;

pub use authorized_user::AuthorizedUserTokenProvider;
pub use service_account::ServiceAccountTokenProvider;

use crate::config::CredentialSource;
use crate::error::AuthError;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use std::sync::Arc;

/// Google Drive 只读权限
pub const DRIVE_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/drive.readonly";

/// Google OAuth 令牌端点
pub const GOOGLE_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// 令牌到期前提前刷新的秒数
const EXPIRY_MARGIN_SECS: i64 = 60;

/// 访问令牌提供者
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// 返回当前有效的访问令牌，必要时先刷新。
    async fn access_token(&self) -> Result<String, AuthError>;
}

/// 固定令牌，适用于外部已获取令牌的场景
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn access_token(&self) -> Result<String, AuthError> {
        Ok(self.token.clone())
    }
}

/// 根据凭据配置创建令牌提供者。
///
/// # 参数
///
/// * `source` - 凭据来源配置。
/// * `http` - 用于访问令牌端点的 HTTP 客户端。
///
/// # 返回值
///
/// 对应模式的令牌提供者；凭据文件无法读取或解析时返回 `AuthError`。
pub fn token_provider_for(
    source: &CredentialSource,
    http: reqwest::Client,
) -> Result<Arc<dyn TokenProvider>, AuthError> {
    let provider: Arc<dyn TokenProvider> = match source {
        CredentialSource::ServiceAccountFile(path) => {
            Arc::new(ServiceAccountTokenProvider::from_file(path, http)?)
        }
        CredentialSource::ServiceAccountJson(json) => {
            Arc::new(ServiceAccountTokenProvider::from_json(json, http)?)
        }
        CredentialSource::OAuth {
            client_secrets,
            token_cache,
        } => Arc::new(AuthorizedUserTokenProvider::new(
            client_secrets,
            token_cache.clone(),
            http,
        )?),
    };
    Ok(provider)
}

/// 内存中缓存的访问令牌
#[derive(Debug, Clone)]
pub(crate) struct CachedToken {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

impl CachedToken {
    pub fn is_fresh(&self) -> bool {
        is_fresh(Some(self.expires_at))
    }
}

/// 没有到期时间的令牌视为有效
pub(crate) fn is_fresh(expires_at: Option<DateTime<Utc>>) -> bool {
    match expires_at {
        Some(expires_at) => expires_at - Duration::seconds(EXPIRY_MARGIN_SECS) > Utc::now(),
        None => true,
    }
}

/// 令牌端点的响应
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    #[serde(default = "default_expires_in")]
    pub expires_in: i64,
}

fn default_expires_in() -> i64 {
    3600
}

impl TokenResponse {
    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc::now() + Duration::seconds(self.expires_in)
    }
}

/// 以表单方式请求令牌端点。
pub(crate) async fn request_token(
    http: &reqwest::Client,
    token_uri: &str,
    form: &[(&str, &str)],
) -> Result<TokenResponse, AuthError> {
    let response = http.post(token_uri).form(form).send().await?;

    let status = response.status();
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(AuthError::TokenEndpoint {
            status: status.as_u16(),
            message,
        });
    }

    response
        .json::<TokenResponse>()
        .await
        .map_err(|e| AuthError::Invalid(format!("unexpected token response: {e}")))
}
