//! OAuth 授权用户凭据
//!
//! 从本地令牌缓存读取访问令牌，过期时用刷新令牌换取新令牌并写回缓存。
//! 首次授权（浏览器同意流程）不在本工具范围内，缓存必须事先存在。

use super::{GOOGLE_TOKEN_URI, TokenProvider, is_fresh, request_token};
use crate::error::AuthError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{info, warn};

/// 令牌缓存文件格式（授权用户 JSON）
///
/// 未识别的字段原样保留，写回时不会丢失。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenCache {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scopes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// OAuth 客户端信息
#[derive(Debug, Clone, Deserialize)]
pub struct OAuthClient {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default)]
    pub token_uri: Option<String>,
}

/// 客户端密钥文件，桌面应用为 `installed`，Web 应用为 `web`
#[derive(Debug, Deserialize)]
struct ClientSecretsFile {
    installed: Option<OAuthClient>,
    web: Option<OAuthClient>,
}

/// 读取 OAuth 客户端密钥文件。
pub fn read_client_secrets(path: &Path) -> Result<OAuthClient, AuthError> {
    let json = std::fs::read_to_string(path).map_err(|e| AuthError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    let file: ClientSecretsFile = serde_json::from_str(&json)
        .map_err(|e| AuthError::Invalid(format!("OAuth client secrets: {e}")))?;

    file.installed.or(file.web).ok_or_else(|| {
        AuthError::Invalid("OAuth client secrets contain neither `installed` nor `web`".to_string())
    })
}

/// 授权用户令牌提供者
pub struct AuthorizedUserTokenProvider {
    client: OAuthClient,
    cache_path: PathBuf,
    http: reqwest::Client,
    state: Mutex<Option<TokenCache>>,
}

impl AuthorizedUserTokenProvider {
    /// 创建提供者。
    ///
    /// # 参数
    ///
    /// * `client_secrets` - OAuth 客户端密钥文件路径。
    /// * `cache_path` - 令牌缓存文件路径，首次取令牌时才读取。
    /// * `http` - 用于刷新令牌的 HTTP 客户端。
    pub fn new(
        client_secrets: &Path,
        cache_path: PathBuf,
        http: reqwest::Client,
    ) -> Result<Self, AuthError> {
        let client = read_client_secrets(client_secrets)?;
        Ok(Self::with_client(client, cache_path, http))
    }

    pub fn with_client(client: OAuthClient, cache_path: PathBuf, http: reqwest::Client) -> Self {
        Self {
            client,
            cache_path,
            http,
            state: Mutex::new(None),
        }
    }

    async fn load_cache(&self) -> Result<TokenCache, AuthError> {
        let path = self.cache_path.display().to_string();
        let json = match tokio::fs::read_to_string(&self.cache_path).await {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(AuthError::MissingTokenCache(path));
            }
            Err(e) => {
                return Err(AuthError::Io {
                    path,
                    message: e.to_string(),
                });
            }
        };

        info!(path = %path, "Credentials found, loading from token cache");
        serde_json::from_str(&json).map_err(|e| AuthError::Invalid(format!("token cache {path}: {e}")))
    }

    async fn store_cache(&self, cache: &TokenCache) -> Result<(), AuthError> {
        let json = serde_json::to_string_pretty(cache)
            .map_err(|e| AuthError::Invalid(format!("token cache: {e}")))?;
        tokio::fs::write(&self.cache_path, json)
            .await
            .map_err(|e| AuthError::Io {
                path: self.cache_path.display().to_string(),
                message: e.to_string(),
            })
    }

    async fn refresh(&self, cache: &mut TokenCache) -> Result<(), AuthError> {
        let refresh_token = cache.refresh_token.clone().ok_or_else(|| {
            AuthError::Invalid("access token expired and no refresh token is cached".to_string())
        })?;
        let token_uri = cache
            .token_uri
            .clone()
            .or_else(|| self.client.token_uri.clone())
            .unwrap_or_else(|| GOOGLE_TOKEN_URI.to_string());
        let client_id = cache.client_id.clone().unwrap_or_else(|| self.client.client_id.clone());
        let client_secret = cache
            .client_secret
            .clone()
            .unwrap_or_else(|| self.client.client_secret.clone());

        info!("Credentials expired, refreshing");
        let response = request_token(
            &self.http,
            &token_uri,
            &[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token.as_str()),
                ("client_id", client_id.as_str()),
                ("client_secret", client_secret.as_str()),
            ],
        )
        .await?;

        cache.expiry = Some(response.expires_at());
        cache.token = Some(response.access_token);

        // 写回失败不影响本次运行
        if let Err(e) = self.store_cache(cache).await {
            warn!(error = %e, "Failed to write refreshed token cache");
        } else {
            info!("Credentials refreshed");
        }
        Ok(())
    }
}

#[async_trait]
impl TokenProvider for AuthorizedUserTokenProvider {
    async fn access_token(&self) -> Result<String, AuthError> {
        let mut state = self.state.lock().await;
        let loaded = match state.take() {
            Some(cache) => cache,
            None => self.load_cache().await?,
        };
        let cache = state.insert(loaded);

        match &cache.token {
            Some(token) if is_fresh(cache.expiry) => return Ok(token.clone()),
            _ => {}
        }

        self.refresh(cache).await?;
        cache
            .token
            .clone()
            .ok_or_else(|| AuthError::Invalid("token endpoint returned no access token".to_string()))
    }
}
