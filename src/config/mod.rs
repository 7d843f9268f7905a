//! 传输工具的配置模块。
//!
//! 该模块负责从环境变量加载配置。配置在启动时构建一次，
//! 之后以引用形式传给各个组件。

use crate::error::TransferError;
use crate::transfer::naming::NamingMode;
use aws_config::BehaviorVersion;
use aws_config::Region;
use aws_config::meta::region::RegionProviderChain;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::Credentials;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// 默认的最大并发下载数
pub const DEFAULT_MAX_CONCURRENT_DOWNLOADS: usize = 1;

/// 默认的最大并发上传数
pub const DEFAULT_MAX_CONCURRENT_UPLOADS: usize = 5;

/// 默认的下载尝试总次数
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// 默认的重试间隔（秒）
pub const DEFAULT_RETRY_DELAY_SECS: u64 = 2;

/// 默认的上传尝试总次数（不重试）
pub const DEFAULT_UPLOAD_MAX_ATTEMPTS: u32 = 1;

/// Google Drive 凭据来源，三种模式只能启用一种
#[derive(Debug, Clone, PartialEq)]
pub enum CredentialSource {
    /// 服务账号密钥文件路径
    ServiceAccountFile(PathBuf),
    /// 内联的服务账号密钥 JSON
    ServiceAccountJson(String),
    /// OAuth 客户端文件 + 令牌缓存路径
    OAuth {
        client_secrets: PathBuf,
        token_cache: PathBuf,
    },
}

/// S3 目标配置
#[derive(Debug, Clone, PartialEq)]
pub struct S3Settings {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub region: String,
    pub bucket: String,
    pub prefix: String,
    /// S3 兼容服务的端点，设置后使用路径风格寻址
    pub endpoint: Option<String>,
}

/// 并发与重试限制
#[derive(Debug, Clone, PartialEq)]
pub struct TransferLimits {
    pub max_concurrent_downloads: usize,
    pub max_concurrent_uploads: usize,
    pub fetch_attempts: u32,
    pub retry_delay: Duration,
    pub upload_attempts: u32,
}

impl Default for TransferLimits {
    fn default() -> Self {
        Self {
            max_concurrent_downloads: DEFAULT_MAX_CONCURRENT_DOWNLOADS,
            max_concurrent_uploads: DEFAULT_MAX_CONCURRENT_UPLOADS,
            fetch_attempts: DEFAULT_MAX_RETRIES,
            retry_delay: Duration::from_secs(DEFAULT_RETRY_DELAY_SECS),
            upload_attempts: DEFAULT_UPLOAD_MAX_ATTEMPTS,
        }
    }
}

/// 完整的运行配置
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub folder_id: String,
    pub credentials: CredentialSource,
    pub s3: S3Settings,
    pub naming: NamingMode,
    pub limits: TransferLimits,
}

impl Config {
    /// 从进程环境变量加载配置。
    ///
    /// # 返回值
    ///
    /// 配置值，缺少必需变量或取值非法时返回 `TransferError::Config`。
    pub fn from_env() -> Result<Self, TransferError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// 使用任意查找函数加载配置。
    ///
    /// # 参数
    ///
    /// * `lookup` - 根据变量名返回取值的函数，空字符串视为未设置。
    pub fn from_lookup<F>(lookup: F) -> Result<Self, TransferError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let required = |key: &str| {
            get(key).ok_or_else(|| TransferError::Config(format!("{key} must be set")))
        };

        let folder_id = required("GOOGLE_DRIVE_FOLDER_ID")?;
        let credentials = credential_source(&get)?;

        let s3 = S3Settings {
            access_key_id: required("AWS_ACCESS_KEY_ID")?,
            secret_access_key: required("AWS_SECRET_ACCESS_KEY")?,
            region: required("AWS_REGION")?,
            bucket: required("S3_BUCKET_NAME")?,
            prefix: get("S3_PREFIX").unwrap_or_default(),
            endpoint: get("AWS_ENDPOINT_URL"),
        };

        let retain = match get("RETAIN_FILENAMES") {
            Some(value) => parse_bool("RETAIN_FILENAMES", &value)?,
            None => true,
        };
        let naming = if retain {
            NamingMode::Retain
        } else {
            NamingMode::Sequential
        };

        let defaults = TransferLimits::default();
        let limits = TransferLimits {
            max_concurrent_downloads: parse_positive(
                "MAX_CONCURRENT_DOWNLOADS",
                get("MAX_CONCURRENT_DOWNLOADS"),
                defaults.max_concurrent_downloads,
            )?,
            max_concurrent_uploads: parse_positive(
                "MAX_CONCURRENT_UPLOADS",
                get("MAX_CONCURRENT_UPLOADS"),
                defaults.max_concurrent_uploads,
            )?,
            fetch_attempts: parse_positive("MAX_RETRIES", get("MAX_RETRIES"), defaults.fetch_attempts)?,
            retry_delay: match get("RETRY_DELAY_SECS") {
                Some(value) => Duration::from_secs(value.trim().parse().map_err(|_| {
                    TransferError::Config(format!("RETRY_DELAY_SECS is not a number: {value}"))
                })?),
                None => defaults.retry_delay,
            },
            upload_attempts: parse_positive(
                "UPLOAD_MAX_ATTEMPTS",
                get("UPLOAD_MAX_ATTEMPTS"),
                defaults.upload_attempts,
            )?,
        };

        Ok(Self {
            folder_id,
            credentials,
            s3,
            naming,
            limits,
        })
    }
}

/// 确定唯一启用的凭据模式。
fn credential_source<G>(get: &G) -> Result<CredentialSource, TransferError>
where
    G: Fn(&str) -> Option<String>,
{
    let mut modes = Vec::new();

    if let Some(path) = get("GOOGLE_APPLICATION_CREDENTIALS") {
        modes.push(CredentialSource::ServiceAccountFile(PathBuf::from(path)));
    }
    if let Some(json) = get("GOOGLE_APPLICATION_CREDENTIALS_JSON") {
        modes.push(CredentialSource::ServiceAccountJson(json));
    }
    match (
        get("GOOGLE_OAUTH_CREDENTIALS"),
        get("GOOGLE_TOKEN_CREDENTIALS_LOCATION"),
    ) {
        (Some(client_secrets), Some(token_cache)) => modes.push(CredentialSource::OAuth {
            client_secrets: PathBuf::from(client_secrets),
            token_cache: PathBuf::from(token_cache),
        }),
        (None, None) => {}
        _ => {
            return Err(TransferError::Config(
                "GOOGLE_OAUTH_CREDENTIALS and GOOGLE_TOKEN_CREDENTIALS_LOCATION must be set together"
                    .to_string(),
            ));
        }
    }

    match modes.len() {
        1 => Ok(modes.remove(0)),
        0 => Err(TransferError::Config(
            "one of GOOGLE_APPLICATION_CREDENTIALS, GOOGLE_APPLICATION_CREDENTIALS_JSON or GOOGLE_OAUTH_CREDENTIALS must be set".to_string(),
        )),
        _ => Err(TransferError::Config(
            "only one Google credential mode may be configured".to_string(),
        )),
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, TransferError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        other => Err(TransferError::Config(format!(
            "{key} must be a boolean, got {other:?}"
        ))),
    }
}

fn parse_positive<T>(key: &str, value: Option<String>, default: T) -> Result<T, TransferError>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    let Some(value) = value else {
        return Ok(default);
    };
    match value.trim().parse::<T>() {
        Ok(parsed) if parsed > T::default() => Ok(parsed),
        _ => Err(TransferError::Config(format!(
            "{key} must be a positive integer, got {value:?}"
        ))),
    }
}

/// 使用配置创建 S3 客户端。
///
/// # 参数
///
/// * `settings` - S3 目标配置。
///
/// # 返回值
///
/// 配置好的 `aws_sdk_s3::Client`。
pub async fn create_s3_client(settings: &S3Settings) -> Client {
    let credentials = Credentials::new(
        settings.access_key_id.clone(),
        settings.secret_access_key.clone(),
        None,
        None,
        "environment-credentials",
    );

    let region_provider = RegionProviderChain::first_try(Some(Region::new(settings.region.clone())));

    let mut config_builder = aws_config::defaults(BehaviorVersion::latest())
        .credentials_provider(credentials)
        .region(region_provider);

    if let Some(endpoint) = &settings.endpoint {
        config_builder = config_builder.endpoint_url(endpoint);
    }

    let aws_config = config_builder.load().await;
    let s3_config = aws_sdk_s3::config::Builder::from(&aws_config)
        .force_path_style(settings.endpoint.is_some())
        .build();
    Client::from_conf(s3_config)
}
