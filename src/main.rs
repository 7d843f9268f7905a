use drive_pictures_to_s3::config::Config;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::LocalTime;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // 加载 .env 文件
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("drive_pictures_to_s3=info")),
        )
        .with_timer(LocalTime::rfc_3339())
        .init();

    info!("Application starting...");

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Application error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    // 单个文件失败不影响退出码，只有致命错误才返回非零
    let code = match drive_pictures_to_s3::run(&config).await {
        Ok(report) => {
            info!(
                "Application finished: {}/{} files transferred",
                report.succeeded(),
                report.total()
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Error in file transfer process: {}", e);
            ExitCode::FAILURE
        }
    };

    info!("Application ended.");
    code
}
