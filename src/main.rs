use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::EnvFilter;

use movie_scraper::{run_continuous, run_once, ScrapeRequest, ScraperService};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum RunMode {
    /// 1回だけ実行して終了
    Once,
}

/// 映画メタデータ収集ツール
#[derive(Debug, Parser)]
#[command(name = "movie-scraper", version, about)]
struct Cli {
    /// 省略時は Ctrl-C まで定期実行
    #[arg(value_enum)]
    mode: Option<RunMode>,

    /// 設定ファイル
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // ログ設定
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut service = ScraperService::new();
    let request = ScrapeRequest::from_file(&cli.config);

    match cli.mode {
        Some(RunMode::Once) => {
            let summary = run_once(&mut service, request).await?;
            println!("Movies: {} | Status: {}", summary.count, summary.status);
            for file in &summary.files {
                println!("  → {}", file.display());
            }
        }
        None => {
            info!("Continuous mode, press Ctrl-C to stop");

            let (stop_tx, stop_rx) = watch::channel(false);
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("Ctrl-C received, stopping after the current step");
                    let _ = stop_tx.send(true);
                }
            });

            let runs = run_continuous(&mut service, request, stop_rx).await;
            println!("\nStopped by user after {} runs", runs);
        }
    }

    Ok(())
}
