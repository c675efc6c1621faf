//! 直接テーブル取得の動作確認
//!
//! 実行方法:
//! ```
//! MOVIE_URL=https://example.com/top-movies cargo run --example scrape_once
//! ```

use movie_scraper::{run_once, ScrapeRequest, ScraperConfig, ScraperService};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // ログ設定
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
        )
        .init();

    let url = std::env::var("MOVIE_URL").expect("MOVIE_URL not set");
    let selector = std::env::var("MOVIE_SELECTOR").unwrap_or_else(|_| "tbody tr".to_string());

    let config = ScraperConfig::default()
        .with_base_url(&url)
        .with_movie_selector(selector)
        .with_output_dir("./demo-data")
        .with_headless(false); // デバッグ用に表示モード

    println!("=== Direct Table Scrape ===");
    println!("URL: {}", url);

    let mut service = ScraperService::new();
    let summary = run_once(&mut service, ScrapeRequest::inline(config)).await?;

    println!("Movies: {}", summary.count);
    println!("Status: {}", summary.status);
    for file in &summary.files {
        println!("  {}", file.display());
    }

    Ok(())
}
