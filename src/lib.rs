//! 映画メタデータ収集ライブラリ
//!
//! - 固定URLの結果テーブルから順位付きの映画一覧を取得
//! - 検索エンジン経由で既知サイト（IMDb）の一覧を取得して重複除去
//! - 結果を JSON / CSV に保存し、実行ごとに `log.txt` へ1行記録
//!
//! # 使用例
//!
//! ```rust,ignore
//! use movie_scraper::{ScrapeRequest, ScraperConfig, ScraperService};
//! use tower::Service;
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut service = ScraperService::new();
//!
//!     let config = ScraperConfig::default()
//!         .with_base_url("https://example.com/top-movies")
//!         .with_headless(true);
//!
//!     let summary = service.call(ScrapeRequest::inline(config)).await.unwrap();
//!     println!("{} movies ({})", summary.count, summary.status);
//! }
//! ```

pub mod browser;
pub mod config;
pub mod direct;
pub mod error;
pub mod html;
pub mod normalize;
pub mod persist;
pub mod pipeline;
pub mod record;
pub mod runner;
pub mod search;
pub mod service;
pub mod traits;

#[cfg(test)]
mod testing;

// 主要な型をリエクスポート
pub use browser::{ChromeLauncher, ChromeSession};
pub use config::{AcquisitionMode, ScraperConfig};
pub use error::ScraperError;
pub use pipeline::Pipeline;
pub use record::{MovieRecord, Origin, RunStatus, RunSummary};
pub use runner::{run_continuous, run_once};
pub use service::{ConfigSource, ScrapeRequest, ScraperService};
pub use traits::{AcquisitionStrategy, BrowserSession, SessionLauncher, SiteExtractor};
