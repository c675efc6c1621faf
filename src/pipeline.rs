//! 1回分の実行
//!
//! 起動 → 取得 → 終了 → 正規化 → 保存 → ログ追記。
//! ブラウザはどの経路でも必ず閉じ、実行レベルのエラーはログに記録して件数0で返す。

use tracing::{error, info, warn};

use crate::config::{AcquisitionMode, ScraperConfig};
use crate::direct::DirectTableScraper;
use crate::error::ScraperError;
use crate::normalize::normalize;
use crate::persist::{append_log, save_batch, SaveOutcome};
use crate::record::{Acquisition, MovieRecord, RunStatus, RunSummary};
use crate::search::SearchThenScrape;
use crate::traits::{AcquisitionStrategy, SessionLauncher};

/// 設定に応じた取得方式
pub fn strategy_for(config: &ScraperConfig) -> Result<Box<dyn AcquisitionStrategy>, ScraperError> {
    Ok(match config.mode()? {
        AcquisitionMode::DirectTable { url } => Box::new(DirectTableScraper::new(url, config.clone())),
        AcquisitionMode::Search { keyword } => {
            Box::new(SearchThenScrape::new(keyword, config.clone()))
        }
    })
}

pub struct Pipeline<L> {
    launcher: L,
}

impl<L: SessionLauncher> Pipeline<L> {
    pub fn new(launcher: L) -> Self {
        Self { launcher }
    }

    /// 1回実行してログに1行追記する
    ///
    /// エラーになるのはログ自体が書けなかった場合のみ。
    pub async fn run(&self, config: &ScraperConfig) -> Result<RunSummary, ScraperError> {
        let summary = match self.collect(config).await {
            Ok(Acquisition::NoCandidates) => RunSummary {
                count: 0,
                status: RunStatus::NoUrls,
                files: Vec::new(),
            },
            Ok(Acquisition::Records(records)) => persist(records, config),
            Err(e) => {
                error!("Scraping failed: {}", e);
                RunSummary::failed(e.to_string())
            }
        };

        append_log(&config.output_dir, summary.count, &summary.status)?;
        Ok(summary)
    }

    async fn collect(&self, config: &ScraperConfig) -> Result<Acquisition, ScraperError> {
        let strategy = strategy_for(config)?;
        info!("Acquisition strategy: {}", strategy.name());

        let mut session = self.launcher.launch(config).await?;
        let result = strategy.acquire(session.as_mut()).await;

        if let Err(e) = session.close().await {
            warn!("Failed to close browser: {}", e);
        }

        Ok(match result? {
            Acquisition::Records(records) => {
                let raw = records.len();
                let records = normalize(records, strategy.deduplicates());
                if records.len() != raw {
                    info!("Normalized {} raw items into {} records", raw, records.len());
                }
                Acquisition::Records(records)
            }
            other => other,
        })
    }
}

fn persist(records: Vec<MovieRecord>, config: &ScraperConfig) -> RunSummary {
    if records.is_empty() {
        warn!("Nothing scraped");
        return RunSummary {
            count: 0,
            status: RunStatus::NoData,
            files: Vec::new(),
        };
    }

    let outcome = save_batch(&records, config);
    summarize(records.len(), outcome)
}

/// 保存結果から実行結果を作る
///
/// 書き込みに失敗した実行はエラー扱いなので件数は0として記録する。
fn summarize(count: usize, outcome: SaveOutcome) -> RunSummary {
    if outcome.errors.is_empty() {
        info!("Done! Scraped {} movies", count);
        return RunSummary {
            count,
            status: RunStatus::Success,
            files: outcome.files,
        };
    }

    warn!(
        "Scraped {} movies but saving failed ({} files written)",
        count,
        outcome.files.len()
    );
    RunSummary {
        count: 0,
        status: RunStatus::Error(outcome.errors.join("; ")),
        files: outcome.files,
    }
}
