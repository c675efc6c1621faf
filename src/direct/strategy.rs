use std::time::Duration;

use async_trait::async_trait;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::browser::log_screenshot;
use crate::config::ScraperConfig;
use crate::error::ScraperError;
use crate::record::{scraped_at_now, Acquisition, Extracted};
use crate::traits::{AcquisitionStrategy, BrowserSession};

use super::table::parse_rows;

/// コンテンツ出現待ちの上限（秒）
pub const CONTENT_WAIT_SECS: u64 = 15;

/// 固定URLの結果テーブルを読む取得方式
pub struct DirectTableScraper {
    url: String,
    config: ScraperConfig,
}

impl DirectTableScraper {
    pub fn new(url: impl Into<String>, config: ScraperConfig) -> Self {
        Self {
            url: url.into(),
            config,
        }
    }
}

#[async_trait]
impl AcquisitionStrategy for DirectTableScraper {
    fn name(&self) -> &'static str {
        "direct_table"
    }

    /// 単一ページで順位が一意なので重複除去しない
    fn deduplicates(&self) -> bool {
        false
    }

    async fn acquire(&self, session: &mut dyn BrowserSession) -> Result<Acquisition, ScraperError> {
        info!("Loading {}...", self.url);
        session.goto(&self.url).await?;

        info!("Waiting for content...");
        if let Err(e) = session
            .wait_for(
                &self.config.content_selector,
                Duration::from_secs(CONTENT_WAIT_SECS),
            )
            .await
        {
            if self.config.debug {
                log_screenshot(&*session, "content wait").await;
            }
            return Err(e);
        }

        // 描画が落ち着くまで待つ
        sleep(self.config.page_load_delay()).await;

        info!("Extracting movie data...");
        let html = session.content().await?;
        let page_url = session
            .current_url()
            .await
            .unwrap_or_else(|_| self.url.clone());

        let rows = parse_rows(
            &html,
            &self.config.movie_selector,
            &page_url,
            self.config.max_rows,
            &scraped_at_now(),
        )?;
        info!("Found {} entries", rows.len());

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            match row {
                Extracted::Record(record) => {
                    info!(
                        "  {}: {} ({}) - {}/10",
                        record.origin,
                        record.title,
                        record.year,
                        record.score
                    );
                    records.push(record);
                }
                Extracted::Skipped { position, reason } => {
                    warn!("Skipped row {}: {}", position, reason);
                }
            }
        }

        Ok(Acquisition::Records(records))
    }
}
