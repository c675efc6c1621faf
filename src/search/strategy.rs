use std::time::Duration;

use async_trait::async_trait;
use tokio::time::sleep;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::ScraperConfig;
use crate::error::ScraperError;
use crate::record::{Acquisition, Extracted, MovieRecord};
use crate::traits::{AcquisitionStrategy, BrowserSession, SiteExtractor};

use super::candidates::{extract_candidates, UrlFilter};
use super::sites::default_extractors;

/// 検索送信後の待機（秒）
pub const SEARCH_SETTLE_SECS: u64 = 3;
/// サイト遷移後の待機（秒）
pub const SITE_SETTLE_SECS: u64 = 3;

/// 検索キーワードの入力欄（優先順）
const QUERY_FIELDS: [&str; 2] = ["textarea[name='q']", "input[name='q']"];

/// Cookie同意ダイアログの承諾ボタン文言
const CONSENT_PHRASES: &[&str] = &[
    "accept all",
    "i agree",
    "agree",
    "accept",
    "alle akzeptieren",
    "tout accepter",
    "aceptar todo",
    "accetta tutto",
    "すべて同意",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SearchState {
    Searching,
    SiteVisit(usize),
    Done,
}

/// 検索エンジンで候補サイトを探し、既知サイトの一覧を読む取得方式
pub struct SearchThenScrape {
    keyword: String,
    config: ScraperConfig,
    extractors: Vec<Box<dyn SiteExtractor>>,
}

impl SearchThenScrape {
    pub fn new(keyword: impl Into<String>, config: ScraperConfig) -> Self {
        Self {
            keyword: keyword.into(),
            config,
            extractors: default_extractors(),
        }
    }

    pub fn with_extractors(mut self, extractors: Vec<Box<dyn SiteExtractor>>) -> Self {
        self.extractors = extractors;
        self
    }

    /// 検索を実行して候補URLを返す
    async fn search(&self, session: &mut dyn BrowserSession) -> Result<Vec<String>, ScraperError> {
        let search_url = Url::parse(&self.config.search_url).map_err(|e| {
            ScraperError::Config(format!("search_url '{}': {}", self.config.search_url, e))
        })?;

        info!("Searching for '{}'...", self.keyword);
        session.goto(search_url.as_str()).await?;

        // 同意ダイアログ（失敗しても続行）
        match session.click_button_with_text(CONSENT_PHRASES).await {
            Ok(true) => {
                debug!("Dismissed consent dialog");
                sleep(Duration::from_secs(1)).await;
            }
            Ok(false) => debug!("No consent dialog found"),
            Err(e) if e.is_session_lost() => return Err(e),
            Err(e) => debug!("Consent dialog handling failed: {}", e),
        }

        let mut submitted = false;
        for field in QUERY_FIELDS {
            match session.submit_text(field, &self.keyword).await {
                Ok(()) => {
                    debug!("Submitted query via {}", field);
                    submitted = true;
                    break;
                }
                Err(e) if e.is_session_lost() => return Err(e),
                Err(e) => debug!("Query field {} unavailable: {}", field, e),
            }
        }
        if !submitted {
            return Err(ScraperError::Search("検索欄が見つかりません".into()));
        }

        sleep(Duration::from_secs(SEARCH_SETTLE_SECS)).await;

        let html = session.content().await?;
        let page_url = session
            .current_url()
            .await
            .ok()
            .and_then(|u| Url::parse(&u).ok())
            .unwrap_or_else(|| search_url.clone());

        let filter = UrlFilter::new(&search_url, &self.config.blocked_domains);
        let candidates =
            extract_candidates(&html, &page_url, &filter, self.config.max_google_results);

        info!("Found {} candidate URLs", candidates.len());
        for url in &candidates {
            debug!("  candidate: {}", url);
        }
        Ok(candidates)
    }

    /// 1サイト分の抽出（未知のサイトは何もしない）
    async fn visit_site(
        &self,
        session: &mut dyn BrowserSession,
        url: &str,
    ) -> Result<Vec<MovieRecord>, ScraperError> {
        session.goto(url).await?;
        sleep(Duration::from_secs(SITE_SETTLE_SECS)).await;

        let parsed = Url::parse(url).map_err(|e| ScraperError::Navigation(format!("{}: {}", url, e)))?;
        let Some(extractor) = self.extractors.iter().find(|x| x.matches(&parsed)) else {
            info!("Skipping unrecognized site {}", url);
            return Ok(Vec::new());
        };

        let html = session.content().await?;
        let mut records = Vec::new();
        for item in extractor.extract(&html, url, self.config.max_movies_per_site) {
            match item {
                Extracted::Record(record) => records.push(record),
                Extracted::Skipped { position, reason } => {
                    debug!("Skipped item {} on {}: {}", position, url, reason);
                }
            }
        }

        info!(
            "Extracted {} movies from {} ({})",
            records.len(),
            url,
            extractor.name()
        );
        Ok(records)
    }
}

#[async_trait]
impl AcquisitionStrategy for SearchThenScrape {
    fn name(&self) -> &'static str {
        "search_then_scrape"
    }

    /// 複数サイトから集めるので重複除去する
    fn deduplicates(&self) -> bool {
        true
    }

    async fn acquire(&self, session: &mut dyn BrowserSession) -> Result<Acquisition, ScraperError> {
        let mut state = SearchState::Searching;
        let mut candidates = Vec::new();
        let mut items = Vec::new();

        loop {
            state = match state {
                SearchState::Searching => {
                    candidates = self.search(session).await?;
                    if candidates.is_empty() {
                        warn!("No candidate URLs found");
                        return Ok(Acquisition::NoCandidates);
                    }
                    SearchState::SiteVisit(0)
                }
                SearchState::SiteVisit(i) if i < candidates.len() => {
                    let url = &candidates[i];
                    info!("[{}/{}] Visiting {}", i + 1, candidates.len(), url);

                    match self.visit_site(session, url).await {
                        Ok(records) => items.extend(records),
                        Err(e) if e.is_session_lost() => return Err(e),
                        Err(e) => warn!("Site {} failed: {}", url, e),
                    }

                    // 結果に関わらずサイト間の待機を入れる
                    sleep(self.config.delay_between_sites()).await;
                    SearchState::SiteVisit(i + 1)
                }
                SearchState::SiteVisit(_) => SearchState::Done,
                SearchState::Done => break,
            };
        }

        info!(
            "Collected {} items from {} sites",
            items.len(),
            candidates.len()
        );
        Ok(Acquisition::Records(items))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Origin, UNKNOWN};
    use crate::testing::FakeSession;
    use tokio::time::Instant;

    const SEARCH_URL: &str = "https://www.google.com/";

    /// blog.example の記事から1件だけ返す
    struct BlogPicks;

    impl SiteExtractor for BlogPicks {
        fn name(&self) -> &'static str {
            "blog"
        }

        fn matches(&self, url: &Url) -> bool {
            url.host_str() == Some("blog.example")
        }

        fn extract(&self, _html: &str, page_url: &str, _limit: usize) -> Vec<Extracted> {
            vec![Extracted::Record(MovieRecord {
                origin: Origin::Source(page_url.to_string()),
                title: "Heat".into(),
                year: "1995".into(),
                score: UNKNOWN.into(),
                votes: UNKNOWN.into(),
                detail_url: page_url.to_string(),
                scraped_at: "2024-05-01T12:00:00.000000".into(),
            })]
        }
    }

    fn session() -> FakeSession {
        FakeSession::new()
            .with_page(SEARCH_URL, r#"<input name="q">"#)
            .with_search_results(
                r#"
                <div class="g"><a href="https://down.example/list">Down</a></div>
                <div class="g"><a href="https://blog.example/picks">Blog</a></div>
                <div class="g"><a href="https://other.example/top">Other</a></div>
                "#,
            )
            .with_page("https://blog.example/picks", "<p>Heat (1995)</p>")
            .with_page("https://other.example/top", "<p>nothing</p>")
            .failing_at("https://down.example/list")
    }

    fn config() -> ScraperConfig {
        ScraperConfig::default()
            .with_search_keyword("best heist movies")
            .with_delays(0.0, 10.0)
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_extractors_are_used() {
        let strategy = SearchThenScrape::new("best heist movies", config())
            .with_extractors(vec![Box::new(BlogPicks)]);
        let mut session = session();

        let Acquisition::Records(records) = strategy.acquire(&mut session).await.unwrap() else {
            panic!("expected records");
        };

        assert_eq!(records.len(), 1);
        assert_eq!(
            records[0].origin,
            Origin::Source("https://blog.example/picks".into())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_follows_every_visit() {
        let strategy = SearchThenScrape::new("best heist movies", config())
            .with_extractors(vec![Box::new(BlogPicks)]);
        let mut session = session();
        let start = Instant::now();

        strategy.acquire(&mut session).await.unwrap();

        // 検索 3s + 失敗 10s + 抽出 (3s + 10s) + 未知サイト (3s + 10s)
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(39), "{:?}", elapsed);
        assert!(elapsed < Duration::from_secs(40), "{:?}", elapsed);
        assert_eq!(session.visits().len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_loss_stops_site_visits() {
        let strategy = SearchThenScrape::new("best heist movies", config());
        let mut session = session().losing_session_at("https://blog.example/picks");

        let result = strategy.acquire(&mut session).await;

        assert!(matches!(result, Err(ScraperError::Session(_))));
        assert_eq!(
            session.visits(),
            [
                SEARCH_URL,
                "https://down.example/list",
                "https://blog.example/picks",
            ]
        );
    }
}
