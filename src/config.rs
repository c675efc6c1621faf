use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::ScraperError;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// 実行設定（config.json）
///
/// 1回の実行中は変更しない。連続モードでは実行ごとに読み直す。
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    pub headless: bool,
    pub use_proxy: bool,
    pub proxy_url: Option<String>,
    /// 直接テーブル取得モードの対象URL
    pub base_url: Option<String>,
    /// 検索モードのキーワード（base_urlより優先）
    pub search_keyword: Option<String>,
    pub movie_selector: String,
    /// 行を読む前に出現を待つ要素
    pub content_selector: String,
    pub search_url: String,
    pub blocked_domains: Vec<String>,
    /// 秒
    pub page_load_delay: f64,
    /// 秒
    pub delay_between_sites: f64,
    pub max_movies_per_site: usize,
    pub max_google_results: usize,
    pub max_rows: Option<usize>,
    pub run_interval_seconds: u64,
    pub save_json: bool,
    pub save_csv: bool,
    pub output_dir: PathBuf,
    pub user_agent: String,
    pub chrome_path: Option<PathBuf>,
    pub debug: bool,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            headless: false,
            use_proxy: false,
            proxy_url: None,
            base_url: None,
            search_keyword: None,
            movie_selector: "tbody tr".to_string(),
            content_selector: "tbody".to_string(),
            search_url: "https://www.google.com".to_string(),
            blocked_domains: vec!["youtube.com".to_string()],
            page_load_delay: 3.0,
            delay_between_sites: 2.0,
            max_movies_per_site: 50,
            max_google_results: 5,
            max_rows: None,
            run_interval_seconds: 3600,
            save_json: true,
            save_csv: true,
            output_dir: PathBuf::from("data"),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            chrome_path: None,
            debug: false,
        }
    }
}

/// 取得方式
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcquisitionMode {
    DirectTable { url: String },
    Search { keyword: String },
}

impl ScraperConfig {
    /// JSON設定ファイルを読み込む
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ScraperError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            ScraperError::Config(format!("{} を読み込めません: {}", path.display(), e))
        })?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, ScraperError> {
        let config: Self =
            serde_json::from_str(text).map_err(|e| ScraperError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// 待機時間として表せない値を弾く
    pub fn validate(&self) -> Result<(), ScraperError> {
        for (key, value) in [
            ("page_load_delay", self.page_load_delay),
            ("delay_between_sites", self.delay_between_sites),
        ] {
            if value > 0.0 && Duration::try_from_secs_f64(value).is_err() {
                return Err(ScraperError::Config(format!(
                    "{} が大きすぎます: {}",
                    key, value
                )));
            }
        }
        Ok(())
    }

    pub fn mode(&self) -> Result<AcquisitionMode, ScraperError> {
        let non_empty = |v: &Option<String>| {
            v.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        if let Some(keyword) = non_empty(&self.search_keyword) {
            return Ok(AcquisitionMode::Search { keyword });
        }
        if let Some(url) = non_empty(&self.base_url) {
            return Ok(AcquisitionMode::DirectTable { url });
        }
        Err(ScraperError::Config(
            "base_url か search_keyword のどちらかが必要です".into(),
        ))
    }

    /// use_proxy が有効で URL が設定されている場合のみ
    pub fn proxy(&self) -> Option<&str> {
        if !self.use_proxy {
            return None;
        }
        self.proxy_url.as_deref().filter(|p| !p.trim().is_empty())
    }

    pub fn page_load_delay(&self) -> Duration {
        secs(self.page_load_delay)
    }

    pub fn delay_between_sites(&self) -> Duration {
        secs(self.delay_between_sites)
    }

    pub fn run_interval(&self) -> Duration {
        Duration::from_secs(self.run_interval_seconds)
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn with_search_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.search_keyword = Some(keyword.into());
        self
    }

    pub fn with_movie_selector(mut self, selector: impl Into<String>) -> Self {
        self.movie_selector = selector.into();
        self
    }

    pub fn with_output_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_dir = path.into();
        self
    }

    pub fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    pub fn with_proxy(mut self, proxy_url: impl Into<String>) -> Self {
        self.use_proxy = true;
        self.proxy_url = Some(proxy_url.into());
        self
    }

    pub fn with_delays(mut self, page_load: f64, between_sites: f64) -> Self {
        self.page_load_delay = page_load;
        self.delay_between_sites = between_sites;
        self
    }
}

// 負数やNaNはゼロ、表せない大きさは上限
fn secs(value: f64) -> Duration {
    match Duration::try_from_secs_f64(value) {
        Ok(duration) => duration,
        Err(_) if value > 0.0 => Duration::MAX,
        Err(_) => Duration::ZERO,
    }
}
