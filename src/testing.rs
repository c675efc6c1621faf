//! テスト用のブラウザ代替
//!
//! 事前登録したHTMLを返すだけのセッション。訪問履歴と終了状態を共有するので、
//! ランチャーに渡した後もテスト側から確認できる。

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use scraper::{Html, Selector};

use crate::config::ScraperConfig;
use crate::error::ScraperError;
use crate::traits::{BrowserSession, SessionLauncher};

#[derive(Default)]
struct FakeState {
    pages: HashMap<String, String>,
    search_results: Option<String>,
    failing: HashSet<String>,
    lost_at: HashSet<String>,
    current_url: String,
    current_html: String,
    visits: Vec<String>,
    closed: bool,
}

#[derive(Clone, Default)]
pub struct FakeSession {
    state: Arc<Mutex<FakeState>>,
}

impl FakeSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(self, url: &str, html: &str) -> Self {
        self.lock().pages.insert(url.to_string(), html.to_string());
        self
    }

    /// 検索欄への入力後に表示するページ
    pub fn with_search_results(self, html: &str) -> Self {
        self.lock().search_results = Some(html.to_string());
        self
    }

    /// 遷移するとナビゲーションエラーになるURL
    pub fn failing_at(self, url: &str) -> Self {
        self.lock().failing.insert(url.to_string());
        self
    }

    /// 遷移するとブラウザとの接続が切れるURL
    pub fn losing_session_at(self, url: &str) -> Self {
        self.lock().lost_at.insert(url.to_string());
        self
    }

    pub fn visits(&self) -> Vec<String> {
        self.lock().visits.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }
}

fn has_match(html: &str, css: &str) -> Result<bool, ScraperError> {
    let selector =
        Selector::parse(css).map_err(|e| ScraperError::Config(format!("{}: {:?}", css, e)))?;
    Ok(Html::parse_document(html).select(&selector).next().is_some())
}

#[async_trait]
impl BrowserSession for FakeSession {
    async fn goto(&mut self, url: &str) -> Result<(), ScraperError> {
        let mut state = self.lock();
        state.visits.push(url.to_string());
        if state.lost_at.contains(url) {
            return Err(ScraperError::Session(format!("{}: websocket closed", url)));
        }
        if state.failing.contains(url) {
            return Err(ScraperError::Navigation(format!("{}: connection refused", url)));
        }
        state.current_url = url.to_string();
        state.current_html = state.pages.get(url).cloned().unwrap_or_default();
        Ok(())
    }

    async fn wait_for(&self, selector: &str, _timeout: Duration) -> Result<(), ScraperError> {
        let html = self.lock().current_html.clone();
        if has_match(&html, selector)? {
            Ok(())
        } else {
            Err(ScraperError::Timeout(selector.to_string()))
        }
    }

    async fn content(&self) -> Result<String, ScraperError> {
        Ok(self.lock().current_html.clone())
    }

    async fn current_url(&self) -> Result<String, ScraperError> {
        Ok(self.lock().current_url.clone())
    }

    async fn click_button_with_text(&self, _phrases: &[&str]) -> Result<bool, ScraperError> {
        Ok(false)
    }

    async fn submit_text(&self, selector: &str, text: &str) -> Result<(), ScraperError> {
        let mut state = self.lock();
        if !has_match(&state.current_html, selector)? {
            return Err(ScraperError::ElementNotFound(selector.to_string()));
        }
        state.current_url = format!(
            "{}/search?q={}",
            state.current_url.trim_end_matches('/'),
            text.replace(' ', "+")
        );
        state.current_html = state.search_results.clone().unwrap_or_default();
        Ok(())
    }

    async fn screenshot(&self) -> Result<Vec<u8>, ScraperError> {
        Ok(Vec::new())
    }

    async fn close(&mut self) -> Result<(), ScraperError> {
        self.lock().closed = true;
        Ok(())
    }
}

/// `FakeSession` を返すランチャー
#[derive(Clone)]
pub struct FakeLauncher {
    session: FakeSession,
    failure: Option<String>,
    launches: Arc<AtomicUsize>,
}

impl FakeLauncher {
    pub fn new(session: FakeSession) -> Self {
        Self {
            session,
            failure: None,
            launches: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// 起動に必ず失敗する
    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Self::new(FakeSession::new())
        }
    }

    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionLauncher for FakeLauncher {
    async fn launch(&self, _config: &ScraperConfig) -> Result<Box<dyn BrowserSession>, ScraperError> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        match &self.failure {
            Some(message) => Err(ScraperError::BrowserInit(message.clone())),
            None => Ok(Box::new(self.session.clone())),
        }
    }
}
