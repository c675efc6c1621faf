use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use crate::config::ScraperConfig;
use crate::error::ScraperError;
use crate::record::{Acquisition, Extracted};

/// 操作対象のブラウザセッション
///
/// 取得処理はこのトレイト越しにページを操作し、DOMはHTML文字列として受け取る。
#[async_trait]
pub trait BrowserSession: Send + Sync {
    /// ページ遷移（ページロードのタイムアウト付き）
    async fn goto(&mut self, url: &str) -> Result<(), ScraperError>;

    /// セレクタに一致する要素が現れるまで待機
    async fn wait_for(&self, selector: &str, timeout: Duration) -> Result<(), ScraperError>;

    /// 現在のページのHTML
    async fn content(&self) -> Result<String, ScraperError>;

    /// 現在のURL
    async fn current_url(&self) -> Result<String, ScraperError>;

    /// 表示中のボタンのうち、文言が一致する最初のものをクリック
    async fn click_button_with_text(&self, phrases: &[&str]) -> Result<bool, ScraperError>;

    /// 入力欄に文字列を入力してEnter
    async fn submit_text(&self, selector: &str, text: &str) -> Result<(), ScraperError>;

    /// PNGスクリーンショット
    async fn screenshot(&self) -> Result<Vec<u8>, ScraperError>;

    /// リソース解放
    async fn close(&mut self) -> Result<(), ScraperError>;
}

/// セッション起動
#[async_trait]
pub trait SessionLauncher: Send + Sync {
    async fn launch(&self, config: &ScraperConfig) -> Result<Box<dyn BrowserSession>, ScraperError>;
}

/// 取得方式（直接テーブル / 検索経由）
#[async_trait]
pub trait AcquisitionStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// 取得後に (タイトル, 年) で重複除去するか
    fn deduplicates(&self) -> bool;

    async fn acquire(&self, session: &mut dyn BrowserSession) -> Result<Acquisition, ScraperError>;
}

/// 既知サイトの一覧ページ抽出
pub trait SiteExtractor: Send + Sync {
    fn name(&self) -> &'static str;

    fn matches(&self, url: &Url) -> bool;

    fn extract(&self, html: &str, page_url: &str, limit: usize) -> Vec<Extracted>;
}
