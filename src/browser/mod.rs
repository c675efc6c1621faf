//! ブラウザセッション
//!
//! Chromeを自動操作検出を抑えた設定で起動し、`BrowserSession` として提供する。

mod session;

use base64::Engine;
use tracing::debug;

use crate::traits::BrowserSession;

pub use session::{chrome_args, ChromeLauncher, ChromeSession, PAGE_LOAD_TIMEOUT_SECS};

/// デバッグ用に現在のページのスクリーンショットをログへ出力
pub async fn log_screenshot(session: &dyn BrowserSession, label: &str) {
    match session.screenshot().await {
        Ok(png) => {
            let encoded = base64::engine::general_purpose::STANDARD.encode(&png);
            debug!("{} screenshot: data:image/png;base64,{}", label, encoded);
        }
        Err(e) => debug!("Failed to capture {} screenshot: {}", label, e),
    }
}
