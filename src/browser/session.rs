use std::path::PathBuf;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::error::CdpError;
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

use crate::config::ScraperConfig;
use crate::error::ScraperError;
use crate::traits::{BrowserSession, SessionLauncher};

/// ページロードのタイムアウト（秒）
pub const PAGE_LOAD_TIMEOUT_SECS: u64 = 30;
/// 要素待機のポーリング間隔（ミリ秒）
const WAIT_POLL_INTERVAL_MS: u64 = 250;

pub const WINDOW_SIZE: (u32, u32) = (1920, 1080);

/// 自動操作の検出を減らすためのフラグ
/// (--enable-automation を含む既定フラグは disable_default_args で外す)
const STEALTH_ARGS: &[&str] = &[
    "--disable-blink-features=AutomationControlled",
    "--disable-dev-shm-usage",
    "--disable-gpu",
    "--disable-extensions",
    "--disable-component-extensions-with-background-pages",
    "--disable-background-networking",
    "--disable-sync",
    "--disable-default-apps",
    "--disable-crash-reporter",
    "--disable-in-process-stack-traces",
    "--disable-breakpad",
    "--metrics-recording-only",
    "--no-first-run",
    "--no-default-browser-check",
    "--password-store=basic",
    "--use-mock-keychain",
];

/// ウィンドウと同じ大きさのビューポート（既定の800x600エミュレーションを使わない）
pub fn window_viewport() -> Viewport {
    Viewport {
        width: WINDOW_SIZE.0,
        height: WINDOW_SIZE.1,
        ..Default::default()
    }
}

/// Chromeに渡す追加引数
pub fn chrome_args(config: &ScraperConfig) -> Vec<String> {
    let mut args: Vec<String> = STEALTH_ARGS.iter().map(|a| a.to_string()).collect();
    args.push(format!("--user-agent={}", config.user_agent));
    if let Some(proxy) = config.proxy() {
        args.push(format!("--proxy-server={}", proxy));
    }
    args
}

fn chrome_path(config: &ScraperConfig) -> Option<PathBuf> {
    config
        .chrome_path
        .clone()
        .or_else(|| std::env::var("CHROME_PATH").ok().map(PathBuf::from))
        .or_else(|| std::env::var("CHROMIUM_PATH").ok().map(PathBuf::from))
}

/// 接続が切れた場合はセッション全体のエラー、それ以外は個別の操作エラー
fn classify(context: &str, err: CdpError) -> ScraperError {
    match err {
        CdpError::Ws(_) | CdpError::ChannelSendError(_) => {
            ScraperError::Session(format!("{}: {}", context, err))
        }
        other => ScraperError::Navigation(format!("{}: {}", context, other)),
    }
}

/// chromiumoxide によるセッション
pub struct ChromeSession {
    browser: Option<Browser>,
    page: Option<Page>,
    handler: Option<JoinHandle<()>>,
    user_data_dir: PathBuf,
}

impl ChromeSession {
    pub async fn launch(config: &ScraperConfig) -> Result<Self, ScraperError> {
        info!("Starting browser...");

        // ユニークなユーザーデータディレクトリを生成
        let unique_id = format!(
            "{}-{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos()
        );
        let user_data_dir = std::env::temp_dir().join(format!("movie-scraper-{}", unique_id));

        let mut builder = BrowserConfig::builder()
            .disable_default_args()
            .user_data_dir(&user_data_dir)
            .window_size(WINDOW_SIZE.0, WINDOW_SIZE.1)
            .viewport(window_viewport())
            .no_sandbox()
            .request_timeout(Duration::from_secs(PAGE_LOAD_TIMEOUT_SECS))
            .args(chrome_args(config));

        if !config.headless {
            builder = builder.with_head();
        }

        if let Some(path) = chrome_path(config) {
            debug!("Using Chrome executable {:?}", path);
            builder = builder.chrome_executable(path);
        }

        if let Some(proxy) = config.proxy() {
            info!("Routing browser traffic through proxy {}", proxy);
        }

        let browser_config = builder
            .build()
            .map_err(|e| ScraperError::BrowserInit(format!("ブラウザ設定エラー: {}", e)))?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| ScraperError::BrowserInit(e.to_string()))?;

        // ハンドラータスクを起動
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                debug!("Browser event: {:?}", event);
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                // 起動済みのプロセスは閉じてからエラーを返す
                let mut browser = browser;
                let _ = browser.close().await;
                let _ = browser.wait().await;
                handler.abort();
                return Err(ScraperError::BrowserInit(e.to_string()));
            }
        };

        info!("Browser initialized successfully");
        Ok(Self {
            browser: Some(browser),
            page: Some(page),
            handler: Some(handler),
            user_data_dir,
        })
    }

    fn page(&self) -> Result<&Page, ScraperError> {
        self.page
            .as_ref()
            .ok_or_else(|| ScraperError::Session("ブラウザが初期化されていません".into()))
    }
}

#[async_trait]
impl BrowserSession for ChromeSession {
    async fn goto(&mut self, url: &str) -> Result<(), ScraperError> {
        let page = self.page()?;
        debug!("Navigating to {}", url);

        match timeout(Duration::from_secs(PAGE_LOAD_TIMEOUT_SECS), page.goto(url)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(classify(url, e)),
            Err(_) => Err(ScraperError::Timeout(format!(
                "{} の読み込みが{}秒以内に完了しませんでした",
                url, PAGE_LOAD_TIMEOUT_SECS
            ))),
        }
    }

    async fn wait_for(&self, selector: &str, timeout: Duration) -> Result<(), ScraperError> {
        let page = self.page()?;
        let script = format!(
            "document.querySelector({}) !== null",
            serde_json::to_string(selector)?
        );
        let start = Instant::now();

        loop {
            match page.evaluate(script.as_str()).await {
                Ok(result) => {
                    if result.into_value::<bool>().unwrap_or(false) {
                        debug!("{} appeared after {:?}", selector, start.elapsed());
                        return Ok(());
                    }
                }
                Err(e @ (CdpError::Ws(_) | CdpError::ChannelSendError(_))) => {
                    return Err(classify(selector, e));
                }
                Err(e) => debug!("Selector check error: {}", e),
            }

            if start.elapsed() > timeout {
                return Err(ScraperError::Timeout(format!(
                    "{} が{}秒以内に見つかりませんでした",
                    selector,
                    timeout.as_secs()
                )));
            }

            sleep(Duration::from_millis(WAIT_POLL_INTERVAL_MS)).await;
        }
    }

    async fn content(&self) -> Result<String, ScraperError> {
        self.page()?
            .content()
            .await
            .map_err(|e| classify("page content", e))
    }

    async fn current_url(&self) -> Result<String, ScraperError> {
        self.page()?
            .url()
            .await
            .map_err(|e| classify("current url", e))?
            .ok_or_else(|| ScraperError::Navigation("URLが取得できません".into()))
    }

    async fn click_button_with_text(&self, phrases: &[&str]) -> Result<bool, ScraperError> {
        let page = self.page()?;
        let phrases: Vec<String> = phrases.iter().map(|p| p.to_lowercase()).collect();
        let script = format!(
            r#"
            ((phrases) => {{
                const buttons = document.querySelectorAll(
                    'button, [role="button"], input[type="submit"], input[type="button"]'
                );
                for (const el of buttons) {{
                    const rect = el.getBoundingClientRect();
                    if (rect.width === 0 && rect.height === 0) continue;
                    const text = (el.innerText || el.value || '').trim().toLowerCase();
                    if (phrases.some((p) => text === p || text.startsWith(p))) {{
                        el.click();
                        return true;
                    }}
                }}
                return false;
            }})({})
        "#,
            serde_json::to_string(&phrases)?
        );

        let clicked = page
            .evaluate(script.as_str())
            .await
            .map_err(|e| classify("button scan", e))?
            .into_value::<bool>()
            .unwrap_or(false);
        Ok(clicked)
    }

    async fn submit_text(&self, selector: &str, text: &str) -> Result<(), ScraperError> {
        let page = self.page()?;
        page.find_element(selector)
            .await
            .map_err(|e| ScraperError::ElementNotFound(format!("{}: {}", selector, e)))?
            .click()
            .await
            .map_err(|e| classify(selector, e))?
            .type_str(text)
            .await
            .map_err(|e| classify(selector, e))?
            .press_key("Enter")
            .await
            .map_err(|e| classify(selector, e))?;
        Ok(())
    }

    async fn screenshot(&self) -> Result<Vec<u8>, ScraperError> {
        self.page()?
            .screenshot(ScreenshotParams::builder().full_page(true).build())
            .await
            .map_err(|e| classify("screenshot", e))
    }

    async fn close(&mut self) -> Result<(), ScraperError> {
        info!("Closing browser...");

        if let Some(page) = self.page.take() {
            if let Err(e) = page.close().await {
                debug!("Failed to close page: {}", e);
            }
        }

        if let Some(mut browser) = self.browser.take() {
            if let Err(e) = browser.close().await {
                // 既に終了している
                debug!("Browser close failed: {}", e);
            }
            if let Err(e) = browser.wait().await {
                warn!("Failed to wait for browser process: {}", e);
            }
        }

        if let Some(handler) = self.handler.take() {
            handler.abort();
        }

        if let Err(e) = std::fs::remove_dir_all(&self.user_data_dir) {
            debug!("Failed to remove {:?}: {}", self.user_data_dir, e);
        }

        Ok(())
    }
}

impl Drop for ChromeSession {
    fn drop(&mut self) {
        // Browser 側の Drop が子プロセスを終了させる
        if let Some(handler) = self.handler.take() {
            handler.abort();
        }
    }
}

/// Chromeを起動するランチャー
#[derive(Debug, Clone, Copy, Default)]
pub struct ChromeLauncher;

#[async_trait]
impl SessionLauncher for ChromeLauncher {
    async fn launch(&self, config: &ScraperConfig) -> Result<Box<dyn BrowserSession>, ScraperError> {
        let session = ChromeSession::launch(config).await?;
        Ok(Box::new(session))
    }
}
