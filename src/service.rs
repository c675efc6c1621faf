use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tower::Service;
use tracing::{error, info};

use crate::browser::ChromeLauncher;
use crate::config::ScraperConfig;
use crate::error::ScraperError;
use crate::persist::append_log;
use crate::pipeline::Pipeline;
use crate::record::{RunStatus, RunSummary};
use crate::traits::SessionLauncher;

/// 設定の取得元
#[derive(Debug, Clone)]
pub enum ConfigSource {
    /// 実行のたびに読み直す
    File(PathBuf),
    Inline(Box<ScraperConfig>),
}

/// スクレイピングリクエスト
#[derive(Debug, Clone)]
pub struct ScrapeRequest {
    pub config: ConfigSource,
    /// 設定の output_dir を上書き
    pub output_dir: Option<PathBuf>,
}

impl ScrapeRequest {
    pub fn from_file(path: impl Into<PathBuf>) -> Self {
        Self {
            config: ConfigSource::File(path.into()),
            output_dir: None,
        }
    }

    pub fn inline(config: ScraperConfig) -> Self {
        Self {
            config: ConfigSource::Inline(Box::new(config)),
            output_dir: None,
        }
    }

    pub fn with_output_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(path.into());
        self
    }

    /// 今回の実行に使う設定
    pub fn resolve(&self) -> Result<ScraperConfig, ScraperError> {
        let config = match &self.config {
            ConfigSource::File(path) => ScraperConfig::load(path)?,
            ConfigSource::Inline(config) => config.as_ref().clone(),
        };
        config.validate()?;
        Ok(match &self.output_dir {
            Some(dir) => config.with_output_dir(dir),
            None => config,
        })
    }

    /// 設定が読めないときの出力先
    fn fallback_output_dir(&self) -> PathBuf {
        self.output_dir
            .clone()
            .unwrap_or_else(|| ScraperConfig::default().output_dir)
    }
}

/// tower::Serviceを実装したスクレイパーサービス
///
/// 1回の呼び出しが1回の実行に対応し、結果は必ず実行ログに残る。
pub struct ScraperService<L = ChromeLauncher> {
    pipeline: Arc<Pipeline<L>>,
}

impl<L> Clone for ScraperService<L> {
    fn clone(&self) -> Self {
        Self {
            pipeline: Arc::clone(&self.pipeline),
        }
    }
}

impl ScraperService {
    pub fn new() -> Self {
        Self::with_launcher(ChromeLauncher)
    }
}

impl Default for ScraperService {
    fn default() -> Self {
        Self::new()
    }
}

impl<L: SessionLauncher> ScraperService<L> {
    pub fn with_launcher(launcher: L) -> Self {
        Self {
            pipeline: Arc::new(Pipeline::new(launcher)),
        }
    }
}

impl<L: SessionLauncher + 'static> Service<ScrapeRequest> for ScraperService<L> {
    type Response = RunSummary;
    type Error = ScraperError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: ScrapeRequest) -> Self::Future {
        let pipeline = Arc::clone(&self.pipeline);

        Box::pin(async move {
            let config = match req.resolve() {
                Ok(config) => config,
                Err(e) => {
                    // 設定が読めなくても実行ログには残す
                    error!("Failed to load config: {}", e);
                    let summary = RunSummary::failed(e.to_string());
                    append_log(&req.fallback_output_dir(), summary.count, &summary.status)?;
                    return Ok(summary);
                }
            };

            let summary = pipeline.run(&config).await?;
            if summary.status != RunStatus::Success {
                info!("Run finished with status {}", summary.status);
            }
            Ok(summary)
        })
    }
}
