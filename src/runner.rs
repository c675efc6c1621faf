//! 単発実行と連続実行
//!
//! 連続モードでは停止フラグを実行の合間と待機中にだけ確認し、実行中の処理は最後まで終える。

use std::time::Duration;

use futures::future::poll_fn;
use tokio::sync::watch;
use tokio::time::sleep;
use tower::Service;
use tracing::{error, info, warn};

use crate::config::ScraperConfig;
use crate::error::ScraperError;
use crate::record::RunSummary;
use crate::service::ScrapeRequest;

/// 1回実行
pub async fn run_once<S>(service: &mut S, request: ScrapeRequest) -> Result<RunSummary, ScraperError>
where
    S: Service<ScrapeRequest, Response = RunSummary, Error = ScraperError>,
{
    poll_fn(|cx| service.poll_ready(cx)).await?;
    service.call(request).await
}

/// 停止要求まで実行を繰り返す
///
/// 戻り値は実行回数。実行の失敗ではループを止めない。
pub async fn run_continuous<S>(
    service: &mut S,
    request: ScrapeRequest,
    mut stop: watch::Receiver<bool>,
) -> usize
where
    S: Service<ScrapeRequest, Response = RunSummary, Error = ScraperError>,
{
    let mut runs = 0;

    loop {
        if *stop.borrow() {
            break;
        }

        runs += 1;
        info!("========== Run #{} ==========", runs);

        match run_once(service, request.clone()).await {
            Ok(summary) => info!(
                "Run #{} finished: {} movies, status {}",
                runs, summary.count, summary.status
            ),
            Err(e) => error!("Run #{} failed: {}", runs, e),
        }

        // 待機時間も実行ごとに設定から読む
        let interval = next_interval(&request);
        info!("Next run in {} seconds", interval.as_secs());

        tokio::select! {
            _ = sleep(interval) => {}
            _ = stop_requested(&mut stop) => break,
        }
    }

    info!("Stopped after {} runs", runs);
    runs
}

fn next_interval(request: &ScrapeRequest) -> Duration {
    match request.resolve() {
        Ok(config) => config.run_interval(),
        Err(e) => {
            warn!("Using default run interval: {}", e);
            ScraperConfig::default().run_interval()
        }
    }
}

/// 停止フラグが立つまで待つ（送信側が無くなったら永久に待つ）
async fn stop_requested(stop: &mut watch::Receiver<bool>) {
    if stop.wait_for(|stopped| *stopped).await.is_err() {
        std::future::pending::<()>().await;
    }
}
