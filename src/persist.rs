//! JSON / CSV の保存と実行ログ

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tracing::{error, info};

use crate::config::ScraperConfig;
use crate::error::ScraperError;
use crate::record::{MovieRecord, RunStatus};

pub const LOG_FILE: &str = "log.txt";

/// 保存結果（形式ごとに独立）
#[derive(Debug, Default)]
pub struct SaveOutcome {
    pub files: Vec<PathBuf>,
    pub errors: Vec<String>,
}

pub fn file_stamp(now: &DateTime<Local>) -> String {
    now.format("%Y%m%d_%H%M%S").to_string()
}

pub fn save_json(records: &[MovieRecord], path: &Path) -> Result<(), ScraperError> {
    let json = serde_json::to_string_pretty(records)?;
    std::fs::write(path, json)?;
    Ok(())
}

/// ヘッダは先頭レコードのフィールド名
pub fn save_csv(records: &[MovieRecord], path: &Path) -> Result<(), ScraperError> {
    let Some(first) = records.first() else {
        return Ok(());
    };

    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(first.fields().iter().map(|(key, _)| *key))?;
    for record in records {
        writer.write_record(record.fields().iter().map(|(_, value)| value.as_str()))?;
    }
    writer.flush()?;
    Ok(())
}

pub fn load_json(path: &Path) -> Result<Vec<MovieRecord>, ScraperError> {
    let text = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

/// バッチを設定された形式で保存する
///
/// 空のバッチはファイルを作らない。片方の形式が失敗してももう片方は書く。
pub fn save_batch(records: &[MovieRecord], config: &ScraperConfig) -> SaveOutcome {
    save_batch_stamped(records, config, &file_stamp(&Local::now()))
}

fn save_batch_stamped(records: &[MovieRecord], config: &ScraperConfig, stamp: &str) -> SaveOutcome {
    let mut outcome = SaveOutcome::default();
    if records.is_empty() {
        return outcome;
    }

    let dir = &config.output_dir;
    if let Err(e) = std::fs::create_dir_all(dir) {
        error!("Failed to create {:?}: {}", dir, e);
        outcome.errors.push(format!("{}: {}", dir.display(), e));
        return outcome;
    }

    let targets: [(bool, &str, fn(&[MovieRecord], &Path) -> Result<(), ScraperError>); 2] = [
        (config.save_json, "json", save_json),
        (config.save_csv, "csv", save_csv),
    ];

    for (enabled, ext, write) in targets {
        if !enabled {
            continue;
        }
        let path = dir.join(format!("movies_{}.{}", stamp, ext));
        match write(records, &path) {
            Ok(()) => {
                info!("  → {}", path.display());
                outcome.files.push(path);
            }
            Err(e) => {
                error!("Failed to write {}: {}", path.display(), e);
                outcome.errors.push(format!("{}: {}", path.display(), e));
            }
        }
    }

    outcome
}

pub fn log_line(now: &DateTime<Local>, count: usize, status: &RunStatus) -> String {
    // 1実行1行
    let status = status.to_string().replace(['\r', '\n'], " ");
    format!(
        "{} | Movies: {} | Status: {}",
        now.format("%Y-%m-%d %H:%M:%S"),
        count,
        status
    )
}

/// 実行ログに1行追記
pub fn append_log(dir: &Path, count: usize, status: &RunStatus) -> Result<PathBuf, ScraperError> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(LOG_FILE);
    let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
    writeln!(file, "{}", log_line(&Local::now(), count, status))?;
    Ok(path)
}
