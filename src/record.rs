//! 映画レコードと実行結果の型定義

use std::fmt;
use std::path::PathBuf;

use chrono::Local;
use serde::{Deserialize, Serialize};

/// 欠損値
pub const UNKNOWN: &str = "N/A";

/// レコードの出所（直接テーブルなら順位、検索モードなら取得元URL）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    Rank(u32),
    Source(String),
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Rank(rank) => write!(f, "#{}", rank),
            Origin::Source(url) => write!(f, "{}", url),
        }
    }
}

/// 取得時刻（ISO-8601, ローカル時刻）
pub fn scraped_at_now() -> String {
    Local::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
}

/// 映画レコード
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovieRecord {
    #[serde(flatten)]
    pub origin: Origin,
    pub title: String,
    pub year: String,
    pub score: String,
    pub votes: String,
    pub detail_url: String,
    pub scraped_at: String,
}

impl MovieRecord {
    /// 重複判定キー（小文字化したタイトル, 年）
    pub fn dedup_key(&self) -> (String, String) {
        (self.title.to_lowercase(), self.year.clone())
    }

    /// CSV 出力用のフィールド名と値
    pub fn fields(&self) -> Vec<(&'static str, String)> {
        let origin = match &self.origin {
            Origin::Rank(rank) => ("rank", rank.to_string()),
            Origin::Source(url) => ("source", url.clone()),
        };
        vec![
            origin,
            ("title", self.title.clone()),
            ("year", self.year.clone()),
            ("score", self.score.clone()),
            ("votes", self.votes.clone()),
            ("detail_url", self.detail_url.clone()),
            ("scraped_at", self.scraped_at.clone()),
        ]
    }
}

/// 行・アイテム単位の抽出結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extracted {
    Record(MovieRecord),
    Skipped { position: usize, reason: String },
}

impl Extracted {
    pub fn skipped(position: usize, reason: impl Into<String>) -> Self {
        Extracted::Skipped {
            position,
            reason: reason.into(),
        }
    }

    pub fn into_record(self) -> Option<MovieRecord> {
        match self {
            Extracted::Record(record) => Some(record),
            Extracted::Skipped { .. } => None,
        }
    }
}

/// 取得方式が返す生データ
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Acquisition {
    Records(Vec<MovieRecord>),
    /// 検索結果から訪問先URLが1件も得られなかった
    NoCandidates,
}

/// ログに書く実行ステータス
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    Success,
    NoData,
    NoUrls,
    Error(String),
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Success => write!(f, "SUCCESS"),
            RunStatus::NoData => write!(f, "NO DATA"),
            RunStatus::NoUrls => write!(f, "NO URLS"),
            RunStatus::Error(message) => write!(f, "ERROR: {}", message),
        }
    }
}

/// 1回の実行結果
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub count: usize,
    pub status: RunStatus,
    pub files: Vec<PathBuf>,
}

impl RunSummary {
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            count: 0,
            status: RunStatus::Error(message.into()),
            files: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(origin: Origin) -> MovieRecord {
        MovieRecord {
            origin,
            title: "Heat".into(),
            year: "1995".into(),
            score: "8.3".into(),
            votes: "700,000".into(),
            detail_url: "http://x/title/1".into(),
            scraped_at: "2024-01-01T00:00:00+00:00".into(),
        }
    }

    #[test]
    fn test_origin_is_flattened_into_record() {
        let json = serde_json::to_value(record(Origin::Rank(3))).unwrap();
        assert_eq!(json["rank"], 3);
        assert_eq!(json["title"], "Heat");
        assert!(json.get("origin").is_none());

        let json = serde_json::to_value(record(Origin::Source("http://s".into()))).unwrap();
        assert_eq!(json["source"], "http://s");
    }

    #[test]
    fn test_field_order_starts_with_origin() {
        let keys: Vec<_> = record(Origin::Rank(1))
            .fields()
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        assert_eq!(
            keys,
            ["rank", "title", "year", "score", "votes", "detail_url", "scraped_at"]
        );
    }

    #[test]
    fn test_status_tokens() {
        assert_eq!(RunStatus::Success.to_string(), "SUCCESS");
        assert_eq!(RunStatus::NoData.to_string(), "NO DATA");
        assert_eq!(RunStatus::NoUrls.to_string(), "NO URLS");
        assert_eq!(
            RunStatus::Error("boom".into()).to_string(),
            "ERROR: boom"
        );
    }

    #[test]
    fn test_dedup_key_lowercases_title() {
        let mut r = record(Origin::Rank(1));
        r.title = "HeAt".into();
        assert_eq!(r.dedup_key(), ("heat".to_string(), "1995".to_string()));
    }
}
