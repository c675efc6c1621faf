//! 検索経由の取得
//!
//! 検索エンジンにキーワードを送り、結果から候補サイトを選んで順に訪問する。
//! 既知サイト（`SiteExtractor`）に一致したページだけから一覧を抽出する。

mod candidates;
mod sites;
mod strategy;

pub use candidates::{extract_candidates, UrlFilter, MIN_CANDIDATES};
pub use sites::{default_extractors, ImdbList};
pub use strategy::{SearchThenScrape, SEARCH_SETTLE_SECS, SITE_SETTLE_SECS};
