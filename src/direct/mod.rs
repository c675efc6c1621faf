//! 直接テーブル取得
//!
//! 設定されたURLを開き、結果テーブルの各行から映画レコードを作る。

mod strategy;
mod table;

pub use strategy::{DirectTableScraper, CONTENT_WAIT_SECS};
pub use table::{parse_rows, MIN_CELLS};
