//! 結果テーブルの行解析

use std::sync::LazyLock;

use scraper::{Html, Selector};
use tracing::debug;

use crate::error::ScraperError;
use crate::html::{absolute_url, or_unknown, selector, text_of};
use crate::normalize::year_in_parens;
use crate::record::{Extracted, MovieRecord, Origin};

/// 1行に必要なセル数（順位, タイトル, 評価, 投票数）
pub const MIN_CELLS: usize = 4;

static CELL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td").expect("static selector"));
static LINK: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a").expect("static selector"));

/// 行セレクタに一致する行を順に解析する
///
/// 順位は一致した全行の中での位置（1始まり）で、スキップした行も番号を消費する。
pub fn parse_rows(
    html: &str,
    row_selector: &str,
    page_url: &str,
    max_rows: Option<usize>,
    scraped_at: &str,
) -> Result<Vec<Extracted>, ScraperError> {
    let rows = selector(row_selector)?;
    let document = Html::parse_document(html);

    let outcomes = document
        .select(&rows)
        .take(max_rows.unwrap_or(usize::MAX))
        .enumerate()
        .map(|(i, row)| {
            let position = i + 1;
            let cells: Vec<_> = row.select(&CELL).collect();

            if cells.len() < MIN_CELLS {
                return Extracted::skipped(
                    position,
                    format!("only {} cells (need {})", cells.len(), MIN_CELLS),
                );
            }

            // タイトルとリンクは2列目の<a>
            let Some(link) = cells[1].select(&LINK).next() else {
                return Extracted::skipped(position, "no link in title cell");
            };
            let title = text_of(&link);
            let detail_url = link
                .value()
                .attr("href")
                .map(|href| absolute_url(page_url, href.trim()))
                .unwrap_or_default();

            // 年は "Title (2000)" の括弧内
            let year = year_in_parens(&text_of(&cells[1]));

            let score = or_unknown(cells.get(2).map(text_of));
            let votes = or_unknown(cells.get(3).map(text_of));

            debug!("Row {}: {} ({})", position, title, year);
            Extracted::Record(MovieRecord {
                origin: Origin::Rank(position as u32),
                title,
                year,
                score,
                votes,
                detail_url,
                scraped_at: scraped_at.to_string(),
            })
        })
        .collect();

    Ok(outcomes)
}
