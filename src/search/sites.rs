//! 既知サイトの一覧ページ抽出
//!
//! 現在は IMDb のリスト / チャート / タイトル検索ページのみ。
//! それ以外のサイトは訪問しても抽出しない。

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::html::{absolute_url, first_attr, first_text, or_unknown, selectors, text_of};
use crate::normalize::{extract_year, is_valid_title};
use crate::record::{scraped_at_now, Extracted, MovieRecord, Origin, UNKNOWN};
use crate::traits::SiteExtractor;

static LIST_NUMBERING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\d+\.\s*").expect("valid regex"));

/// フィールドごとのセレクタ（先頭が現行レイアウト、後ろが旧レイアウト）
struct ImdbSelectors {
    containers: Vec<Selector>,
    title: Vec<Selector>,
    link: Vec<Selector>,
    year: Vec<Selector>,
    rating: Vec<Selector>,
    votes: Vec<Selector>,
}

static IMDB: LazyLock<ImdbSelectors> = LazyLock::new(|| ImdbSelectors {
    containers: selectors(&["li.ipc-metadata-list-summary-item", "div.lister-item"]),
    title: selectors(&[
        "h3.ipc-title__text",
        ".lister-item-header a",
        "a[href*='/title/']",
    ]),
    link: selectors(&[
        "a.ipc-title-link-wrapper",
        ".lister-item-header a",
        "a[href*='/title/']",
    ]),
    year: selectors(&[
        ".cli-title-metadata-item",
        ".dli-title-metadata-item",
        ".lister-item-year",
    ]),
    rating: selectors(&[
        ".ipc-rating-star--rating",
        ".ratings-imdb-rating strong",
        ".ipc-rating-star",
    ]),
    votes: selectors(&[".ipc-rating-star--voteCount", "span[name='nv']"]),
});

/// IMDb の一覧ページ
#[derive(Debug, Clone, Copy, Default)]
pub struct ImdbList;

impl ImdbList {
    fn item(&self, item: &ElementRef, page_url: &str, position: usize, scraped_at: &str) -> Extracted {
        let Some(raw_title) = first_text(item, &IMDB.title) else {
            return Extracted::skipped(position, "no title");
        };
        let title = LIST_NUMBERING.replace(&raw_title, "").trim().to_string();
        if !is_valid_title(&title) {
            return Extracted::skipped(position, format!("invalid title '{}'", title));
        }

        let detail_url = first_attr(item, &IMDB.link, "href")
            .map(|href| absolute_url(page_url, &href))
            .unwrap_or_else(|| UNKNOWN.to_string());

        // 年はメタデータ項目のうち年らしいものを採用
        let year = IMDB
            .year
            .iter()
            .flat_map(|sel| item.select(sel))
            .map(|e| extract_year(&text_of(&e)))
            .find(|y| y != UNKNOWN)
            .unwrap_or_else(|| UNKNOWN.to_string());

        let score = or_unknown(first_text(item, &IMDB.rating).map(|r| leading_token(&r)));
        let votes = or_unknown(first_text(item, &IMDB.votes).map(|v| strip_parens(&v)));

        Extracted::Record(MovieRecord {
            origin: Origin::Source(page_url.to_string()),
            title,
            year,
            score,
            votes,
            detail_url,
            scraped_at: scraped_at.to_string(),
        })
    }
}

impl SiteExtractor for ImdbList {
    fn name(&self) -> &'static str {
        "imdb"
    }

    fn matches(&self, url: &Url) -> bool {
        let host = url.host_str().unwrap_or_default();
        if host != "imdb.com" && !host.ends_with(".imdb.com") {
            return false;
        }
        let path = url.path();
        path.starts_with("/list/") || path.starts_with("/chart/") || path.starts_with("/search/title")
    }

    fn extract(&self, html: &str, page_url: &str, limit: usize) -> Vec<Extracted> {
        let document = Html::parse_document(html);
        let scraped_at = scraped_at_now();

        // 現行レイアウトで見つからなければ旧レイアウト
        let Some(items) = IMDB
            .containers
            .iter()
            .map(|sel| document.select(sel).collect::<Vec<_>>())
            .find(|items| !items.is_empty())
        else {
            return Vec::new();
        };

        let mut out = Vec::new();
        let mut records = 0;
        for (i, item) in items.iter().enumerate() {
            if records >= limit {
                break;
            }
            let extracted = self.item(item, page_url, i + 1, &scraped_at);
            if matches!(extracted, Extracted::Record(_)) {
                records += 1;
            }
            out.push(extracted);
        }
        out
    }
}

/// "8.3 (1.2M)" → "8.3"
fn leading_token(text: &str) -> String {
    text.split_whitespace().next().unwrap_or_default().to_string()
}

/// "(2.9M)" → "2.9M"
fn strip_parens(text: &str) -> String {
    text.trim()
        .trim_start_matches('(')
        .trim_end_matches(')')
        .trim()
        .to_string()
}

/// 登録済みのサイト抽出器
pub fn default_extractors() -> Vec<Box<dyn SiteExtractor>> {
    vec![Box::new(ImdbList)]
}
