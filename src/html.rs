//! HTMLスナップショット用ヘルパー

use scraper::{ElementRef, Selector};
use url::Url;

use crate::error::ScraperError;
use crate::record::UNKNOWN;

/// 設定由来のセレクタ
pub fn selector(css: &str) -> Result<Selector, ScraperError> {
    Selector::parse(css)
        .map_err(|e| ScraperError::Config(format!("不正なセレクタ '{}': {}", css, e)))
}

/// 固定のセレクタ一覧
pub(crate) fn selectors(list: &[&str]) -> Vec<Selector> {
    list.iter()
        .map(|css| Selector::parse(css).expect("static selector"))
        .collect()
}

/// 空白を詰めたテキスト
pub fn text_of(element: &ElementRef) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// 最初に空でないテキストが取れたセレクタの結果
pub fn first_text(element: &ElementRef, candidates: &[Selector]) -> Option<String> {
    candidates.iter().find_map(|sel| {
        element
            .select(sel)
            .map(|e| text_of(&e))
            .find(|t| !t.is_empty())
    })
}

pub fn first_attr(element: &ElementRef, candidates: &[Selector], attr: &str) -> Option<String> {
    candidates.iter().find_map(|sel| {
        element
            .select(sel)
            .filter_map(|e| e.value().attr(attr))
            .map(str::trim)
            .find(|v| !v.is_empty())
            .map(str::to_string)
    })
}

/// 相対リンクを絶対URLへ（解決できなければそのまま）
pub fn absolute_url(base: &str, href: &str) -> String {
    Url::parse(base)
        .and_then(|b| b.join(href))
        .map(|u| u.to_string())
        .unwrap_or_else(|_| href.to_string())
}

pub fn or_unknown(value: Option<String>) -> String {
    value
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| UNKNOWN.to_string())
}
