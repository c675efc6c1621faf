//! 検索結果ページから訪問先URLを取り出す
//!
//! 3つの抽出方法を優先順に試し、集まった件数が足りないときだけ次へ進む。

use std::collections::HashSet;
use std::sync::LazyLock;

use scraper::{Html, Selector};
use tracing::debug;
use url::Url;

/// これ未満なら次の抽出方法も試す
pub const MIN_CANDIDATES: usize = 3;

/// (名前, セレクタ) を優先順に
static STRATEGIES: LazyLock<Vec<(&'static str, Selector)>> = LazyLock::new(|| {
    [
        ("result containers", "div.g a[href]"),
        ("result attributes", "a[href][data-ved], a[href][jsname]"),
        ("all links", "a[href]"),
    ]
    .into_iter()
    .map(|(name, css)| (name, Selector::parse(css).expect("static selector")))
    .collect()
});

/// 検索エンジン自身のドメインとブロック対象ドメインを除外する
#[derive(Debug, Clone)]
pub struct UrlFilter {
    engine_domain: String,
    blocked: Vec<String>,
}

impl UrlFilter {
    pub fn new(search_url: &Url, blocked: &[String]) -> Self {
        let host = search_url.host_str().unwrap_or_default().to_lowercase();
        let engine_domain = host.strip_prefix("www.").unwrap_or(&host).to_string();
        Self {
            engine_domain,
            blocked: blocked
                .iter()
                .map(|d| d.trim().to_lowercase())
                .filter(|d| !d.is_empty())
                .collect(),
        }
    }

    /// 訪問対象として受け入れるURL（フラグメント除去済み）
    pub fn accept(&self, href: &str, base: &Url) -> Option<String> {
        let mut url = unwrap_redirect(base.join(href.trim()).ok()?);

        if !matches!(url.scheme(), "http" | "https") {
            return None;
        }

        let host = url.host_str()?.to_lowercase();
        if !self.engine_domain.is_empty() && host.contains(&self.engine_domain) {
            return None;
        }
        if self.blocked.iter().any(|d| host.contains(d.as_str())) {
            return None;
        }

        url.set_fragment(None);
        Some(url.to_string())
    }
}

/// "/url?q=<target>" 形式のリダイレクトを展開
fn unwrap_redirect(url: Url) -> Url {
    if url.path() != "/url" {
        return url;
    }
    let target = url
        .query_pairs()
        .find(|(k, _)| k == "q" || k == "url")
        .and_then(|(_, v)| Url::parse(&v).ok());
    target.unwrap_or(url)
}

/// 検索結果HTMLから候補URLを最大 `max` 件取り出す
pub fn extract_candidates(html: &str, page_url: &Url, filter: &UrlFilter, max: usize) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut seen = HashSet::new();
    let mut found = Vec::new();

    for (name, selector) in STRATEGIES.iter() {
        if found.len() >= MIN_CANDIDATES {
            break;
        }

        let before = found.len();
        for link in document.select(selector) {
            let Some(href) = link.value().attr("href") else {
                continue;
            };
            if let Some(url) = filter.accept(href, page_url) {
                if seen.insert(url.clone()) {
                    found.push(url);
                }
            }
        }
        debug!("Strategy '{}' added {} URLs", name, found.len() - before);
    }

    found.truncate(max);
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    fn google() -> Url {
        Url::parse("https://www.google.com/search?q=best+movies").unwrap()
    }

    fn filter() -> UrlFilter {
        UrlFilter::new(&google(), &["youtube.com".to_string()])
    }

    #[test]
    fn test_filter_excludes_engine_and_blocked_domains() {
        let f = filter();
        let base = google();
        assert_eq!(f.accept("https://maps.google.com/x", &base), None);
        assert_eq!(f.accept("/preferences", &base), None);
        assert_eq!(f.accept("https://www.youtube.com/watch?v=1", &base), None);
        assert_eq!(f.accept("javascript:void(0)", &base), None);
        assert_eq!(f.accept("mailto:a@b.c", &base), None);
        assert_eq!(
            f.accept("https://www.imdb.com/list/ls1/#top", &base).as_deref(),
            Some("https://www.imdb.com/list/ls1/")
        );
    }

    #[test]
    fn test_filter_unwraps_redirects() {
        let f = filter();
        assert_eq!(
            f.accept("/url?q=https://www.imdb.com/chart/top/&sa=U", &google())
                .as_deref(),
            Some("https://www.imdb.com/chart/top/")
        );
    }

    #[test]
    fn test_primary_strategy_is_enough() {
        let html = r#"
            <div class="g"><a href="https://a.example/1">A</a></div>
            <div class="g"><a href="https://b.example/2#frag">B</a></div>
            <div class="g"><a href="https://c.example/3">C</a></div>
            <a href="https://d.example/4">D</a>
        "#;
        let urls = extract_candidates(html, &google(), &filter(), 10);
        assert_eq!(
            urls,
            [
                "https://a.example/1",
                "https://b.example/2",
                "https://c.example/3"
            ]
        );
    }

    #[test]
    fn test_falls_back_when_too_few() {
        let html = r#"
            <div class="g"><a href="https://a.example/1">A</a></div>
            <a data-ved="x" href="https://a.example/1">A again</a>
            <a data-ved="y" href="https://b.example/2">B</a>
            <a href="https://www.google.com/settings">settings</a>
            <a href="https://c.example/3">C</a>
            <a href="https://d.example/4">D</a>
        "#;
        let urls = extract_candidates(html, &google(), &filter(), 10);
        assert_eq!(
            urls,
            [
                "https://a.example/1",
                "https://b.example/2",
                "https://c.example/3",
                "https://d.example/4"
            ]
        );
    }

    #[test]
    fn test_cap_and_empty() {
        let html = r#"
            <a href="https://a.example/1">A</a>
            <a href="https://b.example/2">B</a>
            <a href="https://c.example/3">C</a>
        "#;
        assert_eq!(extract_candidates(html, &google(), &filter(), 2).len(), 2);

        let html = r#"<a href="/search?q=more">More</a><a href="https://youtube.com/x">v</a>"#;
        assert!(extract_candidates(html, &google(), &filter(), 5).is_empty());
    }
}
