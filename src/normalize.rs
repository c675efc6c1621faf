//! レコード正規化
//!
//! 年の抽出、タイトルの妥当性判定、(タイトル, 年) による重複除去。
//! どれもページ取得から独立した純粋関数。

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::record::{MovieRecord, UNKNOWN};

static YEAR_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b((?:19|20)\d{2})\b").expect("valid regex"));

static YEAR_IN_PARENS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\((\d{4})\)").expect("valid regex"));

/// ナビゲーション項目の単語（小文字、完全一致のみ）
///
/// "Home Alone" や "Next Friday" のように映画タイトルの先頭にも来るので前方一致には使わない。
const NAV_WORDS: &[&str] = &[
    "imdb",
    "menu",
    "home",
    "watchlist",
    "movies",
    "browse",
    "search",
    "more",
    "trailer",
    "help",
    "next",
    "previous",
];

/// 定型のナビゲーション文言（小文字、完全一致または後ろに空白が続く前方一致）
const NAV_PHRASES: &[&str] = &[
    "sign in",
    "sign up",
    "log in",
    "tv shows",
    "top 250",
    "top rated movies",
    "most popular movies",
    "see all",
    "see more",
    "learn more",
    "play trailer",
    "watch options",
    "cast & crew",
    "user reviews",
    "privacy policy",
    "terms of use",
    "back to top",
];

/// テキスト中の 1900〜2099 の4桁トークンを返す
pub fn extract_year(text: &str) -> String {
    YEAR_TOKEN
        .captures(text)
        .map(|c| c[1].to_string())
        .unwrap_or_else(|| UNKNOWN.to_string())
}

/// "Title (2000)" 形式の括弧内4桁を返す
pub fn year_in_parens(text: &str) -> String {
    YEAR_IN_PARENS
        .captures(text)
        .map(|c| c[1].to_string())
        .unwrap_or_else(|| UNKNOWN.to_string())
}

pub fn is_valid_title(title: &str) -> bool {
    let title = title.trim();
    if title.chars().count() < 2 {
        return false;
    }
    if !title.chars().any(char::is_alphabetic) {
        return false;
    }

    let lower = title.to_lowercase();
    if NAV_WORDS.contains(&lower.as_str()) {
        return false;
    }
    !NAV_PHRASES.iter().any(|phrase| {
        lower == *phrase
            || lower
                .strip_prefix(phrase)
                .is_some_and(|rest| rest.starts_with(' '))
    })
}

/// 最初に出現したものだけを残す（順序は維持）
pub fn dedupe(records: Vec<MovieRecord>) -> Vec<MovieRecord> {
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|r| seen.insert(r.dedup_key()))
        .collect()
}

/// 取得方式の生データを保存対象のバッチに変換
pub fn normalize(records: Vec<MovieRecord>, deduplicate: bool) -> Vec<MovieRecord> {
    let valid: Vec<MovieRecord> = records
        .into_iter()
        .filter(|r| is_valid_title(&r.title))
        .collect();

    if deduplicate {
        dedupe(valid)
    } else {
        valid
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Origin;

    fn record(title: &str, year: &str, rank: u32) -> MovieRecord {
        MovieRecord {
            origin: Origin::Rank(rank),
            title: title.into(),
            year: year.into(),
            score: UNKNOWN.into(),
            votes: UNKNOWN.into(),
            detail_url: format!("http://x/{}", rank),
            scraped_at: "2024-01-01T00:00:00".into(),
        }
    }

    #[test]
    fn test_extract_year_in_range() {
        assert_eq!(extract_year("Released 1999 in cinemas"), "1999");
        assert_eq!(extract_year("2023–2024"), "2023");
        assert_eq!(extract_year("(2001)"), "2001");
        assert_eq!(extract_year("1900"), "1900");
        assert_eq!(extract_year("2099"), "2099");
    }

    #[test]
    fn test_extract_year_out_of_range() {
        assert_eq!(extract_year("1899"), UNKNOWN);
        assert_eq!(extract_year("2100"), UNKNOWN);
        assert_eq!(extract_year("12000 votes"), UNKNOWN);
        assert_eq!(extract_year("no year here"), UNKNOWN);
        assert_eq!(extract_year(""), UNKNOWN);
    }

    #[test]
    fn test_year_in_parens() {
        assert_eq!(year_in_parens("The Godfather (1972)"), "1972");
        assert_eq!(year_in_parens("The Godfather 1972"), UNKNOWN);
        assert_eq!(year_in_parens("Up (09)"), UNKNOWN);
    }

    #[test]
    fn test_title_validity() {
        assert!(is_valid_title("Heat"));
        assert!(is_valid_title("Up"));
        assert!(is_valid_title("1917 Remastered"));
        assert!(is_valid_title("Moreover"));

        assert!(!is_valid_title(""));
        assert!(!is_valid_title("A"));
        assert!(!is_valid_title("1917"));
        assert!(!is_valid_title("#@!"));
        assert!(!is_valid_title("Sign In"));
        assert!(!is_valid_title("  WATCHLIST "));
        assert!(!is_valid_title("See all 250"));
        assert!(!is_valid_title("Play trailer 2:31"));
        assert!(!is_valid_title("Menu"));
        assert!(!is_valid_title("Next"));
    }

    #[test]
    fn test_titles_starting_with_nav_words_are_valid() {
        assert!(is_valid_title("Home Alone"));
        assert!(is_valid_title("Next Friday"));
        assert!(is_valid_title("More Than a Game"));
        assert!(is_valid_title("Trailer Park Boys"));
        assert!(is_valid_title("Search Party"));
        assert!(is_valid_title("Movies of the Year"));
    }

    #[test]
    fn test_dedupe_keeps_first_occurrence_in_order() {
        let batch = vec![
            record("Heat", "1995", 1),
            record("Alien", "1979", 2),
            record("HEAT", "1995", 3),
            record("Heat", "1986", 4),
            record("alien", "1979", 5),
        ];
        let ranks: Vec<_> = dedupe(batch).into_iter().map(|r| r.origin).collect();
        assert_eq!(ranks, [Origin::Rank(1), Origin::Rank(2), Origin::Rank(4)]);
    }

    #[test]
    fn test_normalize_filters_titles() {
        let batch = vec![
            record("Heat", "1995", 1),
            record("Menu", UNKNOWN, 2),
            record("Heat", "1995", 3),
        ];
        assert_eq!(normalize(batch.clone(), false).len(), 2);
        assert_eq!(normalize(batch, true).len(), 1);
    }
}
