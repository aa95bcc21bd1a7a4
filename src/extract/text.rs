//! Regex scanners for fields that live in the card's running text rather
//! than behind a stable selector, plus URL normalization helpers.

use anyhow::Result;
use regex::Regex;
use url::Url;

/// Site root used to resolve root-relative hrefs and image paths.
pub const SITE_ROOT: &str = "https://www.avito.ru";

const DESCRIPTION_LIMIT: usize = 500;
const TRUNCATION_MARKER: &str = "...";

/// Ordered text patterns for deposit, commission and utilities notes.
/// Each list is tried top to bottom; the first match wins and the rest
/// are skipped.
pub struct TextPatterns {
    deposit: Vec<Regex>,
    commission: Vec<Regex>,
    utilities: Vec<Regex>,
}

impl TextPatterns {
    pub fn new() -> Result<Self> {
        Ok(Self {
            deposit: vec![
                Regex::new(r"(?i)залог[^.]*?(\d[\d\s]*?₽)")?,
                Regex::new(r"(?i)депозит[^.]*?(\d[\d\s]*?₽)")?,
                Regex::new(r"(?i)обеспечение[^.]*?(\d[\d\s]*?₽)")?,
            ],
            commission: vec![
                Regex::new(r"(?i)комиссия[^.]*?(\d+%)")?,
                Regex::new(r"(?i)вознаграждение[^.]*?(\d+%)")?,
            ],
            utilities: vec![
                Regex::new(r"(?i)ЖКУ[^.]*включены")?,
                Regex::new(r"(?i)коммуналка[^.]*включена")?,
                Regex::new(r"(?i)ком\. услуги[^.]*включены")?,
            ],
        })
    }

    /// "Залог {amount}" for the first deposit synonym found, else empty.
    pub fn deposit(&self, text: &str) -> String {
        for re in &self.deposit {
            if let Some(caps) = re.captures(text) {
                if let Some(amount) = caps.get(1) {
                    return format!("Залог {}", amount.as_str());
                }
            }
        }
        String::new()
    }

    /// "Комиссия {percent}" for the first commission synonym found, else empty.
    pub fn commission(&self, text: &str) -> String {
        for re in &self.commission {
            if let Some(caps) = re.captures(text) {
                if let Some(percent) = caps.get(1) {
                    return format!("Комиссия {}", percent.as_str());
                }
            }
        }
        String::new()
    }

    /// Canned "ЖКУ включены" when any of the included-utilities phrasings
    /// is present, else empty.
    pub fn utilities(&self, text: &str) -> String {
        for re in &self.utilities {
            if re.is_match(text) {
                return "ЖКУ включены".to_string();
            }
        }
        String::new()
    }
}

/// Resolve a raw `src`/`href` to an absolute http(s) URL.
///
/// Protocol-relative (`//…`) and root-relative (`/…`) values are resolved
/// against the site; anything that still does not parse as an absolute
/// http(s) URL is rejected.
pub fn absolutize(raw: &str) -> Option<String> {
    let candidate = if let Some(rest) = raw.strip_prefix("//") {
        format!("https://{rest}")
    } else if raw.starts_with('/') {
        format!("{SITE_ROOT}{raw}")
    } else {
        raw.to_string()
    };

    match Url::parse(&candidate) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Some(candidate),
        _ => None,
    }
}

/// Collapse runs of whitespace to single spaces and trim the ends.
pub fn collapse_ws(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Cap a description at 500 characters, appending a marker when cut.
pub fn truncate_description(desc: &str) -> String {
    let mut chars = desc.chars();
    let head: String = chars.by_ref().take(DESCRIPTION_LIMIT).collect();
    if chars.next().is_some() {
        format!("{head}{TRUNCATION_MARKER}")
    } else {
        head
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patterns() -> TextPatterns {
        TextPatterns::new().unwrap()
    }

    #[test]
    fn deposit_from_card_text() {
        assert_eq!(
            patterns().deposit("1-к. квартира, залог 15000 ₽, торг"),
            "Залог 15000 ₽"
        );
    }

    #[test]
    fn deposit_synonyms_share_the_template() {
        assert_eq!(patterns().deposit("Депозит 5 000 ₽"), "Залог 5 000 ₽");
        assert_eq!(
            patterns().deposit("обеспечение 30000 ₽ при въезде"),
            "Залог 30000 ₽"
        );
    }

    #[test]
    fn deposit_absent_yields_empty() {
        assert_eq!(patterns().deposit("просторная студия у метро"), "");
    }

    #[test]
    fn commission_patterns() {
        assert_eq!(patterns().commission("Комиссия 50%"), "Комиссия 50%");
        assert_eq!(
            patterns().commission("вознаграждение агенту 30%"),
            "Комиссия 30%"
        );
        assert_eq!(patterns().commission("без комиссии"), "");
    }

    #[test]
    fn utilities_phrasings() {
        assert_eq!(patterns().utilities("ЖКУ включены в цену"), "ЖКУ включены");
        assert_eq!(patterns().utilities("коммуналка включена"), "ЖКУ включены");
        assert_eq!(
            patterns().utilities("ком. услуги полностью включены"),
            "ЖКУ включены"
        );
        assert_eq!(patterns().utilities("счетчики оплачиваются отдельно"), "");
    }

    #[test]
    fn absolutize_protocol_relative() {
        assert_eq!(
            absolutize("//10.img.avito.st/image.jpg").as_deref(),
            Some("https://10.img.avito.st/image.jpg")
        );
    }

    #[test]
    fn absolutize_root_relative() {
        assert_eq!(
            absolutize("/ufa/kvartiry/flat-1").as_deref(),
            Some("https://www.avito.ru/ufa/kvartiry/flat-1")
        );
    }

    #[test]
    fn absolutize_passes_absolute_through() {
        assert_eq!(
            absolutize("https://example.com/a.jpg").as_deref(),
            Some("https://example.com/a.jpg")
        );
    }

    #[test]
    fn absolutize_rejects_non_http() {
        assert_eq!(absolutize("javascript:void(0)"), None);
        assert_eq!(absolutize("data:image/png;base64,AAAA"), None);
        assert_eq!(absolutize("not a url"), None);
        assert_eq!(absolutize(""), None);
    }

    #[test]
    fn truncation_at_the_limit() {
        let exact = "x".repeat(500);
        assert_eq!(truncate_description(&exact), exact);

        let long = "x".repeat(501);
        let cut = truncate_description(&long);
        assert_eq!(cut.chars().count(), 503);
        assert!(cut.ends_with("..."));
    }

    #[test]
    fn collapse_ws_flattens_runs() {
        assert_eq!(collapse_ws("  25 000\n ₽  в месяц "), "25 000 ₽ в месяц");
    }
}
