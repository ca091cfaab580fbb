//! Text helpers shared by the HTML adapters.

use regex::Regex;
use std::sync::LazyLock;
use url::Url;

static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("Invalid regex"));
static SPACES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("Invalid regex"));
static NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d[\d.,\s]*").expect("Invalid regex"));

/// Parse a displayed price such as `"1.234,56 €"`, `"€1,234.56"`, `"89,90"`
/// or `"120"`. The last `.` or `,` followed by one or two digits is the
/// decimal separator; every other separator groups thousands.
pub fn parse_price(text: &str) -> Option<f64> {
    let raw = NUMBER.find(text)?.as_str();
    let digits: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    let digits = digits.trim_end_matches(['.', ',']);

    let decimal_at = digits.rfind(['.', ',']).filter(|&i| {
        let tail = digits.len() - i - 1;
        tail == 1 || tail == 2
    });
    let normalized: String = match decimal_at {
        Some(i) => {
            let (int, frac) = digits.split_at(i);
            let int: String = int.chars().filter(char::is_ascii_digit).collect();
            format!("{int}.{}", &frac[1..])
        }
        None => digits.chars().filter(char::is_ascii_digit).collect(),
    };
    normalized.parse::<f64>().ok().filter(|p| p.is_finite())
}

pub fn strip_tags(html: &str) -> String {
    let text = TAG.replace_all(html, " ");
    let text = decode_entities(&text);
    SPACES.replace_all(text.trim(), " ").into_owned()
}

pub fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&euro;", "€")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#039;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

/// Resolve `href` against `base`. `None` for unparsable input.
pub fn join_url(base: &str, href: &str) -> Option<String> {
    let base = Url::parse(base).ok()?;
    base.join(href.trim()).ok().map(|u| u.to_string())
}

/// True for price lines that are fees rather than item prices.
pub fn is_fee_line(text: &str) -> bool {
    let lower = text.to_lowercase();
    ["envío", "envio", "gastos", "shipping", "transport", "portes", "livraison", "frais de port"]
        .iter()
        .any(|w| lower.contains(w))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_price_formats() {
        assert_eq!(parse_price("1.234,56 €"), Some(1234.56));
        assert_eq!(parse_price("€1,234.56"), Some(1234.56));
        assert_eq!(parse_price("89,90 €"), Some(89.9));
        assert_eq!(parse_price("Precio: 120 €"), Some(120.0));
        assert_eq!(parse_price("1 250,00"), Some(1250.0));
        assert_eq!(parse_price("2.500 €"), Some(2500.0));
        assert_eq!(parse_price("consultar"), None);
    }

    #[test]
    fn test_strip_tags_and_entities() {
        assert_eq!(
            strip_tags("<span class=\"p\">89,90&nbsp;&euro;</span>\n <b>IVA</b>"),
            "89,90 € IVA"
        );
    }

    #[test]
    fn test_join_url() {
        assert_eq!(
            join_url("https://www.example.com/search?q=1", "/pieza/123").as_deref(),
            Some("https://www.example.com/pieza/123")
        );
        assert_eq!(
            join_url("https://www.example.com/a/", "https://cdn.example.com/x.jpg").as_deref(),
            Some("https://cdn.example.com/x.jpg")
        );
    }

    #[test]
    fn test_fee_lines() {
        assert!(is_fee_line("Gastos de envío: 6,95 €"));
        assert!(!is_fee_line("Faro delantero izquierdo"));
    }
}
