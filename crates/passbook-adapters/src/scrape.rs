//! Extraction of JSON state embedded in bank HTML pages.
//!
//! Some portals expose no profile or account endpoint; the data only exists as
//! a client-state blob rendered into the page. These helpers pull that blob out
//! and nothing more. They are deliberately narrow and tested against pinned
//! page snippets.

use regex::Regex;
use scraper::{Html, Selector};
use serde_json::Value;

/// Parse the JSON text of the first element matching `selector`.
///
/// Intended for `<script type="application/json">` state tags such as
/// `script#__NEXT_DATA__`. Returns `None` when the element is missing or its
/// content is not JSON.
#[must_use]
pub fn script_json(html: &str, selector: &str) -> Option<Value> {
    let selector = Selector::parse(selector).ok()?;
    let document = Html::parse_document(html);
    let element = document.select(&selector).next()?;
    let text: String = element.text().collect();
    serde_json::from_str(text.trim()).ok()
}

/// Parse the object or array literal assigned to `variable` in an inline script.
///
/// Matches both `window.NAME = {...};` and `NAME = {...}`. The literal is
/// delimited by balanced braces, skipping braces inside string literals.
#[must_use]
pub fn assigned_json(html: &str, variable: &str) -> Option<Value> {
    let pattern = format!(r"(?:window\.)?{}\s*=\s*", regex::escape(variable));
    let re = Regex::new(&pattern).ok()?;
    let found = re.find_iter(html).find_map(|m| {
        let literal = balanced_literal(&html[m.end()..])?;
        serde_json::from_str(literal).ok()
    });
    found
}

/// Leading `{...}` or `[...]` literal of `text`.
fn balanced_literal(text: &str) -> Option<&str> {
    if !text.starts_with(['{', '[']) {
        return None;
    }

    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => quote = Some(c),
            '{' | '[' => depth += 1,
            '}' | ']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const NEXT_DATA_PAGE: &str = r#"<!DOCTYPE html>
<html><head><title>Portfolio</title></head>
<body>
<div id="__next"></div>
<script id="__NEXT_DATA__" type="application/json">{"props":{"pageProps":{"user":{"userId":"u-77","displayName":"Jane Doe"}}}}</script>
</body></html>"#;

    const STATE_PAGE: &str = r#"<html><body>
<script>
  window.analytics = {"page": "start"};
  window.__WF_STATE__ = {"customer":{"ecn":"E1","firstName":"Jane","note":"brace } in string"},"list":[1,2]};
  bootstrap();
</script>
</body></html>"#;

    #[test]
    fn test_script_json_next_data() {
        let value = script_json(NEXT_DATA_PAGE, "script#__NEXT_DATA__").expect("state tag");
        assert_eq!(value["props"]["pageProps"]["user"]["userId"], "u-77");
    }

    #[test]
    fn test_script_json_missing() {
        assert!(script_json("<html></html>", "script#__NEXT_DATA__").is_none());
        assert!(script_json(NEXT_DATA_PAGE, "not a [valid selector").is_none());
    }

    #[test]
    fn test_assigned_json_balanced() {
        let value = assigned_json(STATE_PAGE, "__WF_STATE__").expect("state blob");
        assert_eq!(value["customer"]["ecn"], "E1");
        assert_eq!(value["customer"]["note"], "brace } in string");
        assert_eq!(value["list"][1], 2);
    }

    #[test]
    fn test_assigned_json_missing_or_truncated() {
        assert!(assigned_json(STATE_PAGE, "__OTHER__").is_none());
        assert!(assigned_json("window.__WF_STATE__ = {\"a\": 1", "__WF_STATE__").is_none());
        assert!(assigned_json("window.__WF_STATE__ = null;", "__WF_STATE__").is_none());
    }
}
