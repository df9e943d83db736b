use serde_json::Value;

use crate::schema::Item;

/// Item field matched against the filter keywords.
pub const NAME_FIELD: &str = "vod_name";

/// Returns true when the item must be skipped.
///
/// An item is skipped iff its name contains any keyword as a substring.
/// No keywords, or a missing / null / blank name, never skips.
pub fn should_skip(item: &Item, keywords: &[String]) -> bool {
    if keywords.is_empty() {
        return false;
    }

    let name = match item.get(NAME_FIELD) {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Null) | None => return false,
        Some(other) => other.to_string(),
    };
    if name.is_empty() {
        return false;
    }

    keywords
        .iter()
        .any(|kw| !kw.is_empty() && name.contains(kw.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(raw: &str) -> Item {
        serde_json::from_str(raw).unwrap()
    }

    fn kws(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn substring_match_skips() {
        let i = item(r#"{"vod_name":"Some Movie (Trailer)"}"#);
        assert!(should_skip(&i, &kws(&["Trailer"])));
        assert!(should_skip(&i, &kws(&["nope", "Movie"])));
        assert!(!should_skip(&i, &kws(&["trailer"])));
    }

    #[test]
    fn empty_keyword_set_never_skips() {
        let i = item(r#"{"vod_name":"Anything"}"#);
        assert!(!should_skip(&i, &[]));
    }

    #[test]
    fn missing_or_blank_name_never_skips() {
        let k = kws(&["x"]);
        assert!(!should_skip(&item(r#"{"vod_id":1}"#), &k));
        assert!(!should_skip(&item(r#"{"vod_name":null}"#), &k));
        assert!(!should_skip(&item(r#"{"vod_name":"   "}"#), &k));
    }

    #[test]
    fn numeric_names_are_matched_textually() {
        assert!(should_skip(&item(r#"{"vod_name":2024}"#), &kws(&["202"])));
    }
}
