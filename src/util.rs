/// Utility helpers shared by the queue client, provider and destination.
///
/// IMPORTANT:
/// - No run-level state lives here.
/// - Everything in this module is pure and deterministic
///   (except `hostname`, which asks the OS).
///

use std::time::Duration;

use serde_json::Value;

/// Maximum number of body bytes quoted in an error message.
pub const ERROR_BODY_LIMIT: usize = 512;

/// Strips trailing slashes from a base URL.
///
/// Examples:
/// - "http://localhost:3000/" -> "http://localhost:3000"
/// - "https://cms.example"    -> "https://cms.example"
pub fn trim_base(url: &str) -> &str {
    url.trim().trim_end_matches('/')
}

/// Lossy UTF-8 view of a body, cut to `ERROR_BODY_LIMIT` bytes.
///
/// Used when quoting destination / provider responses in error messages.
pub fn body_snippet(body: &[u8]) -> String {
    let end = body.len().min(ERROR_BODY_LIMIT);
    String::from_utf8_lossy(&body[..end]).into_owned()
}

/// Renders an item field for a form body.
///
/// - null        -> None (field is omitted)
/// - string      -> as-is
/// - number/bool -> display form
/// - array/object -> compact JSON
pub fn form_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}

/// Parses a short duration literal.
///
/// Accepted forms: "250ms", "5s", "2m", "1h" or a bare number of seconds.
pub fn parse_duration(raw: &str) -> Result<Duration, String> {
    let raw = raw.trim();
    let split = raw
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(raw.len());
    let (digits, unit) = raw.split_at(split);

    let n: u64 = digits
        .parse()
        .map_err(|_| format!("invalid duration {:?}", raw))?;

    match unit.trim() {
        "" | "s" => Ok(Duration::from_secs(n)),
        "ms" => Ok(Duration::from_millis(n)),
        "m" => Ok(Duration::from_secs(n * 60)),
        "h" => Ok(Duration::from_secs(n * 3600)),
        other => Err(format!("unknown duration unit {:?}", other)),
    }
}

/// Reads a response body, keeping at most `limit` bytes.
///
/// Anything past the limit is discarded; callers decoding the body
/// will then see a truncated document and fail to parse it.
pub async fn read_capped(mut resp: reqwest::Response, limit: usize) -> reqwest::Result<Vec<u8>> {
    let mut buf = Vec::new();
    while let Some(chunk) = resp.chunk().await? {
        let room = limit - buf.len();
        if chunk.len() >= room {
            buf.extend_from_slice(&chunk[..room]);
            break;
        }
        buf.extend_from_slice(&chunk);
    }
    Ok(buf)
}

/// Best-effort host name used as the default worker id.
pub fn hostname() -> String {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .map(|h| h.trim().to_string())
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| "worker".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn trims_trailing_slashes() {
        assert_eq!(trim_base("http://localhost:3000/"), "http://localhost:3000");
        assert_eq!(trim_base(" https://a.example// "), "https://a.example");
    }

    #[test]
    fn body_snippet_is_capped() {
        let body = vec![b'x'; 2000];
        assert_eq!(body_snippet(&body).len(), ERROR_BODY_LIMIT);
        assert_eq!(body_snippet(b"short"), "short");
    }

    #[test]
    fn form_values() {
        assert_eq!(form_value(&json!(null)), None);
        assert_eq!(form_value(&json!("abc")), Some("abc".into()));
        assert_eq!(form_value(&json!(12)), Some("12".into()));
        assert_eq!(form_value(&json!(true)), Some("true".into()));
        assert_eq!(form_value(&json!([1, 2])), Some("[1,2]".into()));
    }

    #[test]
    fn durations() {
        assert_eq!(parse_duration("5s").unwrap(), Duration::from_secs(5));
        assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
        assert_eq!(parse_duration("2m").unwrap(), Duration::from_secs(120));
        assert_eq!(parse_duration("7").unwrap(), Duration::from_secs(7));
        assert!(parse_duration("fast").is_err());
        assert!(parse_duration("3d").is_err());
    }

    #[test]
    fn default_worker_id_is_never_blank() {
        let id = hostname();
        assert!(!id.trim().is_empty());
        assert_eq!(id, id.trim());
    }
}
