use reqwest::blocking::Client;
use serde_json::Value;

use super::provider::{fetch, non_empty_tags, ProviderResponse, TagProvider};

/// Fallback provider: the Gelbooru DAPI post index filtered by `md5:<hash>`
pub struct GelbooruProvider {
    client: Client,
    base_url: String,
}

impl GelbooruProvider {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url_for(&self, hash: &str) -> String {
        format!(
            "{}/index.php?page=dapi&s=post&q=index&json=1&tags=md5:{}",
            self.base_url, hash
        )
    }
}

impl TagProvider for GelbooruProvider {
    fn name(&self) -> &str {
        "gelbooru"
    }

    fn lookup(&self, hash: &str) -> ProviderResponse {
        match fetch(&self.client, self.name(), &self.url_for(hash)) {
            Ok(body) => interpret_body(&body),
            Err(reason) => ProviderResponse::Unavailable(reason),
        }
    }
}

/// Read a successful response body.
///
/// An empty body means no record. Otherwise the body is a list of posts, or on
/// newer API versions an object wrapping that list under `post`.
pub fn interpret_body(body: &str) -> ProviderResponse {
    if body.trim().is_empty() {
        return ProviderResponse::NoRecord;
    }

    let value: Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(e) => return ProviderResponse::Unavailable(format!("invalid JSON: {}", e)),
    };

    let posts = match &value {
        Value::Array(posts) => posts,
        Value::Object(map) => match map.get("post") {
            Some(Value::Array(posts)) => posts,
            // Wrapper without posts, e.g. {"@attributes": {"count": 0}}
            _ => return ProviderResponse::NoRecord,
        },
        Value::Null => return ProviderResponse::NoRecord,
        other => {
            return ProviderResponse::Unavailable(format!("unexpected response: {}", other))
        }
    };

    match posts.first() {
        Some(post) => non_empty_tags(post.get("tags").and_then(Value::as_str)),
        None => ProviderResponse::NoRecord,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_post_tags() {
        let body = r#"[{"id": 7, "tags": "landscape sky"}]"#;
        assert_eq!(
            interpret_body(body),
            ProviderResponse::Tags("landscape sky".to_string())
        );
    }

    #[test]
    fn test_empty_body_is_no_record() {
        assert_eq!(interpret_body(""), ProviderResponse::NoRecord);
        assert_eq!(interpret_body("  \n"), ProviderResponse::NoRecord);
        assert_eq!(interpret_body("[]"), ProviderResponse::NoRecord);
    }

    #[test]
    fn test_wrapped_response() {
        let body = r#"{"@attributes": {"count": 1}, "post": [{"tags": "cat"}]}"#;
        assert_eq!(interpret_body(body), ProviderResponse::Tags("cat".to_string()));

        let empty = r#"{"@attributes": {"count": 0}}"#;
        assert_eq!(interpret_body(empty), ProviderResponse::NoRecord);
    }

    #[test]
    fn test_garbage_is_unavailable() {
        assert!(matches!(
            interpret_body("Search down"),
            ProviderResponse::Unavailable(_)
        ));
    }

    #[test]
    fn test_url() {
        let provider = GelbooruProvider::new(Client::new(), "http://gelbooru.com");
        assert_eq!(
            provider.url_for("0123456789abcdef0123456789abcdef"),
            "http://gelbooru.com/index.php?page=dapi&s=post&q=index&json=1&tags=md5:0123456789abcdef0123456789abcdef"
        );
    }
}
