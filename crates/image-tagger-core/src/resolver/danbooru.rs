use reqwest::blocking::Client;
use serde_json::Value;

use super::provider::{fetch, non_empty_tags, ProviderResponse, TagProvider};

/// Primary provider: `GET <base>/posts.json?md5=<hash>`
pub struct DanbooruProvider {
    client: Client,
    base_url: String,
}

impl DanbooruProvider {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url_for(&self, hash: &str) -> String {
        format!("{}/posts.json?md5={}", self.base_url, hash)
    }
}

impl TagProvider for DanbooruProvider {
    fn name(&self) -> &str {
        "danbooru"
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
/// A post object carries `tag_string`; `null` means no record. Some deployments
/// answer with a list of posts, in which case the first one is used.
pub fn interpret_body(body: &str) -> ProviderResponse {
    let value: Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(e) => return ProviderResponse::Unavailable(format!("invalid JSON: {}", e)),
    };

    let post = match &value {
        Value::Null => return ProviderResponse::NoRecord,
        Value::Array(posts) => match posts.first() {
            Some(post) => post,
            None => return ProviderResponse::NoRecord,
        },
        Value::Object(_) => &value,
        other => {
            return ProviderResponse::Unavailable(format!("unexpected response: {}", other))
        }
    };

    non_empty_tags(post.get("tag_string").and_then(Value::as_str))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_post_with_tags() {
        let body = r#"{"id": 1, "tag_string": "1girl solo smile"}"#;
        assert_eq!(
            interpret_body(body),
            ProviderResponse::Tags("1girl solo smile".to_string())
        );
    }

    #[test]
    fn test_null_is_no_record() {
        assert_eq!(interpret_body("null"), ProviderResponse::NoRecord);
        assert_eq!(interpret_body("[]"), ProviderResponse::NoRecord);
    }

    #[test]
    fn test_blank_tag_string_is_no_record() {
        assert_eq!(
            interpret_body(r#"{"tag_string": "  "}"#),
            ProviderResponse::NoRecord
        );
        assert_eq!(interpret_body(r#"{"id": 5}"#), ProviderResponse::NoRecord);
    }

    #[test]
    fn test_list_response_uses_first_post() {
        let body = r#"[{"tag_string": "scenery"}, {"tag_string": "other"}]"#;
        assert_eq!(
            interpret_body(body),
            ProviderResponse::Tags("scenery".to_string())
        );
    }

    #[test]
    fn test_garbage_is_unavailable() {
        assert!(matches!(
            interpret_body("<html>busy</html>"),
            ProviderResponse::Unavailable(_)
        ));
    }

    #[test]
    fn test_url_trims_trailing_slash() {
        let provider = DanbooruProvider::new(Client::new(), "http://danbooru.donmai.us/");
        assert_eq!(
            provider.url_for("0123456789abcdef0123456789abcdef"),
            "http://danbooru.donmai.us/posts.json?md5=0123456789abcdef0123456789abcdef"
        );
    }
}
