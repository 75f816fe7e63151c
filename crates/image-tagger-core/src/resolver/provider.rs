use log::debug;
use reqwest::blocking::Client;
use std::time::Duration;

use crate::error::Result;

/// What a single provider said about a hash
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderResponse {
    /// Non-empty tag string
    Tags(String),

    /// The provider answered and has nothing for this hash
    NoRecord,

    /// The provider could not be asked or gave an unusable answer
    Unavailable(String),
}

/// A metadata service that can be asked for the tags of a content hash
pub trait TagProvider {
    /// Short name used in log messages
    fn name(&self) -> &str;

    /// Look up the tags for `hash`
    fn lookup(&self, hash: &str) -> ProviderResponse;
}

/// Build the blocking HTTP client shared by the providers.
///
/// `None` disables the timeout entirely.
pub fn build_client(timeout: Option<Duration>) -> Result<Client> {
    let client = Client::builder()
        .timeout(timeout)
        .user_agent(concat!("image-tagger/", env!("CARGO_PKG_VERSION")))
        .build()?;
    Ok(client)
}

/// GET `url` and hand back the body when the status is a success
pub(crate) fn fetch(
    client: &Client,
    provider: &str,
    url: &str,
) -> std::result::Result<String, String> {
    debug!("Querying {}: {}", provider, url);

    let response = client
        .get(url)
        .send()
        .map_err(|e| format!("request failed: {}", e))?;

    let status = response.status();
    debug!("{} responded with {}", provider, status);
    if !status.is_success() {
        return Err(format!("HTTP status {}", status));
    }

    response
        .text()
        .map_err(|e| format!("failed to read body: {}", e))
}

/// Treat blank tag strings as no record
pub(crate) fn non_empty_tags(tags: Option<&str>) -> ProviderResponse {
    match tags.map(str::trim) {
        Some(tags) if !tags.is_empty() => ProviderResponse::Tags(tags.to_string()),
        _ => ProviderResponse::NoRecord,
    }
}
