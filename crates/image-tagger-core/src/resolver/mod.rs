//! Tag lookup across metadata providers, with a negative cache of hashes
//! nobody knows about.

mod danbooru;
mod gelbooru;
mod negative_cache;
mod provider;


use log::{debug, info, warn};
use std::time::Duration;

pub use danbooru::DanbooruProvider;
pub use gelbooru::GelbooruProvider;
pub use negative_cache::NegativeCache;
pub use provider::{build_client, ProviderResponse, TagProvider};

use crate::config::Config;
use crate::error::Result;

/// Outcome of asking every provider about one hash
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Found(String),

    /// Every provider answered authoritatively with no record
    NotFound,

    /// No tags, but at least one provider could not be asked
    Unavailable,
}

/// Queries providers in priority order until one has tags
pub struct TagResolver {
    providers: Vec<Box<dyn TagProvider>>,
}

impl TagResolver {
    /// Providers are tried in the order given
    pub fn new(providers: Vec<Box<dyn TagProvider>>) -> Self {
        Self { providers }
    }

    /// Danbooru first, Gelbooru as fallback, both sharing one HTTP client
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = build_client(config.http_timeout_secs.map(Duration::from_secs))?;
        Ok(Self::new(vec![
            Box::new(DanbooruProvider::new(client.clone(), &config.danbooru_url)),
            Box::new(GelbooruProvider::new(client, &config.gelbooru_url)),
        ]))
    }

    /// Look up tags for `hash`.
    ///
    /// The hash is added to `cache` only when every provider answered with no
    /// record; transport failures never make a hash known bad. A hash that
    /// resolves is dropped from the cache.
    pub fn resolve(&self, hash: &str, cache: &mut NegativeCache) -> Resolution {
        let mut all_authoritative = true;

        for provider in &self.providers {
            match provider.lookup(hash) {
                ProviderResponse::Tags(tags) => {
                    info!("Tags found from {} for {}", provider.name(), hash);
                    cache.remove(hash);
                    return Resolution::Found(tags);
                }
                ProviderResponse::NoRecord => {
                    debug!("No record from {} for {}", provider.name(), hash);
                }
                ProviderResponse::Unavailable(reason) => {
                    warn!("{} unavailable for {}: {}", provider.name(), hash, reason);
                    all_authoritative = false;
                }
            }
        }

        if all_authoritative {
            cache.insert(hash);
            Resolution::NotFound
        } else {
            Resolution::Unavailable
        }
    }
}
