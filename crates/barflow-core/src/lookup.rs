//! Client for the drink reference service (TheCocktailDB search API).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::config::LookupConfig;

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("drink lookup request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// One search hit. Only the glass classification is required downstream.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DrinkCandidate {
    #[serde(rename = "strDrink", default)]
    pub name: Option<String>,
    #[serde(rename = "strGlass", default)]
    pub glass: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    /// The service answers `null` rather than `[]` when nothing matches.
    #[serde(default)]
    drinks: Option<Vec<DrinkCandidate>>,
}

/// Free-text search by drink name. Implementations must return candidates
/// best match first; an exact name match, when present, sorts first.
#[async_trait]
pub trait DrinkLookup: Send + Sync {
    async fn search(&self, name: &str) -> Result<Vec<DrinkCandidate>, LookupError>;
}

#[derive(Debug, Clone)]
pub struct CocktailDbClient {
    client: reqwest::Client,
    base_url: String,
}

impl CocktailDbClient {
    pub fn new(config: &LookupConfig) -> Result<Self, LookupError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl DrinkLookup for CocktailDbClient {
    async fn search(&self, name: &str) -> Result<Vec<DrinkCandidate>, LookupError> {
        let url = format!("{}/search.php", self.base_url);
        debug!(drink = name, %url, "Searching drink reference");

        let response: SearchResponse = self
            .client
            .get(&url)
            .query(&[("s", name)])
            .header(ACCEPT, "application/json")
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(response.drinks.unwrap_or_default())
    }
}
