//! Product source backed by live listing pages

use async_trait::async_trait;
use chrono::Utc;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{error, info, warn};

use super::listing_parser::{ListingParser, ListingParserConfig};
use super::raw_product::{RawProduct, RecordDefaults, into_batch};
use super::retry::RetryPolicy;
use crate::domain::errors::ExtractionError;
use crate::domain::repositories::{ExtractionBatch, ProductSource};
use crate::infrastructure::config::ExtractionConfig;
use crate::infrastructure::http_client::{HttpClient, HttpClientConfig};

pub struct WebListingSource {
    client: Arc<HttpClient>,
    parser: Arc<ListingParser>,
    urls: Vec<String>,
    max_concurrent_requests: usize,
    default_category: String,
    source_tag: Option<String>,
}

impl WebListingSource {
    /// Builds the source from configuration; `urls` overrides `target_urls` when non-empty
    pub fn from_config(config: &ExtractionConfig, urls: Vec<String>) -> Result<Self, ExtractionError> {
        let urls = if urls.is_empty() {
            config.target_urls.clone()
        } else {
            urls
        };
        if urls.is_empty() {
            return Err(ExtractionError::Configuration {
                message: "no listing URLs configured".to_string(),
            });
        }

        let client = HttpClient::new(
            &HttpClientConfig::from_extraction(config),
            RetryPolicy::from_config(config),
        )?;
        let parser = ListingParser::new(ListingParserConfig {
            base_url: config.base_url.clone(),
            max_products: config.max_products_per_page,
        })?;

        Ok(Self {
            client: Arc::new(client),
            parser: Arc::new(parser),
            urls,
            max_concurrent_requests: config.max_concurrent_requests.max(1),
            default_category: config.default_category.clone(),
            source_tag: config.source_tag.clone(),
        })
    }

    async fn fetch_page(&self, url: String) -> Result<Vec<RawProduct>, ExtractionError> {
        let html = self.client.get_text_with_retry(&url).await?;
        let products = self.parser.parse(&html, &url);
        info!("📦 {} products extracted from {}", products.len(), url);
        Ok(products)
    }
}

#[async_trait]
impl ProductSource for WebListingSource {
    async fn extract(&self) -> Result<ExtractionBatch, ExtractionError> {
        let scraped_at = Utc::now();

        // `buffered` keeps page order so duplicate resolution stays deterministic
        let results: Vec<_> = stream::iter(self.urls.iter().cloned())
            .map(|url| self.fetch_page(url))
            .buffered(self.max_concurrent_requests)
            .collect()
            .await;

        let mut raws = Vec::new();
        let mut failed = 0;
        for result in results {
            match result {
                Ok(products) => raws.extend(products),
                Err(e) => {
                    error!("❌ Listing page failed: {}", e);
                    failed += 1;
                }
            }
        }

        if failed == self.urls.len() {
            return Err(ExtractionError::AllPagesFailed { failed });
        }
        if failed > 0 {
            warn!("{} of {} listing pages failed; continuing with the rest", failed, self.urls.len());
        }

        let defaults = RecordDefaults {
            category: self.default_category.clone(),
            source: self.source_tag.clone(),
            scraped_at,
        };
        Ok(into_batch(raws, &defaults))
    }

    fn describe(&self) -> String {
        format!("{} listing page(s): {}", self.urls.len(), self.urls.join(", "))
    }
}
