//! Product source reading records from a JSON file.
//!
//! Accepts either a top-level array of products or an object with a
//! `products` array (the shape `catalog-sync export` writes).

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use std::path::PathBuf;
use tracing::info;

use super::raw_product::{RawProduct, RecordDefaults, into_batch};
use crate::domain::errors::ExtractionError;
use crate::domain::repositories::{ExtractionBatch, ProductSource};

#[derive(Deserialize)]
#[serde(untagged)]
enum JsonInput {
    List(Vec<RawProduct>),
    Wrapped { products: Vec<RawProduct> },
}

pub struct JsonFileSource {
    path: PathBuf,
    default_category: String,
    source_tag: Option<String>,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>, default_category: impl Into<String>, source_tag: Option<String>) -> Self {
        Self {
            path: path.into(),
            default_category: default_category.into(),
            source_tag,
        }
    }

    pub fn parse(content: &str) -> Result<Vec<RawProduct>, ExtractionError> {
        let input: JsonInput = serde_json::from_str(content).map_err(|e| ExtractionError::Parse {
            message: e.to_string(),
        })?;
        Ok(match input {
            JsonInput::List(products) | JsonInput::Wrapped { products } => products,
        })
    }
}

#[async_trait]
impl ProductSource for JsonFileSource {
    async fn extract(&self) -> Result<ExtractionBatch, ExtractionError> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| ExtractionError::Input {
                path: self.path.display().to_string(),
                message: e.to_string(),
            })?;

        let raws = Self::parse(&content)?;
        info!("📄 {} records read from {}", raws.len(), self.path.display());

        let defaults = RecordDefaults {
            category: self.default_category.clone(),
            source: self.source_tag.clone(),
            scraped_at: Utc::now(),
        };
        Ok(into_batch(raws, &defaults))
    }

    fn describe(&self) -> String {
        format!("JSON file {}", self.path.display())
    }
}
