//! Listing page parser
//!
//! Structured data (`application/ld+json` Product / ItemList / @graph) is
//! preferred; product cards in the HTML are the fallback when the page has
//! none.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use tracing::{debug, info, warn};
use url::Url;

use super::raw_product::{RawPrice, RawProduct};
use crate::domain::errors::ExtractionError;
use crate::domain::price::Price;

/// Product pages end in `-p<digits>.html`
static PRODUCT_ID_PATTERN: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"-p(\d+)\.html").ok());

const CARD_SELECTORS: [&str; 6] = [
    ".product-item",
    ".product-card",
    ".product",
    "[data-product]",
    ".item",
    ".grid-item",
];
const NAME_SELECTORS: [&str; 5] = ["h3", ".product-name", ".title", "[data-product-name]", "a"];
const PRICE_SELECTORS: [&str; 4] = [".price", ".current-price", "[data-price]", ".amount"];
const OLD_PRICE_SELECTORS: [&str; 4] = [".price-old", ".old-price", "del", "s"];
const SIZE_KEYS: [&str; 4] = ["size", "sizes", "availableSizes", "variants"];

struct CompiledSelectors {
    json_ld: Selector,
    cards: Vec<(&'static str, Selector)>,
    names: Vec<Selector>,
    prices: Vec<Selector>,
    old_prices: Vec<Selector>,
    image: Selector,
    link: Selector,
    color: Selector,
}

fn compile(selector: &'static str) -> Result<Selector, ExtractionError> {
    Selector::parse(selector).map_err(|e| ExtractionError::Configuration {
        message: format!("Invalid selector '{selector}': {e}"),
    })
}

fn compile_all(selectors: &[&'static str]) -> Result<Vec<Selector>, ExtractionError> {
    selectors.iter().copied().map(compile).collect()
}

/// Parser configuration
#[derive(Debug, Clone)]
pub struct ListingParserConfig {
    /// Base for relative links, e.g. `https://www.zara.com`
    pub base_url: String,
    /// 0 = unlimited
    pub max_products: usize,
}

pub struct ListingParser {
    config: ListingParserConfig,
    selectors: CompiledSelectors,
}

impl ListingParser {
    pub fn new(config: ListingParserConfig) -> Result<Self, ExtractionError> {
        let selectors = CompiledSelectors {
            json_ld: compile(r#"script[type="application/ld+json"]"#)?,
            cards: CARD_SELECTORS
                .iter()
                .map(|s| compile(*s).map(|compiled| (*s, compiled)))
                .collect::<Result<_, _>>()?,
            names: compile_all(&NAME_SELECTORS)?,
            prices: compile_all(&PRICE_SELECTORS)?,
            old_prices: compile_all(&OLD_PRICE_SELECTORS)?,
            image: compile("img")?,
            link: compile("a[href]")?,
            color: compile(".color, .product-color, [data-color]")?,
        };
        Ok(Self { config, selectors })
    }

    /// Extracts raw products from one listing page
    pub fn parse(&self, html: &str, page_url: &str) -> Vec<RawProduct> {
        let document = Html::parse_document(html);

        let mut products = self.parse_structured_data(&document, page_url);
        if products.is_empty() {
            products = self.parse_cards(&document, page_url);
        } else {
            debug!("Found {} products in structured data", products.len());
        }

        if self.config.max_products > 0 && products.len() > self.config.max_products {
            debug!("Limiting {} products to {}", products.len(), self.config.max_products);
            products.truncate(self.config.max_products);
        }
        products
    }

    fn parse_structured_data(&self, document: &Html, page_url: &str) -> Vec<RawProduct> {
        let mut products = Vec::new();
        for script in document.select(&self.selectors.json_ld) {
            let text: String = script.text().collect();
            match serde_json::from_str::<Value>(text.trim()) {
                Ok(value) => self.collect_json_ld(&value, page_url, &mut products),
                Err(e) => warn!("Failed to parse JSON-LD block: {}", e),
            }
        }
        products
    }

    fn collect_json_ld(&self, value: &Value, page_url: &str, out: &mut Vec<RawProduct>) {
        match value {
            Value::Array(items) => {
                for item in items {
                    self.collect_json_ld(item, page_url, out);
                }
            }
            Value::Object(map) => {
                if let Some(graph) = map.get("@graph") {
                    self.collect_json_ld(graph, page_url, out);
                }
                if has_type(value, "Product") {
                    out.push(self.json_ld_product(value, page_url));
                } else if has_type(value, "ItemList") {
                    if let Some(Value::Array(elements)) = map.get("itemListElement") {
                        for element in elements {
                            let item = element.get("item").unwrap_or(element);
                            self.collect_json_ld(item, page_url, out);
                        }
                    }
                } else if has_type(value, "ProductGroup") {
                    if let Some(variants) = map.get("hasVariant") {
                        self.collect_json_ld(variants, page_url, out);
                    }
                }
            }
            _ => {}
        }
    }

    fn json_ld_product(&self, data: &Value, page_url: &str) -> RawProduct {
        let offers = match data.get("offers") {
            Some(Value::Array(list)) => list.clone(),
            Some(offer @ Value::Object(_)) => vec![offer.clone()],
            _ => Vec::new(),
        };
        let first_offer = offers.first();

        let price = first_offer
            .and_then(|o| o.get("price").or_else(|| o.get("lowPrice")))
            .and_then(raw_price);
        let original_price = first_offer.and_then(|o| o.get("highPrice")).and_then(raw_price);
        let price_text = match (&price, first_offer.and_then(|o| string_field(o, "priceCurrency"))) {
            (Some(RawPrice::Number(value)), Some(currency)) => Price::new(*value)
                .ok()
                .map(|price| format!("{} {currency}", price.normalized())),
            _ => None,
        };

        let product_url = string_field(data, "url")
            .map(|u| self.absolutize(&u))
            .or_else(|| Some(page_url.to_string()));

        let id = string_field(data, "productID")
            .or_else(|| string_field(data, "sku"))
            .or_else(|| product_url.as_deref().and_then(product_id_from_url));

        // Sizes keep their listing order; one entry per offer is common
        let mut sizes = Vec::new();
        for offer in &offers {
            for key in SIZE_KEYS {
                collect_strings(offer.get(key), &mut sizes);
            }
        }
        collect_strings(data.get("size"), &mut sizes);

        RawProduct {
            id,
            name: string_field(data, "name"),
            price,
            price_text,
            original_price,
            image_url: image_field(data.get("image")).map(|u| self.absolutize(&u)),
            product_url,
            color: string_field(data, "color"),
            category: string_field(data, "category"),
            is_sale: None,
            sizes,
            description: string_field(data, "description"),
            source: None,
            scraped_at: None,
        }
    }

    fn parse_cards(&self, document: &Html, page_url: &str) -> Vec<RawProduct> {
        let Some((selector_name, elements)) = self.selectors.cards.iter().find_map(|(name, selector)| {
            let found: Vec<ElementRef<'_>> = document.select(selector).collect();
            (!found.is_empty()).then_some((*name, found))
        }) else {
            warn!("No product cards found on {}", page_url);
            return Vec::new();
        };
        info!("Found {} products using selector: {}", elements.len(), selector_name);

        elements
            .into_iter()
            .filter_map(|element| self.parse_card(element, page_url))
            .collect()
    }

    fn parse_card(&self, element: ElementRef<'_>, page_url: &str) -> Option<RawProduct> {
        let name = first_text(element, &self.selectors.names);
        let price_text = first_text(element, &self.selectors.prices);
        if name.is_none() && price_text.is_none() {
            return None;
        }

        let original_price_text = first_text(element, &self.selectors.old_prices);

        let image_url = element.select(&self.selectors.image).next().and_then(|img| {
            img.value()
                .attr("src")
                .filter(|s| !s.is_empty())
                .or_else(|| img.value().attr("data-src"))
                .map(|src| self.absolutize(src))
        });

        let product_url = element
            .select(&self.selectors.link)
            .next()
            .and_then(|a| a.value().attr("href"))
            .map(|href| self.absolutize(href))
            .unwrap_or_else(|| page_url.to_string());

        let id = element
            .value()
            .attr("data-productid")
            .or_else(|| element.value().attr("data-product-id"))
            .map(str::to_string)
            .or_else(|| product_id_from_url(&product_url));

        let is_sale = original_price_text.is_some()
            || element
                .value()
                .classes()
                .any(|c| c.contains("sale") || c.contains("discount"));

        Some(RawProduct {
            id,
            name,
            price: price_text.clone().map(RawPrice::Text),
            price_text,
            original_price: original_price_text.map(RawPrice::Text),
            image_url,
            product_url: Some(product_url),
            color: first_text(element, std::slice::from_ref(&self.selectors.color)),
            is_sale: Some(is_sale),
            ..RawProduct::default()
        })
    }

    fn absolutize(&self, href: &str) -> String {
        if href.starts_with("http://") || href.starts_with("https://") {
            return href.to_string();
        }
        Url::parse(&self.config.base_url)
            .and_then(|base| base.join(href))
            .map_or_else(|_| href.to_string(), |u| u.to_string())
    }
}

/// Identifier embedded in a product URL (`...-p04087469.html` -> `04087469`)
pub fn product_id_from_url(url: &str) -> Option<String> {
    PRODUCT_ID_PATTERN
        .as_ref()?
        .captures(url)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

fn has_type(value: &Value, wanted: &str) -> bool {
    match value.get("@type") {
        Some(Value::String(t)) => t == wanted,
        Some(Value::Array(types)) => types.iter().any(|t| t.as_str() == Some(wanted)),
        _ => false,
    }
}

fn string_field(value: &Value, key: &str) -> Option<String> {
    match value.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Object(map) => map.get("name").and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
}

fn raw_price(value: &Value) -> Option<RawPrice> {
    match value {
        Value::Number(n) => n.to_string().parse().ok().map(RawPrice::Number),
        Value::String(s) => s
            .trim()
            .parse()
            .map(RawPrice::Number)
            .ok()
            .or_else(|| Some(RawPrice::Text(s.clone()))),
        _ => None,
    }
}

fn image_field(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => image_field(items.first()),
        Value::Object(map) => map
            .get("url")
            .or_else(|| map.get("contentUrl"))
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    }
}

fn collect_strings(value: Option<&Value>, out: &mut Vec<String>) {
    match value {
        Some(Value::String(s)) => out.push(s.clone()),
        Some(Value::Number(n)) => out.push(n.to_string()),
        Some(Value::Array(items)) => {
            for item in items {
                collect_strings(Some(item), out);
            }
        }
        Some(Value::Object(map)) => collect_strings(map.get("name"), out),
        _ => {}
    }
}

fn first_text(element: ElementRef<'_>, selectors: &[Selector]) -> Option<String> {
    selectors.iter().find_map(|selector| {
        element.select(selector).next().and_then(|found| {
            let text = found.text().collect::<Vec<_>>().join(" ");
            let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
            (!text.is_empty()).then_some(text)
        })
    })
}
