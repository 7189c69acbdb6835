//! Product identity resolution
//!
//! A product name is derived from, in order: the static price→product
//! table over the subscription's price ids, the metadata maps attached to
//! the event, and finally the checkout session's line items fetched from
//! the processor. The first strategy yielding a name wins.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::stripe::{Metadata, PaymentProvider, StripeError};

/// Price ids sold through the storefront
const BUILTIN_PRICES: &[(&str, &str)] = &[("price_1R1A9uGLqZ8YjU1vEkXXC79n", "Autovoter")];

/// Metadata keys that may carry a product name, in lookup order
const METADATA_KEYS: &[&str] = &["product_name", "productName", "product"];

/// Static price id → product name table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PriceCatalog {
    prices: HashMap<String, String>,
}

impl PriceCatalog {
    pub fn builtin() -> Self {
        Self {
            prices: BUILTIN_PRICES
                .iter()
                .map(|(price, name)| (price.to_string(), name.to_string()))
                .collect(),
        }
    }

    /// Add or replace entries
    pub fn with_overrides(mut self, overrides: impl IntoIterator<Item = (String, String)>) -> Self {
        self.prices.extend(overrides);
        self
    }

    pub fn product_for(&self, price_id: &str) -> Option<&str> {
        self.prices.get(price_id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}

/// Which strategy produced the product name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductSource {
    PriceMap,
    Metadata,
    LineItems,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedProduct {
    pub name: String,
    pub source: ProductSource,
}

/// Inputs available to the strategies for one event
#[derive(Debug, Default)]
pub struct ProductContext<'a> {
    /// Price ids of the subscription's items
    pub price_ids: Vec<&'a str>,
    /// Metadata maps in priority order
    pub metadata: Vec<&'a Metadata>,
    /// Set for checkout completions; enables the line-item lookup
    pub checkout_session_id: Option<&'a str>,
}

#[async_trait]
pub trait ProductStrategy: Send + Sync {
    fn source(&self) -> ProductSource;

    async fn resolve(&self, ctx: &ProductContext<'_>) -> Result<Option<String>, StripeError>;
}

/// Price ids looked up in the [`PriceCatalog`]
pub struct PriceMapStrategy {
    catalog: Arc<PriceCatalog>,
}

impl PriceMapStrategy {
    pub fn new(catalog: Arc<PriceCatalog>) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl ProductStrategy for PriceMapStrategy {
    fn source(&self) -> ProductSource {
        ProductSource::PriceMap
    }

    async fn resolve(&self, ctx: &ProductContext<'_>) -> Result<Option<String>, StripeError> {
        Ok(ctx
            .price_ids
            .iter()
            .find_map(|price| self.catalog.product_for(price))
            .map(str::to_string))
    }
}

/// First non-empty product key across the metadata maps
pub struct MetadataStrategy;

pub(crate) fn metadata_product(metadata: &Metadata) -> Option<&str> {
    METADATA_KEYS
        .iter()
        .filter_map(|key| metadata.get(*key))
        .map(|value| value.trim())
        .find(|value| !value.is_empty())
}

#[async_trait]
impl ProductStrategy for MetadataStrategy {
    fn source(&self) -> ProductSource {
        ProductSource::Metadata
    }

    async fn resolve(&self, ctx: &ProductContext<'_>) -> Result<Option<String>, StripeError> {
        Ok(ctx
            .metadata
            .iter()
            .find_map(|map| metadata_product(map))
            .map(str::to_string))
    }
}

/// Checkout line items: catalog match on their prices, then their description
pub struct LineItemsStrategy {
    catalog: Arc<PriceCatalog>,
    payments: Arc<dyn PaymentProvider>,
}

impl LineItemsStrategy {
    pub fn new(catalog: Arc<PriceCatalog>, payments: Arc<dyn PaymentProvider>) -> Self {
        Self { catalog, payments }
    }
}

#[async_trait]
impl ProductStrategy for LineItemsStrategy {
    fn source(&self) -> ProductSource {
        ProductSource::LineItems
    }

    async fn resolve(&self, ctx: &ProductContext<'_>) -> Result<Option<String>, StripeError> {
        let Some(session_id) = ctx.checkout_session_id else {
            return Ok(None);
        };
        let items = self.payments.list_line_items(session_id).await?;

        let from_catalog = items
            .iter()
            .filter_map(|item| item.price.as_ref())
            .find_map(|price| self.catalog.product_for(&price.id));
        if let Some(name) = from_catalog {
            return Ok(Some(name.to_string()));
        }

        Ok(items
            .iter()
            .filter_map(|item| item.description.as_deref())
            .map(str::trim)
            .find(|d| !d.is_empty())
            .map(str::to_string))
    }
}

/// Ordered strategy chain
pub struct ProductResolver {
    strategies: Vec<Box<dyn ProductStrategy>>,
}

impl ProductResolver {
    /// Price map, then metadata, then line items
    pub fn new(catalog: PriceCatalog, payments: Arc<dyn PaymentProvider>) -> Self {
        let catalog = Arc::new(catalog);
        Self::from_strategies(vec![
            Box::new(PriceMapStrategy::new(catalog.clone())),
            Box::new(MetadataStrategy),
            Box::new(LineItemsStrategy::new(catalog, payments)),
        ])
    }

    pub fn from_strategies(strategies: Vec<Box<dyn ProductStrategy>>) -> Self {
        Self { strategies }
    }

    pub async fn resolve(
        &self,
        ctx: &ProductContext<'_>,
    ) -> Result<Option<ResolvedProduct>, StripeError> {
        for strategy in &self.strategies {
            if let Some(name) = strategy.resolve(ctx).await? {
                return Ok(Some(ResolvedProduct {
                    name,
                    source: strategy.source(),
                }));
            }
        }
        Ok(None)
    }
}
