use serde::{Deserialize, Serialize};

/// One product listing as captured from a retailer catalog.
///
/// Every field is free text exactly as scraped. The core never mutates it;
/// normalization derives a separate record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawProductRecord {
    #[serde(default, alias = "product_name")]
    pub name: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub price: Option<String>,
    #[serde(default)]
    pub price_per_unit: Option<String>,
    /// Size, weight or volume ("500g", "6 x 100g", "2L")
    #[serde(default, alias = "size_weight_volume")]
    pub size: Option<String>,
    #[serde(default)]
    pub unit_of_measure: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default, alias = "url")]
    pub product_url: Option<String>,
    /// Retailer identifier; filled from the source file name when missing
    #[serde(default)]
    pub retailer: String,
    /// Capture timestamp, RFC 3339 or `%Y-%m-%d %H:%M:%S`
    #[serde(default, alias = "scrape_date")]
    pub captured_at: Option<String>,
}

impl RawProductRecord {
    /// Convenience constructor used by loaders and tests
    pub fn new(retailer: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            retailer: retailer.into(),
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn with_price(mut self, price: impl Into<String>) -> Self {
        self.price = Some(price.into());
        self
    }

    pub fn with_size(mut self, size: impl Into<String>) -> Self {
        self.size = Some(size.into());
        self
    }

    pub fn with_brand(mut self, brand: impl Into<String>) -> Self {
        self.brand = Some(brand.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.product_url = Some(url.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }
}
