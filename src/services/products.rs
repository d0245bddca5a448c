//! Product detail lookup.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::unwrap_data;
use crate::gateway::{ApiError, RequestGateway};

/// Detail path for `product_id`, encoded as a single path segment.
#[must_use]
pub fn product_endpoint(product_id: &str) -> String {
    format!("/client/v1/products/{}", urlencoding::encode(product_id))
}

/// Open product record with accessors for the fields the detail view reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Product(Map<String, Value>);

impl Product {
    #[must_use]
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    #[must_use]
    pub fn id(&self) -> Option<String> {
        match self.0.get("productId")? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.0.get("productName").and_then(Value::as_str)
    }

    #[must_use]
    pub fn short_description(&self) -> Option<&str> {
        self.0.get("shortDescription").and_then(Value::as_str)
    }

    #[must_use]
    pub fn original_price(&self) -> Option<f64> {
        self.0.get("originalPrice").and_then(as_price)
    }

    #[must_use]
    pub fn final_price(&self) -> Option<f64> {
        self.0.get("finalPrice").and_then(as_price)
    }

    #[must_use]
    pub fn in_stock(&self) -> bool {
        self.0.get("inStock").and_then(Value::as_bool).unwrap_or(false)
    }

    #[must_use]
    pub fn stock_quantity(&self) -> Option<i64> {
        self.0.get("stockQuantity").and_then(Value::as_i64)
    }

    #[must_use]
    pub fn brand_name(&self) -> Option<&str> {
        self.0.get("brand")?.get("brandName")?.as_str()
    }

    #[must_use]
    pub fn category_name(&self) -> Option<&str> {
        self.0.get("category")?.get("categoryName")?.as_str()
    }

    /// Percent off the original price, `0` when prices are missing or there
    /// is no discount.
    #[must_use]
    pub fn discount_percentage(&self) -> u32 {
        match (self.original_price(), self.final_price()) {
            (Some(original), Some(final_price)) => discount_percentage(original, final_price),
            _ => 0,
        }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    #[must_use]
    pub fn as_value(&self) -> Value {
        Value::Object(self.0.clone())
    }
}

/// Rounded percent saved going from `original` to `final_price`.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn discount_percentage(original: f64, final_price: f64) -> u32 {
    if original <= 0.0 || final_price >= original {
        return 0;
    }
    (((original - final_price) / original) * 100.0).round() as u32
}

fn as_price(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => match s.trim().parse() {
            Ok(price) => Some(price),
            Err(_) => None,
        },
        _ => None,
    }
}

pub struct ProductService {
    gateway: Arc<RequestGateway>,
}

impl ProductService {
    #[must_use]
    pub fn new(gateway: Arc<RequestGateway>) -> Self {
        Self { gateway }
    }

    /// Fetch one product by id.
    ///
    /// # Errors
    ///
    /// Returns the gateway's error, or [`ApiError::InvalidResponse`] when the
    /// payload is not an object.
    pub async fn get(&self, product_id: &str) -> Result<Product, ApiError> {
        let response = self.gateway.get(&product_endpoint(product_id)).await?;
        Product::from_value(unwrap_data(response))
            .ok_or_else(|| ApiError::InvalidResponse("product payload is not an object".to_owned()))
    }
}

#[cfg(test)]
#[path = "products_test.rs"]
mod tests;
