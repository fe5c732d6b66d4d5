use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Number;
use sqlx::{sqlite::SqliteRow, FromRow, Row};

use crate::error::{AppError, AppResult};

/// A product price as the client sent it. `Number` keeps the literal text
/// (serde_json `arbitrary_precision`), so `30` never comes back as `30.0` and
/// integers beyond 64 bits or long decimals are not rounded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(Number);

impl Price {
    pub fn is_negative(&self) -> bool {
        self.0.as_f64().is_some_and(|v| v < 0.0)
    }
}

impl From<i64> for Price {
    fn from(value: i64) -> Self {
        Self(Number::from(value))
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for Price {
    type Err = serde_json::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<Number>().map(Self)
    }
}

/// Core product entity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub price: Price,
}

// Price is stored as its canonical number text; parse it back on the way out.
impl<'r> FromRow<'r, SqliteRow> for Product {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let raw: String = row.try_get("price")?;
        let price = raw.parse::<Price>().map_err(|e| sqlx::Error::ColumnDecode {
            index: "price".to_string(),
            source: Box::new(e),
        })?;

        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            price,
        })
    }
}

// ── Request payloads ─────────────────────────────────────────────────────────

/// Body of a create request. Both fields are optional at the JSON level so a
/// missing field surfaces as a 400 with a readable message.
#[derive(Debug, Deserialize)]
pub struct CreateProduct {
    pub name: Option<String>,
    pub price: Option<Price>,
}

/// A create request that passed validation.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub price: Price,
}

impl CreateProduct {
    pub fn validate(self) -> AppResult<NewProduct> {
        let name = self
            .name
            .ok_or_else(|| AppError::BadRequest("name is required".to_string()))?;
        validate_name(&name)?;

        let price = self
            .price
            .ok_or_else(|| AppError::BadRequest("price is required".to_string()))?;
        validate_price(&price)?;

        Ok(NewProduct { name, price })
    }
}

/// Body of a partial update. Absent fields are left unchanged.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateProduct {
    pub name: Option<String>,
    pub price: Option<Price>,
}

impl UpdateProduct {
    pub fn validate(self) -> AppResult<Self> {
        if let Some(name) = &self.name {
            validate_name(name)?;
        }
        if let Some(price) = &self.price {
            validate_price(price)?;
        }
        Ok(self)
    }
}

fn validate_name(name: &str) -> AppResult<()> {
    if name.trim().is_empty() {
        return Err(AppError::BadRequest("name must not be empty".to_string()));
    }
    Ok(())
}

fn validate_price(price: &Price) -> AppResult<()> {
    if price.is_negative() {
        return Err(AppError::BadRequest("price must be >= 0".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn create(body: serde_json::Value) -> AppResult<NewProduct> {
        serde_json::from_value::<CreateProduct>(body)
            .expect("payload should deserialize")
            .validate()
    }

    // ── Price ──────────────────────────────────────────────────────────────────

    #[test]
    fn integer_price_keeps_integer_text() {
        let price: Price = "30".parse().unwrap();
        assert_eq!(price.to_string(), "30");
        assert_eq!(serde_json::to_value(&price).unwrap(), json!(30));
    }

    #[test]
    fn decimal_price_round_trips_through_text() {
        let price: Price = serde_json::from_value(json!(29.99)).unwrap();
        let stored = price.to_string();
        assert_eq!(stored, "29.99");
        assert_eq!(stored.parse::<Price>().unwrap(), price);
    }

    #[test]
    fn price_keeps_literal_beyond_float_precision() {
        for literal in ["100000000000000000000", "0.12345678901234567890123", "1e2"] {
            let body = format!(r#"{{ "name": "Exact", "price": {literal} }}"#);
            let new = serde_json::from_str::<CreateProduct>(&body)
                .unwrap()
                .validate()
                .unwrap();
            assert_eq!(new.price.to_string(), literal);
        }
    }

    #[test]
    fn price_rejects_json_strings() {
        assert!(serde_json::from_value::<Price>(json!("29.99")).is_err());
    }

    #[test]
    fn negative_price_detected() {
        assert!(Price::from(-1).is_negative());
        assert!("-0.5".parse::<Price>().unwrap().is_negative());
        assert!(!Price::from(0).is_negative());
    }

    // ── Create validation ─────────────────────────────────────────────────────

    #[test]
    fn create_accepts_name_and_price() {
        let new = create(json!({ "name": "Lamp", "price": 12 })).unwrap();
        assert_eq!(new.name, "Lamp");
        assert_eq!(new.price, Price::from(12));
    }

    #[test]
    fn create_requires_name() {
        let err = create(json!({ "price": 29.99 })).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(msg) if msg == "name is required"));
    }

    #[test]
    fn create_requires_price() {
        let err = create(json!({ "name": "Lamp" })).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(msg) if msg == "price is required"));
    }

    #[test]
    fn create_rejects_blank_name() {
        assert!(matches!(
            create(json!({ "name": "   ", "price": 1 })),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn create_rejects_negative_price() {
        assert!(matches!(
            create(json!({ "name": "Lamp", "price": -3 })),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn create_treats_null_as_missing() {
        assert!(matches!(
            create(json!({ "name": null, "price": 1 })),
            Err(AppError::BadRequest(_))
        ));
    }

    // ── Update validation ─────────────────────────────────────────────────────

    #[test]
    fn empty_update_is_valid() {
        let update = UpdateProduct::default().validate().unwrap();
        assert!(update.name.is_none());
        assert!(update.price.is_none());
    }

    #[test]
    fn update_validates_supplied_fields_only() {
        let ok = UpdateProduct {
            name: None,
            price: Some(Price::from(5)),
        };
        assert!(ok.validate().is_ok());

        let blank = UpdateProduct {
            name: Some(String::new()),
            price: None,
        };
        assert!(matches!(blank.validate(), Err(AppError::BadRequest(_))));

        let negative = UpdateProduct {
            name: None,
            price: Some(Price::from(-1)),
        };
        assert!(matches!(negative.validate(), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn update_price_must_be_a_number() {
        assert!(serde_json::from_value::<UpdateProduct>(json!({ "price": "x" })).is_err());
    }
}
