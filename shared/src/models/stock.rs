//! Stock observation records as returned by the marketplace statistics API

use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// One observed quantity of one product variant at one location.
///
/// Field names mirror the marketplace payload (camelCase on the wire); the
/// same shape is persisted verbatim in the per-account sync cache so cache
/// files stay diffable against raw API responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockRecord {
    #[serde(rename = "supplierArticle", default, deserialize_with = "de_string")]
    pub supplier_article: String,

    #[serde(rename = "productId", default, deserialize_with = "de_opt_i64")]
    pub product_id: Option<i64>,

    #[serde(default, deserialize_with = "de_opt_string")]
    pub barcode: Option<String>,

    #[serde(rename = "warehouseName", default, deserialize_with = "de_opt_string")]
    pub location_name: Option<String>,

    #[serde(default, deserialize_with = "de_lenient_i64")]
    pub quantity: i64,

    #[serde(rename = "inWayToClient", default, deserialize_with = "de_lenient_i64")]
    pub in_transit_to_customer: i64,

    #[serde(rename = "inWayFromClient", default, deserialize_with = "de_lenient_i64")]
    pub in_transit_from_customer: i64,

    #[serde(rename = "quantityFull", default, deserialize_with = "de_lenient_i64")]
    pub quantity_full: i64,

    #[serde(default, deserialize_with = "de_opt_string")]
    pub category: Option<String>,

    #[serde(default, deserialize_with = "de_opt_string")]
    pub subject: Option<String>,

    #[serde(default, deserialize_with = "de_opt_string")]
    pub brand: Option<String>,

    #[serde(rename = "techSize", default, deserialize_with = "de_opt_string")]
    pub size: Option<String>,

    #[serde(default)]
    pub price: Option<Decimal>,

    #[serde(default)]
    pub discount: Option<Decimal>,

    #[serde(rename = "lastChangeDate", default, with = "timestamp")]
    pub last_changed_at: Option<DateTime<Utc>>,
}

impl Default for StockRecord {
    fn default() -> Self {
        Self {
            supplier_article: String::new(),
            product_id: None,
            barcode: None,
            location_name: None,
            quantity: 0,
            in_transit_to_customer: 0,
            in_transit_from_customer: 0,
            quantity_full: 0,
            category: None,
            subject: None,
            brand: None,
            size: None,
            price: None,
            discount: None,
            last_changed_at: None,
        }
    }
}

impl StockRecord {
    /// Composite identity used for cache upsert:
    /// `article|product_id|barcode|location`, components trimmed.
    pub fn composite_key(&self) -> String {
        let product_id = self
            .product_id
            .map(|id| id.to_string())
            .unwrap_or_default();
        format!(
            "{}|{}|{}|{}",
            self.supplier_article.trim(),
            product_id,
            self.barcode.as_deref().unwrap_or("").trim(),
            self.location_name.as_deref().unwrap_or("").trim(),
        )
    }
}

/// Parse a marketplace timestamp: RFC-3339 (with `Z` or offset) or a naive
/// datetime assumed to be UTC, optionally with fractional seconds.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let text = raw.trim();
    if text.is_empty() {
        return None;
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(naive.and_utc());
        }
    }
    None
}

/// Render a timestamp the way the marketplace does: second precision, `Z`.
pub fn format_timestamp(moment: DateTime<Utc>) -> String {
    moment.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

mod timestamp {
    use super::*;

    pub fn serialize<S: Serializer>(
        value: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(moment) => serializer.serialize_str(&format_timestamp(*moment)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.as_deref().and_then(parse_timestamp))
    }
}

/// Number cell as it actually appears on the wire: int, float, string or null.
#[derive(Deserialize)]
#[serde(untagged)]
enum LenientNumber {
    Int(i64),
    Float(f64),
    Text(String),
    Missing(()),
}

fn de_lenient_i64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    Ok(match LenientNumber::deserialize(deserializer)? {
        LenientNumber::Int(value) => value,
        LenientNumber::Float(value) => value as i64,
        LenientNumber::Text(text) => text.trim().parse::<f64>().map(|v| v as i64).unwrap_or(0),
        LenientNumber::Missing(()) => 0,
    })
}

fn de_opt_i64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    Ok(match LenientNumber::deserialize(deserializer)? {
        LenientNumber::Int(value) => Some(value),
        LenientNumber::Float(value) => Some(value as i64),
        LenientNumber::Text(text) => text.trim().parse::<f64>().ok().map(|v| v as i64),
        LenientNumber::Missing(()) => None,
    })
}

/// String-ish cell: numbers are stringified, null stays absent.
#[derive(Deserialize)]
#[serde(untagged)]
enum LenientText {
    Text(String),
    Int(i64),
    Float(f64),
    Missing(()),
}

fn de_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match LenientText::deserialize(deserializer)? {
        LenientText::Text(text) => text,
        LenientText::Int(value) => value.to_string(),
        LenientText::Float(value) => value.to_string(),
        LenientText::Missing(()) => String::new(),
    })
}

fn de_opt_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match LenientText::deserialize(deserializer)? {
        LenientText::Text(text) => Some(text),
        LenientText::Int(value) => Some(value.to_string()),
        LenientText::Float(value) => Some(value.to_string()),
        LenientText::Missing(()) => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_marketplace_payload() {
        let record: StockRecord = serde_json::from_str(
            r#"{
                "supplierArticle": "sku-1",
                "productId": 12345,
                "barcode": 4600000000017,
                "warehouseName": "Moscow",
                "quantity": 4.0,
                "quantityFull": "7",
                "lastChangeDate": "2024-03-01T10:15:00"
            }"#,
        )
        .unwrap();

        assert_eq!(record.supplier_article, "sku-1");
        assert_eq!(record.product_id, Some(12345));
        assert_eq!(record.barcode.as_deref(), Some("4600000000017"));
        assert_eq!(record.quantity, 4);
        assert_eq!(record.quantity_full, 7);
        assert_eq!(
            record.last_changed_at.map(format_timestamp).as_deref(),
            Some("2024-03-01T10:15:00Z")
        );
    }

    #[test]
    fn composite_key_trims_components() {
        let record = StockRecord {
            supplier_article: " sku-1 ".into(),
            product_id: Some(42),
            barcode: Some(" 123 ".into()),
            location_name: Some("Moscow".into()),
            ..StockRecord::default()
        };
        assert_eq!(record.composite_key(), "sku-1|42|123|Moscow");
    }

    #[test]
    fn timestamp_roundtrip_accepts_zulu_and_naive() {
        let zulu = parse_timestamp("2024-03-01T10:15:00Z").unwrap();
        let naive = parse_timestamp("2024-03-01T10:15:00").unwrap();
        assert_eq!(zulu, naive);
        assert_eq!(parse_timestamp(""), None);
        assert_eq!(parse_timestamp("not-a-date"), None);
    }

    #[test]
    fn cache_serialization_keeps_wire_names() {
        let record = StockRecord {
            supplier_article: "sku-1".into(),
            last_changed_at: parse_timestamp("2024-03-01T10:15:00Z"),
            ..StockRecord::default()
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["supplierArticle"], "sku-1");
        assert_eq!(json["lastChangeDate"], "2024-03-01T10:15:00Z");
    }
}
