//! Wire types for the upstream ERP REST API.
//!
//! The ERP wraps every payload in a `{s, d, r?, sp?}` envelope. Field names
//! on the wire are camelCase; a handful of keys are localized.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::constants::DEFAULT_PAGE_SIZE;
use crate::errors::{Result, StorefrontError};

/// Standard response envelope.
///
/// `d` holds the payload on success and an error message (string or list of
/// strings) on failure, so it is kept untyped until the caller knows which.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "s")]
    pub success: bool,
    #[serde(rename = "d", default)]
    pub data: Value,
    /// Resource created by a `save.do` call
    #[serde(rename = "r", default, skip_serializing_if = "Option::is_none")]
    pub created: Option<Value>,
    #[serde(rename = "sp", default, skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
}

impl Envelope {
    /// Human-readable message carried in `d` when `s` is false.
    pub fn error_message(&self) -> String {
        match &self.data {
            Value::String(message) => message.clone(),
            Value::Array(messages) => messages
                .iter()
                .map(|m| m.as_str().map(str::to_string).unwrap_or_else(|| m.to_string()))
                .collect::<Vec<_>>()
                .join("; "),
            Value::Null => "upstream reported failure without a message".to_string(),
            other => other.to_string(),
        }
    }
}

/// Pagination block (`sp`) returned by list endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub page_size: Option<u32>,
    #[serde(default)]
    pub page_count: Option<u32>,
    #[serde(default)]
    pub row_count: Option<u64>,
}

/// One page of a list endpoint: the `d` rows plus the `sp` block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub rows: Vec<T>,
    pub pagination: Option<Pagination>,
}

/// Raw body of the token verification endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TokenVerificationResponse {
    #[serde(rename = "s", default)]
    pub success: bool,
    #[serde(rename = "d", default)]
    pub data: Value,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
}

/// Successful token verification payload.
///
/// Upstream responses are inconsistent: the tenant block is keyed either by
/// `database` or by the localized `data usaha`, and its fields are not always
/// strings. Blocks stay untyped and fields are read leniently, so a usable
/// host is found even when the other block or `alias` is malformed.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TokenPayload {
    #[serde(default)]
    pub database: Option<Value>,
    #[serde(rename = "data usaha", default)]
    pub data_usaha: Option<Value>,
}

impl TokenPayload {
    /// Read the payload from `d`; anything that is not an object has no
    /// tenant block.
    pub fn from_data(data: Value) -> Self {
        serde_json::from_value(data).unwrap_or_default()
    }

    /// Tenant API host, preferring the primary shape.
    pub fn host(&self) -> Option<&str> {
        self.field("host")
    }

    /// Tenant database alias, preferring the primary shape.
    pub fn alias(&self) -> Option<&str> {
        self.field("alias")
    }

    fn field(&self, key: &str) -> Option<&str> {
        [&self.database, &self.data_usaha].into_iter().find_map(|block| {
            block
                .as_ref()?
                .get(key)
                .and_then(Value::as_str)
                .filter(|v| !v.trim().is_empty())
        })
    }
}

/// Catalog item as returned by `item/list.do` and `item/detail.do`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub no: Option<String>,
    #[serde(default)]
    pub item_type: Option<String>,
    #[serde(default)]
    pub unit_price: Option<f64>,
    #[serde(default)]
    pub unit1_name: Option<String>,
    #[serde(default)]
    pub category: Option<Value>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub image_url_thumb: Option<String>,
    /// Fields the detail endpoint returns beyond the list projection
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One entry of an item detail's `detailItemImage` list.
///
/// Paths are relative to the tenant host and need an authenticated fetch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ItemImage {
    pub id: Option<i64>,
    pub file_name: Option<String>,
    pub thumbnail_path: Option<String>,
    pub original_name: Option<String>,
    pub seq: Option<i64>,
}

/// Images attached to one item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemImages {
    pub item_id: i64,
    pub images: Vec<ItemImage>,
    /// Thumbnail of the first image, if it has one
    pub thumbnail: Option<String>,
}

impl ItemImages {
    /// Extract images from an `item/detail.do` payload. A missing or
    /// malformed list yields no images; malformed entries are skipped.
    pub fn from_detail(item_id: i64, detail: &Value) -> Self {
        let images: Vec<ItemImage> = detail
            .get("detailItemImage")
            .and_then(Value::as_array)
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|entry| serde_json::from_value(entry.clone()).ok())
                    .collect()
            })
            .unwrap_or_default();

        let thumbnail = images.first().and_then(|first| first.thumbnail_path.clone());
        Self { item_id, images, thumbnail }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub customer_no: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub mobile_phone: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesOrder {
    pub id: i64,
    #[serde(default)]
    pub number: Option<String>,
    #[serde(default)]
    pub trans_date: Option<String>,
    #[serde(default)]
    pub customer: Option<Value>,
    #[serde(default)]
    pub total: Option<f64>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// `r` block of a successful `customer/save.do`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedCustomer {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub customer_no: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// `r` block of a successful `sales-order/save.do`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedSalesOrder {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub number: Option<String>,
    #[serde(default)]
    pub customer: Option<Value>,
    #[serde(default)]
    pub total: Option<f64>,
}

/// Input for `customer/save.do`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCustomer {
    pub name: String,
    /// `dd/mm/yyyy`
    pub trans_date: String,
    #[serde(default)]
    pub customer_no: Option<String>,
    #[serde(default)]
    pub mobile_phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub bill_street: Option<String>,
    #[serde(default)]
    pub bill_city: Option<String>,
    #[serde(default)]
    pub bill_province: Option<String>,
    #[serde(default)]
    pub bill_country: Option<String>,
    #[serde(default)]
    pub bill_zip_code: Option<String>,
}

impl NewCustomer {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(StorefrontError::InvalidInput("name is required".into()));
        }
        if self.trans_date.trim().is_empty() {
            return Err(StorefrontError::InvalidInput("transDate is required".into()));
        }
        Ok(())
    }

    /// Form fields in wire order; empty optionals are omitted.
    pub fn form_fields(&self) -> Vec<(String, String)> {
        let mut fields = vec![
            ("name".to_string(), self.name.clone()),
            ("transDate".to_string(), self.trans_date.clone()),
        ];

        let optional = [
            ("customerNo", &self.customer_no),
            ("mobilePhone", &self.mobile_phone),
            ("email", &self.email),
            ("billStreet", &self.bill_street),
            ("billCity", &self.bill_city),
            ("billProvince", &self.bill_province),
            ("billCountry", &self.bill_country),
            ("billZipCode", &self.bill_zip_code),
        ];
        for (key, value) in optional {
            if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
                fields.push((key.to_string(), value.to_string()));
            }
        }

        fields
    }
}

/// One line of a sales order draft.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesOrderLine {
    pub item_no: String,
    pub quantity: f64,
    #[serde(default)]
    pub unit_price: Option<f64>,
    #[serde(default)]
    pub discount: Option<f64>,
    #[serde(default)]
    pub detail_notes: Option<String>,
}

/// Input for `sales-order/save.do`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesOrderDraft {
    pub customer_no: String,
    /// `dd/mm/yyyy`; today in the configured zone when absent
    #[serde(default)]
    pub trans_date: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub detail_memo: Option<String>,
    #[serde(default)]
    pub branch_no: Option<String>,
    #[serde(default)]
    pub warehouse_no: Option<String>,
    pub items: Vec<SalesOrderLine>,
}

impl SalesOrderDraft {
    /// Reject drafts the upstream would refuse anyway.
    ///
    /// # Errors
    /// `StorefrontError::InvalidInput` naming the first offending field or
    /// line index.
    pub fn validate(&self) -> Result<()> {
        if self.customer_no.trim().is_empty() {
            return Err(StorefrontError::InvalidInput("customerNo is required".into()));
        }
        if self.items.is_empty() {
            return Err(StorefrontError::InvalidInput(
                "items array is required and must not be empty".into(),
            ));
        }
        for (index, line) in self.items.iter().enumerate() {
            if line.item_no.trim().is_empty() {
                return Err(StorefrontError::InvalidInput(format!(
                    "Item at index {index} is missing itemNo"
                )));
            }
            if line.quantity.is_nan() || line.quantity <= 0.0 {
                return Err(StorefrontError::InvalidInput(format!(
                    "Item at index {index} has invalid quantity"
                )));
            }
        }
        Ok(())
    }

    /// Form fields using the upstream `detailItem[n].field` notation.
    ///
    /// `trans_date` is the resolved transaction date; the draft's own value is
    /// ignored here so the caller decides the fallback.
    pub fn form_fields(&self, trans_date: &str) -> Vec<(String, String)> {
        let mut fields = vec![
            ("customerNo".to_string(), self.customer_no.clone()),
            ("transDate".to_string(), trans_date.to_string()),
        ];

        let optional = [
            ("description", &self.description),
            ("detailMemo", &self.detail_memo),
            ("branchNo", &self.branch_no),
            ("warehouseNo", &self.warehouse_no),
        ];
        for (key, value) in optional {
            if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
                fields.push((key.to_string(), value.to_string()));
            }
        }

        for (index, line) in self.items.iter().enumerate() {
            let prefix = format!("detailItem[{index}]");
            fields.push((format!("{prefix}.itemNo"), line.item_no.clone()));
            fields.push((format!("{prefix}.quantity"), line.quantity.to_string()));
            if let Some(price) = line.unit_price {
                fields.push((format!("{prefix}.unitPrice"), price.to_string()));
            }
            if let Some(discount) = line.discount.filter(|d| *d != 0.0) {
                fields.push((format!("{prefix}.discount"), discount.to_string()));
            }
            if let Some(notes) = line.detail_notes.as_deref().filter(|n| !n.is_empty()) {
                fields.push((format!("{prefix}.detailNotes"), notes.to_string()));
            }
        }

        fields
    }
}

/// Filters for `sales-order/list.do`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SalesOrderQuery {
    pub page: u32,
    pub page_size: u32,
    pub customer_no: Option<String>,
    /// `dd/mm/yyyy`, inclusive
    pub start_date: Option<String>,
    /// `dd/mm/yyyy`, inclusive
    pub end_date: Option<String>,
}

impl Default for SalesOrderQuery {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            customer_no: None,
            start_date: None,
            end_date: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn token_payload_prefers_primary_shape() {
        let payload: TokenPayload = serde_json::from_value(json!({
            "database": { "host": "https://primary.host", "alias": "Main" },
            "data usaha": { "host": "https://legacy.host", "alias": "Legacy" }
        }))
        .unwrap();

        assert_eq!(payload.host(), Some("https://primary.host"));
        assert_eq!(payload.alias(), Some("Main"));
    }

    #[test]
    fn token_payload_falls_back_to_localized_shape() {
        let payload: TokenPayload = serde_json::from_value(json!({
            "data usaha": { "host": "https://legacy.host", "alias": "Toko" }
        }))
        .unwrap();

        assert_eq!(payload.host(), Some("https://legacy.host"));
        assert_eq!(payload.alias(), Some("Toko"));
    }

    #[test]
    fn token_payload_treats_blank_host_as_missing() {
        let payload: TokenPayload = serde_json::from_value(json!({
            "database": { "host": "  " }
        }))
        .unwrap();

        assert_eq!(payload.host(), None);
    }

    #[test]
    fn token_payload_ignores_non_string_alias() {
        let payload: TokenPayload = serde_json::from_value(json!({
            "database": { "host": "https://primary.host", "alias": 123 }
        }))
        .unwrap();

        assert_eq!(payload.host(), Some("https://primary.host"));
        assert_eq!(payload.alias(), None);
    }

    #[test]
    fn token_payload_skips_malformed_primary_block() {
        let payload: TokenPayload = serde_json::from_value(json!({
            "database": "n/a",
            "data usaha": { "host": "https://legacy.host" }
        }))
        .unwrap();

        assert_eq!(payload.host(), Some("https://legacy.host"));
    }

    #[test]
    fn token_payload_from_non_object_data_has_no_host() {
        assert_eq!(TokenPayload::from_data(json!("unexpected")).host(), None);
    }

    #[test]
    fn item_images_take_first_thumbnail() {
        let detail = json!({
            "id": 7,
            "detailItemImage": [
                {"id": 1, "fileName": "/img/a.jpg", "thumbnailPath": "/thumb/a.jpg", "originalName": "a.jpg", "seq": 1},
                {"id": 2, "fileName": "/img/b.jpg", "thumbnailPath": "/thumb/b.jpg", "seq": 2},
                "garbage"
            ]
        });

        let images = ItemImages::from_detail(7, &detail);

        assert_eq!(images.images.len(), 2);
        assert_eq!(images.images[0].original_name.as_deref(), Some("a.jpg"));
        assert_eq!(images.thumbnail.as_deref(), Some("/thumb/a.jpg"));
    }

    #[test]
    fn item_without_images_has_no_thumbnail() {
        let images = ItemImages::from_detail(7, &json!({"id": 7}));
        assert!(images.images.is_empty());
        assert!(images.thumbnail.is_none());
    }

    #[test]
    fn envelope_error_message_joins_lists() {
        let envelope: Envelope = serde_json::from_value(json!({
            "s": false,
            "d": ["Pelanggan tidak ditemukan", "Barang tidak valid"]
        }))
        .unwrap();

        assert!(!envelope.success);
        assert_eq!(envelope.error_message(), "Pelanggan tidak ditemukan; Barang tidak valid");
    }

    #[test]
    fn envelope_keeps_pagination() {
        let envelope: Envelope = serde_json::from_value(json!({
            "s": true,
            "d": [],
            "sp": { "page": 2, "pageSize": 20, "pageCount": 5, "rowCount": 93 }
        }))
        .unwrap();

        let sp = envelope.pagination.unwrap();
        assert_eq!(sp.page, Some(2));
        assert_eq!(sp.row_count, Some(93));
    }

    #[test]
    fn item_keeps_unknown_detail_fields() {
        let item: Item = serde_json::from_value(json!({
            "id": 7,
            "name": "Kopi Susu",
            "no": "KS-01",
            "unitPrice": 18000.0,
            "availableToSell": 12
        }))
        .unwrap();

        assert_eq!(item.no.as_deref(), Some("KS-01"));
        assert_eq!(item.extra.get("availableToSell"), Some(&json!(12)));
    }

    fn draft() -> SalesOrderDraft {
        SalesOrderDraft {
            customer_no: "WEB-1".to_string(),
            description: Some("Web Order".to_string()),
            items: vec![
                SalesOrderLine {
                    item_no: "KS-01".to_string(),
                    quantity: 2.0,
                    unit_price: Some(18000.0),
                    ..Default::default()
                },
                SalesOrderLine {
                    item_no: "RT-02".to_string(),
                    quantity: 1.0,
                    detail_notes: Some("less sugar".to_string()),
                    ..Default::default()
                },
            ],
            ..Default::default()
        }
    }

    #[test]
    fn sales_order_form_uses_indexed_detail_notation() {
        let fields = draft().form_fields("19/10/2026");

        assert!(fields.contains(&("transDate".to_string(), "19/10/2026".to_string())));
        assert!(fields.contains(&("detailItem[0].itemNo".to_string(), "KS-01".to_string())));
        assert!(fields.contains(&("detailItem[0].quantity".to_string(), "2".to_string())));
        assert!(fields.contains(&("detailItem[0].unitPrice".to_string(), "18000".to_string())));
        assert!(fields.contains(&("detailItem[1].detailNotes".to_string(), "less sugar".to_string())));
        assert!(!fields.iter().any(|(k, _)| k == "detailItem[1].unitPrice"));
    }

    #[test]
    fn sales_order_validation_names_bad_line() {
        let mut draft = draft();
        draft.items[1].quantity = 0.0;

        match draft.validate() {
            Err(StorefrontError::InvalidInput(msg)) => {
                assert_eq!(msg, "Item at index 1 has invalid quantity")
            }
            other => panic!("expected invalid input, got {:?}", other),
        }
    }

    #[test]
    fn sales_order_validation_requires_lines() {
        let draft = SalesOrderDraft { customer_no: "C-1".into(), ..Default::default() };
        assert!(draft.validate().is_err());
    }

    #[test]
    fn new_customer_form_omits_empty_optionals() {
        let customer = NewCustomer {
            name: "Budi".to_string(),
            trans_date: "19/10/2026".to_string(),
            email: Some(String::new()),
            mobile_phone: Some("081234567890".to_string()),
            ..Default::default()
        };

        let fields = customer.form_fields();
        assert_eq!(fields.len(), 3);
        assert!(customer.validate().is_ok());
    }
}
