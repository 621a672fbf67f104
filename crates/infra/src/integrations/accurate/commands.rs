//! Typed ERP operations on top of [`AccurateClient::call`].

use futures::future::join_all;
use serde::de::DeserializeOwned;
use serde_json::Value;
use storefront_domain::constants::{
    CUSTOMER_DETAIL_PATH, CUSTOMER_SAVE_PATH, ITEM_DETAIL_PATH, ITEM_LIST_FIELDS, ITEM_LIST_PATH,
    SALES_ORDER_DETAIL_PATH, SALES_ORDER_LIST_FIELDS, SALES_ORDER_LIST_PATH,
    SALES_ORDER_SAVE_PATH,
};
use storefront_domain::{
    Customer, Envelope, Item, ItemImages, NewCustomer, Page, SalesOrder, SalesOrderDraft, SalesOrderQuery,
    SavedCustomer, SavedSalesOrder,
};
use tracing::{debug, info, instrument, warn};
use url::form_urlencoded;

use super::client::{AccurateClient, AccurateResponse, CallOptions};
use super::errors::{AccurateError, UpstreamBody};

/// Item, customer and sales-order endpoints.
#[derive(Debug, Clone)]
pub struct AccurateCommands {
    client: AccurateClient,
}

impl AccurateCommands {
    /// Commands issued through `client`.
    pub fn new(client: AccurateClient) -> Self {
        Self { client }
    }

    /// Underlying facade, for endpoints without a typed command.
    pub fn client(&self) -> &AccurateClient {
        &self.client
    }

    #[instrument(skip(self))]
    pub async fn list_items(&self) -> Result<Page<Item>, AccurateError> {
        let path = with_query(ITEM_LIST_PATH, &[("fields", ITEM_LIST_FIELDS.to_string())]);
        let envelope = self.fetch(&path, CallOptions::get()).await?;
        let page = page_of(envelope)?;
        debug!(rows = page.rows.len(), "fetched items");
        Ok(page)
    }

    #[instrument(skip(self))]
    pub async fn item_detail(&self, id: i64) -> Result<Item, AccurateError> {
        self.detail(ITEM_DETAIL_PATH, id).await
    }

    /// Images of each item in `ids`, in input order.
    ///
    /// Every detail request goes through the shared scheduler, which bounds
    /// the fan-out. A failed id yields its own `Err` without affecting the
    /// others.
    #[instrument(skip(self, ids), fields(items = ids.len()))]
    pub async fn item_images(&self, ids: &[i64]) -> Vec<(i64, Result<ItemImages, AccurateError>)> {
        let lookups = ids.iter().map(|&id| async move {
            let result = self
                .detail::<Value>(ITEM_DETAIL_PATH, id)
                .await
                .map(|detail| ItemImages::from_detail(id, &detail));
            if let Err(err) = &result {
                warn!(item_id = id, error = %err, "failed to fetch item images");
            }
            (id, result)
        });
        let results = join_all(lookups).await;

        let fetched = results.iter().filter(|(_, result)| result.is_ok()).count();
        info!(fetched, requested = ids.len(), "item images fetched");
        results
    }

    #[instrument(skip(self))]
    pub async fn customer_detail(&self, id: i64) -> Result<Customer, AccurateError> {
        self.detail(CUSTOMER_DETAIL_PATH, id).await
    }

    /// Create a customer. Returns the saved record from the envelope's `r`.
    #[instrument(skip(self, customer), fields(name = %customer.name))]
    pub async fn save_customer(
        &self,
        customer: &NewCustomer,
    ) -> Result<SavedCustomer, AccurateError> {
        customer.validate()?;

        let envelope =
            self.fetch(CUSTOMER_SAVE_PATH, CallOptions::post().form(customer.form_fields())).await?;
        let saved: SavedCustomer = created(envelope)?;
        info!(id = ?saved.id, customer_no = ?saved.customer_no, "customer saved");
        Ok(saved)
    }

    #[instrument(skip(self))]
    pub async fn list_sales_orders(
        &self,
        query: &SalesOrderQuery,
    ) -> Result<Page<SalesOrder>, AccurateError> {
        let path = with_query(SALES_ORDER_LIST_PATH, &sales_order_filters(query));
        let envelope = self.fetch(&path, CallOptions::get()).await?;
        let page = page_of(envelope)?;
        debug!(rows = page.rows.len(), "fetched sales orders");
        Ok(page)
    }

    #[instrument(skip(self))]
    pub async fn sales_order_detail(&self, id: i64) -> Result<SalesOrder, AccurateError> {
        self.detail(SALES_ORDER_DETAIL_PATH, id).await
    }

    /// Create a sales order. `transDate` falls back to today in the ERP's
    /// zone.
    #[instrument(skip(self, draft), fields(customer_no = %draft.customer_no, lines = draft.items.len()))]
    pub async fn save_sales_order(
        &self,
        draft: &SalesOrderDraft,
    ) -> Result<SavedSalesOrder, AccurateError> {
        draft.validate()?;

        let trans_date = match draft.trans_date.as_deref().filter(|d| !d.trim().is_empty()) {
            Some(date) => date.to_string(),
            None => self.client.today(),
        };
        let options = CallOptions::post().form(draft.form_fields(&trans_date));
        let envelope = self.fetch(SALES_ORDER_SAVE_PATH, options).await?;
        let saved: SavedSalesOrder = created(envelope)?;
        info!(id = ?saved.id, number = ?saved.number, "sales order saved");
        Ok(saved)
    }

    async fn detail<T: DeserializeOwned>(&self, path: &str, id: i64) -> Result<T, AccurateError> {
        let path = with_query(path, &[("id", id.to_string())]);
        let envelope = self.fetch(&path, CallOptions::get()).await?;
        decode(envelope.data)
    }

    /// Call and unwrap the `{s, d}` envelope; `s == false` becomes an
    /// upstream error.
    async fn fetch(&self, path: &str, options: CallOptions) -> Result<Envelope, AccurateError> {
        let value = match self.client.call(path, options).await? {
            AccurateResponse::Json(value) => value,
            AccurateResponse::Text(text) => {
                return Err(AccurateError::Decode(format!(
                    "expected a JSON envelope, got text: {}",
                    text.chars().take(100).collect::<String>()
                )))
            }
        };

        let envelope: Envelope = serde_json::from_value(value.clone())
            .map_err(|e| AccurateError::Decode(format!("invalid envelope: {e}")))?;
        if !envelope.success {
            return Err(AccurateError::Upstream { status: 200, body: UpstreamBody::Json(value) });
        }
        Ok(envelope)
    }
}

fn with_query(path: &str, params: &[(&str, String)]) -> String {
    let mut query = form_urlencoded::Serializer::new(String::new());
    for (key, value) in params {
        query.append_pair(key, value);
    }
    format!("{path}?{}", query.finish())
}

fn sales_order_filters(query: &SalesOrderQuery) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("fields", SALES_ORDER_LIST_FIELDS.to_string()),
        ("sp.page", query.page.to_string()),
        ("sp.pageSize", query.page_size.to_string()),
    ];

    if let Some(customer_no) = non_blank(&query.customer_no) {
        params.push(("filter.customerNo.op", "EXACT".to_string()));
        params.push(("filter.customerNo", customer_no.to_string()));
    }

    match (non_blank(&query.start_date), non_blank(&query.end_date)) {
        (Some(start), Some(end)) => {
            params.push(("filter.transDate.op", "BETWEEN".to_string()));
            params.push(("filter.transDate.val[0]", start.to_string()));
            params.push(("filter.transDate.val[1]", end.to_string()));
        }
        (Some(start), None) => {
            params.push(("filter.transDate.op", "GREATER_THAN_OR_EQUAL".to_string()));
            params.push(("filter.transDate", start.to_string()));
        }
        (None, Some(end)) => {
            params.push(("filter.transDate.op", "LESS_THAN_OR_EQUAL".to_string()));
            params.push(("filter.transDate", end.to_string()));
        }
        (None, None) => {}
    }

    params
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn decode<T: DeserializeOwned>(data: Value) -> Result<T, AccurateError> {
    serde_json::from_value(data)
        .map_err(|e| AccurateError::Decode(format!("unexpected payload shape: {e}")))
}

fn page_of<T: DeserializeOwned>(envelope: Envelope) -> Result<Page<T>, AccurateError> {
    let rows = match envelope.data {
        Value::Null => Vec::new(),
        data => decode(data)?,
    };
    Ok(Page { rows, pagination: envelope.pagination })
}

fn created<T: DeserializeOwned>(envelope: Envelope) -> Result<T, AccurateError> {
    match envelope.created {
        Some(record) => decode(record),
        None => Err(AccurateError::Decode("save response has no `r` record".into())),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn params(query: &SalesOrderQuery) -> Vec<(String, String)> {
        sales_order_filters(query).into_iter().map(|(k, v)| (k.to_string(), v)).collect()
    }

    #[test]
    fn query_string_is_form_encoded() {
        let path = with_query(ITEM_LIST_PATH, &[("fields", "id,name".to_string())]);
        assert_eq!(path, "/accurate/api/item/list.do?fields=id%2Cname");
    }

    #[test]
    fn default_sales_order_query_has_paging_only() {
        let params = params(&SalesOrderQuery::default());
        assert_eq!(params.len(), 3);
        assert!(params.contains(&("sp.page".into(), "1".into())));
        assert!(params.contains(&("sp.pageSize".into(), "20".into())));
    }

    #[test]
    fn date_range_becomes_between_filter() {
        let query = SalesOrderQuery {
            customer_no: Some("C-001".into()),
            start_date: Some("01/01/2024".into()),
            end_date: Some("31/01/2024".into()),
            ..SalesOrderQuery::default()
        };
        let params = params(&query);

        assert!(params.contains(&("filter.customerNo.op".into(), "EXACT".into())));
        assert!(params.contains(&("filter.customerNo".into(), "C-001".into())));
        assert!(params.contains(&("filter.transDate.op".into(), "BETWEEN".into())));
        assert!(params.contains(&("filter.transDate.val[0]".into(), "01/01/2024".into())));
        assert!(params.contains(&("filter.transDate.val[1]".into(), "31/01/2024".into())));
    }

    #[test]
    fn single_bound_uses_comparison_operator() {
        let query =
            SalesOrderQuery { end_date: Some("31/01/2024".into()), ..SalesOrderQuery::default() };
        let params = params(&query);

        assert!(params.contains(&("filter.transDate.op".into(), "LESS_THAN_OR_EQUAL".into())));
        assert!(params.contains(&("filter.transDate".into(), "31/01/2024".into())));
    }

    #[test]
    fn blank_filters_are_ignored() {
        let query = SalesOrderQuery {
            customer_no: Some("  ".into()),
            start_date: Some(String::new()),
            ..SalesOrderQuery::default()
        };
        assert_eq!(params(&query).len(), 3);
    }

    #[test]
    fn null_list_data_is_an_empty_page() {
        let envelope: Envelope = serde_json::from_value(json!({"s": true, "d": null})).unwrap();
        let page: Page<Item> = page_of(envelope).unwrap();
        assert!(page.rows.is_empty());
        assert!(page.pagination.is_none());
    }

    #[test]
    fn save_without_record_is_decode_error() {
        let envelope: Envelope = serde_json::from_value(json!({"s": true, "d": "ok"})).unwrap();
        let result: Result<SavedCustomer, _> = created(envelope);
        assert!(matches!(result, Err(AccurateError::Decode(_))));
    }
}
