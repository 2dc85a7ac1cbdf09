//! Property data operations.
//!
//! `PropertyClient` wraps the request pipeline with one method per upstream
//! operation. Each method validates its inputs, shapes the query parameters,
//! checks the payload for the expected top-level key, and wraps the result
//! in a uniform envelope: `success`, the data, the echoed criteria, and a
//! `metadata` block with a timestamp and source tag.
//!
//! Failures never panic out of this layer. A failed operation returns a
//! `success: false` envelope carrying the error text, so callers can render
//! it directly.

use chrono::Utc;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::pipeline::RequestPipeline;
use crate::types::{Params, PipelineError, DETAILS, HEALTH, MARKET_TRENDS, SEARCH, ZESTIMATES};

/// Source tag stamped into every envelope's metadata.
const SOURCE: &str = "HEARTH Data Server";

/// Metrics requested when the caller does not name any.
const DEFAULT_TREND_METRICS: &[&str] = &[
    "median_list_price",
    "median_sale_price",
    "median_days_on_market",
];

/// Time window requested when the caller does not name one.
const DEFAULT_TIME_PERIOD: &str = "1year";

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// Search criteria. Only `location` and `listing_type` always reach the
/// upstream query; each optional bound is sent when present and re-applied
/// client-side, since the upstream does not guarantee strict filtering.
#[derive(Debug, Clone, Default)]
pub struct SearchCriteria {
    pub location: String,
    /// "forSale", "forRent", or "sold".
    pub listing_type: String,
    pub price_min: Option<i64>,
    pub price_max: Option<i64>,
    pub beds_min: Option<i64>,
    pub beds_max: Option<i64>,
    pub baths_min: Option<f64>,
    pub baths_max: Option<f64>,
    pub home_types: Option<Vec<String>>,
}

impl SearchCriteria {
    /// For-sale search in the given location with no bounds.
    pub fn for_sale(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            listing_type: "forSale".to_string(),
            ..Self::default()
        }
    }

    fn to_params(&self) -> Params {
        let mut params = Params::new();
        params.insert("location".to_string(), json!(self.location));
        params.insert("type".to_string(), json!(self.listing_type));
        if let Some(v) = self.price_min {
            params.insert("price_min".to_string(), json!(v));
        }
        if let Some(v) = self.price_max {
            params.insert("price_max".to_string(), json!(v));
        }
        if let Some(v) = self.beds_min {
            params.insert("beds_min".to_string(), json!(v));
        }
        if let Some(v) = self.beds_max {
            params.insert("beds_max".to_string(), json!(v));
        }
        if let Some(v) = self.baths_min {
            params.insert("baths_min".to_string(), json!(v));
        }
        if let Some(v) = self.baths_max {
            params.insert("baths_max".to_string(), json!(v));
        }
        if let Some(v) = &self.home_types {
            params.insert("home_types".to_string(), json!(v));
        }
        params
    }
}

/// How a single property is identified. The two upstream lookups accept
/// either a Zillow property id or a full address, never both.
#[derive(Debug, Clone)]
pub enum PropertyKey {
    Zpid(String),
    Address(String),
}

impl PropertyKey {
    fn to_params(&self) -> Params {
        let mut params = Params::new();
        match self {
            PropertyKey::Zpid(id) => params.insert("zpid".to_string(), json!(id)),
            PropertyKey::Address(addr) => params.insert("address".to_string(), json!(addr)),
        };
        params
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct PropertyClient {
    pipeline: RequestPipeline,
}

impl PropertyClient {
    pub fn new(pipeline: RequestPipeline) -> Self {
        Self { pipeline }
    }

    /// Search for property listings matching the criteria.
    ///
    /// The upstream result is post-filtered against every bound in the
    /// criteria before the envelope is assembled, so `count` reflects the
    /// listings actually returned.
    pub async fn search_properties(&self, criteria: &SearchCriteria) -> Value {
        info!(
            location = %criteria.location,
            listing_type = %criteria.listing_type,
            "Searching properties"
        );
        let params = criteria.to_params();

        let outcome = self
            .pipeline
            .execute(&SEARCH, params.clone())
            .await
            .and_then(|payload| {
                payload
                    .get("properties")
                    .and_then(Value::as_array)
                    .cloned()
                    .ok_or_else(|| {
                        PipelineError::UpstreamData(
                            "No properties found or invalid API response".to_string(),
                        )
                    })
            });

        match outcome {
            Ok(listings) => {
                let filtered: Vec<Value> = listings
                    .into_iter()
                    .filter(|p| matches_criteria(p, criteria))
                    .collect();
                json!({
                    "success": true,
                    "count": filtered.len(),
                    "properties": filtered,
                    "search_criteria": Value::Object(params),
                    "metadata": metadata(),
                })
            }
            Err(e) => {
                warn!(location = %criteria.location, error = %e, "Property search failed");
                failure(&e, params)
            }
        }
    }

    /// Detailed information for a single property.
    pub async fn get_property_details(&self, key: &PropertyKey) -> Value {
        let params = key.to_params();
        match self.fetch_keyed(&DETAILS, params.clone(), "property").await {
            Ok(property) => json!({
                "success": true,
                "property": property,
                "metadata": metadata(),
            }),
            Err(e) => {
                warn!(error = %e, "Property details lookup failed");
                failure(&e, params)
            }
        }
    }

    /// Automated valuation estimate for a single property.
    pub async fn get_zestimate(&self, key: &PropertyKey) -> Value {
        let params = key.to_params();
        match self.fetch_keyed(&ZESTIMATES, params.clone(), "zestimate").await {
            Ok(zestimate) => json!({
                "success": true,
                "zestimate": zestimate,
                "metadata": metadata(),
            }),
            Err(e) => {
                warn!(error = %e, "Zestimate lookup failed");
                failure(&e, params)
            }
        }
    }

    /// Market trend metrics for a location. Empty `metrics` requests the
    /// default set; empty `time_period` requests the default window.
    pub async fn get_market_trends(
        &self,
        location: &str,
        metrics: &[String],
        time_period: &str,
    ) -> Value {
        let metrics: Vec<String> = if metrics.is_empty() {
            DEFAULT_TREND_METRICS.iter().map(|s| s.to_string()).collect()
        } else {
            metrics.to_vec()
        };
        let time_period = if time_period.is_empty() {
            DEFAULT_TIME_PERIOD
        } else {
            time_period
        };

        let mut params = Params::new();
        params.insert("location".to_string(), json!(location));
        params.insert("metrics".to_string(), json!(metrics));
        params.insert("time_period".to_string(), json!(time_period));

        match self.fetch_keyed(&MARKET_TRENDS, params.clone(), "trends").await {
            Ok(trends) => json!({
                "success": true,
                "location": location,
                "trends": trends,
                "time_period": time_period,
                "metadata": metadata(),
            }),
            Err(e) => {
                warn!(location, error = %e, "Market trends lookup failed");
                failure(&e, params)
            }
        }
    }

    /// Probe upstream reachability and report latency.
    ///
    /// Unlike the data operations, failure here is still a `success: false`
    /// report with the measured latency, not an error.
    pub async fn check_health(&self) -> Value {
        let start = Utc::now();
        let outcome = self.pipeline.execute(&HEALTH, Params::new()).await;
        let elapsed_ms = (Utc::now() - start).num_milliseconds();

        match outcome {
            Ok(payload) => json!({
                "success": true,
                "api_available": true,
                "response_time_ms": elapsed_ms,
                "timestamp": start.to_rfc3339(),
                "upstream_status": payload.get("status").cloned().unwrap_or(json!("OK")),
                "api_version": payload.get("version").cloned().unwrap_or(json!("unknown")),
            }),
            Err(e) => {
                warn!(error = %e, "Health check failed");
                json!({
                    "success": false,
                    "api_available": false,
                    "response_time_ms": elapsed_ms,
                    "timestamp": start.to_rfc3339(),
                    "error": e.to_string(),
                })
            }
        }
    }

    /// Execute and extract the expected top-level key. A decoded payload
    /// missing the key is a data error, same as an empty one.
    async fn fetch_keyed(
        &self,
        endpoint: &crate::types::Endpoint,
        params: Params,
        key: &str,
    ) -> Result<Value, PipelineError> {
        let payload = self.pipeline.execute(endpoint, params).await?;
        payload.get(key).cloned().ok_or_else(|| {
            PipelineError::UpstreamData(format!("response is missing the '{key}' field"))
        })
    }
}

// ---------------------------------------------------------------------------
// Envelope helpers
// ---------------------------------------------------------------------------

fn metadata() -> Value {
    json!({
        "timestamp": Utc::now().to_rfc3339(),
        "source": SOURCE,
    })
}

fn failure(error: &PipelineError, params: Params) -> Value {
    json!({
        "success": false,
        "error": error.to_string(),
        "search_criteria": Value::Object(params),
    })
}

// ---------------------------------------------------------------------------
// Client-side filtering
// ---------------------------------------------------------------------------

/// Numeric field lookup with the same forgiving default the bounds compare
/// against: a missing or non-numeric field reads as zero.
fn field_f64(listing: &Value, field: &str) -> f64 {
    listing.get(field).and_then(Value::as_f64).unwrap_or(0.0)
}

fn matches_criteria(listing: &Value, criteria: &SearchCriteria) -> bool {
    if let Some(min) = criteria.price_min {
        if field_f64(listing, "price") < min as f64 {
            return false;
        }
    }
    if let Some(max) = criteria.price_max {
        if field_f64(listing, "price") > max as f64 {
            return false;
        }
    }
    if let Some(min) = criteria.beds_min {
        if field_f64(listing, "bedrooms") < min as f64 {
            return false;
        }
    }
    if let Some(max) = criteria.beds_max {
        if field_f64(listing, "bedrooms") > max as f64 {
            return false;
        }
    }
    if let Some(min) = criteria.baths_min {
        if field_f64(listing, "bathrooms") < min {
            return false;
        }
    }
    if let Some(max) = criteria.baths_max {
        if field_f64(listing, "bathrooms") > max {
            return false;
        }
    }
    if let Some(types) = &criteria.home_types {
        let listing_type = listing
            .get("home_type")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_lowercase();
        if !types.iter().any(|t| t.to_lowercase() == listing_type) {
            return false;
        }
    }
    true
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn listing(price: i64, beds: i64, baths: f64, home_type: &str) -> Value {
        json!({
            "price": price,
            "bedrooms": beds,
            "bathrooms": baths,
            "home_type": home_type,
        })
    }

    #[test]
    fn test_criteria_params_include_only_set_bounds() {
        let criteria = SearchCriteria {
            price_max: Some(500_000),
            beds_min: Some(3),
            ..SearchCriteria::for_sale("Austin, TX")
        };
        let params = criteria.to_params();
        assert_eq!(params.get("location"), Some(&json!("Austin, TX")));
        assert_eq!(params.get("type"), Some(&json!("forSale")));
        assert_eq!(params.get("price_max"), Some(&json!(500_000)));
        assert_eq!(params.get("beds_min"), Some(&json!(3)));
        assert!(params.get("price_min").is_none());
        assert!(params.get("home_types").is_none());
    }

    #[test]
    fn test_property_key_params() {
        let zpid = PropertyKey::Zpid("12345".into()).to_params();
        assert_eq!(zpid.get("zpid"), Some(&json!("12345")));
        assert!(zpid.get("address").is_none());

        let addr = PropertyKey::Address("1 Main St".into()).to_params();
        assert_eq!(addr.get("address"), Some(&json!("1 Main St")));
        assert!(addr.get("zpid").is_none());
    }

    #[test]
    fn test_filter_price_bounds() {
        let criteria = SearchCriteria {
            price_min: Some(200_000),
            price_max: Some(400_000),
            ..SearchCriteria::for_sale("X")
        };
        assert!(matches_criteria(&listing(300_000, 3, 2.0, "house"), &criteria));
        assert!(!matches_criteria(&listing(150_000, 3, 2.0, "house"), &criteria));
        assert!(!matches_criteria(&listing(450_000, 3, 2.0, "house"), &criteria));
        // Boundary values pass (inclusive bounds)
        assert!(matches_criteria(&listing(200_000, 3, 2.0, "house"), &criteria));
        assert!(matches_criteria(&listing(400_000, 3, 2.0, "house"), &criteria));
    }

    #[test]
    fn test_filter_beds_and_baths() {
        let criteria = SearchCriteria {
            beds_min: Some(3),
            baths_min: Some(2.5),
            ..SearchCriteria::for_sale("X")
        };
        assert!(matches_criteria(&listing(1, 3, 2.5, "house"), &criteria));
        assert!(!matches_criteria(&listing(1, 2, 2.5, "house"), &criteria));
        assert!(!matches_criteria(&listing(1, 3, 2.0, "house"), &criteria));
    }

    #[test]
    fn test_filter_home_types_case_insensitive() {
        let criteria = SearchCriteria {
            home_types: Some(vec!["House".to_string(), "Condo".to_string()]),
            ..SearchCriteria::for_sale("X")
        };
        assert!(matches_criteria(&listing(1, 1, 1.0, "house"), &criteria));
        assert!(matches_criteria(&listing(1, 1, 1.0, "CONDO"), &criteria));
        assert!(!matches_criteria(&listing(1, 1, 1.0, "apartment"), &criteria));
    }

    #[test]
    fn test_filter_missing_fields_read_as_zero() {
        // A listing with no price fails a price_min bound but passes price_max
        let bare = json!({"address": "somewhere"});
        let with_min = SearchCriteria {
            price_min: Some(100),
            ..SearchCriteria::for_sale("X")
        };
        let with_max = SearchCriteria {
            price_max: Some(100),
            ..SearchCriteria::for_sale("X")
        };
        assert!(!matches_criteria(&bare, &with_min));
        assert!(matches_criteria(&bare, &with_max));
    }

    #[test]
    fn test_unbounded_criteria_match_everything() {
        let criteria = SearchCriteria::for_sale("Anywhere");
        assert!(matches_criteria(&listing(1, 0, 0.0, ""), &criteria));
        assert!(matches_criteria(&json!({}), &criteria));
    }

    #[test]
    fn test_failure_envelope_shape() {
        let mut params = Params::new();
        params.insert("location".to_string(), json!("Nowhere"));
        let env = failure(
            &PipelineError::UpstreamData("empty response from upstream API".into()),
            params,
        );
        assert_eq!(env["success"], json!(false));
        assert!(env["error"].as_str().unwrap().contains("empty response"));
        assert_eq!(env["search_criteria"]["location"], json!("Nowhere"));
    }

    #[test]
    fn test_metadata_shape() {
        let meta = metadata();
        assert_eq!(meta["source"], json!(SOURCE));
        assert!(meta["timestamp"].as_str().unwrap().contains('T'));
    }
}
