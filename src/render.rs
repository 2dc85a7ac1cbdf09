//! Markdown report rendering.
//!
//! Formats property details and market trend payloads as human-readable
//! markdown. Every field is optional; missing data is skipped rather than
//! rendered as a placeholder.

use serde_json::Value;

// ---------------------------------------------------------------------------
// Property report
// ---------------------------------------------------------------------------

/// Render a single property's details as a markdown report.
///
/// Expects the inner `property` object from a details envelope, not the
/// envelope itself.
pub fn property_report(property: &Value) -> String {
    let mut parts = Vec::new();

    let address = property
        .get("address")
        .and_then(Value::as_str)
        .unwrap_or("Unknown Address");
    parts.push(format!("# Property Details for {address}"));

    if let Some(price) = property.get("price").and_then(Value::as_i64) {
        parts.push(format!("- **Price**: ${}", thousands(price)));
    }
    if let Some(z) = property.get("zestimate").and_then(Value::as_i64) {
        parts.push(format!("- **Zestimate**: ${}", thousands(z)));
    }
    if let Some(beds) = property.get("bedrooms").and_then(Value::as_f64) {
        parts.push(format!("- **Bedrooms**: {}", trim_float(beds)));
    }
    if let Some(baths) = property.get("bathrooms").and_then(Value::as_f64) {
        parts.push(format!("- **Bathrooms**: {}", trim_float(baths)));
    }
    if let Some(sqft) = property.get("sqft").and_then(Value::as_i64) {
        parts.push(format!("- **Square Feet**: {}", thousands(sqft)));
    }
    if let Some(year) = property.get("year_built").and_then(Value::as_i64) {
        parts.push(format!("- **Year Built**: {year}"));
    }
    if let Some(lot) = property.get("lot_size").and_then(Value::as_f64) {
        parts.push(format!("- **Lot Size**: {} acres", trim_float(lot)));
    }
    if let Some(ht) = property.get("home_type").and_then(Value::as_str) {
        parts.push(format!("- **Home Type**: {ht}"));
    }
    if let (Some(date), Some(price)) = (
        property.get("last_sold_date").and_then(Value::as_str),
        property.get("last_sold_price").and_then(Value::as_i64),
    ) {
        parts.push(format!("- **Last Sold**: {date} for ${}", thousands(price)));
    }

    if let Some(features) = property.get("features").and_then(Value::as_array) {
        if !features.is_empty() {
            parts.push(String::new());
            parts.push("## Features".to_string());
            for f in features {
                if let Some(s) = f.as_str() {
                    parts.push(format!("- {s}"));
                }
            }
        }
    }

    if let Some(schools) = property.get("schools").and_then(Value::as_array) {
        if !schools.is_empty() {
            parts.push(String::new());
            parts.push("## Schools".to_string());
            for school in schools {
                let name = school.get("name").and_then(Value::as_str).unwrap_or("Unknown School");
                let level = school.get("level").and_then(Value::as_str).unwrap_or("Unknown Level");
                let rating = school
                    .get("rating")
                    .map(render_scalar)
                    .unwrap_or_else(|| "N/A".to_string());
                let distance = school
                    .get("distance")
                    .map(render_scalar)
                    .unwrap_or_else(|| "Unknown".to_string());
                parts.push(format!(
                    "- **{name}** ({level}): Rating {rating}/10, {distance} miles away"
                ));
            }
        }
    }

    let mut neighborhood = Vec::new();
    if let Some(n) = property.get("neighborhood").and_then(Value::as_str) {
        neighborhood.push(format!("- **Neighborhood**: {n}"));
    }
    if let Some(w) = property.get("walk_score").and_then(Value::as_i64) {
        neighborhood.push(format!("- **Walk Score**: {w}/100"));
    }
    if let Some(t) = property.get("transit_score").and_then(Value::as_i64) {
        neighborhood.push(format!("- **Transit Score**: {t}/100"));
    }
    if !neighborhood.is_empty() {
        parts.push(String::new());
        parts.push("## Neighborhood".to_string());
        parts.extend(neighborhood);
    }

    if let Some(url) = property.get("url").and_then(Value::as_str) {
        parts.push(String::new());
        parts.push(format!("View listing: {url}"));
    }

    parts.join("\n")
}

// ---------------------------------------------------------------------------
// Market trends report
// ---------------------------------------------------------------------------

/// Display formatting for one known trend metric.
struct MetricStyle {
    key: &'static str,
    display_name: &'static str,
    prefix: &'static str,
    suffix: &'static str,
}

const METRIC_STYLES: &[MetricStyle] = &[
    MetricStyle { key: "median_list_price", display_name: "Median Listing Price", prefix: "$", suffix: "" },
    MetricStyle { key: "median_sale_price", display_name: "Median Sale Price", prefix: "$", suffix: "" },
    MetricStyle { key: "median_days_on_market", display_name: "Median Days on Market", prefix: "", suffix: " days" },
];

fn metric_style(key: &str) -> &'static MetricStyle {
    METRIC_STYLES
        .iter()
        .find(|s| s.key == key)
        .unwrap_or(&METRIC_STYLES[2])
}

/// Render market trends for a location as a markdown report.
///
/// Expects the inner `trends` object from a trends envelope. Current values
/// render with their year-over-year change; any metric carrying a
/// `historical` series gets its own dated section.
pub fn market_trends_report(location: &str, trends: &Value) -> String {
    let mut parts = vec![
        format!("# Real Estate Market Trends for {location}"),
        String::new(),
        "## Current Market Overview".to_string(),
    ];

    for style in METRIC_STYLES {
        let Some(metric) = trends.get(style.key) else { continue };
        let (Some(current), Some(change)) = (
            metric.get("current").and_then(Value::as_i64),
            metric.get("change_1year").and_then(Value::as_f64),
        ) else {
            continue;
        };
        parts.push(format!(
            "- **{}**: {}{}{} ({:+.1}% year-over-year)",
            style.display_name,
            style.prefix,
            thousands(current),
            style.suffix,
            change,
        ));
    }

    let historical: Vec<(&String, &Value)> = trends
        .as_object()
        .map(|map| {
            map.iter()
                .filter(|(_, data)| data.get("historical").is_some())
                .collect()
        })
        .unwrap_or_default();

    if !historical.is_empty() {
        parts.push(String::new());
        parts.push("## Historical Trends (Last 12 Months)".to_string());

        for (key, data) in historical {
            let style = metric_style(key);
            parts.push(String::new());
            parts.push(format!("### {}", style.display_name));
            if let Some(points) = data.get("historical").and_then(Value::as_array) {
                for point in points {
                    let (Some(date), Some(value)) = (
                        point.get("date").and_then(Value::as_str),
                        point.get("value").and_then(Value::as_i64),
                    ) else {
                        continue;
                    };
                    parts.push(format!(
                        "- {date}: {}{}{}",
                        style.prefix,
                        thousands(value),
                        style.suffix
                    ));
                }
            }
        }
    }

    parts.join("\n")
}

// ---------------------------------------------------------------------------
// Formatting helpers
// ---------------------------------------------------------------------------

/// Thousands-separated integer rendering ("1234567" to "1,234,567").
fn thousands(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if n < 0 {
        out.push('-');
    }
    let lead = digits.len() % 3;
    if lead > 0 {
        out.push_str(&digits[..lead]);
    }
    for (i, chunk) in digits[lead..].as_bytes().chunks(3).enumerate() {
        if lead > 0 || i > 0 {
            out.push(',');
        }
        out.push_str(std::str::from_utf8(chunk).unwrap_or(""));
    }
    out
}

/// Render a float without a trailing ".0" when it is integral.
fn trim_float(x: f64) -> String {
    if x.fract() == 0.0 {
        format!("{}", x as i64)
    } else {
        format!("{x}")
    }
}

/// Render an arbitrary scalar for inline display.
fn render_scalar(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_thousands() {
        assert_eq!(thousands(0), "0");
        assert_eq!(thousands(999), "999");
        assert_eq!(thousands(1_000), "1,000");
        assert_eq!(thousands(1_234_567), "1,234,567");
        assert_eq!(thousands(-45_000), "-45,000");
    }

    #[test]
    fn test_trim_float() {
        assert_eq!(trim_float(3.0), "3");
        assert_eq!(trim_float(2.5), "2.5");
    }

    #[test]
    fn test_property_report_basic_fields() {
        let property = json!({
            "address": "123 Main St, Portland, OR",
            "price": 550_000,
            "zestimate": 562_300,
            "bedrooms": 3,
            "bathrooms": 2.5,
            "sqft": 1850,
            "year_built": 1978,
            "home_type": "house",
        });
        let report = property_report(&property);
        assert!(report.starts_with("# Property Details for 123 Main St, Portland, OR"));
        assert!(report.contains("- **Price**: $550,000"));
        assert!(report.contains("- **Zestimate**: $562,300"));
        assert!(report.contains("- **Bedrooms**: 3"));
        assert!(report.contains("- **Bathrooms**: 2.5"));
        assert!(report.contains("- **Square Feet**: 1,850"));
        assert!(report.contains("- **Year Built**: 1978"));
    }

    #[test]
    fn test_property_report_skips_missing_fields() {
        let report = property_report(&json!({}));
        assert!(report.contains("Unknown Address"));
        assert!(!report.contains("Price"));
        assert!(!report.contains("## Features"));
        assert!(!report.contains("## Schools"));
        assert!(!report.contains("## Neighborhood"));
    }

    #[test]
    fn test_property_report_sections() {
        let property = json!({
            "address": "9 Elm Ave",
            "features": ["Garage", "Solar panels"],
            "schools": [
                {"name": "Lincoln Elementary", "level": "Elementary", "rating": 8, "distance": 0.4}
            ],
            "neighborhood": "Alphabet District",
            "walk_score": 92,
            "last_sold_date": "2019-06-14",
            "last_sold_price": 415_000,
        });
        let report = property_report(&property);
        assert!(report.contains("## Features"));
        assert!(report.contains("- Solar panels"));
        assert!(report.contains("## Schools"));
        assert!(report.contains("**Lincoln Elementary** (Elementary): Rating 8/10, 0.4 miles away"));
        assert!(report.contains("## Neighborhood"));
        assert!(report.contains("- **Walk Score**: 92/100"));
        assert!(report.contains("- **Last Sold**: 2019-06-14 for $415,000"));
    }

    #[test]
    fn test_trends_report_current_overview() {
        let trends = json!({
            "median_list_price": {"current": 485_000, "change_1year": 4.2},
            "median_days_on_market": {"current": 23, "change_1year": -5.0},
        });
        let report = market_trends_report("Portland, OR", &trends);
        assert!(report.starts_with("# Real Estate Market Trends for Portland, OR"));
        assert!(report.contains("- **Median Listing Price**: $485,000 (+4.2% year-over-year)"));
        assert!(report.contains("- **Median Days on Market**: 23 days (-5.0% year-over-year)"));
        assert!(!report.contains("## Historical Trends"));
    }

    #[test]
    fn test_trends_report_historical_sections() {
        let trends = json!({
            "median_sale_price": {
                "current": 470_000,
                "change_1year": 2.1,
                "historical": [
                    {"date": "2025-09", "value": 455_000},
                    {"date": "2025-10", "value": 458_500},
                ],
            },
        });
        let report = market_trends_report("Austin, TX", &trends);
        assert!(report.contains("## Historical Trends (Last 12 Months)"));
        assert!(report.contains("### Median Sale Price"));
        assert!(report.contains("- 2025-09: $455,000"));
        assert!(report.contains("- 2025-10: $458,500"));
    }

    #[test]
    fn test_trends_report_skips_incomplete_metrics() {
        // Metric present but missing change_1year is skipped from the overview
        let trends = json!({
            "median_list_price": {"current": 485_000},
        });
        let report = market_trends_report("Nowhere", &trends);
        assert!(!report.contains("Median Listing Price"));
    }
}
