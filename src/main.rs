//! HEARTH — Resilient real-estate data client with a local mortgage engine
//!
//! Entry point. Loads configuration, initialises structured logging,
//! verifies upstream connectivity, and dispatches one subcommand:
//! search, details, zestimate, trends, mortgage, or health.

use anyhow::{bail, Result};
use serde_json::Value;
use tracing::{info, warn};

use hearth::config::AppConfig;
use hearth::mortgage::{MortgageEngine, MortgageInputs};
use hearth::pipeline::RequestPipeline;
use hearth::render;
use hearth::tools::{PropertyClient, PropertyKey, SearchCriteria};

const USAGE: &str = "\
HEARTH — real-estate data client

Usage:
  hearth search <location> [listing_type] [price_min] [price_max]
  hearth details (--zpid <id> | --address <addr>)
  hearth zestimate (--zpid <id> | --address <addr>)
  hearth trends <location> [time_period]
  hearth mortgage <home_price> [down_payment_percent] [loan_term_years] [interest_rate]
  hearth health
";

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let cfg = AppConfig::load("config.toml")?;
    init_logging();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first().map(String::as_str) else {
        print!("{USAGE}");
        return Ok(());
    };

    // Mortgage math is local; no pipeline or credential needed.
    if command == "mortgage" {
        return run_mortgage(&args[1..]);
    }

    let pipeline_config = cfg.pipeline_config();
    if pipeline_config.api_key.is_none() {
        warn!(
            env = %cfg.api.api_key_env,
            "No API credential found; upstream calls will fail"
        );
    }
    let client = PropertyClient::new(RequestPipeline::with_http(pipeline_config)?);

    // Startup connectivity probe, skipped for the health command since that
    // is the probe.
    if command != "health" {
        let health = client.check_health().await;
        if health["api_available"] == Value::Bool(true) {
            info!(
                response_time_ms = health["response_time_ms"].as_i64().unwrap_or(0),
                "Connected to upstream API"
            );
        } else {
            warn!(
                error = health["error"].as_str().unwrap_or("unknown"),
                "Could not reach upstream API; continuing anyway"
            );
        }
    }

    match command {
        "search" => {
            let location = required(&args, 1, "search needs a <location>")?;
            let mut criteria = SearchCriteria::for_sale(location);
            if let Some(t) = args.get(2) {
                criteria.listing_type = t.clone();
            }
            if let Some(min) = args.get(3) {
                criteria.price_min = Some(min.parse()?);
            }
            if let Some(max) = args.get(4) {
                criteria.price_max = Some(max.parse()?);
            }
            print_json(&client.search_properties(&criteria).await)?;
        }
        "details" => {
            let key = parse_property_key(&args[1..])?;
            let envelope = client.get_property_details(&key).await;
            if envelope["success"] == Value::Bool(true) {
                println!("{}", render::property_report(&envelope["property"]));
            } else {
                print_json(&envelope)?;
            }
        }
        "zestimate" => {
            let key = parse_property_key(&args[1..])?;
            print_json(&client.get_zestimate(&key).await)?;
        }
        "trends" => {
            let location = required(&args, 1, "trends needs a <location>")?;
            let time_period = args.get(2).map(String::as_str).unwrap_or("");
            let envelope = client.get_market_trends(location, &[], time_period).await;
            if envelope["success"] == Value::Bool(true) {
                println!("{}", render::market_trends_report(location, &envelope["trends"]));
            } else {
                print_json(&envelope)?;
            }
        }
        "health" => {
            print_json(&client.check_health().await)?;
        }
        other => {
            print!("{USAGE}");
            bail!("unknown command: {other}");
        }
    }

    Ok(())
}

/// Run the local mortgage calculator and print the rounded summary.
fn run_mortgage(args: &[String]) -> Result<()> {
    let Some(price) = args.first() else {
        print!("{USAGE}");
        bail!("mortgage needs a <home_price>");
    };

    let mut inputs = MortgageInputs::new(price.parse()?);
    if let Some(pct) = args.get(1) {
        inputs.down_payment_percent = Some(pct.parse()?);
    }
    if let Some(term) = args.get(2) {
        inputs.loan_term_years = term.parse()?;
    }
    if let Some(rate) = args.get(3) {
        inputs.interest_rate_percent = rate.parse()?;
    }

    match MortgageEngine::compute(&inputs) {
        Ok(result) => {
            println!("{}", serde_json::to_string_pretty(&result.rounded())?);
            Ok(())
        }
        Err(e) => bail!("{e}"),
    }
}

fn parse_property_key(args: &[String]) -> Result<PropertyKey> {
    match (args.first().map(String::as_str), args.get(1)) {
        (Some("--zpid"), Some(id)) => Ok(PropertyKey::Zpid(id.clone())),
        (Some("--address"), Some(addr)) => Ok(PropertyKey::Address(addr.clone())),
        _ => {
            print!("{USAGE}");
            bail!("expected --zpid <id> or --address <addr>");
        }
    }
}

fn required<'a>(args: &'a [String], idx: usize, msg: &str) -> Result<&'a str> {
    match args.get(idx) {
        Some(v) => Ok(v),
        None => {
            print!("{USAGE}");
            bail!("{msg}");
        }
    }
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("hearth=info"));

    let json_logging = std::env::var("HEARTH_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
