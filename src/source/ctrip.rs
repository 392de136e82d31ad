// src/source/ctrip.rs
//! Ctrip "lowest price" calendar endpoint.
//!
//! Response shape: `{"status": 0, "msg": "...", "data": {"oneWayPrice": [{"20250101": 820, ...}]}}`.
//! Only the first element of `oneWayPrice` is used. `status == 2` is the
//! provider's explicit error; anything else without prices is "no data".

use anyhow::Context;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, REFERER, USER_AGENT};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

use super::{PriceMap, PriceSource};
use crate::config::Route;
use crate::error::FetchError;
use crate::tracker::ItineraryKind;

pub const BASE_URL: &str = "https://flights.ctrip.com/itinerary/api/12808/lowestPrice";
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

const PROVIDER_ERROR_STATUS: i64 = 2;

const UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                  (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

#[derive(Debug, Deserialize)]
struct LowestPriceResponse {
    #[serde(default)]
    status: Option<i64>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    data: Option<Value>,
}

pub struct CtripSource {
    client: Client,
    base_url: String,
}

impl CtripSource {
    pub fn new() -> anyhow::Result<Self> {
        Self::with_base_url(BASE_URL)
    }

    /// Point at another endpoint (local fixtures, proxies).
    pub fn with_base_url(url: impl Into<String>) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(UA));
        headers.insert(
            REFERER,
            HeaderValue::from_static("https://flights.ctrip.com/online/list/oneway"),
        );
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/json, text/plain, */*"),
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("build ctrip http client")?;
        Ok(Self {
            client,
            base_url: url.into(),
        })
    }

    /// Query parameters for one itinerary kind. Only the direct query sets `direct=true`.
    pub fn query(route: &Route, kind: ItineraryKind) -> Vec<(&'static str, String)> {
        let mut q = vec![
            ("flightWay", route.flight_way.provider_param().to_string()),
            ("dcity", route.origin.to_ascii_uppercase()),
            ("acity", route.destination.to_ascii_uppercase()),
            ("army", "false".to_string()),
            ("classType", "ALL".to_string()),
            ("quantity", "1".to_string()),
        ];
        if kind == ItineraryKind::Direct {
            q.push(("direct", "true".to_string()));
        }
        q
    }

    pub fn parse_response(kind: ItineraryKind, body: &str) -> Result<PriceMap, FetchError> {
        let resp: LowestPriceResponse = serde_json::from_str(body)
            .map_err(|source| FetchError::Decode { kind, source })?;

        if resp.status == Some(PROVIDER_ERROR_STATUS) {
            return Err(FetchError::Provider {
                kind,
                message: resp.msg.unwrap_or_else(|| "unknown error".to_string()),
            });
        }

        Ok(resp.data.as_ref().map(first_price_map).unwrap_or_default())
    }
}

fn first_price_map(data: &Value) -> PriceMap {
    let Some(first) = data
        .get("oneWayPrice")
        .and_then(Value::as_array)
        .and_then(|list| list.first())
        .and_then(Value::as_object)
    else {
        return PriceMap::new();
    };

    first
        .iter()
        .filter_map(|(date, v)| price_of(v).map(|p| (date.clone(), p)))
        .collect()
}

fn price_of(v: &Value) -> Option<u32> {
    let n = match v {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f.round() as u64))?,
        Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    u32::try_from(n).ok().filter(|p| *p > 0)
}

#[async_trait]
impl PriceSource for CtripSource {
    async fn fetch(&self, route: &Route, kind: ItineraryKind) -> Result<PriceMap, FetchError> {
        let resp = self
            .client
            .get(&self.base_url)
            .query(&Self::query(route, kind))
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|source| FetchError::Transport { kind, source })?;

        let body = resp
            .text()
            .await
            .map_err(|source| FetchError::Transport { kind, source })?;

        let prices = Self::parse_response(kind, &body)?;
        tracing::debug!(%kind, dates = prices.len(), "ctrip response parsed");
        Ok(prices)
    }

    fn name(&self) -> &'static str {
        "ctrip"
    }
}
