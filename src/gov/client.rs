//! GOV (genealogy.net) place lookup, REST-first with a SOAP fallback.

use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::{Context, Result};
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

const DEFAULT_BASE_URL: &str = "https://gov.genealogy.net";
const USER_AGENT: &str = "ortskern/0.1";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// A place as the directory service reports it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GovPlace {
    pub gov_id: String,
    pub name: String,
    #[serde(default)]
    pub historical_names: Vec<String>,
    pub kind: Option<String>,
    /// (lat, lon) when the service carries a position.
    pub location: Option<(f64, f64)>,
    pub valid_from: Option<String>,
    pub valid_to: Option<String>,
    #[serde(default)]
    pub external_ids: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct RestSearchResponse {
    #[serde(default)]
    results: Vec<RestPlace>,
}

#[derive(Debug, Deserialize)]
struct RestPlace {
    id: String,
    name: String,
    #[serde(default)]
    historical_names: Vec<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    lat: Option<f64>,
    lon: Option<f64>,
    valid_from: Option<String>,
    valid_to: Option<String>,
    #[serde(default)]
    external_ids: BTreeMap<String, String>,
}

impl From<RestPlace> for GovPlace {
    fn from(p: RestPlace) -> Self {
        let location = match (p.lat, p.lon) {
            (Some(lat), Some(lon)) => Some((lat, lon)),
            _ => None,
        };
        Self {
            gov_id: p.id,
            name: p.name,
            historical_names: p.historical_names,
            kind: p.kind,
            location,
            valid_from: p.valid_from,
            valid_to: p.valid_to,
            external_ids: p.external_ids,
        }
    }
}

/// Fetches place candidates from the GOV directory service.
pub struct GovClient {
    client: Client,
    base_url: String,
}

impl GovClient {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    pub fn with_base_url(base_url: &str) -> Self {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Search places by name: REST endpoint first, SOAP fallback when the
    /// REST call fails. Errors from the fallback surface to the caller;
    /// an empty list is a valid answer.
    pub async fn search_place(&self, name: &str, limit: usize) -> Result<Vec<GovPlace>> {
        match self.search_rest(name, limit).await {
            Ok(places) => Ok(places),
            Err(e) => {
                warn!("GOV REST search failed, trying SOAP: {e:#}");
                self.search_soap(name).await
            }
        }
    }

    async fn search_rest(&self, name: &str, limit: usize) -> Result<Vec<GovPlace>> {
        let url = format!("{}/api/json/search", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("q", name),
                ("limit", &limit.to_string()),
                ("format", "json"),
            ])
            .send()
            .await
            .context("GOV REST request failed")?
            .error_for_status()
            .context("GOV REST returned an error status")?;

        let body: RestSearchResponse = response
            .json()
            .await
            .context("GOV REST response was not valid JSON")?;

        debug!("GOV REST returned {} results for {name:?}", body.results.len());
        Ok(body.results.into_iter().map(GovPlace::from).collect())
    }

    async fn search_soap(&self, name: &str) -> Result<Vec<GovPlace>> {
        let envelope = format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/">
  <soap:Body>
    <searchByName xmlns="http://gov.genealogy.net/ws">
      <placename>{}</placename>
    </searchByName>
  </soap:Body>
</soap:Envelope>"#,
            xml_escape(name)
        );

        let response = self
            .client
            .post(format!("{}/services/ComplexService", self.base_url))
            .header("Content-Type", "text/xml")
            .body(envelope)
            .send()
            .await
            .context("GOV SOAP request failed")?;

        let text = response.text().await?;
        Ok(parse_soap_places(&text))
    }

    /// Full detail object for a GOV id, or `None` when unknown.
    pub async fn get_place_details(&self, gov_id: &str) -> Result<Option<serde_json::Value>> {
        let url = format!("{}/api/json/object/{gov_id}", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("GOV detail request failed for {gov_id}"))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = response.error_for_status()?;
        Ok(Some(response.json().await?))
    }
}

impl Default for GovClient {
    fn default() -> Self {
        Self::new()
    }
}

fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Simplified extraction of id/name pairs from the SOAP response, enough
/// for candidate generation without a full XML stack.
fn parse_soap_places(xml: &str) -> Vec<GovPlace> {
    let id_re = Regex::new(r"<(?:\w+:)?id>([^<]+)</(?:\w+:)?id>").unwrap();
    let name_re = Regex::new(r"<(?:\w+:)?name>([^<]+)</(?:\w+:)?name>").unwrap();

    let ids: Vec<String> = id_re.captures_iter(xml).map(|c| c[1].to_string()).collect();
    let names: Vec<String> = name_re
        .captures_iter(xml)
        .map(|c| c[1].to_string())
        .collect();

    ids.into_iter()
        .zip(names)
        .map(|(id, name)| GovPlace {
            gov_id: id.trim().to_string(),
            name: name.trim().to_string(),
            historical_names: Vec::new(),
            kind: None,
            location: None,
            valid_from: None,
            valid_to: None,
            external_ids: BTreeMap::new(),
        })
        .collect()
}
