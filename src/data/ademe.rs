//! ADEME data-fair API integration (DPE datasets).
//!
//! One call = one `GET {base}/{dataset}/lines` for one town. There is no
//! retry, timeout policy or cache; failures are reported to the caller.

use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::data::normalize::normalize_record;
use crate::domain::catalog::department_for;
use crate::domain::{ApiPage, DatasetSchema};
use crate::error::FetchError;

pub const DEFAULT_BASE_URL: &str = "https://data.ademe.fr/data-fair/api/v1/datasets";

/// Environment variable overriding `DEFAULT_BASE_URL`.
pub const BASE_URL_ENV: &str = "ADEME_API_URL";

/// Most recent diagnostics first.
pub const SORT_FIELD: &str = "-date_etablissement_dpe";

/// Upper bound on the `size` query parameter.
pub const MAX_PAGE_SIZE: usize = 2000;

/// Upstream error bodies can be whole HTML pages; keep the start only.
const MAX_ERROR_BODY: usize = 500;

/// Parameters of one upstream query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DpeQuery {
    pub town: String,
    pub dataset_id: String,
    pub size: usize,
}

impl DpeQuery {
    pub fn new(town: impl Into<String>, dataset_id: impl Into<String>, size: usize) -> Self {
        Self {
            town: town.into(),
            dataset_id: dataset_id.into(),
            size,
        }
    }

    /// Requested size clamped to `1..=MAX_PAGE_SIZE`.
    pub fn page_size(&self) -> usize {
        self.size.clamp(1, MAX_PAGE_SIZE)
    }

    /// data-fair `qs` filter: exact town match AND department postcode wildcard.
    pub fn filter(&self) -> String {
        let schema = DatasetSchema::for_dataset(&self.dataset_id);
        let town = self.town.replace('"', "\\\"");
        format!(
            "{}:\"{}\" AND {}:{}*",
            schema.town_field(),
            town,
            schema.postcode_field(),
            department_for(&self.town),
        )
    }

    /// Query-string pairs, in request order.
    pub fn params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("size", self.page_size().to_string()),
            ("sort", SORT_FIELD.to_string()),
            ("qs", self.filter()),
        ]
    }
}

/// Anything that can answer a `DpeQuery`.
///
/// The HTTP client is the production implementation; tests and the bulk
/// exporter can use in-memory sources.
pub trait DpeSource {
    fn fetch(&self, query: &DpeQuery) -> Result<ApiPage, FetchError>;
}

/// Like `DpeSource::fetch`, but a failure is logged and turned into an
/// empty page instead of an error.
pub fn fetch_or_empty<S: DpeSource + ?Sized>(source: &S, query: &DpeQuery) -> ApiPage {
    match source.fetch(query) {
        Ok(page) => page,
        Err(err) => {
            warn!(town = %query.town, dataset = %query.dataset_id, error = %err, "fetch failed, using empty result");
            ApiPage::empty()
        }
    }
}

#[derive(Debug, Clone)]
pub struct AdemeClient {
    client: Client,
    base_url: String,
}

impl AdemeClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Build a client from `.env` / the environment, falling back to the
    /// public endpoint.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let base_url = std::env::var(BASE_URL_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        Self::new(base_url)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn lines_url(&self, dataset_id: &str) -> String {
        format!("{}/{}/lines", self.base_url, dataset_id)
    }
}

impl DpeSource for AdemeClient {
    fn fetch(&self, query: &DpeQuery) -> Result<ApiPage, FetchError> {
        let url = self.lines_url(&query.dataset_id);
        let params = query.params();
        debug!(%url, qs = %query.filter(), size = query.page_size(), "requesting DPE lines");

        let resp = self
            .client
            .get(&url)
            .query(&params)
            .send()
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let status = resp.status();
        let body = resp
            .text()
            .map_err(|e| FetchError::Network(format!("failed to read response body: {e}")))?;

        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                body: truncate(&body, MAX_ERROR_BODY),
            });
        }

        let page = parse_lines_body(&body, &query.town)?;
        info!(
            town = %query.town,
            dataset = %query.dataset_id,
            total = page.total,
            received = page.results.len(),
            "fetched DPE lines"
        );
        Ok(page)
    }
}

#[derive(Debug, Deserialize)]
struct LinesResponse {
    #[serde(default)]
    total: Option<u64>,
    #[serde(default)]
    results: Option<Vec<Value>>,
}

/// Decode a `/lines` body and normalize each result.
///
/// A missing `total` or `results` is treated as zero / empty; a body that is
/// not a JSON object is a `FetchError::Decode`.
pub fn parse_lines_body(body: &str, town: &str) -> Result<ApiPage, FetchError> {
    let parsed: LinesResponse =
        serde_json::from_str(body).map_err(|e| FetchError::Decode(e.to_string()))?;

    let results = parsed
        .results
        .unwrap_or_default()
        .iter()
        .map(|item| normalize_record(item, town))
        .collect();

    Ok(ApiPage {
        total: parsed.total.unwrap_or(0),
        results,
    })
}

fn truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}…", &s[..idx]),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;
    use std::thread::{self, JoinHandle};

    /// Answer one request with `status` and `body`; the handle yields the
    /// request line that was received.
    fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());

            let mut request_line = String::new();
            reader.read_line(&mut request_line).unwrap();
            loop {
                let mut header = String::new();
                let n = reader.read_line(&mut header).unwrap();
                if n == 0 || header == "\r\n" {
                    break;
                }
            }

            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).unwrap();
            request_line.trim_end().to_string()
        });

        (format!("http://{addr}/datasets"), handle)
    }

    struct Failing;

    impl DpeSource for Failing {
        fn fetch(&self, _query: &DpeQuery) -> Result<ApiPage, FetchError> {
            Err(FetchError::Status {
                status: 502,
                body: "Bad Gateway".to_string(),
            })
        }
    }

    #[test]
    fn moselle_town_uses_alternate_department() {
        let q = DpeQuery::new("Audun-le-Tiche", "dpe03existant", 2000);
        assert_eq!(
            q.filter(),
            "nom_commune_ban:\"Audun-le-Tiche\" AND code_postal_ban:57*"
        );
    }

    #[test]
    fn other_towns_use_primary_department() {
        let q = DpeQuery::new("Longwy", "dpe03existant", 2000);
        assert!(q.filter().ends_with("code_postal_ban:54*"));

        let q = DpeQuery::new("Audun-le-Roman", "dpe03existant", 2000);
        assert!(q.filter().contains("54*"));
    }

    #[test]
    fn legacy_dataset_uses_raw_field_names() {
        let q = DpeQuery::new("Villerupt", "dpe-france", 100);
        assert_eq!(q.filter(), "nom_commune:\"Villerupt\" AND code_postal_brut:54*");
    }

    #[test]
    fn params_are_sorted_by_date_and_clamped() {
        let q = DpeQuery::new("Longwy", "dpe03existant", 50_000);
        let params = q.params();
        assert_eq!(params[0], ("size", "2000".to_string()));
        assert_eq!(params[1], ("sort", "-date_etablissement_dpe".to_string()));
        assert_eq!(params[2].0, "qs");
        assert_eq!(DpeQuery::new("Longwy", "x", 0).page_size(), 1);
    }

    #[test]
    fn lines_url_joins_base_and_dataset() {
        let client = AdemeClient::new("http://localhost:8080/datasets/");
        assert_eq!(
            client.lines_url("dpe03existant"),
            "http://localhost:8080/datasets/dpe03existant/lines"
        );
    }

    #[test]
    fn parses_and_normalizes_results() {
        let body = r#"{
            "total": 1523,
            "results": [
                {"n_dpe": "A1", "etiquette_dpe": "G", "date_etablissement_dpe": "2024-03-01"},
                {"numero_dpe": "B2", "classe_consommation_energie": "c"}
            ]
        }"#;

        let page = parse_lines_body(body, "Longwy").unwrap();
        assert_eq!(page.total, 1523);
        assert_eq!(page.results.len(), 2);
        assert_eq!(page.results[0].id, "A1");
        assert_eq!(page.results[1].etiquette_dpe, "C");
        assert_eq!(page.results[1].commune_brut, "Longwy");
    }

    #[test]
    fn missing_total_and_results_mean_empty() {
        let page = parse_lines_body("{}", "Longwy").unwrap();
        assert_eq!(page, ApiPage::empty());
    }

    #[test]
    fn malformed_body_is_a_decode_error() {
        let err = parse_lines_body("<html>oops</html>", "Longwy").unwrap_err();
        assert!(matches!(err, FetchError::Decode(_)));

        let err = parse_lines_body(r#"{"results": 3}"#, "Longwy").unwrap_err();
        assert!(matches!(err, FetchError::Decode(_)));
    }

    #[test]
    fn failure_surfaces_as_error_or_empty_page() {
        let q = DpeQuery::new("Longwy", "dpe03existant", 10);

        let err = Failing.fetch(&q).unwrap_err();
        assert_eq!(
            err,
            FetchError::Status {
                status: 502,
                body: "Bad Gateway".to_string()
            }
        );

        let page = fetch_or_empty(&Failing, &q);
        assert_eq!(page.total, 0);
        assert!(page.results.is_empty());
    }

    #[test]
    fn client_sends_filter_and_maps_error_status() {
        let (base, server) = serve_once("400 Bad Request", "bad qs");
        let client = AdemeClient::new(base);

        let err = client
            .fetch(&DpeQuery::new("Audun-le-Tiche", "dpe03existant", 5000))
            .unwrap_err();
        assert_eq!(
            err,
            FetchError::Status {
                status: 400,
                body: "bad qs".to_string()
            }
        );

        assert_eq!(
            server.join().unwrap(),
            "GET /datasets/dpe03existant/lines?size=2000&sort=-date_etablissement_dpe\
             &qs=nom_commune_ban%3A%22Audun-le-Tiche%22+AND+code_postal_ban%3A57* HTTP/1.1"
        );
    }

    #[test]
    fn client_normalizes_successful_response() {
        let (base, server) = serve_once(
            "200 OK",
            r#"{"total": 7, "results": [{"etiquette_dpe": "e", "nom_commune_ban": "Longwy"}]}"#,
        );
        let client = AdemeClient::new(base);

        let page = client.fetch(&DpeQuery::new("Longwy", "dpe03existant", 10)).unwrap();
        assert_eq!(page.total, 7);
        assert_eq!(page.results.len(), 1);
        assert_eq!(page.results[0].etiquette_dpe, "E");
        assert!(server.join().unwrap().starts_with("GET /datasets/dpe03existant/lines?size=10&"));
    }

    #[test]
    fn long_error_bodies_are_truncated() {
        let body = "x".repeat(2000);
        let t = truncate(&body, MAX_ERROR_BODY);
        assert_eq!(t.chars().count(), MAX_ERROR_BODY + 1);
        assert_eq!(truncate("short", MAX_ERROR_BODY), "short");
    }
}
