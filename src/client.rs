use anyhow::{Context, Result};
use reqwest::blocking::Client as HttpClient;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use std::time::Duration;

use crate::error::format_erddap_error;
use crate::util::{encode_query_expr, urljoin};

/// A blocking client for one ERDDAP server.
///
/// Only the tabledap protocol is implemented; griddap datasets are out of
/// scope. One client can serve any number of requests against the same server.
#[derive(Debug, Clone)]
pub struct Erddap {
    server: String,
    http: HttpClient,
}

/// A tabledap request: which dataset, which variables, which constraints.
///
/// Constraints are kept in insertion order and sent verbatim (operator
/// included), e.g. `("time>=", "2024-01-01")`. An empty variable list asks
/// the server for every column of the dataset.
#[derive(Debug, Clone, Default)]
pub struct Dap {
    pub dataset_id: String,
    pub variables: Vec<String>,
    pub constraints: Vec<(String, String)>,
}

impl Dap {
    pub fn new(dataset_id: &str) -> Self {
        Self {
            dataset_id: dataset_id.to_string(),
            ..Self::default()
        }
    }

    pub fn variable(mut self, name: &str) -> Self {
        self.variables.push(name.to_string());
        self
    }

    /// Adds a constraint from an operator-suffixed field and a value,
    /// ERDDAP style: `constraint("time>=", "2024-01-01")`.
    pub fn constraint(mut self, op: &str, value: &str) -> Self {
        self.constraints.push((op.to_string(), value.to_string()));
        self
    }
}

impl Erddap {
    /// Creates a client for `server` with a 60 second request timeout.
    pub fn new(server: &str) -> Result<Self> {
        Self::with_timeout(server, Duration::from_secs(60))
    }

    pub fn with_timeout(server: &str, timeout: Duration) -> Result<Self> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("erddap-discharge/{}", env!("CARGO_PKG_VERSION")))
                .unwrap_or(HeaderValue::from_static("erddap-discharge")),
        );

        let http = HttpClient::builder()
            .default_headers(default_headers)
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            server: server.to_string(),
            http,
        })
    }

    pub fn server(&self) -> &str {
        &self.server
    }

    /// Builds the request URL for `dap` in the given response format
    /// (`csv`, `json`, `htmlTable`, ...).
    ///
    /// Shape: `{server}/tabledap/{dataset_id}.{format}?{vars}&{constraints}`
    /// with constraint operators percent-encoded as the server requires.
    pub fn tabledap_url(&self, dap: &Dap, format: &str) -> String {
        let mut url = urljoin(&self.server, "tabledap");
        url.push('/');
        url.push_str(&dap.dataset_id);
        url.push('.');
        url.push_str(format);

        let mut parts: Vec<String> = Vec::new();
        if !dap.variables.is_empty() {
            parts.push(dap.variables.join(","));
        }
        for (op, value) in &dap.constraints {
            parts.push(encode_query_expr(&format!("{}{}", op, value)));
        }

        if !parts.is_empty() {
            url.push('?');
            url.push_str(&parts.join("&"));
        }

        url
    }

    /// Executes `dap` and returns the raw CSV response body.
    ///
    /// One synchronous GET, no retries. Network failures, unknown dataset
    /// ids, and server-side constraint rejections all surface as errors with
    /// the server's own message attached when one can be extracted.
    pub fn download_csv(&self, dap: &Dap) -> Result<String> {
        let url = self.tabledap_url(dap, "csv");

        let resp = self
            .http
            .get(&url)
            .send()
            .with_context(|| format!("could not connect to {}", self.server))?;

        let status = resp.status();
        let text = resp.text().unwrap_or_default();
        if !status.is_success() {
            return Err(format_erddap_error(status, &url, &text));
        }

        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> Erddap {
        Erddap::new("https://catalogue.hakai.org/erddap/").unwrap()
    }

    #[test]
    fn url_with_constraint_encodes_operator() {
        let dap = Dap::new("HakaiWatershedsStreamStationsProvisional")
            .constraint("time>=", "2024-01-01");
        assert_eq!(
            client().tabledap_url(&dap, "csv"),
            "https://catalogue.hakai.org/erddap/tabledap/HakaiWatershedsStreamStationsProvisional.csv?time%3E=2024-01-01"
        );
    }

    #[test]
    fn url_with_variables_lists_them_before_constraints() {
        let dap = Dap::new("ds")
            .variable("station")
            .variable("pls_lvl")
            .constraint("time>=", "2024-01-01")
            .constraint("time<", "2024-02-01");
        assert_eq!(
            client().tabledap_url(&dap, "csv"),
            "https://catalogue.hakai.org/erddap/tabledap/ds.csv?station,pls_lvl&time%3E=2024-01-01&time%3C2024-02-01"
        );
    }

    #[test]
    fn url_without_query_has_no_question_mark() {
        let dap = Dap::new("ds");
        assert_eq!(
            client().tabledap_url(&dap, "csv"),
            "https://catalogue.hakai.org/erddap/tabledap/ds.csv"
        );
    }
}
