use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::blocking::{Client as HttpClient, multipart};
use reqwest::header::{CONTENT_DISPOSITION, HeaderMap, HeaderValue, USER_AGENT};
use serde_json::{Map, Value};
use tracing::{error, info};

use crate::config::resolve_base_url;
use crate::download::{resolve_destination, stream_to_file};
use crate::error::{IngestError, api_error};
use crate::metadata::load_metadata;
use crate::search::{SearchFilters, SearchResults, results_from_rows};
use crate::util::urljoin;

/// Default timeout for every operation; uploads of large data files can
/// take many minutes.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1500);

/// Blocking client for the ingestion API.
///
/// Each instance is bound to one base URL; there is no process-wide state,
/// so clients targeting different services can coexist freely.
#[derive(Debug, Clone)]
pub struct Client {
    base_url: String,
    timeout: Duration,
    progress: bool,
    http: HttpClient,
}

impl Client {
    /// Creates a client using the `INGEST_API_URL` environment variable, an
    /// `.ingestapirc` file, or the localhost fallback.
    ///
    /// This is equivalent to `Client::new(None)`.
    pub fn from_env() -> Result<Self, IngestError> {
        Self::new(None)
    }

    /// Creates a client for `base_url`, falling back to environment and
    /// rc-file configuration when `None`.
    ///
    /// The URL is not validated here; a malformed one surfaces when the
    /// first request is attempted.
    pub fn new(base_url: Option<String>) -> Result<Self, IngestError> {
        let base_url = resolve_base_url(base_url);

        let mut default_headers = HeaderMap::new();
        default_headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("ingestapi-rs/{}", env!("CARGO_PKG_VERSION")))
                .unwrap_or(HeaderValue::from_static("ingestapi-rs")),
        );

        let http = HttpClient::builder().default_headers(default_headers).build()?;

        Ok(Self {
            base_url,
            timeout: DEFAULT_TIMEOUT,
            progress: true,
            http,
        })
    }

    /// Timeout applied to upload, search, and download alike.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Whether downloads draw a progress bar.
    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    /// Base URL all operations are relative to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Points this client at a different ingestion service. Subsequent
    /// operations target the new URL.
    pub fn set_base_url(&mut self, base_url: impl Into<String>) {
        self.base_url = base_url.into();
    }

    /// Uploads a data file and its YAML metadata as one multipart request.
    ///
    /// Local checks run before any network call: both files must exist, and
    /// the metadata must be a YAML mapping with non-empty
    /// `research_project_id` and `author`. On success the server's JSON
    /// response is returned verbatim.
    pub fn upload(&self, data_path: &Path, metadata_path: &Path) -> Result<Value, IngestError> {
        info!("starting ingestion for data file '{}'", data_path.display());

        if !data_path.exists() {
            return Err(IngestError::local_file(data_path));
        }
        if !metadata_path.exists() {
            return Err(IngestError::local_file(metadata_path));
        }
        load_metadata(metadata_path)?;

        let url = urljoin(&self.base_url, "/uploadfile/");

        // Part filenames are the path basenames; the form owns both file
        // handles and releases them on every exit path.
        let form = multipart::Form::new()
            .file("data_file", data_path)?
            .file("metadata_file", metadata_path)?;

        info!("calling API at {url}");
        let resp = self
            .http
            .post(&url)
            .multipart(form)
            .timeout(self.timeout)
            .send()
            .map_err(|e| self.network_error(e))?;

        let status = resp.status();
        let text = resp.text().unwrap_or_default();
        if !status.is_success() {
            return Err(api_error(status, &url, text));
        }

        let payload = serde_json::from_str::<Value>(&text).map_err(|e| IngestError::Decode {
            url: url.clone(),
            source: e,
        })?;
        info!("ingestion successful");
        Ok(payload)
    }

    /// Searches uploaded file records.
    ///
    /// Only populated filters are sent as query parameters. An empty result
    /// is an empty set, not an error. Unparsable values in the two date
    /// fields degrade to `None`; see [`SearchResults::invalid_dates`].
    pub fn search(&self, filters: &SearchFilters) -> Result<SearchResults, IngestError> {
        let url = urljoin(&self.base_url, "/search/");
        let params = filters.to_query();
        info!("querying API at {url} with {} filter(s)", params.len());

        let mut req = self.http.get(&url).timeout(self.timeout);
        if !params.is_empty() {
            req = req.query(&params);
        }
        let resp = req.send().map_err(|e| self.network_error(e))?;

        let status = resp.status();
        let text = resp.text().unwrap_or_default();
        if !status.is_success() {
            return Err(api_error(status, &url, text));
        }

        let rows: Vec<Map<String, Value>> =
            serde_json::from_str(&text).map_err(|e| IngestError::Decode {
                url: url.clone(),
                source: e,
            })?;
        if rows.is_empty() {
            info!("search returned no results");
            return Ok(SearchResults::default());
        }

        Ok(results_from_rows(rows))
    }

    /// Downloads a previously uploaded file by its server-issued identifier,
    /// streaming the body to disk in 1 MiB chunks. Returns the absolute path
    /// written.
    ///
    /// With no `target` the file lands in the user's downloads directory. A
    /// `target` that is an existing directory gets the server-provided
    /// filename (else `{file_id}.dat`); any other path is the literal
    /// destination. Containing directories are created before the request
    /// goes out.
    pub fn download(&self, file_id: &str, target: Option<&Path>) -> Result<PathBuf, IngestError> {
        let destination = resolve_destination(target)?;

        let url = urljoin(&self.base_url, &format!("/download/{file_id}/"));
        info!("downloading file '{file_id}' from {url}");

        let resp = self
            .http
            .get(&url)
            .timeout(self.timeout)
            .send()
            .map_err(|e| self.network_error(e))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().unwrap_or_default();
            return Err(api_error(status, &url, text));
        }

        let content_disposition = resp
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let content_length = resp.content_length();

        let target_path = destination.into_target(file_id, content_disposition.as_deref());
        let written = stream_to_file(resp, &target_path, content_length, self.progress)?;

        let absolute = std::path::absolute(&target_path)?;
        info!("downloaded {written} byte(s) to {}", absolute.display());
        Ok(absolute)
    }

    fn network_error(&self, err: reqwest::Error) -> IngestError {
        error!("could not connect to API at {}: {err}", self.base_url);
        IngestError::Network(err)
    }
}
