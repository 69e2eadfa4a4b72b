//! Overlay data sources.
//!
//! The [`OverlaySource`] trait abstracts the backend's three list calls.
//! [`HttpOverlaySource`] talks to the REST API via `reqwest`;
//! [`StaticOverlaySource`] serves in-memory lists for tests and offline runs.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde::de::DeserializeOwned;

use super::config::RefreshConfig;
use super::error::FetchError;
use super::wire::{decode_listing, GeofenceRecord, IncidentRecord, Listing, PersonRecord};

/// Path of the incident list below the API base URL.
pub const INCIDENTS_PATH: &str = "incidents";

/// Path of the geofence list below the API base URL.
pub const GEOFENCES_PATH: &str = "geofences";

/// Path of the tracked person list below the API base URL.
pub const PERSONS_PATH: &str = "tracked-persons";

/// Backend capability that lists overlay records.
pub trait OverlaySource: Send + Sync + 'static {
    fn list_incidents(
        &self,
    ) -> impl Future<Output = Result<Listing<IncidentRecord>, FetchError>> + Send;

    fn list_geofences(
        &self,
    ) -> impl Future<Output = Result<Listing<GeofenceRecord>, FetchError>> + Send;

    fn list_tracked_persons(
        &self,
    ) -> impl Future<Output = Result<Listing<PersonRecord>, FetchError>> + Send;
}

/// REST backend client.
///
/// Uses one pooled `reqwest::Client`; every request carries the bearer
/// token when one is configured.
pub struct HttpOverlaySource {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl std::fmt::Debug for HttpOverlaySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpOverlaySource")
            .field("base_url", &self.base_url)
            .field("authenticated", &self.token.is_some())
            .finish()
    }
}

impl HttpOverlaySource {
    /// Create a client from the refresh configuration.
    pub fn new(config: &RefreshConfig) -> Result<Self, FetchError> {
        Self::with_timeout(
            config.api_url.clone(),
            config.api_token.clone(),
            config.request_timeout,
        )
    }

    pub fn with_timeout(
        base_url: impl Into<String>,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.trim().is_empty()),
        })
    }

    /// Full URL of a list endpoint.
    pub fn endpoint_url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn fetch<T: DeserializeOwned>(&self, path: &str) -> Result<Listing<T>, FetchError> {
        let url = self.endpoint_url(path);
        let mut request = self.http.get(&url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(map_transport_error)?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(FetchError::Unauthorized(status.as_u16()));
        }
        if !status.is_success() {
            return Err(FetchError::Status {
                endpoint: path.to_string(),
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await.map_err(map_transport_error)?;
        let listing = decode_listing(&bytes)?;

        tracing::debug!(
            endpoint = path,
            records = listing.records.len(),
            dropped = listing.dropped,
            "Overlay list fetched"
        );
        Ok(listing)
    }
}

fn map_transport_error(error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Transport(error.to_string())
    }
}

impl OverlaySource for HttpOverlaySource {
    async fn list_incidents(&self) -> Result<Listing<IncidentRecord>, FetchError> {
        self.fetch(INCIDENTS_PATH).await
    }

    async fn list_geofences(&self) -> Result<Listing<GeofenceRecord>, FetchError> {
        self.fetch(GEOFENCES_PATH).await
    }

    async fn list_tracked_persons(&self) -> Result<Listing<PersonRecord>, FetchError> {
        self.fetch(PERSONS_PATH).await
    }
}

#[derive(Debug, Default)]
struct StaticLists {
    incidents: Vec<IncidentRecord>,
    geofences: Vec<GeofenceRecord>,
    persons: Vec<PersonRecord>,
    failure: Option<FetchError>,
}

/// In-memory source with replaceable contents.
///
/// Clones share state, so a test can swap the lists while the scheduler
/// holds another clone. Counts one call per `list_incidents`, which the
/// scheduler issues exactly once per attempt.
#[derive(Debug, Clone, Default)]
pub struct StaticOverlaySource {
    lists: Arc<Mutex<StaticLists>>,
    delay: Duration,
    calls: Arc<AtomicUsize>,
}

impl StaticOverlaySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every list call, to hold a fetch in flight.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn lists(&self) -> std::sync::MutexGuard<'_, StaticLists> {
        self.lists.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_incidents(&self, incidents: Vec<IncidentRecord>) {
        self.lists().incidents = incidents;
    }

    pub fn set_geofences(&self, geofences: Vec<GeofenceRecord>) {
        self.lists().geofences = geofences;
    }

    pub fn set_persons(&self, persons: Vec<PersonRecord>) {
        self.lists().persons = persons;
    }

    /// Make every call fail with `error` (or succeed again with `None`).
    pub fn set_failure(&self, error: Option<FetchError>) {
        self.lists().failure = error;
    }

    /// Number of fetch attempts served.
    pub fn fetch_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn serve<T: Clone>(
        &self,
        select: impl Fn(&StaticLists) -> &Vec<T>,
    ) -> Result<Listing<T>, FetchError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let lists = self.lists();
        if let Some(error) = &lists.failure {
            return Err(error.clone());
        }
        Ok(Listing::new(select(&lists).clone()))
    }
}

impl OverlaySource for StaticOverlaySource {
    async fn list_incidents(&self) -> Result<Listing<IncidentRecord>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.serve(|lists| &lists.incidents).await
    }

    async fn list_geofences(&self) -> Result<Listing<GeofenceRecord>, FetchError> {
        self.serve(|lists| &lists.geofences).await
    }

    async fn list_tracked_persons(&self) -> Result<Listing<PersonRecord>, FetchError> {
        self.serve(|lists| &lists.persons).await
    }
}
