//! Refresh coordination with a single in-flight fetch.
//!
//! [`RefreshCoordinator`] owns the cached snapshot. Callers ask it for usage;
//! it answers from cache while the snapshot is fresh and otherwise fetches.
//! Overlapping callers share one upstream request and its result, whatever
//! their own `force_refresh` flag.
//!
//! The fetch runs on its own task. A caller that stops waiting does not
//! cancel it; the task still updates the cache when it finishes. A failed
//! fetch leaves the previous snapshot in place.

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use claudemeter_core::{STALENESS_THRESHOLD_SECS, SessionKey, UsageSnapshot, display_timezone_from_env};
use claudemeter_fetch::{FetchError, UsageApi};
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::keychain::{CredentialStore, DEFAULT_ACCOUNT};
use crate::settings::SettingsRepository;

type SharedFetch = Shared<BoxFuture<'static, Result<Arc<UsageSnapshot>, FetchError>>>;

/// Returns true if a fetch is needed.
///
/// Pure function of its inputs: forced refreshes and missing snapshots always
/// fetch, otherwise only snapshots at least `threshold` old do.
pub fn needs_refresh(
    now: DateTime<Utc>,
    fetched_at: Option<DateTime<Utc>>,
    force_refresh: bool,
    threshold: Duration,
) -> bool {
    match fetched_at {
        _ if force_refresh => true,
        None => true,
        Some(fetched_at) => now - fetched_at >= threshold,
    }
}

// ============================================================================
// Options
// ============================================================================

/// Tunables for a [`RefreshCoordinator`].
#[derive(Debug, Clone, Copy)]
pub struct CoordinatorOptions {
    /// Age at which the cached snapshot stops being served.
    pub staleness_threshold: Duration,
    /// Timezone stamped on new snapshots.
    pub display_timezone: Tz,
}

impl Default for CoordinatorOptions {
    fn default() -> Self {
        Self {
            staleness_threshold: Duration::seconds(STALENESS_THRESHOLD_SECS),
            display_timezone: display_timezone_from_env(),
        }
    }
}

// ============================================================================
// Coordinator
// ============================================================================

#[derive(Default)]
struct CacheState {
    cached: Option<Arc<UsageSnapshot>>,
    inflight: Option<SharedFetch>,
}

struct Inner {
    api: Arc<dyn UsageApi>,
    settings: Arc<dyn SettingsRepository>,
    credentials: Arc<dyn CredentialStore>,
    options: CoordinatorOptions,
    state: Mutex<CacheState>,
}

/// Serves usage snapshots from cache or a single shared fetch.
///
/// Cloning is cheap; clones share the cache.
#[derive(Clone)]
pub struct RefreshCoordinator {
    inner: Arc<Inner>,
}

impl RefreshCoordinator {
    /// Creates a coordinator with default options.
    pub fn new(
        api: Arc<dyn UsageApi>,
        settings: Arc<dyn SettingsRepository>,
        credentials: Arc<dyn CredentialStore>,
    ) -> Self {
        Self::with_options(api, settings, credentials, CoordinatorOptions::default())
    }

    /// Creates a coordinator with explicit options.
    pub fn with_options(
        api: Arc<dyn UsageApi>,
        settings: Arc<dyn SettingsRepository>,
        credentials: Arc<dyn CredentialStore>,
        options: CoordinatorOptions,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                api,
                settings,
                credentials,
                options,
                state: Mutex::new(CacheState::default()),
            }),
        }
    }

    /// Returns the cached snapshot without fetching.
    pub async fn cached(&self) -> Option<Arc<UsageSnapshot>> {
        self.inner.state.lock().await.cached.clone()
    }

    /// Returns a snapshot, fetching if needed.
    ///
    /// A fresh cached snapshot is returned as is unless `force_refresh` is
    /// set. If a fetch is already running, this waits for it instead of
    /// starting another.
    ///
    /// # Errors
    ///
    /// Returns the [`FetchError`] of the fetch this call waited on. The cached
    /// snapshot is left untouched.
    pub async fn fetch(&self, force_refresh: bool) -> Result<Arc<UsageSnapshot>, FetchError> {
        let inflight = {
            let mut state = self.inner.state.lock().await;

            if let Some(cached) = &state.cached {
                let fetched_at = Some(cached.fetched_at);
                let threshold = self.inner.options.staleness_threshold;
                if !needs_refresh(Utc::now(), fetched_at, force_refresh, threshold) {
                    debug!("Serving cached snapshot");
                    return Ok(Arc::clone(cached));
                }
            }

            if let Some(inflight) = &state.inflight {
                debug!(force_refresh, "Joining in-flight fetch");
                inflight.clone()
            } else {
                // The lock is held until `inflight` is set, so the task cannot
                // finish and clear it first.
                let inflight = self.spawn_fetch();
                state.inflight = Some(inflight.clone());
                inflight
            }
        };

        inflight.await
    }

    fn spawn_fetch(&self) -> SharedFetch {
        debug!("Starting fetch");
        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(async move {
            let result = inner.fetch_snapshot().await.map(Arc::new);

            let mut state = inner.state.lock().await;
            state.inflight = None;
            match &result {
                Ok(snapshot) => state.cached = Some(Arc::clone(snapshot)),
                Err(e) => warn!(error = %e, "Fetch failed, keeping cached snapshot"),
            }
            result
        });

        async move {
            handle
                .await
                .unwrap_or_else(|e| Err(FetchError::Aborted(e.to_string())))
        }
        .boxed()
        .shared()
    }
}

impl Inner {
    #[instrument(skip(self))]
    async fn fetch_snapshot(&self) -> Result<UsageSnapshot, FetchError> {
        let key = self.session_key().await?;
        let organization_id = self.organization_id(&key).await?;
        let response = self.api.fetch_raw_usage(&key, &organization_id).await?;
        let snapshot = response.to_snapshot(self.options.display_timezone)?;
        info!(
            session = snapshot.session.utilization,
            weekly = snapshot.weekly.utilization,
            "Usage refreshed"
        );
        Ok(snapshot)
    }

    async fn session_key(&self) -> Result<SessionKey, FetchError> {
        let raw = self
            .credentials
            .retrieve(DEFAULT_ACCOUNT)
            .await
            .map_err(|e| FetchError::CredentialStore(e.to_string()))?
            .ok_or(FetchError::MissingCredential)?;
        Ok(SessionKey::parse(&raw)?)
    }

    /// Uses the saved organization, or resolves and saves the first one.
    async fn organization_id(&self, key: &SessionKey) -> Result<String, FetchError> {
        let mut settings = self
            .settings
            .load_settings()
            .await
            .map_err(|e| FetchError::Settings(e.to_string()))?;

        if let Some(id) = settings.cached_organization_id.clone() {
            return Ok(id);
        }

        let organization = self
            .api
            .fetch_organizations(key)
            .await?
            .into_iter()
            .next()
            .ok_or(FetchError::NoOrganization)?;
        info!(organization = %organization.uuid, name = %organization.name, "Resolved organization");

        settings.cached_organization_id = Some(organization.uuid.clone());
        if let Err(e) = self.settings.save_settings(&settings).await {
            warn!(error = %e, "Could not save organization, will resolve again next time");
        }
        Ok(organization.uuid)
    }
}

// ============================================================================
// Tests
// ============================================================================
