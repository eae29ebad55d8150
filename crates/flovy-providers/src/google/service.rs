//! High-level calendar operations.
//!
//! [`CalendarService`] is what the rest of the application talks to. It
//! owns the per-user account store, the OAuth client, and the data cache,
//! and implements the full flows: connect an account, switch/disconnect,
//! list calendars, fetch aggregated schedule data.

use std::sync::atomic::{AtomicU64, Ordering};

use flovy_core::{CalendarData, CalendarEvent, DateRange, UserId};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{ProviderError, ProviderResult};

use super::accounts::{AccountStore, CalendarAccount};
use super::cache::DataCache;
use super::client::{CalendarApiClient, CalendarListing, IdentityResolver, UserinfoResolver};
use super::config::GoogleConfig;
use super::oauth::{OAuthClient, TokenBundle};

/// High-level Google Calendar service for one application user.
pub struct CalendarService {
    config: GoogleConfig,
    oauth: OAuthClient,
    resolver: Box<dyn IdentityResolver>,
    store: AccountStore,
    cache: Mutex<DataCache>,
    /// Bumped on every account switch/disconnect. In-flight fetches carry
    /// the generation they started under; a response from an older
    /// generation is discarded instead of overwriting fresher state.
    fetch_generation: AtomicU64,
}

impl CalendarService {
    /// Creates the service for the given user, loading any persisted
    /// accounts.
    pub fn new(config: GoogleConfig, user: UserId) -> ProviderResult<Self> {
        config.validate().map_err(ProviderError::configuration)?;

        let resolver = UserinfoResolver::new(config.timeout)?;
        Self::with_resolver(config, user, Box::new(resolver))
    }

    /// Creates the service with a custom identity resolver.
    pub fn with_resolver(
        config: GoogleConfig,
        user: UserId,
        resolver: Box<dyn IdentityResolver>,
    ) -> ProviderResult<Self> {
        let oauth = OAuthClient::new(config.credentials.clone(), config.timeout)?;
        let store = AccountStore::open(&config, user)?;

        Ok(Self {
            config,
            oauth,
            resolver,
            store,
            cache: Mutex::new(DataCache::default()),
            fetch_generation: AtomicU64::new(0),
        })
    }

    /// The underlying account store.
    pub fn store(&self) -> &AccountStore {
        &self.store
    }

    /// All linked accounts.
    pub fn accounts(&self) -> Vec<CalendarAccount> {
        self.store.accounts()
    }

    /// The currently active account.
    pub fn active_account(&self) -> Option<CalendarAccount> {
        self.store.active_account()
    }

    /// True when an account is linked and active.
    pub fn is_authenticated(&self) -> bool {
        self.store.is_authenticated()
    }

    /// Runs the browser OAuth flow and links the resulting account.
    pub async fn connect_account(&self) -> ProviderResult<CalendarAccount> {
        let tokens = self
            .oauth
            .authorize(&self.config.scopes, self.config.loopback_port_range)
            .await?;
        self.add_new_account(tokens).await
    }

    /// Links an account from an already-obtained token bundle.
    ///
    /// The Google identity behind the tokens is resolved first; if that
    /// lookup fails, the stored collection is left untouched. On success
    /// the account is upserted (re-auth updates in place) and becomes
    /// active.
    pub async fn add_new_account(&self, tokens: TokenBundle) -> ProviderResult<CalendarAccount> {
        let identity = self
            .resolver
            .resolve(&tokens.access_token)
            .await
            .map_err(|e| {
                warn!("identity lookup failed, leaving accounts unchanged: {}", e);
                e
            })?;

        let account = self.store.add_account(identity, tokens)?;
        self.invalidate().await;
        Ok(account)
    }

    /// Makes another linked account the active one.
    ///
    /// Cached listings and events belong to the previous account and are
    /// cleared.
    pub async fn switch_account(&self, account_id: &str) -> ProviderResult<CalendarAccount> {
        let account = self.store.switch_account(account_id)?;
        self.invalidate().await;
        Ok(account)
    }

    /// Unlinks one account.
    pub async fn disconnect_account(&self, account_id: &str) -> ProviderResult<()> {
        self.store.disconnect_account(account_id)?;
        self.invalidate().await;
        Ok(())
    }

    /// Unlinks every account and resets the calendar selection.
    pub async fn disconnect_all(&self) -> ProviderResult<()> {
        self.store.disconnect_all()?;
        self.invalidate().await;
        Ok(())
    }

    /// Lists the active account's calendars.
    ///
    /// The primary calendar is seeded into the per-user selection the
    /// first time a listing resolves it.
    pub async fn list_calendars(&self) -> ProviderResult<CalendarListing> {
        let (account_id, access_token) = self.ensure_access_token().await?;

        if let Some(listing) = self.cache.lock().await.listing(&account_id) {
            debug!(account = %account_id, "calendar listing served from cache");
            return Ok(listing);
        }

        let generation = self.fetch_generation.load(Ordering::SeqCst);
        let client = CalendarApiClient::new(&access_token, self.config.timeout)?;
        let listing = client.list_calendars().await?;

        self.check_generation(generation)?;

        self.store.seed_primary_calendar(&listing.primary_calendar)?;
        self.cache
            .lock()
            .await
            .put_listing(&account_id, listing.clone());
        Ok(listing)
    }

    /// Fetches events for the selected calendars over the last `days`
    /// days and aggregates them.
    ///
    /// A calendar that fails to fetch is logged and skipped; aggregation
    /// continues with the remaining calendars.
    pub async fn fetch_data(&self, days: i64) -> ProviderResult<CalendarData> {
        let (account_id, access_token) = self.ensure_access_token().await?;

        if let Some(data) = self.cache.lock().await.data(&account_id)
            && data.date_range.days == days
        {
            debug!(account = %account_id, "calendar data served from cache");
            return Ok(data);
        }

        let generation = self.fetch_generation.load(Ordering::SeqCst);
        let client = CalendarApiClient::new(&access_token, self.config.timeout)?;

        // Resolve display names from a listing when we have one cached;
        // fall back to the calendar id otherwise.
        let listing = self.cache.lock().await.listing(&account_id);

        let range = DateRange::last_days(days);
        let calendar_ids = self.store.selected_calendars();

        let mut events: Vec<CalendarEvent> = Vec::new();
        let mut calendars_used = Vec::new();

        for calendar_id in &calendar_ids {
            let name = listing
                .as_ref()
                .and_then(|l| l.name_of(calendar_id))
                .unwrap_or(calendar_id)
                .to_string();

            match client.list_events(calendar_id, &name, &range).await {
                Ok(fetched) => {
                    events.extend(fetched);
                    calendars_used.push(calendar_id.clone());
                }
                Err(e) => {
                    warn!(calendar = %calendar_id, "skipping calendar: {}", e);
                }
            }
        }

        self.check_generation(generation)?;

        let data = CalendarData::new(events, range, calendars_used);
        info!(
            account = %account_id,
            events = data.analytics.total_events,
            calendars = data.calendars_used.len(),
            "fetched calendar data"
        );

        self.cache.lock().await.put_data(&account_id, data.clone());
        Ok(data)
    }

    /// Returns the active account's id and a usable access token,
    /// refreshing (and persisting) it first when expired.
    async fn ensure_access_token(&self) -> ProviderResult<(String, String)> {
        let account = self.store.active_account().ok_or_else(|| {
            ProviderError::authentication("no calendar account connected - run 'flovy auth google'")
        })?;

        if !account.tokens.is_expired() {
            return Ok((account.id, account.tokens.access_token));
        }

        debug!(account = %account.id, "refreshing expired access token");
        let (access_token, expires_in) = self.oauth.refresh(&account.tokens.refresh_token).await?;

        let mut tokens = account.tokens.clone();
        tokens.update_access_token(&access_token, expires_in);
        self.store.update_tokens(&account.id, tokens)?;

        Ok((account.id, access_token))
    }

    /// Clears cached data and invalidates in-flight fetches.
    async fn invalidate(&self) {
        self.fetch_generation.fetch_add(1, Ordering::SeqCst);
        self.cache.lock().await.clear();
    }

    /// Fails if the account changed while a fetch was in flight.
    fn check_generation(&self, generation: u64) -> ProviderResult<()> {
        if self.fetch_generation.load(Ordering::SeqCst) != generation {
            return Err(ProviderError::internal(
                "active account changed during fetch; discarding stale response",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::google::accounts::AccountIdentity;
    use crate::google::client::BoxFuture;
    use crate::google::config::OAuthCredentials;

    /// Resolver that maps access tokens to fixed identities.
    struct StubResolver {
        identities: Vec<(String, AccountIdentity)>,
    }

    impl StubResolver {
        fn new(identities: Vec<(&str, &str, &str)>) -> Self {
            Self {
                identities: identities
                    .into_iter()
                    .map(|(token, id, email)| {
                        (
                            token.to_string(),
                            AccountIdentity {
                                id: id.to_string(),
                                email: email.to_string(),
                            },
                        )
                    })
                    .collect(),
            }
        }
    }

    impl IdentityResolver for StubResolver {
        fn resolve(&self, access_token: &str) -> BoxFuture<'_, ProviderResult<AccountIdentity>> {
            let result = self
                .identities
                .iter()
                .find(|(token, _)| token == access_token)
                .map(|(_, identity)| identity.clone())
                .ok_or_else(|| ProviderError::authentication("unknown access token"));
            Box::pin(async move { result })
        }
    }

    fn service_in(dir: &tempfile::TempDir, resolver: StubResolver) -> CalendarService {
        let credentials =
            OAuthCredentials::new("test-client.apps.googleusercontent.com", "test-secret");
        let config = GoogleConfig::new(credentials).with_data_dir(dir.path());
        CalendarService::with_resolver(config, UserId::new("u1"), Box::new(resolver)).unwrap()
    }

    fn tokens(tag: &str) -> TokenBundle {
        TokenBundle::new(format!("token-{tag}"), format!("refresh-{tag}"), Some(3600))
    }

    #[tokio::test]
    async fn add_new_account_resolves_identity() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_in(&dir, StubResolver::new(vec![("token-a", "A", "a@x.com")]));

        let account = service.add_new_account(tokens("a")).await.unwrap();
        assert_eq!(account.id, "A");
        assert_eq!(account.email, "a@x.com");
        assert!(service.is_authenticated());
    }

    #[tokio::test]
    async fn failed_identity_lookup_leaves_store_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_in(&dir, StubResolver::new(vec![]));

        let err = service.add_new_account(tokens("a")).await.unwrap_err();
        assert_eq!(
            err.code(),
            crate::error::ProviderErrorCode::AuthenticationFailed
        );
        assert!(!service.is_authenticated());
        assert!(service.accounts().is_empty());
    }

    #[tokio::test]
    async fn reauth_keeps_single_entry() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_in(
            &dir,
            StubResolver::new(vec![
                ("token-a", "G1", "g1@x.com"),
                ("token-b", "G1", "g1@x.com"),
            ]),
        );

        service.add_new_account(tokens("a")).await.unwrap();
        service.add_new_account(tokens("b")).await.unwrap();
        assert_eq!(service.accounts().len(), 1);
    }

    #[tokio::test]
    async fn switch_account_clears_cache() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_in(
            &dir,
            StubResolver::new(vec![
                ("token-a", "A", "a@x.com"),
                ("token-b", "B", "b@x.com"),
            ]),
        );

        service.add_new_account(tokens("a")).await.unwrap();
        service.add_new_account(tokens("b")).await.unwrap();

        // Simulate cached data for the active account.
        let data = CalendarData::new(vec![], DateRange::last_days(7), vec![]);
        service.cache.lock().await.put_data("B", data);
        assert!(service.cache.lock().await.data("B").is_some());

        let switched = service.switch_account("A").await.unwrap();
        assert_eq!(switched.email, "a@x.com");
        assert!(service.cache.lock().await.data("B").is_none());
    }

    #[tokio::test]
    async fn switch_invalidates_in_flight_fetches() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_in(
            &dir,
            StubResolver::new(vec![
                ("token-a", "A", "a@x.com"),
                ("token-b", "B", "b@x.com"),
            ]),
        );

        service.add_new_account(tokens("a")).await.unwrap();
        service.add_new_account(tokens("b")).await.unwrap();

        let generation = service.fetch_generation.load(Ordering::SeqCst);
        service.switch_account("A").await.unwrap();

        // A fetch that started before the switch must be discarded.
        assert!(service.check_generation(generation).is_err());
        let current = service.fetch_generation.load(Ordering::SeqCst);
        assert!(service.check_generation(current).is_ok());
    }

    #[tokio::test]
    async fn fetch_without_account_is_an_auth_error() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_in(&dir, StubResolver::new(vec![]));

        let err = service.fetch_data(30).await.unwrap_err();
        assert_eq!(
            err.code(),
            crate::error::ProviderErrorCode::AuthenticationFailed
        );
    }

    #[tokio::test]
    async fn disconnect_all_resets_everything() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_in(&dir, StubResolver::new(vec![("token-a", "A", "a@x.com")]));

        service.add_new_account(tokens("a")).await.unwrap();
        service
            .store()
            .set_selected_calendars(vec!["primary".into(), "work".into()])
            .unwrap();

        service.disconnect_all().await.unwrap();
        assert!(!service.is_authenticated());
        assert_eq!(
            service.store().selected_calendars(),
            vec!["primary".to_string()]
        );
    }
}
