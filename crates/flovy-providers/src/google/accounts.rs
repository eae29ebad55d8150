//! Per-user multi-account token storage.
//!
//! Each application user can link several Google accounts. The set of
//! linked accounts, the currently active one, and the selected-calendar
//! list are all persisted per user in their own files, so two users
//! sharing a machine never see each other's tokens.
//!
//! Invariants:
//! - the active account id, when set, names an entry in the collection
//! - re-authenticating an already-linked Google account updates that
//!   entry in place instead of duplicating it
//! - clearing happens only on explicit user action or on the owning
//!   user's sign-out cascade

use flovy_core::UserId;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ProviderError, ProviderResult};
use crate::storage::JsonStore;

use super::config::GoogleConfig;
use super::oauth::TokenBundle;

/// The resolved identity of a Google account, from the userinfo endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountIdentity {
    /// Google account id.
    pub id: String,
    /// Account email address.
    pub email: String,
}

/// One linked Google Calendar account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarAccount {
    /// Google account id (unique key within the collection).
    pub id: String,
    /// Account email address.
    pub email: String,
    /// The OAuth tokens for this account.
    pub tokens: TokenBundle,
    /// Whether the account is currently connected.
    pub is_connected: bool,
}

/// The persisted per-user account collection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountSet {
    accounts: Vec<CalendarAccount>,
    active: Option<String>,
}

/// Per-user storage of linked accounts and selected calendars.
#[derive(Debug)]
pub struct AccountStore {
    user: UserId,
    accounts: JsonStore<AccountSet>,
    selected: JsonStore<Vec<String>>,
}

impl AccountStore {
    /// The default calendar selection before any listing has been fetched.
    pub const DEFAULT_SELECTION: &'static str = "primary";

    /// Opens (and loads) the store for the given user.
    pub fn open(config: &GoogleConfig, user: UserId) -> ProviderResult<Self> {
        let accounts = JsonStore::new(config.accounts_path(&user));
        let selected = JsonStore::new(config.selected_path(&user));
        accounts.load()?;
        selected.load()?;
        Ok(Self {
            user,
            accounts,
            selected,
        })
    }

    /// The owning application user.
    pub fn user(&self) -> &UserId {
        &self.user
    }

    /// All linked accounts.
    pub fn accounts(&self) -> Vec<CalendarAccount> {
        self.accounts.get().map(|s| s.accounts).unwrap_or_default()
    }

    /// The currently active account, if any.
    pub fn active_account(&self) -> Option<CalendarAccount> {
        let set = self.accounts.get()?;
        let active = set.active?;
        set.accounts.into_iter().find(|a| a.id == active)
    }

    /// The id of the currently active account, if any.
    pub fn active_account_id(&self) -> Option<String> {
        self.accounts.get().and_then(|s| s.active)
    }

    /// True when at least one account is linked and active.
    pub fn is_authenticated(&self) -> bool {
        self.active_account().is_some()
    }

    /// Upserts an account and makes it active.
    ///
    /// A re-authenticating Google account (same resolved id) replaces its
    /// existing entry in place; the collection length is unchanged.
    pub fn add_account(
        &self,
        identity: AccountIdentity,
        tokens: TokenBundle,
    ) -> ProviderResult<CalendarAccount> {
        let account = CalendarAccount {
            id: identity.id,
            email: identity.email,
            tokens,
            is_connected: true,
        };

        let added = account.clone();
        self.accounts.update(|set| {
            match set.accounts.iter_mut().find(|a| a.id == account.id) {
                Some(existing) => {
                    debug!(account = %account.id, "updating existing calendar account");
                    *existing = account.clone();
                }
                None => {
                    debug!(account = %account.id, "linking new calendar account");
                    set.accounts.push(account.clone());
                }
            }
            set.active = Some(account.id.clone());
        })?;

        info!(user = %self.user, account = %added.email, "calendar account connected");
        Ok(added)
    }

    /// Replaces the token bundle of an existing account (after a refresh).
    pub fn update_tokens(&self, account_id: &str, tokens: TokenBundle) -> ProviderResult<()> {
        let mut found = false;
        self.accounts.update(|set| {
            if let Some(account) = set.accounts.iter_mut().find(|a| a.id == account_id) {
                account.tokens = tokens.clone();
                found = true;
            }
        })?;

        if found {
            Ok(())
        } else {
            Err(ProviderError::not_found(format!(
                "no linked account with id {}",
                account_id
            )))
        }
    }

    /// Repoints the active account to an existing entry.
    pub fn switch_account(&self, account_id: &str) -> ProviderResult<CalendarAccount> {
        let set = self.accounts.get().unwrap_or_default();
        let account = set
            .accounts
            .iter()
            .find(|a| a.id == account_id)
            .cloned()
            .ok_or_else(|| {
                ProviderError::not_found(format!("no linked account with id {}", account_id))
            })?;

        self.accounts.update(|set| {
            set.active = Some(account_id.to_string());
        })?;

        info!(user = %self.user, account = %account.email, "switched active calendar account");
        Ok(account)
    }

    /// Removes an account.
    ///
    /// If it was active, another remaining account is promoted; if none
    /// remain, auth state clears entirely.
    pub fn disconnect_account(&self, account_id: &str) -> ProviderResult<()> {
        let set = self.accounts.get().unwrap_or_default();
        if !set.accounts.iter().any(|a| a.id == account_id) {
            return Err(ProviderError::not_found(format!(
                "no linked account with id {}",
                account_id
            )));
        }

        self.accounts.update(|set| {
            set.accounts.retain(|a| a.id != account_id);
            if set.active.as_deref() == Some(account_id) {
                set.active = set.accounts.first().map(|a| a.id.clone());
            }
        })?;

        info!(user = %self.user, account = %account_id, "calendar account disconnected");
        Ok(())
    }

    /// Clears all accounts and the calendar selection for this user.
    ///
    /// Used for the explicit "disconnect everything" action and for the
    /// sign-out cascade; both remove the per-user files outright.
    pub fn disconnect_all(&self) -> ProviderResult<()> {
        self.accounts.clear()?;
        self.selected.clear()?;
        info!(user = %self.user, "cleared all calendar accounts");
        Ok(())
    }

    /// The selected calendar ids, defaulting to the primary calendar.
    pub fn selected_calendars(&self) -> Vec<String> {
        self.selected
            .get()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| vec![Self::DEFAULT_SELECTION.to_string()])
    }

    /// Replaces the selected calendar ids.
    pub fn set_selected_calendars(&self, ids: Vec<String>) -> ProviderResult<()> {
        self.selected.set(ids)
    }

    /// Ensures the primary calendar is part of the selection.
    ///
    /// Called after the first listing fetch resolves the real primary id.
    pub fn seed_primary_calendar(&self, primary_id: &str) -> ProviderResult<()> {
        let mut selection = self.selected_calendars();
        if !selection.iter().any(|id| id == primary_id) {
            selection.push(primary_id.to_string());
            self.selected.set(selection)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::google::config::OAuthCredentials;

    fn config_in(dir: &tempfile::TempDir) -> GoogleConfig {
        let credentials =
            OAuthCredentials::new("test-client.apps.googleusercontent.com", "test-secret");
        GoogleConfig::new(credentials).with_data_dir(dir.path())
    }

    fn tokens(tag: &str) -> TokenBundle {
        TokenBundle::new(format!("access-{tag}"), format!("refresh-{tag}"), Some(3600))
    }

    fn identity(id: &str, email: &str) -> AccountIdentity {
        AccountIdentity {
            id: id.to_string(),
            email: email.to_string(),
        }
    }

    fn open_store(dir: &tempfile::TempDir, user: &str) -> AccountStore {
        AccountStore::open(&config_in(dir), UserId::new(user)).unwrap()
    }

    #[test]
    fn add_account_sets_active() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir, "u1");

        assert!(!store.is_authenticated());
        store.add_account(identity("A", "a@x.com"), tokens("a")).unwrap();

        assert!(store.is_authenticated());
        assert_eq!(store.active_account().unwrap().email, "a@x.com");
        assert_eq!(store.accounts().len(), 1);
    }

    #[test]
    fn reauth_updates_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir, "u1");

        store.add_account(identity("G1", "g1@x.com"), tokens("old")).unwrap();
        store.add_account(identity("G1", "g1@x.com"), tokens("new")).unwrap();

        let accounts = store.accounts();
        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].tokens.access_token, "access-new");
    }

    #[test]
    fn switch_between_accounts() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir, "u1");

        store.add_account(identity("A", "a@x.com"), tokens("a")).unwrap();
        store.add_account(identity("B", "b@x.com"), tokens("b")).unwrap();
        assert_eq!(store.active_account().unwrap().id, "B");

        let switched = store.switch_account("A").unwrap();
        assert_eq!(switched.email, "a@x.com");
        assert_eq!(store.active_account().unwrap().id, "A");

        assert!(store.switch_account("missing").is_err());
    }

    #[test]
    fn disconnect_active_promotes_remaining() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir, "u1");

        store.add_account(identity("A", "a@x.com"), tokens("a")).unwrap();
        store.add_account(identity("B", "b@x.com"), tokens("b")).unwrap();

        store.disconnect_account("B").unwrap();
        assert_eq!(store.active_account().unwrap().id, "A");
    }

    #[test]
    fn disconnect_non_active_leaves_active_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir, "u1");

        store.add_account(identity("A", "a@x.com"), tokens("a")).unwrap();
        store.add_account(identity("B", "b@x.com"), tokens("b")).unwrap();

        store.disconnect_account("A").unwrap();
        assert_eq!(store.active_account().unwrap().id, "B");
    }

    #[test]
    fn disconnect_last_clears_auth() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir, "u1");

        store.add_account(identity("A", "a@x.com"), tokens("a")).unwrap();
        store.disconnect_account("A").unwrap();

        assert!(!store.is_authenticated());
        assert!(store.active_account().is_none());
    }

    #[test]
    fn disconnect_all_removes_files() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir);
        let user = UserId::new("u1");
        let store = AccountStore::open(&config, user.clone()).unwrap();

        store.add_account(identity("A", "a@x.com"), tokens("a")).unwrap();
        store.set_selected_calendars(vec!["primary".into(), "work".into()]).unwrap();
        assert!(config.accounts_path(&user).exists());
        assert!(config.selected_path(&user).exists());

        store.disconnect_all().unwrap();
        assert!(!config.accounts_path(&user).exists());
        assert!(!config.selected_path(&user).exists());
        assert!(!store.is_authenticated());
        assert_eq!(store.selected_calendars(), vec!["primary".to_string()]);
    }

    #[test]
    fn persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = open_store(&dir, "u1");
            store.add_account(identity("A", "a@x.com"), tokens("a")).unwrap();
        }

        let reopened = open_store(&dir, "u1");
        assert!(reopened.is_authenticated());
        assert_eq!(reopened.active_account().unwrap().id, "A");
    }

    #[test]
    fn users_are_isolated() {
        let dir = tempfile::tempdir().unwrap();
        let alice = open_store(&dir, "alice");
        let bob = open_store(&dir, "bob");

        alice.add_account(identity("A", "a@x.com"), tokens("a")).unwrap();

        assert!(alice.is_authenticated());
        assert!(!bob.is_authenticated());
        assert!(bob.accounts().is_empty());
    }

    #[test]
    fn selection_defaults_and_seeding() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir, "u1");

        assert_eq!(store.selected_calendars(), vec!["primary".to_string()]);

        store.seed_primary_calendar("me@x.com").unwrap();
        assert_eq!(
            store.selected_calendars(),
            vec!["primary".to_string(), "me@x.com".to_string()]
        );

        // Seeding again does not duplicate.
        store.seed_primary_calendar("me@x.com").unwrap();
        assert_eq!(store.selected_calendars().len(), 2);
    }

    #[test]
    fn corrupt_account_file_recovers_empty() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir);
        let user = UserId::new("u1");

        std::fs::create_dir_all(dir.path()).unwrap();
        std::fs::write(config.accounts_path(&user), "{{ definitely not json").unwrap();

        let store = AccountStore::open(&config, user.clone()).unwrap();
        assert!(!store.is_authenticated());
        assert!(store.accounts().is_empty());
        assert!(!config.accounts_path(&user).exists());
    }

    #[test]
    fn update_tokens_persists_refresh() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir, "u1");

        store.add_account(identity("A", "a@x.com"), tokens("a")).unwrap();
        store.update_tokens("A", tokens("fresh")).unwrap();

        assert_eq!(
            store.active_account().unwrap().tokens.access_token,
            "access-fresh"
        );
        assert!(store.update_tokens("missing", tokens("x")).is_err());
    }
}
