//! Google Calendar provider.
//!
//! # Pieces
//!
//! - [`GoogleConfig`] / [`OAuthCredentials`] — client credentials and
//!   provider settings.
//! - [`OAuthClient`] — OAuth 2.0 PKCE flow with a loopback redirect and
//!   token refresh.
//! - [`AccountStore`] — per-application-user storage of one or more
//!   linked Google accounts and the per-user selected-calendar set.
//! - [`CalendarApiClient`] — the Calendar API v3 surface (calendar list,
//!   paginated events, userinfo).
//! - [`CalendarService`] — the high-level operations the rest of the app
//!   talks to: connect an account, switch/disconnect, list calendars,
//!   fetch analytics data.
//!
//! # Connecting an account
//!
//! 1. The PKCE flow opens the browser to Google's consent page
//! 2. The loopback server receives the single-use callback
//! 3. The authorization code is exchanged for a token bundle
//! 4. The userinfo endpoint resolves which Google account it belongs to
//! 5. The account is upserted into the owning user's store and becomes
//!    the active account

mod accounts;
mod cache;
mod client;
mod config;
mod oauth;
mod service;

pub use accounts::{AccountIdentity, AccountStore, CalendarAccount};
pub use cache::DataCache;
pub use client::{
    BoxFuture, CalendarApiClient, CalendarListEntry, CalendarListing, IdentityResolver,
    UserinfoResolver,
};
pub use config::{GoogleConfig, OAuthCredentials};
pub use oauth::{OAuthClient, PkceFlow, TokenBundle};
pub use service::CalendarService;
