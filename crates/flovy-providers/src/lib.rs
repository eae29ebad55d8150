//! External service providers for flovy.
//!
//! Everything that talks to the outside world lives here:
//!
//! - [`google`] — Google Calendar: OAuth 2.0 PKCE flow, per-user
//!   multi-account token storage, the Calendar API client, and the data
//!   service that aggregates schedule analytics.
//! - [`ai`] — productivity suggestion generation against OpenAI or
//!   Gemini, with a mock fallback when no API key is configured.
//! - [`brevo`] — waitlist CRM integration.
//!
//! Errors share the [`ProviderError`] taxonomy so callers can classify
//! failures (retryable network trouble vs. authentication vs. bad
//! configuration) without knowing which backend produced them.

pub mod ai;
pub mod brevo;
pub mod error;
pub mod google;
pub mod storage;

pub use error::{ProviderError, ProviderErrorCode, ProviderResult};
