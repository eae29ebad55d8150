//! Core types: users, time, events, analytics, notes

pub mod analytics;
pub mod event;
pub mod notes;
pub mod time;
pub mod trace;
pub mod user;

pub use analytics::{CalendarAnalytics, CalendarData, aggregate};
pub use event::CalendarEvent;
pub use notes::{AiContext, Note, NoteKind, NotesStats, Priority, TimeContext};
pub use time::{DateRange, EventTime};
pub use trace::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
pub use user::UserId;
