//! Command-line interface definition.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// flovy - your workday, organized
#[derive(Debug, Parser)]
#[command(name = "flovy")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "FLOVY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v')]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Authentication commands
    Auth {
        #[command(subcommand)]
        provider: AuthProvider,
    },

    /// Manage linked calendar accounts
    Accounts {
        #[command(subcommand)]
        action: AccountsAction,
    },

    /// Manage calendars of the active account
    Calendars {
        #[command(subcommand)]
        action: CalendarsAction,
    },

    /// Fetch calendar events and analytics
    Events {
        /// How many days back to fetch
        #[arg(long, default_value = "60")]
        days: i64,

        /// Print the raw JSON instead of a summary
        #[arg(long)]
        json: bool,
    },

    /// Generate an AI productivity suggestion
    Suggest {
        /// Backend to use (openai or gemini)
        #[arg(long)]
        model: Option<String>,

        /// Name to address the user by (defaults to the profile user)
        #[arg(long)]
        name: Option<String>,
    },

    /// Waitlist signups
    Waitlist {
        #[command(subcommand)]
        action: WaitlistAction,
    },

    /// Notes and goals
    Notes {
        #[command(subcommand)]
        action: NotesAction,
    },

    /// Session timeout settings
    Session {
        #[command(subcommand)]
        action: SessionAction,
    },
}

/// Authentication providers.
#[derive(Debug, Subcommand)]
pub enum AuthProvider {
    /// Link a Google Calendar account
    Google {
        /// OAuth client ID (from Google Cloud Console)
        #[arg(long, env = "GOOGLE_CLIENT_ID")]
        client_id: Option<String>,

        /// OAuth client secret (from Google Cloud Console)
        #[arg(long, env = "GOOGLE_CLIENT_SECRET")]
        client_secret: Option<String>,

        /// Path to a Google Cloud Console credentials JSON file
        #[arg(long, env = "GOOGLE_CREDENTIALS_FILE")]
        credentials_file: Option<PathBuf>,
    },
}

/// Account management actions.
#[derive(Debug, Subcommand)]
pub enum AccountsAction {
    /// List linked accounts
    List,

    /// Make another linked account active
    Switch {
        /// Google account id (see `flovy accounts list`)
        account_id: String,
    },

    /// Unlink one account
    Disconnect {
        /// Google account id
        account_id: String,
    },

    /// Unlink every account
    DisconnectAll,
}

/// Calendar selection actions.
#[derive(Debug, Subcommand)]
pub enum CalendarsAction {
    /// List the active account's calendars
    List,

    /// Choose which calendars feed the analytics
    Select {
        /// Calendar ids to select
        #[arg(required = true)]
        calendar_ids: Vec<String>,
    },
}

/// Waitlist actions.
#[derive(Debug, Subcommand)]
pub enum WaitlistAction {
    /// Add someone to the waitlist
    Add {
        /// Contact email
        #[arg(long)]
        email: String,

        /// First name
        #[arg(long)]
        name: Option<String>,

        /// What they struggle with
        #[arg(long)]
        challenge: Option<String>,

        /// What they want to achieve
        #[arg(long)]
        goal: Option<String>,

        /// How urgently they want it
        #[arg(long)]
        urgency: Option<String>,
    },

    /// List waitlist contacts
    List {
        /// Maximum number of contacts to fetch
        #[arg(long, default_value = "50")]
        limit: u32,
    },
}

/// Notes actions.
#[derive(Debug, Subcommand)]
pub enum NotesAction {
    /// Add a note
    Add {
        /// Short title
        title: String,

        /// Body text
        #[arg(long, default_value = "")]
        content: String,

        /// Kind: goal, note, or reminder
        #[arg(long, default_value = "note")]
        kind: String,

        /// Priority: high, medium, or low
        #[arg(long, default_value = "medium")]
        priority: String,
    },

    /// List notes and stats
    List,

    /// Mark a note as done
    Done {
        /// Note id
        id: String,
    },

    /// Remove a note
    Remove {
        /// Note id
        id: String,
    },
}

/// Session actions.
#[derive(Debug, Subcommand)]
pub enum SessionAction {
    /// Show the effective session timeout configuration
    Status,

    /// Persist a session preset to config.toml
    Preset {
        /// Preset name (high-security, standard, development, no-timeout)
        name: String,
    },
}
