//! # Keiro
//!
//! Draft and publish orchestration for a social-media content studio.
//!
//! ## Overview
//!
//! Keiro takes a picture or video from the user's library, helps write the
//! caption (optionally with an AI suggestion), narrates videos, and turns the
//! result into a draft, a publish on Instagram, TikTok, LinkedIn or X, or a
//! scheduled post on the calendar. The four platforms share one flow; what
//! differs between them is data in a [`profile::PlatformProfile`].
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        PublishFlow                          │
//! │   One compose session per platform, driven by its profile   │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!          ┌───────────────────┼───────────────────┐
//!          ▼                   ▼                   ▼
//! ┌─────────────────┐ ┌─────────────────┐ ┌─────────────────┐
//! │    Selection    │ │    Composer     │ │    Narration    │
//! │                 │ │                 │ │                 │
//! │ • Media tabs    │ │ • Caption       │ │ • TTS audio     │
//! │ • Page cap      │ │ • Hashtags      │ │ • Merge video   │
//! │ • Zero state    │ │ • Char limits   │ │ • Staleness     │
//! └─────────────────┘ └─────────────────┘ └─────────────────┘
//!          │                   │                   │
//!          └───────────────────┴───────────────────┘
//!                              │
//!          ┌───────────────────┼───────────────────┐
//!          ▼                   ▼                   ▼
//! ┌─────────────────┐ ┌─────────────────┐ ┌─────────────────┐
//! │     Drafts      │ │     Publish     │ │    Schedule     │
//! │                 │ │                 │ │                 │
//! │ • Save / edit   │ │ • Preconditions │ │ • Fan-out       │
//! │ • Guest quota   │ │ • Confirmation  │ │ • Partial fail  │
//! │ • Delete        │ │ • Support ticket│ │ • Calendar      │
//! └─────────────────┘ └─────────────────┘ └─────────────────┘
//!                              │
//!              ┌───────────────┴───────────────┐
//!              ▼                               ▼
//!     ┌─────────────────┐             ┌─────────────────┐
//!     │  StudioClient   │             │    Database     │
//!     │  (HTTP backend) │             │  (local mode)   │
//!     └─────────────────┘             └─────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`api`] — Collaborator traits and the HTTP studio client
//! - [`auth`] — Encrypted session-token vault
//! - [`composer`] — Caption and hashtag editing with platform limits
//! - [`config`] — Configuration management
//! - [`db`] — `SQLite` store for local mode
//! - [`drafts`] — Draft persistence and the guest quota
//! - [`error`] — Error taxonomy of the flow
//! - [`flow`] — The per-platform compose/publish session
//! - [`guest`] — Guest sessions over a key/value store
//! - [`models`] — Data models (Draft, `ScheduledPost`, `MediaItem`, ...)
//! - [`narration`] — Narration and subtitle pipeline for videos
//! - [`profile`] — Per-platform constraints
//! - [`publish`] — Publish dispatcher
//! - [`schedule`] — Scheduling fan-out and calendar
//! - [`selection`] — Media picker state
//!
//! ## Example
//!
//! ```no_run
//! use keiro::{Platform, PublishFlow, narration::VoiceSettings};
//!
//! let mut flow = PublishFlow::new(Platform::Twitter, 50, true, VoiceSettings::default());
//! flow.composer_mut().set_caption("Ouverture samedi !");
//! flow.composer_mut().add_hashtag("bistrot").unwrap();
//! assert!(flow.composer().remaining() > 0);
//! ```

#![doc(html_root_url = "https://docs.rs/keiro/0.3.1")]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![allow(clippy::unused_async)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::option_if_let_else)]
#![allow(clippy::if_not_else)]
#![allow(clippy::single_match_else)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::trivially_copy_pass_by_ref)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::use_self)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::should_implement_trait)]
#![allow(clippy::future_not_send)]
#![allow(clippy::manual_let_else)]
#![allow(clippy::return_self_not_must_use)]

pub mod api;
pub mod auth;
pub mod composer;
pub mod config;
pub mod db;
pub mod drafts;
pub mod error;
pub mod flow;
pub mod guest;
pub mod models;
pub mod narration;
pub mod paths;
pub mod profile;
pub mod publish;
pub mod schedule;
pub mod selection;

// Re-export main types for convenience
pub use api::StudioClient;
pub use config::Config;
pub use db::Database;
pub use error::{FlowError, SupportTicket, ValidationError};
pub use flow::PublishFlow;
pub use models::{
    Draft, DraftStatus, MediaItem, MediaKind, MediaType, Platform, ScheduledPost,
    ScheduledPostStatus,
};
pub use profile::PlatformProfile;

/// ASCII logo for the application
pub const LOGO: &str = r"
  _  __     _
 | |/ /___ (_)_ __ ___
 | ' // _ \| | '__/ _ \
 | . \  __/| | | | (_) |
 |_|\_\___||_|_|  \___/
";

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
