//! Data models for Keiro

mod connection;
mod draft;
mod media;
mod platform;
mod scheduled_post;

pub use connection::{BrandProfile, PlatformConnection};
pub use draft::{Draft, DraftCategory, DraftStatus};
pub use media::{Folder, MediaItem, MediaKind, MediaType};
pub use platform::Platform;
pub use scheduled_post::{ScheduledPost, ScheduledPostStatus, day_key};
