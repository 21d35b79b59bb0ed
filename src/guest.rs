//! Guest mode: try the studio without an account
//!
//! Guest identity and quota live in a key/value store injected into the
//! session, never in ambient global state.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::models::{Draft, Platform};

/// Guest e-mail address
pub const GUEST_EMAIL_KEY: &str = "keiro_guest_email";
/// When the guest session started (RFC 3339)
pub const GUEST_STARTED_AT_KEY: &str = "keiro_guest_started_at";
/// Images generated during the guest session (JSON array of URLs)
pub const GUEST_IMAGES_KEY: &str = "keiro_guest_images";
/// The single Instagram draft a guest may keep (JSON)
pub const GUEST_INSTAGRAM_DRAFT_KEY: &str = "keiro_guest_instagram_draft";
/// Platforms last selected in the publish picker (JSON array)
pub const SELECTED_NETWORKS_KEY: &str = "keiro_selected_networks";

const GUEST_KEYS: &[&str] = &[
    GUEST_EMAIL_KEY,
    GUEST_STARTED_AT_KEY,
    GUEST_IMAGES_KEY,
    GUEST_INSTAGRAM_DRAFT_KEY,
];

/// Persistent key/value storage
pub trait KeyValueStore {
    /// Read a value
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a value
    fn set(&mut self, key: &str, value: &str) -> Result<()>;

    /// Remove a value
    fn clear(&mut self, key: &str) -> Result<()>;
}

/// In-memory store (tests, embedding)
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: HashMap<String, String>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn clear(&mut self, key: &str) -> Result<()> {
        self.values.remove(key);
        Ok(())
    }
}

/// JSON-file-backed store
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// Use the file at `path`, created on first write
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Store at the default location
    pub fn open() -> Result<Self> {
        Ok(Self::new(crate::paths::guest_store_path()?))
    }

    fn load(&self) -> Result<HashMap<String, String>> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }
        let content = fs::read_to_string(&self.path).context("Failed to read local storage")?;
        if content.trim().is_empty() {
            return Ok(HashMap::new());
        }
        serde_json::from_str(&content).context("Failed to parse local storage")
    }

    fn save(&self, values: &HashMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).context("Failed to create data directory")?;
        }
        let json = serde_json::to_string_pretty(values)?;
        fs::write(&self.path, json).context("Failed to write local storage")
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.load()?.remove(key))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let mut values = self.load()?;
        values.insert(key.to_string(), value.to_string());
        self.save(&values)
    }

    fn clear(&mut self, key: &str) -> Result<()> {
        let mut values = self.load()?;
        if values.remove(key).is_some() {
            self.save(&values)?;
        }
        Ok(())
    }
}

/// An unauthenticated user with a one-Instagram-draft quota
#[derive(Debug)]
pub struct GuestSession<S> {
    store: S,
    email: String,
    started_at: DateTime<Utc>,
}

impl<S: KeyValueStore> GuestSession<S> {
    /// Start (or resume) a guest session for `email`
    pub fn start(mut store: S, email: &str) -> Result<Self> {
        let email = email.trim().to_string();
        anyhow::ensure!(!email.is_empty(), "Guest e-mail is required");

        let same_guest = store.get(GUEST_EMAIL_KEY)?.as_deref() == Some(email.as_str());
        let started_at = match read_started_at(&store)? {
            Some(at) if same_guest => at,
            _ => {
                let now = Utc::now();
                store.set(GUEST_EMAIL_KEY, &email)?;
                store.set(GUEST_STARTED_AT_KEY, &now.to_rfc3339())?;
                now
            }
        };

        tracing::debug!("Guest session for {email} since {started_at}");
        Ok(Self {
            store,
            email,
            started_at,
        })
    }

    /// Resume the session stored in `store`, if any
    pub fn resume(store: S) -> Result<Option<Self>> {
        let Some(email) = store.get(GUEST_EMAIL_KEY)? else {
            return Ok(None);
        };
        let started_at = read_started_at(&store)?.unwrap_or_else(Utc::now);
        Ok(Some(Self {
            store,
            email,
            started_at,
        }))
    }

    /// Guest e-mail
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Session start
    pub const fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Whether the guest may save a draft for `platform` right now
    pub fn can_save_draft(&self, platform: Platform) -> Result<bool> {
        if platform != Platform::Instagram {
            return Ok(false);
        }
        Ok(self.instagram_draft()?.is_none())
    }

    /// The guest's Instagram draft
    pub fn instagram_draft(&self) -> Result<Option<Draft>> {
        match self.store.get(GUEST_INSTAGRAM_DRAFT_KEY)? {
            Some(json) => Ok(Some(
                serde_json::from_str(&json).context("Corrupted guest draft")?,
            )),
            None => Ok(None),
        }
    }

    /// Store the guest's Instagram draft
    pub fn store_instagram_draft(&mut self, draft: &Draft) -> Result<()> {
        let json = serde_json::to_string(draft)?;
        self.store.set(GUEST_INSTAGRAM_DRAFT_KEY, &json)
    }

    /// Drop the guest's Instagram draft, freeing the quota
    pub fn delete_instagram_draft(&mut self) -> Result<()> {
        self.store.clear(GUEST_INSTAGRAM_DRAFT_KEY)
    }

    /// Images generated during the session
    pub fn images(&self) -> Result<Vec<String>> {
        read_json_list(&self.store, GUEST_IMAGES_KEY)
    }

    /// Remember a generated image
    pub fn add_image(&mut self, url: &str) -> Result<()> {
        let mut images = self.images()?;
        if !images.iter().any(|u| u == url) {
            images.push(url.to_string());
        }
        self.store.set(GUEST_IMAGES_KEY, &serde_json::to_string(&images)?)
    }

    /// End the session and wipe guest data
    pub fn end(mut self) -> Result<S> {
        for key in GUEST_KEYS {
            self.store.clear(key)?;
        }
        Ok(self.store)
    }

    /// Underlying store
    pub const fn store(&self) -> &S {
        &self.store
    }
}

/// Who is driving the studio
#[derive(Debug)]
pub enum Session<S> {
    /// Signed-in user; persistence goes through the stores
    Authenticated,
    /// Guest; persistence stays local
    Guest(GuestSession<S>),
}

impl<S> Session<S> {
    /// Whether this is a guest session
    pub const fn is_guest(&self) -> bool {
        matches!(self, Self::Guest(_))
    }
}

/// Platforms last selected in the publish picker
pub fn selected_networks(store: &impl KeyValueStore) -> Result<Vec<Platform>> {
    let names = read_json_list(store, SELECTED_NETWORKS_KEY)?;
    Ok(names.iter().filter_map(|n| Platform::from_str(n)).collect())
}

/// Remember the platforms selected in the publish picker
pub fn save_selected_networks(store: &mut impl KeyValueStore, platforms: &[Platform]) -> Result<()> {
    let names: Vec<&str> = platforms.iter().map(Platform::slug).collect();
    store.set(SELECTED_NETWORKS_KEY, &serde_json::to_string(&names)?)
}

fn read_started_at(store: &impl KeyValueStore) -> Result<Option<DateTime<Utc>>> {
    Ok(store
        .get(GUEST_STARTED_AT_KEY)?
        .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|dt| dt.with_timezone(&Utc)))
}

fn read_json_list(store: &impl KeyValueStore, key: &str) -> Result<Vec<String>> {
    match store.get(key)? {
        Some(json) => Ok(serde_json::from_str(&json).unwrap_or_default()),
        None => Ok(Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MediaType;
    use tempfile::tempdir;

    #[test]
    fn test_start_and_resume() {
        let session = GuestSession::start(MemoryStore::new(), "ana@example.com").unwrap();
        let started = session.started_at();
        let store = session.store().clone();

        let resumed = GuestSession::resume(store).unwrap().unwrap();
        assert_eq!(resumed.email(), "ana@example.com");
        assert_eq!(resumed.started_at().timestamp(), started.timestamp());
        assert!(Session::Guest(resumed).is_guest());
        assert!(!Session::<MemoryStore>::Authenticated.is_guest());
    }

    #[test]
    fn test_resume_without_session() {
        assert!(GuestSession::resume(MemoryStore::new()).unwrap().is_none());
    }

    #[test]
    fn test_quota_is_one_instagram_draft() {
        let mut session = GuestSession::start(MemoryStore::new(), "ana@example.com").unwrap();
        assert!(session.can_save_draft(Platform::Instagram).unwrap());
        assert!(!session.can_save_draft(Platform::Tiktok).unwrap());

        let draft = Draft::new(Platform::Instagram, MediaType::Image, "hello");
        session.store_instagram_draft(&draft).unwrap();
        assert!(!session.can_save_draft(Platform::Instagram).unwrap());

        session.delete_instagram_draft().unwrap();
        assert!(session.can_save_draft(Platform::Instagram).unwrap());
    }

    #[test]
    fn test_end_wipes_guest_keys_only() {
        let mut store = MemoryStore::new();
        save_selected_networks(&mut store, &[Platform::Linkedin]).unwrap();
        let mut session = GuestSession::start(store, "ana@example.com").unwrap();
        session.add_image("https://cdn/a.png").unwrap();

        let store = session.end().unwrap();
        assert!(store.get(GUEST_EMAIL_KEY).unwrap().is_none());
        assert!(store.get(GUEST_IMAGES_KEY).unwrap().is_none());
        assert_eq!(selected_networks(&store).unwrap(), vec![Platform::Linkedin]);
    }

    #[test]
    fn test_file_store_persists() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("local_storage.json");

        let mut store = FileStore::new(&path);
        store.set(GUEST_EMAIL_KEY, "bob@example.com").unwrap();

        let reopened = FileStore::new(&path);
        assert_eq!(
            reopened.get(GUEST_EMAIL_KEY).unwrap().as_deref(),
            Some("bob@example.com")
        );

        let mut reopened = reopened;
        reopened.clear(GUEST_EMAIL_KEY).unwrap();
        assert!(reopened.get(GUEST_EMAIL_KEY).unwrap().is_none());
    }

    #[test]
    fn test_add_image_dedupes() {
        let mut session = GuestSession::start(MemoryStore::new(), "ana@example.com").unwrap();
        session.add_image("https://cdn/a.png").unwrap();
        session.add_image("https://cdn/a.png").unwrap();
        assert_eq!(session.images().unwrap().len(), 1);
    }
}
