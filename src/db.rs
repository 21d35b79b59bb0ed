//! Local-mode `SQLite` store: drafts, scheduled posts, library and connections
//!
//! Implements the same collaborator traits as the studio client, so the
//! orchestration layer runs unchanged without a backend.

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::path::Path;
use uuid::Uuid;

use crate::api::{DraftStore, Library, ScheduleStore};
use crate::models::{
    BrandProfile, Draft, DraftCategory, DraftStatus, Folder, MediaItem, MediaKind, MediaType,
    Platform, PlatformConnection, ScheduledPost, ScheduledPostStatus,
};
use crate::paths;

const DRAFT_COLUMNS: &str = "id, platform, media_ref, media_url, media_type, caption, hashtags, status, \
     category, original_media_url, narration_script, permalink, created_at, updated_at, scheduled_for";

const SCHEDULED_COLUMNS: &str =
    "id, platform, media_ref, media_url, scheduled_for, caption, hashtags, status, created_at";

/// Database connection wrapper
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create the database at the default location
    pub fn open() -> Result<Self> {
        Self::open_path(&paths::database_path()?)
    }

    /// Open or create the database at a specific path
    pub fn open_path(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create data directory")?;
        }
        let conn = Connection::open(path).context("Failed to open database")?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    fn init(&self) -> Result<()> {
        self.conn.execute_batch(
            r"
            CREATE TABLE IF NOT EXISTS drafts (
                id TEXT PRIMARY KEY,
                platform TEXT NOT NULL,
                media_ref TEXT,
                media_url TEXT,
                media_type TEXT NOT NULL,
                caption TEXT NOT NULL,
                hashtags TEXT NOT NULL DEFAULT '[]',
                status TEXT NOT NULL DEFAULT 'draft',
                category TEXT NOT NULL DEFAULT 'draft',
                original_media_url TEXT,
                narration_script TEXT,
                permalink TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                scheduled_for TEXT
            );

            CREATE TABLE IF NOT EXISTS scheduled_posts (
                id TEXT PRIMARY KEY,
                platform TEXT NOT NULL,
                media_ref TEXT,
                media_url TEXT,
                scheduled_for TEXT NOT NULL,
                caption TEXT NOT NULL,
                hashtags TEXT NOT NULL DEFAULT '[]',
                status TEXT NOT NULL DEFAULT 'scheduled',
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS media (
                id TEXT PRIMARY KEY,
                url TEXT NOT NULL,
                thumbnail_url TEXT,
                title TEXT,
                kind TEXT NOT NULL,
                folder_id TEXT,
                is_favorite INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS folders (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                color TEXT
            );

            CREATE TABLE IF NOT EXISTS connections (
                platform TEXT PRIMARY KEY,
                external_user_id TEXT NOT NULL,
                username TEXT NOT NULL,
                token_expiry TEXT
            );

            CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_drafts_platform ON drafts(platform);
            CREATE INDEX IF NOT EXISTS idx_scheduled_posts_scheduled_for ON scheduled_posts(scheduled_for);
            CREATE INDEX IF NOT EXISTS idx_media_kind ON media(kind);
            ",
        )?;
        Ok(())
    }

    // ==================== Drafts ====================

    fn write_draft(&self, draft: &Draft, replace: bool) -> Result<usize> {
        let sql = if replace {
            format!("INSERT OR REPLACE INTO drafts ({DRAFT_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)")
        } else {
            format!("INSERT INTO drafts ({DRAFT_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)")
        };
        let rows = self.conn.execute(
            &sql,
            params![
                draft.id.to_string(),
                draft.platform.slug(),
                draft.media_ref,
                draft.media_url,
                draft.media_type.as_str(),
                draft.caption,
                serde_json::to_string(&draft.hashtags)?,
                draft.status.as_str(),
                draft.category.as_str(),
                draft.original_media_url,
                draft.narration_script,
                draft.permalink,
                draft.created_at.to_rfc3339(),
                draft.updated_at.to_rfc3339(),
                draft.scheduled_for.map(|dt| dt.to_rfc3339()),
            ],
        )?;
        Ok(rows)
    }

    /// Get one draft
    pub fn get_draft(&self, id: Uuid) -> Result<Option<Draft>> {
        self.conn
            .query_row(
                &format!("SELECT {DRAFT_COLUMNS} FROM drafts WHERE id = ?1"),
                params![id.to_string()],
                Self::row_to_draft,
            )
            .optional()
            .map_err(Into::into)
    }

    fn row_to_draft(row: &Row<'_>) -> rusqlite::Result<Draft> {
        let platform = parse_platform(1, &row.get::<_, String>(1)?)?;
        let media_type: String = row.get(4)?;
        let hashtags: String = row.get(6)?;
        let status: String = row.get(7)?;
        let category: String = row.get(8)?;

        Ok(Draft {
            id: parse_uuid(0, &row.get::<_, String>(0)?)?,
            platform,
            media_ref: row.get(2)?,
            media_url: row.get(3)?,
            media_type: MediaType::from_str(&media_type)
                .ok_or_else(|| conversion_error(4, format!("unknown media type '{media_type}'")))?,
            caption: row.get(5)?,
            hashtags: parse_hashtags(6, &hashtags)?,
            status: DraftStatus::from_str(&status).unwrap_or_default(),
            category: DraftCategory::from_str(&category).unwrap_or_default(),
            original_media_url: row.get(9)?,
            narration_script: row.get(10)?,
            permalink: row.get(11)?,
            created_at: parse_time(12, &row.get::<_, String>(12)?)?,
            updated_at: parse_time(13, &row.get::<_, String>(13)?)?,
            scheduled_for: row
                .get::<_, Option<String>>(14)?
                .map(|s| parse_time(14, &s))
                .transpose()?,
        })
    }

    // ==================== Scheduled Posts ====================

    fn row_to_scheduled_post(row: &Row<'_>) -> rusqlite::Result<ScheduledPost> {
        let hashtags: String = row.get(6)?;
        let status: String = row.get(7)?;

        Ok(ScheduledPost {
            id: parse_uuid(0, &row.get::<_, String>(0)?)?,
            platform: parse_platform(1, &row.get::<_, String>(1)?)?,
            media_ref: row.get(2)?,
            media_url: row.get(3)?,
            scheduled_for: parse_time(4, &row.get::<_, String>(4)?)?,
            caption: row.get(5)?,
            hashtags: parse_hashtags(6, &hashtags)?,
            status: ScheduledPostStatus::from_str(&status).unwrap_or_default(),
            created_at: parse_time(8, &row.get::<_, String>(8)?)?,
        })
    }

    /// Mark a scheduled post as published
    pub fn mark_scheduled_published(&self, id: Uuid) -> Result<()> {
        self.conn.execute(
            "UPDATE scheduled_posts SET status = ?2 WHERE id = ?1",
            params![id.to_string(), ScheduledPostStatus::Published.as_str()],
        )?;
        Ok(())
    }

    // ==================== Library ====================

    /// Add an item to the library
    pub fn add_media(&self, item: &MediaItem) -> Result<()> {
        self.conn.execute(
            r"INSERT OR REPLACE INTO media (id, url, thumbnail_url, title, kind, folder_id, is_favorite, created_at)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                item.id,
                item.url,
                item.thumbnail_url,
                item.title,
                item.kind.as_str(),
                item.folder_id,
                i32::from(item.is_favorite),
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Remove an item from the library
    pub fn delete_media(&self, id: &str) -> Result<()> {
        self.conn.execute("DELETE FROM media WHERE id = ?1", params![id])?;
        Ok(())
    }

    /// Create or rename a folder
    pub fn save_folder(&self, folder: &Folder) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO folders (id, name, color) VALUES (?1, ?2, ?3)",
            params![folder.id, folder.name, folder.color],
        )?;
        Ok(())
    }

    /// Record a linked platform account
    pub fn save_connection(&self, connection: &PlatformConnection) -> Result<()> {
        self.conn.execute(
            r"INSERT OR REPLACE INTO connections (platform, external_user_id, username, token_expiry)
               VALUES (?1, ?2, ?3, ?4)",
            params![
                connection.platform.slug(),
                connection.external_user_id,
                connection.username,
                connection.token_expiry.map(|dt| dt.to_rfc3339()),
            ],
        )?;
        Ok(())
    }

    /// Forget a linked platform account
    pub fn delete_connection(&self, platform: Platform) -> Result<()> {
        self.conn.execute(
            "DELETE FROM connections WHERE platform = ?1",
            params![platform.slug()],
        )?;
        Ok(())
    }

    fn setting(&self, key: &str) -> Result<Option<String>> {
        self.conn
            .query_row("SELECT value FROM settings WHERE key = ?1", params![key], |row| row.get(0))
            .optional()
            .map_err(Into::into)
    }

    fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO settings (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }
}

impl Library for Database {
    async fn list_media(&self, kind: MediaKind, limit: usize) -> Result<Vec<MediaItem>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, url, thumbnail_url, title, kind, folder_id, is_favorite
             FROM media WHERE kind = ?1 ORDER BY created_at DESC LIMIT ?2",
        )?;
        let items = stmt.query_map(params![kind.as_str(), i64::try_from(limit).unwrap_or(i64::MAX)], |row| {
            Ok(MediaItem {
                id: row.get(0)?,
                url: row.get(1)?,
                thumbnail_url: row.get(2)?,
                title: row.get(3)?,
                kind,
                folder_id: row.get(5)?,
                is_favorite: row.get::<_, i32>(6)? != 0,
            })
        })?;
        items.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    async fn list_folders(&self) -> Result<Vec<Folder>> {
        let mut stmt = self.conn.prepare("SELECT id, name, color FROM folders ORDER BY name")?;
        let folders = stmt.query_map([], |row| {
            Ok(Folder {
                id: row.get(0)?,
                name: row.get(1)?,
                color: row.get(2)?,
            })
        })?;
        folders.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    async fn connections(&self) -> Result<Vec<PlatformConnection>> {
        let mut stmt = self.conn.prepare(
            "SELECT platform, external_user_id, username, token_expiry FROM connections ORDER BY platform",
        )?;
        let connections = stmt.query_map([], |row| {
            Ok(PlatformConnection {
                platform: parse_platform(0, &row.get::<_, String>(0)?)?,
                external_user_id: row.get(1)?,
                username: row.get(2)?,
                token_expiry: row
                    .get::<_, Option<String>>(3)?
                    .map(|s| parse_time(3, &s))
                    .transpose()?,
            })
        })?;
        connections.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    fn connect_url(&self, _platform: Platform) -> Option<String> {
        None
    }

    async fn brand(&self) -> Result<BrandProfile> {
        match self.setting("brand")? {
            Some(json) => serde_json::from_str(&json).context("Corrupt brand profile"),
            None => Ok(BrandProfile::default()),
        }
    }

    async fn save_brand(&self, brand: &BrandProfile) -> Result<BrandProfile> {
        self.set_setting("brand", &serde_json::to_string(brand)?)?;
        Ok(brand.clone())
    }
}

impl DraftStore for Database {
    async fn list_drafts(&self, platform: Platform) -> Result<Vec<Draft>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {DRAFT_COLUMNS} FROM drafts WHERE platform = ?1 ORDER BY updated_at DESC"
        ))?;
        let drafts = stmt.query_map(params![platform.slug()], Self::row_to_draft)?;
        drafts.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    async fn insert_draft(&self, draft: &Draft) -> Result<Draft> {
        self.write_draft(draft, false)
            .with_context(|| format!("Failed to insert draft {}", draft.id))?;
        Ok(draft.clone())
    }

    async fn update_draft(&self, draft: &Draft) -> Result<Draft> {
        if self.get_draft(draft.id)?.is_none() {
            bail!("Draft {} not found", draft.id);
        }
        self.write_draft(draft, true)?;
        Ok(draft.clone())
    }

    async fn delete_draft(&self, platform: Platform, id: Uuid) -> Result<()> {
        self.conn.execute(
            "DELETE FROM drafts WHERE id = ?1 AND platform = ?2",
            params![id.to_string(), platform.slug()],
        )?;
        Ok(())
    }
}

impl ScheduleStore for Database {
    async fn list_scheduled_posts(&self) -> Result<Vec<ScheduledPost>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {SCHEDULED_COLUMNS} FROM scheduled_posts ORDER BY scheduled_for ASC"
        ))?;
        let posts = stmt.query_map([], Self::row_to_scheduled_post)?;
        posts.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    async fn create_scheduled_post(&self, post: &ScheduledPost) -> Result<ScheduledPost> {
        self.conn.execute(
            &format!("INSERT INTO scheduled_posts ({SCHEDULED_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"),
            params![
                post.id.to_string(),
                post.platform.slug(),
                post.media_ref,
                post.media_url,
                post.scheduled_for.to_rfc3339(),
                post.caption,
                serde_json::to_string(&post.hashtags)?,
                post.status.as_str(),
                post.created_at.to_rfc3339(),
            ],
        )?;
        Ok(post.clone())
    }

    async fn delete_scheduled_post(&self, id: Uuid) -> Result<()> {
        self.conn.execute(
            "DELETE FROM scheduled_posts WHERE id = ?1",
            params![id.to_string()],
        )?;
        Ok(())
    }
}

fn conversion_error(column: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, Type::Text, message.into())
}

fn parse_hashtags(column: usize, value: &str) -> rusqlite::Result<Vec<String>> {
    serde_json::from_str(value)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(e)))
}

fn parse_uuid(column: usize, value: &str) -> rusqlite::Result<Uuid> {
    Uuid::parse_str(value)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(e)))
}

fn parse_time(column: usize, value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(e)))
}

fn parse_platform(column: usize, value: &str) -> rusqlite::Result<Platform> {
    Platform::from_str(value).ok_or_else(|| conversion_error(column, format!("unknown platform '{value}'")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempfile::tempdir;
    use tokio_test::{assert_err, assert_ok};

    fn db() -> (tempfile::TempDir, Database) {
        let dir = tempdir().unwrap();
        let db = Database::open_path(&dir.path().join("keiro.sqlite")).unwrap();
        (dir, db)
    }

    #[tokio::test]
    async fn test_draft_crud_per_platform() {
        let (_dir, db) = db();
        let mut draft = Draft::new(Platform::Tiktok, MediaType::Video, "Recette express");
        draft.media_url = Some("https://cdn/merged.mp4".to_string());
        draft.original_media_url = Some("https://cdn/raw.mp4".to_string());
        draft.hashtags = vec!["#recette".to_string(), "#rapide".to_string()];
        db.insert_draft(&draft).await.unwrap();
        db.insert_draft(&Draft::new(Platform::Linkedin, MediaType::TextOnly, "Autre"))
            .await
            .unwrap();

        let tiktok = db.list_drafts(Platform::Tiktok).await.unwrap();
        assert_eq!(tiktok.len(), 1);
        assert_eq!(tiktok[0].hashtags, draft.hashtags);
        assert_eq!(tiktok[0].original_media_url.as_deref(), Some("https://cdn/raw.mp4"));

        draft.caption = "Recette express v2".to_string();
        draft.status = DraftStatus::Ready;
        db.update_draft(&draft).await.unwrap();
        let tiktok = db.list_drafts(Platform::Tiktok).await.unwrap();
        assert_eq!(tiktok.len(), 1);
        assert_eq!(tiktok[0].caption, "Recette express v2");
        assert_eq!(tiktok[0].status, DraftStatus::Ready);

        db.delete_draft(Platform::Tiktok, draft.id).await.unwrap();
        assert!(db.list_drafts(Platform::Tiktok).await.unwrap().is_empty());
        assert_eq!(db.list_drafts(Platform::Linkedin).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_hashtags_with_commas_survive_reload() {
        let (_dir, db) = db();
        let mut draft = Draft::new(Platform::Instagram, MediaType::Image, "Carte d'automne");
        draft.media_url = Some("https://cdn/menu.png".to_string());
        draft.hashtags = vec!["#a,b".to_string(), "#automne".to_string()];
        assert_ok!(db.insert_draft(&draft).await);

        let loaded = db.get_draft(draft.id).unwrap().unwrap();
        assert_eq!(loaded.hashtags, ["#a,b", "#automne"]);

        let post = ScheduledPost::new(Platform::Linkedin, Utc::now(), "x", vec!["#un,deux".to_string()]);
        assert_ok!(db.create_scheduled_post(&post).await);
        assert_eq!(db.list_scheduled_posts().await.unwrap()[0].hashtags, ["#un,deux"]);
    }

    #[tokio::test]
    async fn test_update_requires_existing_draft() {
        let (_dir, db) = db();
        let draft = Draft::new(Platform::Instagram, MediaType::Image, "x");
        assert_err!(db.update_draft(&draft).await);
        assert_ok!(db.insert_draft(&draft).await);
        assert_err!(db.insert_draft(&draft).await);
    }

    #[tokio::test]
    async fn test_scheduled_posts_sorted_by_time() {
        let (_dir, db) = db();
        let now = Utc::now();
        let later = ScheduledPost::new(Platform::Instagram, now + Duration::days(2), "b", Vec::new());
        let sooner = ScheduledPost::new(Platform::Tiktok, now + Duration::hours(3), "a", vec!["#a".to_string()]);
        assert_ok!(db.create_scheduled_post(&later).await);
        assert_ok!(db.create_scheduled_post(&sooner).await);

        let posts = db.list_scheduled_posts().await.unwrap();
        assert_eq!(posts.iter().map(|p| p.caption.as_str()).collect::<Vec<_>>(), ["a", "b"]);
        assert_eq!(posts[0].hashtags, ["#a"]);

        db.mark_scheduled_published(sooner.id).unwrap();
        db.delete_scheduled_post(later.id).await.unwrap();
        let posts = db.list_scheduled_posts().await.unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].status, ScheduledPostStatus::Published);
    }

    #[tokio::test]
    async fn test_library_and_connections() {
        let (_dir, db) = db();
        db.add_media(&MediaItem::new("i1", "https://cdn/i1.png", MediaKind::Image)).unwrap();
        db.add_media(&MediaItem::new("v1", "https://cdn/v1.mp4", MediaKind::Video)).unwrap();
        db.save_folder(&Folder {
            id: "f1".to_string(),
            name: "Menus".to_string(),
            color: None,
        })
        .unwrap();

        let images = db.list_media(MediaKind::Image, 10).await.unwrap();
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].id, "i1");
        assert_eq!(db.list_folders().await.unwrap()[0].name, "Menus");
        db.delete_media("i1").unwrap();
        assert!(db.list_media(MediaKind::Image, 10).await.unwrap().is_empty());
        assert_eq!(db.list_media(MediaKind::Video, 10).await.unwrap().len(), 1);

        db.save_connection(&PlatformConnection::new(Platform::Linkedin, "urn:li:1", "keiro"))
            .unwrap();
        let connections = db.connections().await.unwrap();
        assert_eq!(connections.len(), 1);
        assert!(connections[0].is_active());
        db.delete_connection(Platform::Linkedin).unwrap();
        assert!(db.connections().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_brand_defaults_then_persists() {
        let (_dir, db) = db();
        assert_eq!(db.brand().await.unwrap(), BrandProfile::default());

        let brand = BrandProfile {
            business_name: Some("Chez Lina".to_string()),
            tone: Some("convivial".to_string()),
            ..BrandProfile::default()
        };
        db.save_brand(&brand).await.unwrap();
        assert_eq!(db.brand().await.unwrap(), brand);
    }
}
