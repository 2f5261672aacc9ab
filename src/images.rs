//! Filesystem-backed storage for user and game images.
//!
//! Files live flat in a single directory with deterministic names of the form
//! `game_<id>.<ext>` / `user_<id>.<ext>`. Replacement writes the new file
//! first, then updates the metadata row, then deletes the old file, so a crash
//! can only leave an orphaned file behind — never a dangling reference.
//! Orphans are swept at startup.

use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use sea_orm::{DatabaseConnection, DbErr, EntityTrait, QuerySelect};
use tokio::fs;

use crate::entities::{game, user};

/// Allowed upload content types and their file extensions.
const VALID_TYPES: &[(&str, &str)] = &[
    ("image/jpeg", ".jpg"),
    ("image/png", ".png"),
    ("image/gif", ".gif"),
];

/// Handle to the image directory.
#[derive(Debug, Clone)]
pub struct ImageStore {
    dir: PathBuf,
}

impl ImageStore {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Map an upload `Content-Type` to a file extension, or `None` if the
    /// type is not in the allow-list.
    #[must_use]
    pub fn extension_for(content_type: &str) -> Option<&'static str> {
        VALID_TYPES
            .iter()
            .find(|(ct, _)| *ct == content_type)
            .map(|(_, ext)| *ext)
    }

    /// Content type for a stored filename, derived from its extension.
    #[must_use]
    pub fn content_type_for(filename: &str) -> &'static str {
        let ext = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("");
        VALID_TYPES
            .iter()
            .find(|(_, e)| e.trim_start_matches('.') == ext)
            .map_or("application/octet-stream", |(ct, _)| ct)
    }

    /// Deterministic filename for a game image.
    #[must_use]
    pub fn game_filename(game_id: i32, extension: &str) -> String {
        format!("game_{game_id}{extension}")
    }

    /// Deterministic filename for a user image.
    #[must_use]
    pub fn user_filename(user_id: i32, extension: &str) -> String {
        format!("user_{user_id}{extension}")
    }

    /// Create the image directory if it does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub async fn ensure_dir(&self) -> std::io::Result<()> {
        fs::create_dir_all(&self.dir).await
    }

    /// Read a stored image, or `None` if the file is missing.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failures other than the file being absent.
    pub async fn read(&self, filename: &str) -> std::io::Result<Option<Vec<u8>>> {
        match fs::read(self.dir.join(filename)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Write an image file, creating the directory on first use.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub async fn write(&self, filename: &str, bytes: &[u8]) -> std::io::Result<()> {
        fs::create_dir_all(&self.dir).await?;
        fs::write(self.dir.join(filename), bytes).await
    }

    /// Delete an image file; a file that is already gone is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failures other than the file being absent.
    pub async fn remove(&self, filename: &str) -> std::io::Result<()> {
        match fs::remove_file(self.dir.join(filename)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Delete files that no `image_filename` column references.
    ///
    /// Image writes are not transactional with their metadata update, so a
    /// crash between the two can strand a file. Returns the number removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be listed or a file cannot be
    /// removed.
    pub async fn sweep_orphans(&self, referenced: &HashSet<String>) -> std::io::Result<usize> {
        let mut removed = 0;
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e),
        };
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if !referenced.contains(&name) {
                fs::remove_file(entry.path()).await?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}

/// Collect every filename referenced by a user or game row.
///
/// # Errors
///
/// Returns an error if either query fails.
pub async fn referenced_filenames(db: &DatabaseConnection) -> Result<HashSet<String>, DbErr> {
    let mut referenced = HashSet::new();

    let user_files: Vec<Option<String>> = user::Entity::find()
        .select_only()
        .column(user::Column::ImageFilename)
        .into_tuple()
        .all(db)
        .await?;
    let game_files: Vec<Option<String>> = game::Entity::find()
        .select_only()
        .column(game::Column::ImageFilename)
        .into_tuple()
        .all(db)
        .await?;

    referenced.extend(user_files.into_iter().flatten());
    referenced.extend(game_files.into_iter().flatten());
    Ok(referenced)
}
