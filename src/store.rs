use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

use crate::config::{self, Config};
use crate::deck::{self, Cover, CoverDraft, CoverUpdate, CoverUpsert, Deck, IdPolicy};
use crate::error::{AppError, Result};
use crate::tree::{self, Node, TreeDocument};

/// Resolves per-artist document locations under the data directory.
#[derive(Debug, Clone)]
pub struct Library {
    config: Config,
}

impl Library {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn artist_dir(&self, artist: &str) -> Result<PathBuf> {
        validate_artist(artist)?;
        Ok(self.config.data_dir.join(artist))
    }

    pub fn deck_store(&self, artist: &str) -> Result<DeckStore> {
        Ok(DeckStore::new(
            self.artist_dir(artist)?.join(config::COVERS_FILE),
            self.config.id_policy,
        ))
    }

    pub fn tree_store(&self, artist: &str) -> Result<TreeStore> {
        Ok(TreeStore::new(
            self.artist_dir(artist)?.join(config::ASSETS_FILE),
        ))
    }
}

/// Artist names become a directory name, so only a plain slug is allowed.
pub fn validate_artist(artist: &str) -> Result<()> {
    let valid = !artist.is_empty()
        && artist.len() <= config::MAX_ARTIST_LEN
        && artist
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(AppError::MalformedInput(format!("invalid artist '{}'", artist)))
    }
}

/// `covers.json`. Every mutation is a full read, change, and rewrite.
#[derive(Debug, Clone)]
pub struct DeckStore {
    path: PathBuf,
    id_policy: IdPolicy,
}

impl DeckStore {
    pub fn new(path: impl Into<PathBuf>, id_policy: IdPolicy) -> Self {
        Self {
            path: path.into(),
            id_policy,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A missing file is an empty deck.
    pub fn load(&self) -> Result<Deck> {
        Ok(read_document(&self.path)?.unwrap_or_default())
    }

    pub fn save(&self, deck: &[Cover]) -> Result<()> {
        write_document(&self.path, deck)
    }

    pub fn list(&self) -> Result<Deck> {
        self.load()
    }

    pub fn create(&self, draft: CoverDraft) -> Result<Cover> {
        let mut deck = self.load()?;
        let cover = deck::create(&mut deck, draft, self.id_policy);
        self.save(&deck)?;
        log::info!("Created cover {} in {}", cover.id, self.path.display());
        Ok(cover)
    }

    pub fn update(&self, id: u64, update: CoverUpdate) -> Result<Cover> {
        let mut deck = self.load()?;
        let cover = deck::update(&mut deck, id, update)?;
        self.save(&deck)?;
        log::info!("Updated cover {} in {}", id, self.path.display());
        Ok(cover)
    }

    pub fn upsert(&self, upsert: CoverUpsert) -> Result<Cover> {
        match upsert.id {
            Some(id) => self.update(id, upsert.into_update()),
            None => self.create(upsert.into_draft()?),
        }
    }

    /// Returns the removed cover and the position it held.
    pub fn delete(&self, id: u64) -> Result<(usize, Cover)> {
        let mut deck = self.load()?;
        let removed = deck::delete(&mut deck, id)?;
        self.save(&deck)?;
        log::info!(
            "Deleted cover {} (position {}) from {}",
            id,
            removed.0,
            self.path.display()
        );
        Ok(removed)
    }

    /// Bulk save: the given array becomes the document as-is.
    pub fn replace(&self, deck: Deck) -> Result<Deck> {
        self.save(&deck)?;
        log::info!("Replaced deck in {} ({} covers)", self.path.display(), deck.len());
        Ok(deck)
    }
}

/// `assets.json`. Normalized on every read and before every write.
#[derive(Debug, Clone)]
pub struct TreeStore {
    path: PathBuf,
}

impl TreeStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<TreeDocument> {
        let mut doc: TreeDocument = read_document(&self.path)?.unwrap_or_default();
        tree::normalize_document(&mut doc);
        doc.validate()?;
        Ok(doc)
    }

    pub fn save(&self, doc: &TreeDocument) -> Result<()> {
        write_document(&self.path, doc)
    }

    pub fn get(&self) -> Result<TreeDocument> {
        self.load()
    }

    pub fn replace(&self, mut doc: TreeDocument) -> Result<TreeDocument> {
        tree::normalize_document(&mut doc);
        doc.validate()?;
        self.save(&doc)?;
        log::info!("Replaced tree in {}", self.path.display());
        Ok(doc)
    }

    pub fn insert(&self, root: Option<&str>, path: &[String], node: Node) -> Result<TreeDocument> {
        let mut doc = self.load()?;
        let name = node.name.clone();
        tree::insert(&mut doc, root, path, node)?;
        tree::normalize_document(&mut doc);
        doc.validate()?;
        self.save(&doc)?;
        log::info!("Added '{}' under /{} in {}", name, path.join("/"), self.path.display());
        Ok(doc)
    }

    pub fn remove(&self, root: Option<&str>, path: &[String], name: &str) -> Result<Node> {
        let mut doc = self.load()?;
        let removed = tree::remove(&mut doc, root, path, name)?;
        self.save(&doc)?;
        log::info!("Removed '{}' from /{} in {}", name, path.join("/"), self.path.display());
        Ok(removed)
    }
}

fn read_document<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            log::warn!("{} does not exist yet, starting empty", path.display());
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    };

    log::debug!("Loaded {} ({} bytes)", path.display(), content.len());
    serde_json::from_str(&content)
        .map(Some)
        .map_err(|source| AppError::CorruptDocument {
            path: path.display().to_string(),
            source,
        })
}

/// Write to a temp file next to `path`, then rename over it. The previous
/// document stays intact until the rename.
fn write_document<T: Serialize + ?Sized>(path: &Path, doc: &T) -> Result<()> {
    let json = serde_json::to_vec_pretty(doc)
        .map_err(|e| AppError::Internal(format!("encoding {}: {}", path.display(), e)))?;

    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    let temp_path = parent.join(format!(".{}.{}.tmp", file_name, Uuid::new_v4()));

    let written = File::create(&temp_path)
        .and_then(|mut file| {
            file.write_all(&json)?;
            file.sync_all()
        })
        .and_then(|_| fs::rename(&temp_path, path));

    if let Err(e) = written {
        if let Err(cleanup) = fs::remove_file(&temp_path) {
            if cleanup.kind() != ErrorKind::NotFound {
                log::warn!("Could not remove {}: {}", temp_path.display(), cleanup);
            }
        }
        return Err(e.into());
    }

    log::debug!("Wrote {} ({} bytes)", path.display(), json.len());
    Ok(())
}
