//! Cover records and the in-memory deck operations.
//!
//! A deck is an ordered `Vec<Cover>`. The functions here mutate a loaded deck;
//! persisting it is the job of [`crate::store::DeckStore`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{AppError, Result};

pub type Deck = Vec<Cover>;

pub const TRACKS_KIND: &str = "tracks";

/// Tagged music payload: `{ "type": kind, kind: ..., ... }`.
///
/// The value of `type` always names a key of the payload. `tracks` payloads
/// must carry an array under that key; other kinds are kept as given.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub struct Music {
    kind: String,
    body: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MusicShapeError(String);

impl fmt::Display for MusicShapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for MusicShapeError {}

impl Music {
    pub fn tracks(tracks: Vec<Value>) -> Self {
        let mut body = Map::new();
        body.insert(TRACKS_KIND.to_string(), Value::Array(tracks));
        Self {
            kind: TRACKS_KIND.to_string(),
            body,
        }
    }

    /// Parse caller-supplied JSON text. Any syntax or shape problem rejects
    /// the payload as a whole.
    pub fn parse(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| AppError::MalformedInput(format!("music is not valid JSON: {}", e)))?;
        Music::try_from(value).map_err(|e| AppError::MalformedInput(e.to_string()))
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// The value stored under the key named by `type`.
    pub fn payload(&self) -> &Value {
        // present by construction
        self.body.get(&self.kind).unwrap_or(&Value::Null)
    }

    pub fn track_list(&self) -> Option<&[Value]> {
        if self.kind != TRACKS_KIND {
            return None;
        }
        self.payload().as_array().map(Vec::as_slice)
    }
}

impl Default for Music {
    fn default() -> Self {
        Music::tracks(Vec::new())
    }
}

impl TryFrom<Value> for Music {
    type Error = MusicShapeError;

    fn try_from(value: Value) -> std::result::Result<Self, Self::Error> {
        let mut body = match value {
            Value::Object(map) => map,
            other => {
                return Err(MusicShapeError(format!(
                    "music must be an object, got {}",
                    json_type_name(&other)
                )))
            }
        };

        let kind = match body.remove("type") {
            Some(Value::String(kind)) if !kind.is_empty() => kind,
            Some(_) => return Err(MusicShapeError("music.type must be a non-empty string".into())),
            None => return Err(MusicShapeError("music.type is missing".into())),
        };

        match body.get(&kind) {
            None => Err(MusicShapeError(format!(
                "music.type is '{}' but the payload has no '{}' key",
                kind, kind
            ))),
            Some(payload) if kind == TRACKS_KIND && !payload.is_array() => {
                Err(MusicShapeError("music.tracks must be an array".into()))
            }
            Some(_) => Ok(Music { kind, body }),
        }
    }
}

impl From<Music> for Value {
    fn from(music: Music) -> Self {
        let mut map = Map::with_capacity(music.body.len() + 1);
        map.insert("type".to_string(), Value::String(music.kind));
        map.extend(music.body);
        Value::Object(map)
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// One deck record. Every key is optional on the wire and is written back
/// only if it was present, so a sparse record survives a save unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cover {
    pub id: u64,
    /// Title key of older documents, kept apart from `albumTitle`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub front_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub music: Option<Music>,
    /// Fields this service does not interpret, written back untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Cover {
    /// Title shown and searched: the legacy `title` key wins over `albumTitle`.
    pub fn display_title(&self) -> &str {
        self.title
            .as_deref()
            .or(self.album_title.as_deref())
            .unwrap_or("")
    }

    pub fn category(&self) -> &str {
        self.category.as_deref().unwrap_or("")
    }

    pub fn album_title(&self) -> &str {
        self.album_title.as_deref().unwrap_or("")
    }

    pub fn cover_label(&self) -> &str {
        self.cover_label.as_deref().unwrap_or("")
    }

    pub fn front_image(&self) -> &str {
        self.front_image.as_deref().unwrap_or("")
    }

    /// The stored payload, or the empty track list when the key is absent.
    pub fn music(&self) -> Music {
        self.music.clone().unwrap_or_default()
    }
}

/// Fields for a new cover. Anything left out defaults to empty.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverDraft {
    pub category: Option<String>,
    pub album_title: Option<String>,
    pub cover_label: Option<String>,
    pub front_image: Option<String>,
    pub music: Option<Music>,
}

/// Partial update. `music` is raw JSON text and replaces the payload wholesale.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverUpdate {
    pub category: Option<String>,
    pub album_title: Option<String>,
    pub cover_label: Option<String>,
    pub front_image: Option<String>,
    pub music: Option<String>,
}

/// Single-record upsert as posted by the admin form: `id` selects update,
/// its absence selects create.
#[derive(Debug, Clone, Default)]
pub struct CoverUpsert {
    pub id: Option<u64>,
    pub fields: CoverUpdate,
}

impl CoverUpsert {
    /// A blank music field from a form counts as "not supplied".
    pub fn music_text(&self) -> Option<&str> {
        self.fields
            .music
            .as_deref()
            .filter(|text| !text.trim().is_empty())
    }

    pub fn into_draft(self) -> Result<CoverDraft> {
        let music = self.music_text().map(Music::parse).transpose()?;
        let fields = self.fields;
        Ok(CoverDraft {
            category: fields.category,
            album_title: fields.album_title,
            cover_label: fields.cover_label,
            front_image: fields.front_image,
            music,
        })
    }

    pub fn into_update(self) -> CoverUpdate {
        let music = self.music_text().map(str::to_string);
        CoverUpdate {
            music,
            ..self.fields
        }
    }
}

/// How `create` picks the id of a new cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdPolicy {
    /// Current deck length. Can repeat an existing id after a delete.
    #[default]
    Length,
    /// One past the largest id in the deck.
    Monotonic,
}

impl IdPolicy {
    pub fn next_id(self, deck: &[Cover]) -> u64 {
        match self {
            IdPolicy::Length => deck.len() as u64,
            IdPolicy::Monotonic => deck.iter().map(|c| c.id + 1).max().unwrap_or(0),
        }
    }
}

impl FromStr for IdPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "length" => Ok(IdPolicy::Length),
            "monotonic" => Ok(IdPolicy::Monotonic),
            other => Err(format!("unknown id policy '{}'", other)),
        }
    }
}

pub fn create(deck: &mut Deck, draft: CoverDraft, policy: IdPolicy) -> Cover {
    let cover = Cover {
        id: policy.next_id(deck),
        title: None,
        category: Some(draft.category.unwrap_or_default()),
        album_title: Some(draft.album_title.unwrap_or_default()),
        cover_label: Some(draft.cover_label.unwrap_or_default()),
        front_image: Some(draft.front_image.unwrap_or_default()),
        music: Some(draft.music.unwrap_or_default()),
        extra: Map::new(),
    };
    deck.push(cover.clone());
    cover
}

/// Apply `update` to the first cover with `id`. The music text is parsed
/// before anything is touched, so a rejected update changes nothing.
pub fn update(deck: &mut Deck, id: u64, update: CoverUpdate) -> Result<Cover> {
    let music = update.music.as_deref().map(Music::parse).transpose()?;

    let cover = deck
        .iter_mut()
        .find(|c| c.id == id)
        .ok_or_else(|| AppError::NotFound(format!("cover {}", id)))?;

    if let Some(category) = update.category {
        cover.category = Some(category);
    }
    if let Some(album_title) = update.album_title {
        cover.album_title = Some(album_title);
    }
    if let Some(cover_label) = update.cover_label {
        cover.cover_label = Some(cover_label);
    }
    if let Some(front_image) = update.front_image {
        cover.front_image = Some(front_image);
    }
    if let Some(music) = music {
        cover.music = Some(music);
    }

    Ok(cover.clone())
}

/// Remove the first cover with `id`, returning its former position.
pub fn delete(deck: &mut Deck, id: u64) -> Result<(usize, Cover)> {
    let position = deck
        .iter()
        .position(|c| c.id == id)
        .ok_or_else(|| AppError::NotFound(format!("cover {}", id)))?;
    Ok((position, deck.remove(position)))
}
