use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::PENDING_ID_PREFIX;

// Stable identifier assigned by the persistence service
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct EntityId(pub String);

impl EntityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Placeholder id for an entity created locally but not yet confirmed.
    pub fn pending() -> Self {
        Self(format!("{PENDING_ID_PREFIX}{}", Uuid::new_v4()))
    }

    pub fn is_pending(&self) -> bool {
        self.0.starts_with(PENDING_ID_PREFIX)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for EntityId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// The catalog collections mirrored by the store.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Rooms,
    Services,
    Gallery,
}

impl Collection {
    pub const ALL: [Collection; 3] = [Collection::Rooms, Collection::Services, Collection::Gallery];

    /// Path segment of the collection on the persistence API.
    pub fn path(&self) -> &'static str {
        match self {
            Collection::Rooms => "rooms",
            Collection::Services => "services",
            Collection::Gallery => "gallery",
        }
    }

    /// Destination folder hint passed to the storage service.
    pub fn upload_folder(&self) -> &'static str {
        self.path()
    }

    /// Rooms and services carry a designated main image.
    pub fn has_main_ref(&self) -> bool {
        matches!(self, Collection::Rooms | Collection::Services)
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.path())
    }
}

/// Broad media kind of an uploaded asset.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MimeClass {
    Image,
    Video,
}

impl MimeClass {
    /// Classify a `Content-Type` value such as `video/mp4; codecs=avc1`.
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or("")
            .trim()
            .to_ascii_lowercase();
        match essence.split('/').next() {
            Some("image") => Some(Self::Image),
            Some("video") => Some(Self::Video),
            _ => None,
        }
    }

    /// Fallback classification from a file name extension.
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        let ext = file_name.rsplit_once('.')?.1.to_ascii_lowercase();
        match ext.as_str() {
            "jpg" | "jpeg" | "png" | "webp" | "gif" | "avif" => Some(Self::Image),
            "mp4" | "webm" | "mov" | "mkv" | "avi" | "ogv" => Some(Self::Video),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MimeClass::Image => "image",
            MimeClass::Video => "video",
        }
    }
}

impl std::fmt::Display for MimeClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mime_from_content_type() {
        assert_eq!(MimeClass::from_content_type("video/mp4"), Some(MimeClass::Video));
        assert_eq!(
            MimeClass::from_content_type("Video/WebM; codecs=vp9"),
            Some(MimeClass::Video)
        );
        assert_eq!(MimeClass::from_content_type("image/png"), Some(MimeClass::Image));
        assert_eq!(MimeClass::from_content_type("application/json"), None);
        assert_eq!(MimeClass::from_content_type(""), None);
    }

    #[test]
    fn test_mime_from_file_name() {
        assert_eq!(MimeClass::from_file_name("lobby.MOV"), Some(MimeClass::Video));
        assert_eq!(MimeClass::from_file_name("pool.jpeg"), Some(MimeClass::Image));
        assert_eq!(MimeClass::from_file_name("notes.txt"), None);
        assert_eq!(MimeClass::from_file_name("no_extension"), None);
    }

    #[test]
    fn test_pending_ids() {
        let id = EntityId::pending();
        assert!(id.is_pending());
        assert!(!EntityId::from("42").is_pending());
        assert_ne!(EntityId::pending(), id);
    }

    #[test]
    fn test_collection_paths() {
        assert_eq!(Collection::Gallery.path(), "gallery");
        assert!(Collection::Rooms.has_main_ref());
        assert!(!Collection::Gallery.has_main_ref());
    }
}
