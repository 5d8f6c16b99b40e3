//! Catalog entities and upload assets.
//!
//! Entities use the camelCase field names of the persistence API so they can
//! be decoded straight from its responses. Collection-specific fields
//! (room capacity, service price, translated titles) are carried opaquely in
//! `attributes`.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::types::{EntityId, MimeClass};

// ---------------------------------------------------------------------------
// CatalogEntity
// ---------------------------------------------------------------------------

/// A room, service or gallery item as mirrored from the server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntity {
    /// Server-assigned identifier, unique within its collection.
    pub id: EntityId,
    /// Display position within the collection.
    pub order_index: u32,
    /// Visibility flag.
    #[serde(default = "default_active")]
    pub active: bool,
    /// Ordered asset URLs.
    #[serde(default)]
    pub media_refs: Vec<String>,
    /// Designated main image; always one of `media_refs` when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_ref: Option<String>,
    /// Remaining collection-specific fields.
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

fn default_active() -> bool {
    true
}

impl CatalogEntity {
    pub fn new(id: EntityId, order_index: u32) -> Self {
        Self {
            id,
            order_index,
            active: true,
            media_refs: Vec::new(),
            main_ref: None,
            attributes: Map::new(),
        }
    }

    /// The main image, if one is designated and still present in `media_refs`.
    pub fn main_image(&self) -> Option<&str> {
        self.main_ref
            .as_deref()
            .filter(|main| self.media_refs.iter().any(|r| r == main))
    }

    /// Designate `url` as main image. Returns `false` if it is not one of
    /// the entity's media refs.
    pub fn set_main_ref(&mut self, url: &str) -> bool {
        if !self.media_refs.iter().any(|r| r == url) {
            return false;
        }
        self.main_ref = Some(url.to_string());
        true
    }

    /// Drop a main ref that no longer belongs to `media_refs`.
    pub fn prune_main_ref(&mut self) {
        if self.main_image().is_none() {
            self.main_ref = None;
        }
    }
}

// ---------------------------------------------------------------------------
// Draft / patch / order
// ---------------------------------------------------------------------------

/// Fields of an entity about to be created. The id and order index are
/// assigned by the server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EntityDraft {
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub media_refs: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_ref: Option<String>,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl Default for EntityDraft {
    fn default() -> Self {
        Self {
            active: true,
            media_refs: Vec::new(),
            main_ref: None,
            attributes: Map::new(),
        }
    }
}

impl EntityDraft {
    pub fn into_entity(self, id: EntityId, order_index: u32) -> CatalogEntity {
        let mut entity = CatalogEntity {
            id,
            order_index,
            active: self.active,
            media_refs: self.media_refs,
            main_ref: self.main_ref,
            attributes: self.attributes,
        };
        entity.prune_main_ref();
        entity
    }
}

/// A partial update. `None` fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EntityPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_refs: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_ref: Option<String>,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl EntityPatch {
    pub fn toggle(active: bool) -> Self {
        Self {
            active: Some(active),
            ..Self::default()
        }
    }

    pub fn apply_to(&self, entity: &mut CatalogEntity) {
        if let Some(active) = self.active {
            entity.active = active;
        }
        if let Some(ref refs) = self.media_refs {
            entity.media_refs = refs.clone();
        }
        if let Some(ref main) = self.main_ref {
            entity.main_ref = Some(main.clone());
        }
        for (key, value) in &self.attributes {
            entity.attributes.insert(key.clone(), value.clone());
        }
        entity.prune_main_ref();
    }
}

/// One `{id, orderIndex}` pair of a reorder request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OrderEntry {
    pub id: EntityId,
    pub order_index: u32,
}

impl OrderEntry {
    pub fn new(id: impl Into<EntityId>, order_index: u32) -> Self {
        Self {
            id: id.into(),
            order_index,
        }
    }
}

// ---------------------------------------------------------------------------
// MediaAsset
// ---------------------------------------------------------------------------

/// A file selected for upload. Owned by the upload call and dropped once
/// submitted.
#[derive(Debug, Clone)]
pub struct MediaAsset {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

impl MediaAsset {
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: impl Into<Bytes>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes: bytes.into(),
        }
    }

    /// Media kind, from the content type or, failing that, the extension.
    pub fn mime_class(&self) -> Option<MimeClass> {
        MimeClass::from_content_type(&self.content_type)
            .or_else(|| MimeClass::from_file_name(&self.file_name))
    }

    pub fn size_bytes(&self) -> usize {
        self.bytes.len()
    }
}
