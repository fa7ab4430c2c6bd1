//! Core data models shared by the cache, binding registry and reconciler.
//!
//! These mirror the remote note service's entities closely enough that a
//! [`NoteService`](crate::service::NoteService) implementation can map its
//! wire types onto them without loss for the fields the core cares about.

use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};

/// A named container for notes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notebook {
    pub guid: String,
    pub name: String,
}

/// A tag as known to the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub guid: String,
    pub name: String,
}

/// Server-known note metadata.
///
/// Listing calls only fill in the identifying fields; `resources` is
/// `None` unless the note was just published or fetched with resources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub guid: String,
    pub title: String,
    pub notebook_guid: String,
    #[serde(default)]
    pub tag_guids: Vec<String>,
    #[serde(default)]
    pub resources: Option<Vec<Attachment>>,
}

/// Binary payload of an attachment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceData {
    #[serde(default)]
    pub body: Vec<u8>,
    pub size: usize,
    /// Raw MD5 digest of `body`.
    pub body_hash: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceAttributes {
    pub file_name: String,
    pub attachment: bool,
}

/// A file attached to a note, either staged locally or already on the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// Server-assigned resource guid; `None` for locally staged files.
    #[serde(default)]
    pub guid: Option<String>,
    pub mime: String,
    pub data: ResourceData,
    pub attributes: ResourceAttributes,
}

impl Attachment {
    /// Build a local attachment from file contents, hashing the body once.
    pub fn from_bytes(file_name: impl Into<String>, mime: impl Into<String>, body: Vec<u8>) -> Self {
        let body_hash = Md5::digest(&body).to_vec();
        Self {
            guid: None,
            mime: mime.into(),
            data: ResourceData {
                size: body.len(),
                body,
                body_hash,
            },
            attributes: ResourceAttributes {
                file_name: file_name.into(),
                attachment: true,
            },
        }
    }

    pub fn file_name(&self) -> &str {
        &self.attributes.file_name
    }

    /// Lowercase hex of the body hash, as used in resource references.
    pub fn hash_hex(&self) -> String {
        hex::encode(&self.data.body_hash)
    }
}

/// Stable identity of an open editor document (file name or untitled URI).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocumentId(pub String);

impl DocumentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
