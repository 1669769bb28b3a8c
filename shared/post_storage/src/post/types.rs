//! Post record types and their document conversions

use std::fmt;

use mongodb::bson::{oid::ObjectId, Bson, Document};
use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use strum::Display;

use super::error::{PostStorageError, PostStorageResult};

/// Document attribute names used by the backend
#[derive(Debug, Clone, Copy, Display)]
#[strum(serialize_all = "camelCase")]
pub enum PostAttribute {
    /// Store-assigned primary key
    #[strum(serialize = "_id")]
    Id,
    /// Free-form description
    Description,
    /// Relative on-disk path of the uploaded image
    ImagePath,
    /// Public URL the image is served from
    ImageUrl,
}

/// Keys a client may never write: the identifier is owned by the store
const RESERVED_KEYS: [&str; 2] = ["_id", "id"];

/// Store-assigned post identifier
///
/// Rendered externally as a 24-character lowercase hex string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PostId(ObjectId);

impl PostId {
    /// Parses the external hex representation
    ///
    /// # Errors
    ///
    /// Returns `PostStorageError::InvalidIdentifier` if `raw` is not exactly
    /// 24 hex characters
    pub fn parse(raw: &str) -> PostStorageResult<Self> {
        ObjectId::parse_str(raw)
            .map(Self)
            .map_err(|_| PostStorageError::InvalidIdentifier(raw.to_string()))
    }

    /// Generates a fresh identifier without a store round trip
    #[must_use]
    pub fn generate() -> Self {
        Self(ObjectId::new())
    }

    /// The underlying store identifier
    #[must_use]
    pub const fn as_object_id(&self) -> ObjectId {
        self.0
    }

    /// Lowercase hex representation
    #[must_use]
    pub fn to_hex(&self) -> String {
        self.0.to_hex()
    }
}

impl From<ObjectId> for PostId {
    fn from(oid: ObjectId) -> Self {
        Self(oid)
    }
}

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.to_hex())
    }
}

impl Serialize for PostId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for PostId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Schemaless key/value payload of a post
///
/// Any JSON object is accepted as-is; shape enforcement is left to callers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct PostFields(Map<String, Value>);

/// Fields of a post to be created
pub type PostInput = PostFields;

/// Fields to merge into an existing post
pub type PostPatch = PostFields;

impl PostFields {
    /// Creates an empty payload
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Inserts a field, returning the previous value if any
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Drops identifier keys so a client can never assign or rewrite `id`
    #[must_use]
    pub fn without_reserved_keys(mut self) -> Self {
        for key in RESERVED_KEYS {
            self.0.remove(key);
        }
        self
    }

    /// Converts to a BSON document for writing
    ///
    /// Top-level names must be non-empty and free of `$` prefixes and dots,
    /// so a merge never turns into an operator or a nested path.
    ///
    /// # Errors
    ///
    /// Returns `PostStorageError::InvalidDocument` for a disallowed field name
    /// or a value with no BSON form (such as an integer above `i64::MAX`)
    pub fn to_document(&self) -> PostStorageResult<Document> {
        if let Some(key) = self.0.keys().find(|key| !is_storable_key(key)) {
            return Err(PostStorageError::InvalidDocument(format!(
                "field name `{key}` is not allowed"
            )));
        }
        Ok(mongodb::bson::to_document(&self.0)?)
    }

    #[must_use]
    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

fn is_storable_key(key: &str) -> bool {
    !key.is_empty() && !key.starts_with('$') && !key.contains('.')
}

impl From<Map<String, Value>> for PostFields {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// A stored post: its identifier plus every other stored field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Post {
    /// Store-assigned identifier (24-character hex string)
    #[schemars(with = "String")]
    pub id: PostId,
    /// All remaining fields, flattened next to `id`
    #[serde(flatten)]
    pub fields: PostFields,
}

impl TryFrom<Document> for Post {
    type Error = PostStorageError;

    fn try_from(mut document: Document) -> PostStorageResult<Self> {
        let id = match document.remove(PostAttribute::Id.to_string()) {
            Some(Bson::ObjectId(oid)) => PostId(oid),
            other => {
                return Err(PostStorageError::Serialization(format!(
                    "expected an ObjectId `_id`, found {other:?}"
                )))
            }
        };

        match Bson::Document(document).into_relaxed_extjson() {
            Value::Object(map) => Ok(Self {
                id,
                fields: PostFields(map),
            }),
            other => Err(PostStorageError::Serialization(format!(
                "expected a document body, found {other}"
            ))),
        }
    }
}

/// Acknowledgment of a newly inserted post
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CreatedPost {
    /// Identifier assigned by the store
    #[schemars(with = "String")]
    pub id: PostId,
}

/// What an update did to the collection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// A post matched and at least one field changed
    Modified,
    /// A post matched but the patch equalled the stored values
    Unchanged,
    /// No post has the given identifier; nothing was written
    NotMatched,
}

/// Matched/modified counts of a single-post update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSummary {
    /// Number of posts the identifier matched (0 or 1)
    pub matched_count: u64,
    /// Number of posts whose stored fields changed (0 or 1)
    pub modified_count: u64,
}

impl UpdateSummary {
    /// Summary of an update whose identifier matched nothing
    pub const NOT_MATCHED: Self = Self {
        matched_count: 0,
        modified_count: 0,
    };

    #[must_use]
    pub const fn outcome(&self) -> UpdateOutcome {
        match (self.matched_count, self.modified_count) {
            (0, _) => UpdateOutcome::NotMatched,
            (_, 0) => UpdateOutcome::Unchanged,
            _ => UpdateOutcome::Modified,
        }
    }
}

impl From<mongodb::results::UpdateResult> for UpdateSummary {
    fn from(result: mongodb::results::UpdateResult) -> Self {
        Self {
            matched_count: result.matched_count,
            modified_count: result.modified_count,
        }
    }
}
