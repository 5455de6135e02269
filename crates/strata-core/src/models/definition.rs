//! Migration definitions and the schema operation vocabulary.

use std::fmt;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use super::identifier::MigrationId;

/// One ordered schema-evolution step.
///
/// `up` carries the forward operations, `down` the reverse ones. An empty
/// `down` marks the migration irreversible: it can never be rolled back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MigrationDefinition {
    pub identifier: MigrationId,
    /// Schema version tag recorded in the ledger, e.g. `"1.0.0"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub up: Vec<SchemaOperation>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub down: Vec<SchemaOperation>,
}

impl MigrationDefinition {
    /// Whether the migration carries reverse operations.
    pub fn is_reversible(&self) -> bool {
        !self.down.is_empty()
    }
}

/// One idempotent-by-convention schema primitive.
///
/// Creating something that already exists and dropping something that does
/// not are both no-ops at the adapter, so a failed migration can be retried
/// from its first operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case", deny_unknown_fields)]
pub enum SchemaOperation {
    CreateCollection {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        validator: Option<Value>,
    },
    DropCollection {
        name: String,
    },
    CreateIndex {
        collection: String,
        keys: Vec<IndexKey>,
        #[serde(default)]
        options: IndexOptions,
    },
    DropIndex {
        collection: String,
        name: String,
    },
    SetValidator {
        collection: String,
        validator: Value,
    },
    UnsetValidator {
        collection: String,
    },
    EnableSharding {
        database: String,
    },
    ShardCollection {
        collection: String,
        key: Vec<IndexKey>,
    },
    SeedDocuments {
        collection: String,
        documents: Vec<Value>,
    },
    DeleteDocuments {
        collection: String,
        ids: Vec<String>,
    },
}

impl SchemaOperation {
    /// Wire name of the operation, used in logs and error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CreateCollection { .. } => "create_collection",
            Self::DropCollection { .. } => "drop_collection",
            Self::CreateIndex { .. } => "create_index",
            Self::DropIndex { .. } => "drop_index",
            Self::SetValidator { .. } => "set_validator",
            Self::UnsetValidator { .. } => "unset_validator",
            Self::EnableSharding { .. } => "enable_sharding",
            Self::ShardCollection { .. } => "shard_collection",
            Self::SeedDocuments { .. } => "seed_documents",
            Self::DeleteDocuments { .. } => "delete_documents",
        }
    }

    /// The collection the operation targets, when it targets one.
    pub fn collection(&self) -> Option<&str> {
        match self {
            Self::CreateCollection { name, .. } | Self::DropCollection { name } => Some(name),
            Self::CreateIndex { collection, .. }
            | Self::DropIndex { collection, .. }
            | Self::SetValidator { collection, .. }
            | Self::UnsetValidator { collection }
            | Self::ShardCollection { collection, .. }
            | Self::SeedDocuments { collection, .. }
            | Self::DeleteDocuments { collection, .. } => Some(collection),
            Self::EnableSharding { .. } => None,
        }
    }
}

/// Optional settings for `create_index`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IndexOptions {
    /// Index name; derived from the key fields when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub unique: bool,
}

/// One field of a compound index or shard key, in declaration order.
///
/// Keys are an array rather than a JSON object because object key order is
/// not preserved by every JSON layer, and order matters for compound keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IndexKey {
    pub field: String,
    pub order: KeyOrder,
}

impl IndexKey {
    pub fn asc(field: &str) -> Self {
        Self {
            field: field.to_string(),
            order: KeyOrder::Ascending,
        }
    }

    pub fn desc(field: &str) -> Self {
        Self {
            field: field.to_string(),
            order: KeyOrder::Descending,
        }
    }

    pub fn hashed(field: &str) -> Self {
        Self {
            field: field.to_string(),
            order: KeyOrder::Hashed,
        }
    }
}

/// Key direction: `1`, `-1`, or `"hashed"` on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyOrder {
    Ascending,
    Descending,
    Hashed,
}

impl Serialize for KeyOrder {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Ascending => serializer.serialize_i8(1),
            Self::Descending => serializer.serialize_i8(-1),
            Self::Hashed => serializer.serialize_str("hashed"),
        }
    }
}

impl<'de> Deserialize<'de> for KeyOrder {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct KeyOrderVisitor;

        impl Visitor<'_> for KeyOrderVisitor {
            type Value = KeyOrder;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("1, -1, or \"hashed\"")
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<KeyOrder, E> {
                match v {
                    1 => Ok(KeyOrder::Ascending),
                    -1 => Ok(KeyOrder::Descending),
                    other => Err(E::custom(format!("invalid key order {other}"))),
                }
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<KeyOrder, E> {
                match v {
                    1 => Ok(KeyOrder::Ascending),
                    other => Err(E::custom(format!("invalid key order {other}"))),
                }
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<KeyOrder, E> {
                match v {
                    "hashed" => Ok(KeyOrder::Hashed),
                    other => Err(E::custom(format!("invalid key order {other:?}"))),
                }
            }
        }

        deserializer.deserialize_any(KeyOrderVisitor)
    }
}
