//! Embedded document-store catalog over SQLite.
//!
//! Collections become `doc_<name>` tables with a JSON `body` column, and
//! secondary indexes become real SQL indexes over `json_extract`
//! expressions, so `unique` is enforced by the storage engine rather than
//! recorded as a wish. Validators and shard keys are catalog metadata: a
//! single-file database has no chunks to place, but the declared schema
//! state stays inspectable.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use uuid::Uuid;

use strata_core::errors::AdapterError;
use strata_core::models::{IndexKey, IndexOptions, KeyOrder};
use strata_core::traits::SchemaAdapter;

use crate::pragmas::apply_pragmas;

const CATALOG_SQL: &str = r#"
-- One row per declared collection. Dropping a collection cascades to its
-- index rows; the doc_<name> table is dropped separately.
CREATE TABLE IF NOT EXISTS _strata_collections (
    name TEXT PRIMARY KEY,
    validator TEXT,
    shard_key TEXT,
    created_at TEXT NOT NULL
) STRICT;

CREATE TABLE IF NOT EXISTS _strata_indexes (
    collection TEXT NOT NULL REFERENCES _strata_collections(name) ON DELETE CASCADE,
    name TEXT NOT NULL,
    keys TEXT NOT NULL,
    is_unique INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (collection, name)
) STRICT;

-- Database-level declarations, keyed by setting name.
CREATE TABLE IF NOT EXISTS _strata_database (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
) STRICT;
"#;

/// SQLite realization of the schema adapter.
pub struct SqliteCatalog {
    conn: Mutex<Connection>,
}

impl SqliteCatalog {
    /// Open a catalog backed by a database file.
    pub fn open(path: &Path) -> Result<Self, AdapterError> {
        let conn = Connection::open(path)
            .map_err(|e| AdapterError::backend(format!("open {}: {e}", path.display())))?;
        Self::with_connection(conn)
    }

    /// Open an in-memory catalog, for tests and dry runs.
    pub fn open_in_memory() -> Result<Self, AdapterError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| AdapterError::backend(format!("open in-memory: {e}")))?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self, AdapterError> {
        apply_pragmas(&conn).map_err(|e| AdapterError::backend(format!("pragmas: {e}")))?;
        conn.execute_batch(CATALOG_SQL)
            .map_err(|e| AdapterError::backend(format!("catalog schema: {e}")))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, AdapterError> {
        self.conn
            .lock()
            .map_err(|_| AdapterError::backend("catalog connection poisoned"))
    }

    /// Names of all declared collections, sorted.
    pub fn list_collections(&self) -> Result<Vec<String>, AdapterError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT name FROM _strata_collections ORDER BY name")
            .map_err(|e| AdapterError::backend(format!("list_collections: {e}")))?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(|e| AdapterError::backend(format!("list_collections: {e}")))?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| AdapterError::backend(format!("list_collections: {e}")))
    }

    pub fn collection_exists(&self, name: &str) -> Result<bool, AdapterError> {
        let conn = self.lock()?;
        exists_in(&conn, name)
    }

    pub fn index_exists(&self, collection: &str, name: &str) -> Result<bool, AdapterError> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT 1 FROM _strata_indexes WHERE collection = ?1 AND name = ?2",
            params![collection, name],
            |_| Ok(()),
        )
        .optional()
        .map(|row| row.is_some())
        .map_err(|e| AdapterError::backend(format!("index_exists: {e}")))
    }

    /// The declared validator document, if the collection has one.
    pub fn validator(&self, collection: &str) -> Result<Option<Value>, AdapterError> {
        let conn = self.lock()?;
        let raw: Option<Option<String>> = conn
            .query_row(
                "SELECT validator FROM _strata_collections WHERE name = ?1",
                params![collection],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| AdapterError::backend(format!("validator: {e}")))?;
        match raw {
            None => Err(unknown(collection)),
            Some(None) => Ok(None),
            Some(Some(json)) => serde_json::from_str(&json)
                .map(Some)
                .map_err(|e| AdapterError::backend(format!("validator for {collection:?}: {e}"))),
        }
    }

    pub fn is_sharded(&self, collection: &str) -> Result<bool, AdapterError> {
        let conn = self.lock()?;
        let raw: Option<Option<String>> = conn
            .query_row(
                "SELECT shard_key FROM _strata_collections WHERE name = ?1",
                params![collection],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| AdapterError::backend(format!("is_sharded: {e}")))?;
        match raw {
            None => Err(unknown(collection)),
            Some(key) => Ok(key.is_some()),
        }
    }

    pub fn sharding_enabled(&self) -> Result<bool, AdapterError> {
        let conn = self.lock()?;
        sharding_enabled_in(&conn)
    }

    pub fn count_documents(&self, collection: &str) -> Result<u64, AdapterError> {
        validate_name(collection)?;
        let conn = self.lock()?;
        if !exists_in(&conn, collection)? {
            return Err(unknown(collection));
        }
        let count: i64 = conn
            .query_row(
                &format!("SELECT COUNT(*) FROM {}", doc_table(collection)),
                [],
                |row| row.get(0),
            )
            .map_err(|e| AdapterError::backend(format!("count_documents: {e}")))?;
        Ok(count as u64)
    }
}

impl SchemaAdapter for SqliteCatalog {
    fn create_collection(&self, name: &str, validator: Option<&Value>) -> Result<(), AdapterError> {
        validate_name(name)?;
        let validator_json = validator
            .map(|v| serde_json::to_string(v))
            .transpose()
            .map_err(|e| AdapterError::backend(format!("encode validator: {e}")))?;

        let conn = self.lock()?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| AdapterError::backend(format!("create_collection begin: {e}")))?;
        // An existing declaration wins; re-creation is a no-op even with a
        // different validator. set_validator is the explicit way to change one.
        tx.execute(
            "INSERT INTO _strata_collections (name, validator, shard_key, created_at)
             VALUES (?1, ?2, NULL, ?3)
             ON CONFLICT(name) DO NOTHING",
            params![name, validator_json, Utc::now().to_rfc3339()],
        )
        .map_err(|e| AdapterError::backend(format!("create_collection: {e}")))?;
        tx.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {} (id TEXT PRIMARY KEY, body TEXT NOT NULL) STRICT",
            doc_table(name)
        ))
        .map_err(|e| AdapterError::backend(format!("create_collection table: {e}")))?;
        tx.commit()
            .map_err(|e| AdapterError::backend(format!("create_collection commit: {e}")))
    }

    fn drop_collection(&self, name: &str) -> Result<(), AdapterError> {
        validate_name(name)?;
        let conn = self.lock()?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| AdapterError::backend(format!("drop_collection begin: {e}")))?;
        tx.execute(
            "DELETE FROM _strata_collections WHERE name = ?1",
            params![name],
        )
        .map_err(|e| AdapterError::backend(format!("drop_collection: {e}")))?;
        tx.execute_batch(&format!("DROP TABLE IF EXISTS {}", doc_table(name)))
            .map_err(|e| AdapterError::backend(format!("drop_collection table: {e}")))?;
        tx.commit()
            .map_err(|e| AdapterError::backend(format!("drop_collection commit: {e}")))
    }

    fn create_index(
        &self,
        collection: &str,
        keys: &[IndexKey],
        options: &IndexOptions,
    ) -> Result<(), AdapterError> {
        validate_name(collection)?;
        if keys.is_empty() {
            return Err(AdapterError::InvalidDocument {
                collection: collection.to_string(),
                detail: "index needs at least one key".to_string(),
            });
        }
        for key in keys {
            validate_field(&key.field)?;
        }
        let index_name = match &options.name {
            Some(name) => name.clone(),
            None => derived_index_name(keys),
        };
        validate_name(&index_name)?;
        let keys_json = serde_json::to_string(keys)
            .map_err(|e| AdapterError::backend(format!("encode index keys: {e}")))?;

        let conn = self.lock()?;
        if !exists_in(&conn, collection)? {
            return Err(unknown(collection));
        }

        let exprs: Vec<String> = keys.iter().map(index_expr).collect();
        let unique = if options.unique { "UNIQUE " } else { "" };
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| AdapterError::backend(format!("create_index begin: {e}")))?;
        // The SQL index first: a unique index over existing rows can
        // genuinely fail, and then the catalog must not list it.
        tx.execute_batch(&format!(
            "CREATE {unique}INDEX IF NOT EXISTS {} ON {} ({})",
            sql_index_name(collection, &index_name),
            doc_table(collection),
            exprs.join(", ")
        ))
        .map_err(|e| {
            if is_constraint_violation(&e) {
                AdapterError::Constraint {
                    collection: collection.to_string(),
                    detail: format!("unique index {index_name:?}: {e}"),
                }
            } else {
                AdapterError::backend(format!("create_index: {e}"))
            }
        })?;
        tx.execute(
            "INSERT INTO _strata_indexes (collection, name, keys, is_unique)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(collection, name) DO NOTHING",
            params![collection, index_name, keys_json, options.unique as i64],
        )
        .map_err(|e| AdapterError::backend(format!("create_index: {e}")))?;
        tx.commit()
            .map_err(|e| AdapterError::backend(format!("create_index commit: {e}")))
    }

    fn drop_index(&self, collection: &str, name: &str) -> Result<(), AdapterError> {
        validate_name(collection)?;
        validate_name(name)?;
        let conn = self.lock()?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| AdapterError::backend(format!("drop_index begin: {e}")))?;
        tx.execute(
            "DELETE FROM _strata_indexes WHERE collection = ?1 AND name = ?2",
            params![collection, name],
        )
        .map_err(|e| AdapterError::backend(format!("drop_index: {e}")))?;
        tx.execute_batch(&format!(
            "DROP INDEX IF EXISTS {}",
            sql_index_name(collection, name)
        ))
        .map_err(|e| AdapterError::backend(format!("drop_index: {e}")))?;
        tx.commit()
            .map_err(|e| AdapterError::backend(format!("drop_index commit: {e}")))
    }

    fn set_validator(&self, collection: &str, validator: &Value) -> Result<(), AdapterError> {
        validate_name(collection)?;
        let json = serde_json::to_string(validator)
            .map_err(|e| AdapterError::backend(format!("encode validator: {e}")))?;
        let conn = self.lock()?;
        let updated = conn
            .execute(
                "UPDATE _strata_collections SET validator = ?2 WHERE name = ?1",
                params![collection, json],
            )
            .map_err(|e| AdapterError::backend(format!("set_validator: {e}")))?;
        if updated == 0 {
            return Err(unknown(collection));
        }
        Ok(())
    }

    fn unset_validator(&self, collection: &str) -> Result<(), AdapterError> {
        validate_name(collection)?;
        let conn = self.lock()?;
        // Zero rows means no collection, which an unset treats as done.
        conn.execute(
            "UPDATE _strata_collections SET validator = NULL WHERE name = ?1",
            params![collection],
        )
        .map_err(|e| AdapterError::backend(format!("unset_validator: {e}")))?;
        Ok(())
    }

    fn enable_sharding(&self, database: &str) -> Result<(), AdapterError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO _strata_database (key, value) VALUES ('sharding', ?1)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![database],
        )
        .map_err(|e| AdapterError::backend(format!("enable_sharding: {e}")))?;
        Ok(())
    }

    fn shard_collection(&self, collection: &str, key: &[IndexKey]) -> Result<(), AdapterError> {
        validate_name(collection)?;
        for part in key {
            validate_field(&part.field)?;
        }
        let key_json = serde_json::to_string(key)
            .map_err(|e| AdapterError::backend(format!("encode shard key: {e}")))?;
        let conn = self.lock()?;
        if !sharding_enabled_in(&conn)? {
            return Err(AdapterError::Constraint {
                collection: collection.to_string(),
                detail: "enable_sharding must run before shard_collection".to_string(),
            });
        }
        let updated = conn
            .execute(
                "UPDATE _strata_collections SET shard_key = ?2 WHERE name = ?1",
                params![collection, key_json],
            )
            .map_err(|e| AdapterError::backend(format!("shard_collection: {e}")))?;
        if updated == 0 {
            return Err(unknown(collection));
        }
        Ok(())
    }

    fn seed_documents(&self, collection: &str, documents: &[Value]) -> Result<(), AdapterError> {
        validate_name(collection)?;
        let conn = self.lock()?;
        if !exists_in(&conn, collection)? {
            return Err(unknown(collection));
        }
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| AdapterError::backend(format!("seed begin: {e}")))?;
        let insert = format!(
            "INSERT INTO {} (id, body) VALUES (?1, ?2) ON CONFLICT(id) DO NOTHING",
            doc_table(collection)
        );
        for document in documents {
            if !document.is_object() {
                return Err(AdapterError::InvalidDocument {
                    collection: collection.to_string(),
                    detail: "document must be a JSON object".to_string(),
                });
            }
            let (id, body) = identify(document);
            let body_json = serde_json::to_string(&body)
                .map_err(|e| AdapterError::backend(format!("encode document: {e}")))?;
            tx.execute(&insert, params![id, body_json]).map_err(|e| {
                if is_constraint_violation(&e) {
                    AdapterError::Constraint {
                        collection: collection.to_string(),
                        detail: e.to_string(),
                    }
                } else {
                    AdapterError::backend(format!("seed: {e}"))
                }
            })?;
        }
        tx.commit()
            .map_err(|e| AdapterError::backend(format!("seed commit: {e}")))
    }

    fn delete_documents(&self, collection: &str, ids: &[String]) -> Result<(), AdapterError> {
        validate_name(collection)?;
        let conn = self.lock()?;
        // Deleting from a collection that is gone is already done.
        if !exists_in(&conn, collection)? {
            return Ok(());
        }
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| AdapterError::backend(format!("delete begin: {e}")))?;
        let delete = format!("DELETE FROM {} WHERE id = ?1", doc_table(collection));
        for id in ids {
            tx.execute(&delete, params![id])
                .map_err(|e| AdapterError::backend(format!("delete: {e}")))?;
        }
        tx.commit()
            .map_err(|e| AdapterError::backend(format!("delete commit: {e}")))
    }
}

/// A document's primary key and the body to store. Documents without an
/// `_id` get a generated one, injected into the stored body so the row is
/// self-describing.
fn identify(document: &Value) -> (String, Value) {
    match document.get("_id") {
        Some(Value::String(id)) => (id.clone(), document.clone()),
        Some(other) => (other.to_string(), document.clone()),
        None => {
            let id = Uuid::new_v4().to_string();
            let mut body = document.clone();
            if let Some(map) = body.as_object_mut() {
                map.insert("_id".to_string(), Value::String(id.clone()));
            }
            (id, body)
        }
    }
}

fn exists_in(conn: &Connection, collection: &str) -> Result<bool, AdapterError> {
    conn.query_row(
        "SELECT 1 FROM _strata_collections WHERE name = ?1",
        params![collection],
        |_| Ok(()),
    )
    .optional()
    .map(|row| row.is_some())
    .map_err(|e| AdapterError::backend(format!("collection_exists: {e}")))
}

fn sharding_enabled_in(conn: &Connection) -> Result<bool, AdapterError> {
    conn.query_row(
        "SELECT 1 FROM _strata_database WHERE key = 'sharding'",
        [],
        |_| Ok(()),
    )
    .optional()
    .map(|row| row.is_some())
    .map_err(|e| AdapterError::backend(format!("sharding_enabled: {e}")))
}

fn unknown(collection: &str) -> AdapterError {
    AdapterError::UnknownCollection {
        collection: collection.to_string(),
    }
}

fn doc_table(collection: &str) -> String {
    format!("doc_{collection}")
}

fn sql_index_name(collection: &str, index: &str) -> String {
    format!("idx_{collection}_{index}")
}

/// One indexed expression over the JSON body.
fn index_expr(key: &IndexKey) -> String {
    let extract = format!("json_extract(body, '$.{}')", key.field);
    match key.order {
        KeyOrder::Ascending => format!("{extract} ASC"),
        KeyOrder::Descending => format!("{extract} DESC"),
        // SQLite has no hashed index; the plain expression index keeps
        // lookups working and the catalog records the declared kind.
        KeyOrder::Hashed => extract,
    }
}

fn derived_index_name(keys: &[IndexKey]) -> String {
    let parts: Vec<String> = keys
        .iter()
        .map(|k| {
            let suffix = match k.order {
                KeyOrder::Ascending => "asc",
                KeyOrder::Descending => "desc",
                KeyOrder::Hashed => "hashed",
            };
            format!("{}_{suffix}", k.field.replace('.', "_").to_lowercase())
        })
        .collect();
    parts.join("_")
}

/// Collection and index names are spliced into SQL and must stay inside
/// `[a-z0-9_]+`.
fn validate_name(name: &str) -> Result<(), AdapterError> {
    let ok = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if ok {
        Ok(())
    } else {
        Err(AdapterError::InvalidName {
            name: name.to_string(),
        })
    }
}

/// Field paths land inside a quoted json_extract path.
fn validate_field(field: &str) -> Result<(), AdapterError> {
    let ok = !field.is_empty()
        && field
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.');
    if ok {
        Ok(())
    } else {
        Err(AdapterError::InvalidName {
            name: field.to_string(),
        })
    }
}

fn is_constraint_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(f, _) if f.code == rusqlite::ErrorCode::ConstraintViolation
    )
}
