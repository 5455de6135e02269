//! The seam between the engine and the underlying document database.

use serde_json::Value;

use crate::errors::AdapterError;
use crate::models::{IndexKey, IndexOptions, SchemaOperation};

/// Executes schema primitives against a document database.
///
/// Primitives are idempotent by convention: creating something that
/// already exists and dropping something that does not are no-ops, so a
/// failed migration can be retried from its first operation. The engine
/// never retries an individual primitive; transient-fault retry belongs to
/// the driver behind this trait.
pub trait SchemaAdapter {
    fn create_collection(&self, name: &str, validator: Option<&Value>) -> Result<(), AdapterError>;

    fn drop_collection(&self, name: &str) -> Result<(), AdapterError>;

    fn create_index(
        &self,
        collection: &str,
        keys: &[IndexKey],
        options: &IndexOptions,
    ) -> Result<(), AdapterError>;

    fn drop_index(&self, collection: &str, name: &str) -> Result<(), AdapterError>;

    fn set_validator(&self, collection: &str, validator: &Value) -> Result<(), AdapterError>;

    fn unset_validator(&self, collection: &str) -> Result<(), AdapterError>;

    fn enable_sharding(&self, database: &str) -> Result<(), AdapterError>;

    fn shard_collection(&self, collection: &str, key: &[IndexKey]) -> Result<(), AdapterError>;

    fn seed_documents(&self, collection: &str, documents: &[Value]) -> Result<(), AdapterError>;

    fn delete_documents(&self, collection: &str, ids: &[String]) -> Result<(), AdapterError>;

    /// Dispatch one operation to the matching primitive.
    fn apply(&self, operation: &SchemaOperation) -> Result<(), AdapterError> {
        match operation {
            SchemaOperation::CreateCollection { name, validator } => {
                self.create_collection(name, validator.as_ref())
            }
            SchemaOperation::DropCollection { name } => self.drop_collection(name),
            SchemaOperation::CreateIndex {
                collection,
                keys,
                options,
            } => self.create_index(collection, keys, options),
            SchemaOperation::DropIndex { collection, name } => self.drop_index(collection, name),
            SchemaOperation::SetValidator {
                collection,
                validator,
            } => self.set_validator(collection, validator),
            SchemaOperation::UnsetValidator { collection } => self.unset_validator(collection),
            SchemaOperation::EnableSharding { database } => self.enable_sharding(database),
            SchemaOperation::ShardCollection { collection, key } => {
                self.shard_collection(collection, key)
            }
            SchemaOperation::SeedDocuments {
                collection,
                documents,
            } => self.seed_documents(collection, documents),
            SchemaOperation::DeleteDocuments { collection, ids } => {
                self.delete_documents(collection, ids)
            }
        }
    }
}
