//! Fixed-shape statement builders.

use crate::core::Result;
use crate::entity::Entity;
use crate::metadata::MetadataCache;
use crate::metadata::derivation::quote;

impl MetadataCache {
    /// `select {columns} from "{table}" where "{key}" = @Id`
    pub fn build_select<T: Entity>(&self) -> Result<String> {
        let table = self.table_name::<T>()?;
        let key = self.key_name::<T>()?;
        let columns = self.select_columns::<T>()?;

        Ok(format!(
            "select {} from {} where {} = {}",
            columns,
            quote(&table),
            quote(&key),
            self.config().placeholder(&self.config().id_parameter)
        ))
    }

    /// `insert into "{table}" ({columns}) values ({parameters})`
    pub fn build_insert<T: Entity>(&self) -> Result<String> {
        let table = self.table_name::<T>()?;
        let columns = self.insert_columns::<T>()?;
        let parameters = self.insert_parameters::<T>()?;

        Ok(format!(
            "insert into {} ({}) values ({})",
            quote(&table),
            columns,
            parameters
        ))
    }
}

/// Builds the select-by-id statement for `T` from the global cache.
pub fn build_select<T: Entity>() -> Result<String> {
    MetadataCache::global().build_select::<T>()
}

/// Builds the insert statement for `T` from the global cache.
pub fn build_insert<T: Entity>() -> Result<String> {
    MetadataCache::global().build_insert::<T>()
}
