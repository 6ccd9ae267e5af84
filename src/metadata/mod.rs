//! Per-type metadata derivation cache.
//!
//! # Invariants
//! - Each of the five fragments is derived at most once per type per cache
//!   and never evicted.
//! - Concurrent first use may derive a fragment more than once; the first
//!   inserted value wins and every caller observes it.
//! - Failed derivations are not cached.

pub mod derivation;

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use lazy_static::lazy_static;
use serde::Serialize;
use tracing::{debug, trace, warn};

use crate::config::MetadataConfig;
use crate::core::Result;
use crate::entity::{Entity, EntityDescriptor};

lazy_static! {
    static ref GLOBAL_METADATA: MetadataCache = MetadataCache::new();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetadataKind {
    TableName,
    KeyName,
    SelectColumns,
    InsertColumns,
    InsertParameters,
}

impl MetadataKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TableName => "table_name",
            Self::KeyName => "key_name",
            Self::SelectColumns => "select_columns",
            Self::InsertColumns => "insert_columns",
            Self::InsertParameters => "insert_parameters",
        }
    }
}

/// Snapshot of everything derived for one type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityMetadata {
    pub type_name: String,
    pub table_name: String,
    pub key_name: String,
    pub select_columns: String,
    pub insert_columns: String,
    pub insert_parameters: String,
}

type Slot = RwLock<HashMap<TypeId, Arc<str>>>;

pub struct MetadataCache {
    config: MetadataConfig,
    table_names: Slot,
    key_names: Slot,
    select_columns: Slot,
    insert_columns: Slot,
    insert_parameters: Slot,
    derivations: AtomicU64,
}

impl Default for MetadataCache {
    fn default() -> Self {
        Self::new()
    }
}

impl MetadataCache {
    /// Process-wide cache used by the free builder functions and the
    /// [`EntityClientExt`](crate::EntityClientExt) methods.
    pub fn global() -> &'static MetadataCache {
        &GLOBAL_METADATA
    }

    pub fn new() -> Self {
        Self::build(MetadataConfig::default())
    }

    pub fn with_config(config: MetadataConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: MetadataConfig) -> Self {
        Self {
            config,
            table_names: RwLock::new(HashMap::new()),
            key_names: RwLock::new(HashMap::new()),
            select_columns: RwLock::new(HashMap::new()),
            insert_columns: RwLock::new(HashMap::new()),
            insert_parameters: RwLock::new(HashMap::new()),
            derivations: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &MetadataConfig {
        &self.config
    }

    pub fn table_name<T: Entity>(&self) -> Result<Arc<str>> {
        self.get_or_derive::<T, _>(MetadataKind::TableName, |descriptor, _| {
            Ok(derivation::table_name(descriptor))
        })
    }

    pub fn key_name<T: Entity>(&self) -> Result<Arc<str>> {
        self.get_or_derive::<T, _>(MetadataKind::KeyName, derivation::key_name)
    }

    pub fn select_columns<T: Entity>(&self) -> Result<Arc<str>> {
        self.get_or_derive::<T, _>(MetadataKind::SelectColumns, |descriptor, _| {
            derivation::select_columns(descriptor)
        })
    }

    pub fn insert_columns<T: Entity>(&self) -> Result<Arc<str>> {
        self.get_or_derive::<T, _>(MetadataKind::InsertColumns, |descriptor, _| {
            derivation::insert_columns(descriptor)
        })
    }

    pub fn insert_parameters<T: Entity>(&self) -> Result<Arc<str>> {
        self.get_or_derive::<T, _>(MetadataKind::InsertParameters, derivation::insert_parameters)
    }

    pub fn metadata<T: Entity>(&self) -> Result<EntityMetadata> {
        Ok(EntityMetadata {
            type_name: T::descriptor().type_name().to_string(),
            table_name: self.table_name::<T>()?.to_string(),
            key_name: self.key_name::<T>()?.to_string(),
            select_columns: self.select_columns::<T>()?.to_string(),
            insert_columns: self.insert_columns::<T>()?.to_string(),
            insert_parameters: self.insert_parameters::<T>()?.to_string(),
        })
    }

    /// Number of types with a cached value of `kind`.
    pub fn len(&self, kind: MetadataKind) -> Result<usize> {
        Ok(self.slot(kind).read()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        for kind in [
            MetadataKind::TableName,
            MetadataKind::KeyName,
            MetadataKind::SelectColumns,
            MetadataKind::InsertColumns,
            MetadataKind::InsertParameters,
        ] {
            if self.len(kind)? > 0 {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Count of successful derivations performed, including ones that lost
    /// a first-use race and were discarded.
    pub fn derivations(&self) -> u64 {
        self.derivations.load(Ordering::Relaxed)
    }

    fn slot(&self, kind: MetadataKind) -> &Slot {
        match kind {
            MetadataKind::TableName => &self.table_names,
            MetadataKind::KeyName => &self.key_names,
            MetadataKind::SelectColumns => &self.select_columns,
            MetadataKind::InsertColumns => &self.insert_columns,
            MetadataKind::InsertParameters => &self.insert_parameters,
        }
    }

    fn get_or_derive<T, F>(&self, kind: MetadataKind, derive: F) -> Result<Arc<str>>
    where
        T: Entity,
        F: FnOnce(&EntityDescriptor, &MetadataConfig) -> Result<String>,
    {
        let slot = self.slot(kind);
        let type_id = TypeId::of::<T>();

        if let Some(cached) = slot.read()?.get(&type_id) {
            trace!(kind = kind.as_str(), "metadata cache hit");
            return Ok(Arc::clone(cached));
        }

        let descriptor = T::descriptor();
        let derived = derive(descriptor, &self.config).inspect_err(|err| {
            warn!(
                kind = kind.as_str(),
                type_name = descriptor.type_name(),
                error = %err,
                "metadata derivation failed"
            );
        })?;
        self.derivations.fetch_add(1, Ordering::Relaxed);

        let mut map = slot.write()?;
        let value = map.entry(type_id).or_insert_with(|| {
            debug!(
                kind = kind.as_str(),
                type_name = descriptor.type_name(),
                value = %derived,
                "metadata derived"
            );
            Arc::from(derived)
        });

        Ok(Arc::clone(value))
    }
}
