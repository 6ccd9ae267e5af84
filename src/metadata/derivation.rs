//! Pure derivations from an [`EntityDescriptor`] to SQL fragments.
//!
//! Nothing here caches; [`MetadataCache`](super::MetadataCache) memoizes the
//! results per type.

use crate::config::MetadataConfig;
use crate::core::{DbError, Result};
use crate::entity::{EntityDescriptor, FieldDescriptor};

pub fn table_name(descriptor: &EntityDescriptor) -> String {
    descriptor
        .table_override()
        .unwrap_or_else(|| descriptor.type_name())
        .to_string()
}

/// Finds the key property, returning it with its declared casing.
///
/// Without an explicit key the property must case-insensitively equal
/// `{TypeName}{key_suffix}`.
pub fn key_name(descriptor: &EntityDescriptor, config: &MetadataConfig) -> Result<String> {
    if let Some(explicit) = descriptor.explicit_key() {
        return find_property(descriptor, explicit).ok_or_else(|| {
            DbError::Configuration(format!(
                "type '{}' declares key '{}' but has no such property",
                descriptor.type_name(),
                explicit
            ))
        });
    }

    let conventional = format!("{}{}", descriptor.type_name(), config.key_suffix);
    find_property(descriptor, &conventional).ok_or_else(|| {
        DbError::Configuration(format!(
            "type '{}' must have a '{}' property or declare an explicit key",
            descriptor.type_name(),
            conventional
        ))
    })
}

/// `"Prop"` or `storage as "Prop"` per property, comma separated.
pub fn select_columns(descriptor: &EntityDescriptor) -> Result<String> {
    join_fields(descriptor, |field| match field.storage_column() {
        Some(column) => format!("{} as \"{}\"", column, field.name()),
        None => quote(field.name()),
    })
}

/// `"Prop"` or the storage column verbatim per property.
pub fn insert_columns(descriptor: &EntityDescriptor) -> Result<String> {
    join_fields(descriptor, |field| match field.storage_column() {
        Some(column) => column.to_string(),
        None => quote(field.name()),
    })
}

pub fn insert_parameters(descriptor: &EntityDescriptor, config: &MetadataConfig) -> Result<String> {
    join_fields(descriptor, |field| config.placeholder(field.name()))
}

pub fn quote(identifier: &str) -> String {
    format!("\"{}\"", identifier)
}

fn find_property(descriptor: &EntityDescriptor, wanted: &str) -> Option<String> {
    let wanted = wanted.to_lowercase();
    descriptor
        .fields()
        .iter()
        .find(|field| field.name().to_lowercase() == wanted)
        .map(|field| field.name().to_string())
}

fn join_fields<F>(descriptor: &EntityDescriptor, render: F) -> Result<String>
where
    F: Fn(&FieldDescriptor) -> String,
{
    if descriptor.fields().is_empty() {
        return Err(DbError::Configuration(format!(
            "type '{}' has no readable properties",
            descriptor.type_name()
        )));
    }

    Ok(descriptor
        .fields()
        .iter()
        .map(render)
        .collect::<Vec<_>>()
        .join(", "))
}
