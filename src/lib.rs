// ============================================================================
// shapesql
// ============================================================================
//
// Derives `select .. where key = @Id` and `insert into ..` statements from a
// type's declared shape, memoizes the derived fragments per type, and runs the
// statements through any async `DatabaseClient`.

extern crate self as shapesql;

pub mod builder;
pub mod config;
pub mod core;
pub mod entity;
pub mod interface;
pub mod memory;
pub mod metadata;
pub mod ops;
pub mod params;
pub mod result;

pub use builder::{build_insert, build_select};
pub use config::MetadataConfig;
pub use core::{DbError, FromValue, Result, ToValue, Value};
pub use entity::{Entity, EntityDescriptor, EntityDescriptorBuilder, FieldDescriptor};
pub use interface::DatabaseClient;
pub use memory::{ExecutedStatement, MemoryClient};
pub use metadata::{EntityMetadata, MetadataCache, MetadataKind};
pub use ops::{EntityClientExt, get_many_with, get_with, insert_with};
pub use params::Params;
pub use result::{FromRow, QueryResult, Row, RowRef};

pub use shapesql_derive::Entity;
