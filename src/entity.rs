//! Entity descriptors: the declared shape of a mapped type.
//!
//! A descriptor lists the type's readable properties in declaration order,
//! each with an optional storage-column name. It is produced once per type,
//! either by `#[derive(Entity)]` or by [`EntityDescriptor::builder`], and is
//! the only input the metadata cache derives SQL fragments from.

use crate::params::Params;
use crate::result::FromRow;

/// One mapped property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    name: String,
    column: Option<String>,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            column: None,
        }
    }

    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }

    /// Property name; also the row label and the bound parameter name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Raw storage-column annotation, if one was declared.
    pub fn column(&self) -> Option<&str> {
        self.column.as_deref()
    }

    /// Storage-column name, ignoring blank annotations.
    pub fn storage_column(&self) -> Option<&str> {
        self.column
            .as_deref()
            .filter(|column| !column.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityDescriptor {
    type_name: String,
    table: Option<String>,
    key: Option<String>,
    fields: Vec<FieldDescriptor>,
}

impl EntityDescriptor {
    pub fn builder(type_name: impl Into<String>) -> EntityDescriptorBuilder {
        EntityDescriptorBuilder {
            descriptor: EntityDescriptor {
                type_name: type_name.into(),
                table: None,
                key: None,
                fields: Vec::new(),
            },
        }
    }

    /// Simple (unqualified) name of the described type.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn table_override(&self) -> Option<&str> {
        self.table.as_deref()
    }

    pub fn explicit_key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|field| field.name == name)
    }
}

pub struct EntityDescriptorBuilder {
    descriptor: EntityDescriptor,
}

impl EntityDescriptorBuilder {
    /// Adds a property stored under its own name.
    pub fn field(mut self, name: impl Into<String>) -> Self {
        self.descriptor.fields.push(FieldDescriptor::new(name));
        self
    }

    /// Adds a property stored under a different column name.
    pub fn column(mut self, name: impl Into<String>, column: impl Into<String>) -> Self {
        self.descriptor
            .fields
            .push(FieldDescriptor::new(name).with_column(column));
        self
    }

    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.descriptor.table = Some(table.into());
        self
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.descriptor.key = Some(key.into());
        self
    }

    pub fn build(self) -> EntityDescriptor {
        self.descriptor
    }
}

/// A type whose shape can be turned into SQL.
///
/// Usually derived:
///
/// ```ignore
/// #[derive(Entity)]
/// #[entity(rename_all = "PascalCase")]
/// struct Widget {
///     widget_id: i64,
///     #[sql(column = "widget_name")]
///     name: String,
/// }
/// ```
pub trait Entity: FromRow + Send + Sync + 'static {
    fn descriptor() -> &'static EntityDescriptor;

    /// Binds every mapped property under its property name.
    fn to_params(&self) -> Params;
}
