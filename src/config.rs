use crate::core::{DbError, Result};

/// Naming conventions used when deriving metadata and building statements.
///
/// The defaults produce `select .. where "{Type}Id" = @Id` and `@Prop`
/// insert parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataConfig {
    /// Appended to the type name to find the key property
    pub key_suffix: String,

    /// Placeholder prefix for bound parameters
    pub parameter_prefix: String,

    /// Name of the parameter the select statement filters on
    pub id_parameter: String,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl MetadataConfig {
    pub fn new() -> Self {
        Self {
            key_suffix: "Id".to_string(),
            parameter_prefix: "@".to_string(),
            id_parameter: "Id".to_string(),
        }
    }

    /// Set the key property suffix
    pub fn key_suffix(mut self, suffix: &str) -> Self {
        self.key_suffix = suffix.to_string();
        self
    }

    /// Set the parameter placeholder prefix
    pub fn parameter_prefix(mut self, prefix: &str) -> Self {
        self.parameter_prefix = prefix.to_string();
        self
    }

    /// Set the name of the select filter parameter
    pub fn id_parameter(mut self, name: &str) -> Self {
        self.id_parameter = name.to_string();
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.parameter_prefix.trim().is_empty() {
            return Err(DbError::Configuration(
                "parameter_prefix must not be empty".into(),
            ));
        }

        if let Some(bad) = self
            .parameter_prefix
            .chars()
            .find(|c| c.is_alphanumeric() || *c == '_' || c.is_whitespace() || "\",()".contains(*c))
        {
            return Err(DbError::Configuration(format!(
                "parameter_prefix '{}' must be symbols only, found '{}'",
                self.parameter_prefix, bad
            )));
        }

        if self.id_parameter.trim().is_empty() {
            return Err(DbError::Configuration("id_parameter must not be empty".into()));
        }

        if !self
            .id_parameter
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_')
        {
            return Err(DbError::Configuration(format!(
                "id_parameter '{}' must be a plain identifier",
                self.id_parameter
            )));
        }

        Ok(())
    }

    /// Placeholder text for a parameter name, e.g. `@Name`.
    pub fn placeholder(&self, name: &str) -> String {
        format!("{}{}", self.parameter_prefix, name)
    }
}
