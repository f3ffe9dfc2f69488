use thiserror::Error;

/// Errors from loading the resource configuration document.
///
/// A failed load never replaces the running configuration; callers keep the
/// previous snapshot and report the error.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The document failed to parse: bad TOML, an unknown resource name, or
    /// an unknown field.
    #[error("config parse: {0}")]
    Parse(#[from] toml::de::Error),
    /// A value failed validation.
    #[error("config value: {0}")]
    InvalidValue(String),
}
