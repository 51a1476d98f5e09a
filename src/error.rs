use std::path::PathBuf;

use thiserror::Error;

/// Main application error type that encompasses all fatal failure modes.
///
/// Validation findings are not errors: they are reported on stdout and the
/// process still exits successfully.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid command line option: {0}")]
    InvalidOption(String),

    #[error("Empty schema file list")]
    EmptySchemaList,

    #[error("Schema file not found: {}", .path.display())]
    SchemaNotFound { path: PathBuf },

    #[error("Input file not found: {}", .path.display())]
    InputNotFound { path: PathBuf },

    #[error("Unknown schema file type: {}", .path.display())]
    UnknownSchemaType { path: PathBuf },

    #[error("Not implemented: {feature}")]
    NotImplemented { feature: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error in {}: {source}", .path.display())]
    JsonParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("JSON Schema error in {}: {details}", .path.display())]
    JsonSchema { path: PathBuf, details: String },

    #[error("Schema reference could not be retrieved: {uri} - {details}")]
    SchemaFetch { uri: String, details: String },

    #[error("XML parse error in {}: {details}", .path.display())]
    XmlParse { path: PathBuf, details: String },

    #[error("XML Schema error: {details}")]
    XsdSchema { details: String },

    #[error("LibXML2 internal error: {details}")]
    LibXml2Internal { details: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl Error {
    /// Process exit code for this error. Argument errors follow the usual
    /// command-line convention of 2; every other fatal error exits with 1.
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::InvalidOption(_) | Error::EmptySchemaList => 2,
            _ => 1,
        }
    }

    /// Whether the error was detected while loading options, before any
    /// schema or document was opened.
    pub fn is_argument_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidOption(_)
                | Error::EmptySchemaList
                | Error::SchemaNotFound { .. }
                | Error::InputNotFound { .. }
        )
    }
}

/// Configuration-specific error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParsing(#[from] toml::de::Error),

    #[error("JSON parsing error: {0}")]
    JsonParsing(#[from] serde_json::Error),

    #[error("Configuration validation error: {0}")]
    Validation(String),

    #[error("Environment variable error: {0}")]
    Environment(String),

    #[error("Unsupported configuration file format: {0}")]
    UnsupportedFormat(String),
}

/// Errors raised while retrieving a referenced schema document
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP status error: {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Remote schema retrieval is disabled: {url}")]
    RemoteDisabled { url: String },

    #[error("Unsupported URI scheme: {scheme}")]
    UnsupportedScheme { scheme: String },

    #[error("Invalid URI: {0}")]
    InvalidUri(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}

/// LibXML2-specific error types
#[derive(Error, Debug)]
pub enum LibXml2Error {
    #[error("Schema parsing failed: {}", format_messages(.messages))]
    SchemaParseFailed { messages: Vec<String> },

    #[error("Validation context creation failed")]
    ValidationContextCreationFailed,

    #[error("Validation of {} failed with internal error code {code}", .file.display())]
    ValidationFailed { code: i32, file: PathBuf },

    #[error("Memory allocation failed in libxml2")]
    MemoryAllocation,

    #[error("Invalid XML in {}: {details}", .file.display())]
    InvalidXml { file: PathBuf, details: String },

    #[error("Path cannot be passed to libxml2: {}", .path.display())]
    InvalidPath { path: PathBuf },
}

fn format_messages(messages: &[String]) -> String {
    if messages.is_empty() {
        "no diagnostics reported".to_string()
    } else {
        messages.join("; ")
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Error::Config(err.to_string())
    }
}

impl From<LibXml2Error> for Error {
    fn from(err: LibXml2Error) -> Self {
        match err {
            LibXml2Error::SchemaParseFailed { .. } => Error::XsdSchema {
                details: err.to_string(),
            },
            LibXml2Error::InvalidXml { file, details } => Error::XmlParse {
                path: file,
                details,
            },
            other => Error::LibXml2Internal {
                details: other.to_string(),
            },
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, Error>;

/// Configuration result type alias
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// LibXML2 result type alias
pub type LibXml2Result<T> = std::result::Result<T, LibXml2Error>;
