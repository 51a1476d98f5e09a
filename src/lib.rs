//! # schema-validate Library
//!
//! Validates a JSON document against a JSON Schema, or an XML document
//! against a set of XSD files, and reports every finding with its line and
//! column in the input.

pub mod cli;
pub mod config;
pub mod diagnostic;
pub mod dispatch;
pub mod error;
pub mod http_client;
pub mod json_locator;
pub mod json_validator;
pub mod libxml2;
pub mod logging;
pub mod output;
pub mod retriever;
pub mod schema_set;
pub mod xml_validator;

pub use cli::{Cli, Options, VerbosityLevel};
pub use config::{Config, ConfigManager, DraftSetting};
pub use diagnostic::Diagnostic;
pub use dispatch::{SchemaKind, run};
pub use error::{ConfigError, Error, FetchError, LibXml2Error, Result};
pub use http_client::{HttpClientConfig, SchemaHttpClient};
pub use json_locator::{Position, PositionIndex};
pub use json_validator::JsonSchema;
pub use libxml2::{LibXml2Wrapper, ValidationResult, XmlDocument, XmlSchemaPtr};
pub use output::Output;
pub use retriever::SchemaRetriever;
pub use schema_set::SchemaSet;
