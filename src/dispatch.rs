use std::io::Write;
use std::path::Path;

use crate::cli::Options;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::output::Output;
use crate::{json_validator, xml_validator};

/// Which validation path a schema file selects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaKind {
    JsonSchema,
    XsdSchema,
    Unknown,
}

impl SchemaKind {
    /// Classify by file extension, ignoring case.
    pub fn classify(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .as_deref()
        {
            Some("json") => SchemaKind::JsonSchema,
            Some("xsd") => SchemaKind::XsdSchema,
            _ => SchemaKind::Unknown,
        }
    }
}

/// Validate per `options` and write the report to `writer`.
///
/// Only the first schema file decides the path; the others are not checked.
pub async fn run<W: Write>(options: &Options, config: &Config, writer: W) -> Result<()> {
    let primary = options.primary_schema().ok_or(Error::EmptySchemaList)?;
    let mut output = Output::new(writer);

    match SchemaKind::classify(primary) {
        SchemaKind::JsonSchema => {
            tracing::info!(schema = %primary.display(), input = %options.input_file.display(), "validating JSON");
            json_validator::run(options, config, &mut output).await
        }
        SchemaKind::XsdSchema => {
            tracing::info!(schemas = options.schema_files.len(), input = %options.input_file.display(), "validating XML");
            xml_validator::run(options, &mut output).await
        }
        SchemaKind::Unknown => Err(Error::UnknownSchemaType {
            path: primary.clone(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_classify() {
        assert_eq!(SchemaKind::classify(Path::new("person.json")), SchemaKind::JsonSchema);
        assert_eq!(SchemaKind::classify(Path::new("dir/Person.JSON")), SchemaKind::JsonSchema);
        assert_eq!(SchemaKind::classify(Path::new("catalog.xsd")), SchemaKind::XsdSchema);
        assert_eq!(SchemaKind::classify(Path::new("catalog.XSD")), SchemaKind::XsdSchema);
        assert_eq!(SchemaKind::classify(Path::new("schema.txt")), SchemaKind::Unknown);
        assert_eq!(SchemaKind::classify(Path::new("schema")), SchemaKind::Unknown);
        assert_eq!(SchemaKind::classify(Path::new("json")), SchemaKind::Unknown);
    }

    #[tokio::test]
    async fn test_unknown_type_writes_nothing() {
        let options = Options {
            schema_files: vec![PathBuf::from("/nonexistent/schema.txt")],
            input_file: PathBuf::from("/nonexistent/input.json"),
        };
        let mut stdout = Vec::new();
        let err = run(&options, &Config::default(), &mut stdout).await.unwrap_err();

        match err {
            Error::UnknownSchemaType { path } => assert_eq!(path, PathBuf::from("/nonexistent/schema.txt")),
            other => panic!("Expected UnknownSchemaType, got {:?}", other),
        }
        assert!(stdout.is_empty());
    }

    #[tokio::test]
    async fn test_empty_schema_list_is_an_error() {
        let options = Options {
            schema_files: Vec::new(),
            input_file: PathBuf::from("input.json"),
        };
        let mut stdout = Vec::new();
        let err = run(&options, &Config::default(), &mut stdout).await.unwrap_err();
        assert!(matches!(err, Error::EmptySchemaList));
        assert!(stdout.is_empty());
    }

    #[tokio::test]
    async fn test_first_schema_selects_path() {
        // Only the first extension counts, so an .xsd after a .json still
        // takes the JSON path and fails as multi-schema JSON.
        let options = Options {
            schema_files: vec![PathBuf::from("a.json"), PathBuf::from("b.xsd")],
            input_file: PathBuf::from("input.json"),
        };
        let err = run(&options, &Config::default(), Vec::new()).await.unwrap_err();
        assert!(matches!(err, Error::NotImplemented { .. }));
    }
}
