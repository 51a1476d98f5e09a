use clap::Parser;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::PathBuf;

use crate::error::{Error, Result};

/// Verbosity levels for diagnostic logging
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum VerbosityLevel {
    /// Only log errors
    Quiet,
    /// Use the configured level
    #[default]
    Normal,
    /// Log debug diagnostics
    Verbose,
}

/// Validate a JSON or XML document against JSON Schema or XSD files
#[derive(Parser, Debug, Clone)]
#[command(name = "schema-validate")]
#[command(about = "Validate a JSON or XML document against JSON Schema or XSD schema files")]
#[command(version)]
pub struct Cli {
    /// Schema file paths, separated by ';'
    #[arg(
        short = 's',
        long = "schema",
        value_delimiter = ';',
        action = clap::ArgAction::Append,
        help = "Schema file(s) to validate against, separated by ';'"
    )]
    pub schema: Vec<String>,

    /// Document to validate
    #[arg(short = 'i', long = "input", required = true)]
    pub input: Option<PathBuf>,

    /// Settings file (TOML or JSON)
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Enable verbose diagnostics on stderr
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,

    /// Only log errors on stderr
    #[arg(short = 'q', long = "quiet", conflicts_with = "verbose")]
    pub quiet: bool,
}

impl Cli {
    /// Parse an argument vector, turning any grammar failure into
    /// [`Error::InvalidOption`].
    pub fn try_parse_args<I, T>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        Self::try_parse_from(args).map_err(|e| Error::InvalidOption(e.to_string()))
    }

    /// Schema paths with blank `;`-separated segments removed.
    pub fn schema_files(&self) -> Vec<PathBuf> {
        self.schema
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
            .collect()
    }

    pub fn verbosity(&self) -> VerbosityLevel {
        if self.quiet {
            VerbosityLevel::Quiet
        } else if self.verbose {
            VerbosityLevel::Verbose
        } else {
            VerbosityLevel::Normal
        }
    }
}

/// What to validate: the schema files in the order given and the input document.
///
/// Built once from the command line and passed by reference afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    pub schema_files: Vec<PathBuf>,
    pub input_file: PathBuf,
}

impl Options {
    /// Parse `args` and check the referenced files.
    pub fn load<I, T>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let cli = Cli::try_parse_args(args)?;
        Self::from_cli(&cli)
    }

    /// Checks run in order: non-empty schema list, every schema file exists,
    /// then the input file exists. The first failure wins.
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let schema_files = cli.schema_files();
        if schema_files.is_empty() {
            return Err(Error::EmptySchemaList);
        }

        if let Some(missing) = schema_files.iter().find(|p| !p.is_file()) {
            return Err(Error::SchemaNotFound {
                path: missing.clone(),
            });
        }

        let input_file = cli
            .input
            .clone()
            .ok_or_else(|| Error::InvalidOption("missing --input".to_string()))?;
        if !input_file.is_file() {
            return Err(Error::InputNotFound { path: input_file });
        }

        Ok(Self {
            schema_files,
            input_file,
        })
    }

    /// The schema file whose extension selects the validation path, if any.
    pub fn primary_schema(&self) -> Option<&PathBuf> {
        self.schema_files.first()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(dir: &TempDir, name: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, "{}").unwrap();
        path
    }

    #[test]
    fn test_semicolon_separated_schemas() {
        let cli = Cli::try_parse_args([
            "schema-validate",
            "--schema",
            "a.xsd;b.xsd;;",
            "--input",
            "doc.xml",
        ])
        .unwrap();
        assert_eq!(
            cli.schema_files(),
            vec![PathBuf::from("a.xsd"), PathBuf::from("b.xsd")]
        );
        assert_eq!(cli.input, Some(PathBuf::from("doc.xml")));
    }

    #[test]
    fn test_repeated_schema_flag_appends() {
        let cli =
            Cli::try_parse_args(["schema-validate", "-s", "a.xsd", "-s", "b.xsd", "-i", "x.xml"])
                .unwrap();
        assert_eq!(cli.schema_files().len(), 2);
    }

    #[test]
    fn test_unknown_flag_is_invalid_option() {
        let err = Cli::try_parse_args(["schema-validate", "--frobnicate", "-i", "x"]).unwrap_err();
        assert!(matches!(err, Error::InvalidOption(_)));
    }

    #[test]
    fn test_missing_input_is_invalid_option() {
        let err = Options::load(["schema-validate", "-s", "a.json"]).unwrap_err();
        assert!(matches!(err, Error::InvalidOption(_)));
    }

    #[test]
    fn test_verbose_and_quiet_conflict() {
        let err = Cli::try_parse_args(["schema-validate", "-v", "-q", "-i", "x"]).unwrap_err();
        assert!(matches!(err, Error::InvalidOption(_)));
    }

    #[test]
    fn test_empty_schema_list() {
        let dir = TempDir::new().unwrap();
        let input = touch(&dir, "doc.json");

        let err = Options::load(["schema-validate", "-i", input.to_str().unwrap()]).unwrap_err();
        assert!(matches!(err, Error::EmptySchemaList));

        let err = Options::load(["schema-validate", "-s", "", "-i", input.to_str().unwrap()])
            .unwrap_err();
        assert!(matches!(err, Error::EmptySchemaList));
    }

    #[test]
    fn test_first_missing_schema_is_reported() {
        let dir = TempDir::new().unwrap();
        let present = touch(&dir, "present.json");
        let input = touch(&dir, "doc.json");
        let missing_a = dir.path().join("missing_a.json");
        let missing_b = dir.path().join("missing_b.json");

        let schemas = format!(
            "{};{};{}",
            present.display(),
            missing_a.display(),
            missing_b.display()
        );
        let err = Options::load(["schema-validate", "-s", schemas.as_str(), "-i", input.to_str().unwrap()])
            .unwrap_err();
        match err {
            Error::SchemaNotFound { path } => assert_eq!(path, missing_a),
            other => panic!("Expected SchemaNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_schema_checked_before_input() {
        let dir = TempDir::new().unwrap();
        let missing_schema = dir.path().join("nope.xsd");
        let missing_input = dir.path().join("nope.xml");

        let err = Options::load([
            "schema-validate",
            "-s",
            missing_schema.to_str().unwrap(),
            "-i",
            missing_input.to_str().unwrap(),
        ])
        .unwrap_err();
        assert!(matches!(err, Error::SchemaNotFound { .. }));
    }

    #[test]
    fn test_missing_input_file() {
        let dir = TempDir::new().unwrap();
        let schema = touch(&dir, "schema.json");
        let missing_input = dir.path().join("alice.json");

        let err = Options::load([
            "schema-validate",
            "-s",
            schema.to_str().unwrap(),
            "-i",
            missing_input.to_str().unwrap(),
        ])
        .unwrap_err();
        match err {
            Error::InputNotFound { path } => assert_eq!(path, missing_input),
            other => panic!("Expected InputNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_directory_is_not_a_schema_file() {
        let dir = TempDir::new().unwrap();
        let input = touch(&dir, "doc.json");

        let err = Options::load([
            "schema-validate",
            "-s",
            dir.path().to_str().unwrap(),
            "-i",
            input.to_str().unwrap(),
        ])
        .unwrap_err();
        assert!(matches!(err, Error::SchemaNotFound { .. }));
    }

    #[test]
    fn test_valid_options() {
        let dir = TempDir::new().unwrap();
        let a = touch(&dir, "a.xsd");
        let b = touch(&dir, "b.xsd");
        let input = touch(&dir, "doc.xml");

        let schemas = format!("{};{}", a.display(), b.display());
        let options =
            Options::load(["schema-validate", "-s", schemas.as_str(), "-i", input.to_str().unwrap()])
                .unwrap();
        assert_eq!(options.schema_files, vec![a.clone(), b]);
        assert_eq!(options.input_file, input);
        assert_eq!(options.primary_schema(), Some(&a));
    }

    #[test]
    fn test_primary_schema_of_empty_list() {
        let options = Options {
            schema_files: Vec::new(),
            input_file: PathBuf::from("doc.json"),
        };
        assert_eq!(options.primary_schema(), None);
    }

    #[test]
    fn test_verbosity() {
        let cli = Cli::try_parse_args(["schema-validate", "-q", "-i", "x"]).unwrap();
        assert_eq!(cli.verbosity(), VerbosityLevel::Quiet);
        let cli = Cli::try_parse_args(["schema-validate", "--verbose", "-i", "x"]).unwrap();
        assert_eq!(cli.verbosity(), VerbosityLevel::Verbose);
        let cli = Cli::try_parse_args(["schema-validate", "-i", "x"]).unwrap();
        assert_eq!(cli.verbosity(), VerbosityLevel::Normal);
    }
}
