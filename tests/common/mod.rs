#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::Command;

use schema_validate::{Config, Options};

/// Test fixture paths
pub struct TestFixtures {
    pub fixtures_dir: PathBuf,
}

impl TestFixtures {
    pub fn new() -> Self {
        let fixtures_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("tests")
            .join("fixtures");

        Self { fixtures_dir }
    }

    pub fn json(&self, name: &str) -> PathBuf {
        self.fixtures_dir.join("json").join(name)
    }

    pub fn xml(&self, name: &str) -> PathBuf {
        self.fixtures_dir.join("xml").join(name)
    }

    pub fn orders(&self, name: &str) -> PathBuf {
        self.fixtures_dir.join("xml").join("orders").join(name)
    }
}

/// Result of one run of the binary
pub struct CliRun {
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// Run the binary with a clean environment: no log filter, no remote
/// references and no configuration file in the working directory.
pub fn run_cli<I, S>(args: I) -> CliRun
where
    I: IntoIterator<Item = S>,
    S: AsRef<std::ffi::OsStr>,
{
    run_cli_in(&TestFixtures::new().fixtures_dir, args)
}

/// Like [`run_cli`], from another working directory.
pub fn run_cli_in<I, S>(dir: &Path, args: I) -> CliRun
where
    I: IntoIterator<Item = S>,
    S: AsRef<std::ffi::OsStr>,
{
    let output = Command::new(env!("CARGO_BIN_EXE_schema-validate"))
        .args(args)
        .current_dir(dir)
        .env_remove("RUST_LOG")
        .env_remove("SCHEMA_VALIDATE_LOG")
        .env_remove("SCHEMA_VALIDATE_DRAFT")
        .env("SCHEMA_VALIDATE_REMOTE_REFS", "false")
        .output()
        .expect("Failed to execute schema-validate");

    CliRun {
        code: output.status.code(),
        stdout: String::from_utf8(output.stdout).unwrap(),
        stderr: String::from_utf8(output.stderr).unwrap(),
    }
}

/// `--schema` value joining several paths with ';'
pub fn schema_list(paths: &[&Path]) -> String {
    paths
        .iter()
        .map(|p| p.to_str().unwrap())
        .collect::<Vec<_>>()
        .join(";")
}

pub fn options(schemas: &[PathBuf], input: &Path) -> Options {
    Options {
        schema_files: schemas.to_vec(),
        input_file: input.to_path_buf(),
    }
}

pub fn offline_config() -> Config {
    let mut config = Config::default();
    config.json.remote_refs = false;
    config
}

/// Run the library entry point and capture stdout.
pub async fn validate_to_string(options: &Options) -> schema_validate::Result<String> {
    let mut stdout = Vec::new();
    schema_validate::run(options, &offline_config(), &mut stdout).await?;
    Ok(String::from_utf8(stdout).unwrap())
}
