//! JSON validation path: one JSON Schema document against one JSON input.
//!
//! Compilation may fetch remote `$ref` targets with a blocking HTTP client,
//! so everything that touches the compiled validator runs on the blocking
//! pool. The caller awaits it before printing, so nothing runs concurrently.

use jsonschema::{Draft, Validator};
use serde_json::{Value, json};
use std::borrow::Cow;
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use url::Url;

use crate::cli::Options;
use crate::config::Config;
use crate::diagnostic::Diagnostic;
use crate::error::{Error, Result};
use crate::http_client::HttpClientConfig;
use crate::json_locator::PositionIndex;
use crate::output::Output;
use crate::retriever::SchemaRetriever;

/// Run the JSON path and print its report.
pub async fn run<W: Write>(options: &Options, config: &Config, output: &mut Output<W>) -> Result<()> {
    if options.schema_files.len() > 1 {
        return Err(Error::NotImplemented {
            feature: format!(
                "validation against {} JSON schema files (only one is supported)",
                options.schema_files.len()
            ),
        });
    }

    let schema_path = options.primary_schema().ok_or(Error::EmptySchemaList)?.clone();
    let schema_text = tokio::fs::read_to_string(&schema_path).await?;
    let schema_value = parse_schema(&schema_path, &schema_text)?;
    let input_text = tokio::fs::read_to_string(&options.input_file).await?;

    let input_path = options.input_file.clone();
    let config = config.clone();
    let diagnostics = tokio::task::spawn_blocking(move || {
        let schema = JsonSchema::compile(&schema_path, schema_value, &config)?;
        schema.validate_text(&input_path, &input_text)
    })
    .await??;

    tracing::debug!(errors = diagnostics.len(), "JSON validation finished");
    output.json_report(&diagnostics)?;
    Ok(())
}

fn parse_schema(path: &Path, text: &str) -> Result<Value> {
    serde_json::from_str(text).map_err(|e| Error::JsonSchema {
        path: path.to_path_buf(),
        details: e.to_string(),
    })
}

/// A compiled JSON Schema together with the document it was built from.
pub struct JsonSchema {
    path: PathBuf,
    root: Value,
    base_uri: String,
    draft: Option<Draft>,
    retriever: SchemaRetriever,
    validator: Validator,
}

impl JsonSchema {
    /// Compile `root`, loaded from `path`. Relative references resolve
    /// against the file's own location unless the schema declares an id.
    pub fn compile(path: &Path, mut root: Value, config: &Config) -> Result<Self> {
        let draft = config.json.draft.to_draft();
        let base_uri = install_base_uri(&mut root, path, draft)?;
        tracing::debug!(schema = %path.display(), %base_uri, "compiling JSON schema");

        let mut documents = HashMap::new();
        documents.insert(base_uri.clone(), root.clone());
        let retriever = SchemaRetriever::new(
            HttpClientConfig::from(config),
            config.json.remote_refs,
            documents,
        )
        .map_err(|e| Error::JsonSchema {
            path: path.to_path_buf(),
            details: e.to_string(),
        })?;

        let validator = build_validator(&root, draft, &retriever).map_err(|details| {
            match retriever.last_failure() {
                Some(failure) => Error::SchemaFetch {
                    uri: failure.uri,
                    details: failure.details,
                },
                None => Error::JsonSchema {
                    path: path.to_path_buf(),
                    details,
                },
            }
        })?;

        Ok(Self {
            path: path.to_path_buf(),
            root,
            base_uri,
            draft,
            retriever,
            validator,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn base_uri(&self) -> &str {
        &self.base_uri
    }

    /// Parse `text` and validate it.
    pub fn validate_text(&self, input_path: &Path, text: &str) -> Result<Vec<Diagnostic>> {
        let instance: Value = serde_json::from_str(text).map_err(|source| Error::JsonParse {
            path: input_path.to_path_buf(),
            source,
        })?;
        let index = PositionIndex::build(text);
        Ok(self.diagnostics(&instance, &index))
    }

    /// Top-level findings in the engine's order, each with its failed branches.
    pub fn diagnostics(&self, instance: &Value, index: &PositionIndex) -> Vec<Diagnostic> {
        self.validator
            .iter_errors(instance)
            .map(|error| {
                let instance_path = error.instance_path.to_string();
                let schema_path = error.schema_path.to_string();
                let position = index.locate(&instance_path);
                let children = self.branch_diagnostics(&schema_path, &instance_path, instance, index);
                Diagnostic::new(position.line, position.column, error.to_string())
                    .with_children(children)
            })
            .collect()
    }

    /// Re-run every branch of a failed `anyOf`/`oneOf` against the failing value.
    fn branch_diagnostics(
        &self,
        schema_path: &str,
        instance_path: &str,
        instance: &Value,
        index: &PositionIndex,
    ) -> Vec<Diagnostic> {
        if !matches!(schema_path.rsplit('/').next(), Some("anyOf" | "oneOf")) {
            return Vec::new();
        }

        let Some(keyword) = locate_keyword(&self.root, &self.base_uri, &self.retriever, schema_path)
        else {
            tracing::debug!(%schema_path, "cannot locate branches of combinator");
            return Vec::new();
        };
        let Some(branches) = keyword.document.pointer(&keyword.pointer).and_then(Value::as_array)
        else {
            return Vec::new();
        };
        let pointer = &keyword.pointer;
        let Some(target) = instance.pointer(instance_path) else {
            return Vec::new();
        };

        let mut children = Vec::new();
        for i in 0..branches.len() {
            let branch = json!({ "$ref": format!("{}#{}/{}", keyword.base_uri, pointer, i) });
            match build_validator(&branch, self.draft, &self.retriever) {
                Ok(validator) => {
                    for error in validator.iter_errors(target) {
                        let path = format!("{}{}", instance_path, error.instance_path);
                        let position = index.locate(&path);
                        children.push(Diagnostic::new(
                            position.line,
                            position.column,
                            error.to_string(),
                        ));
                    }
                }
                Err(details) => {
                    tracing::debug!(branch = i, %pointer, %details, "cannot compile combinator branch")
                }
            }
        }
        children
    }
}

fn build_validator(
    schema: &Value,
    draft: Option<Draft>,
    retriever: &SchemaRetriever,
) -> std::result::Result<Validator, String> {
    let mut opts = jsonschema::options();
    if let Some(draft) = draft {
        opts.with_draft(draft);
    }
    opts.with_retriever(retriever.clone());
    opts.build(schema).map_err(|e| e.to_string())
}

/// Make sure the root schema carries an absolute id and return it.
///
/// A missing id becomes the schema file's URL; a relative one is resolved
/// against it.
fn install_base_uri(root: &mut Value, path: &Path, draft: Option<Draft>) -> Result<String> {
    let file_url = Url::from_file_path(std::fs::canonicalize(path)?).map_err(|_| {
        Error::JsonSchema {
            path: path.to_path_buf(),
            details: "schema path cannot be expressed as a file URL".to_string(),
        }
    })?;

    let Value::Object(map) = root else {
        return Ok(file_url.to_string());
    };

    let id_key = if uses_legacy_id(map, draft) { "id" } else { "$id" };
    let mut base = match map.get(id_key).and_then(Value::as_str) {
        Some(id) => file_url.join(id).map_err(|e| Error::JsonSchema {
            path: path.to_path_buf(),
            details: format!("invalid {id_key} '{id}': {e}"),
        })?,
        None => file_url,
    };
    base.set_fragment(None);

    map.insert(id_key.to_string(), Value::String(base.to_string()));
    Ok(base.to_string())
}

fn uses_legacy_id(map: &serde_json::Map<String, Value>, draft: Option<Draft>) -> bool {
    match draft {
        Some(draft) => matches!(draft, Draft::Draft4),
        None => map
            .get("$schema")
            .and_then(Value::as_str)
            .is_some_and(|uri| uri.contains("draft-04")),
    }
}

/// Where a keyword lives: the document holding it, that document's URI and
/// the JSON Pointer to the keyword inside it.
struct KeywordLocation<'a> {
    base_uri: String,
    document: Cow<'a, Value>,
    pointer: String,
}

/// Follow a keyword location from the root schema, stepping through every
/// `$ref` on the way. References into other documents are resolved against
/// the current document's URI and loaded through `retriever`.
fn locate_keyword<'a>(
    root: &'a Value,
    base_uri: &str,
    retriever: &SchemaRetriever,
    schema_path: &str,
) -> Option<KeywordLocation<'a>> {
    let mut base = Url::parse(base_uri).ok()?;
    let mut document = Cow::Borrowed(root);
    let mut pointer = String::new();

    for segment in schema_path.split('/').skip(1) {
        if segment == "$ref" {
            let reference = document
                .pointer(&pointer)?
                .get("$ref")
                .and_then(Value::as_str)
                .map(str::to_string);
            if let Some(reference) = reference {
                let mut target = base.join(&reference).ok()?;
                let fragment = target.fragment().unwrap_or_default().to_string();
                target.set_fragment(None);
                if target != base {
                    document = Cow::Owned(retriever.fetch(target.as_str()).ok()?);
                    base = target;
                }
                pointer = fragment;
                continue;
            }
        }
        pointer.push('/');
        pointer.push_str(segment);
    }

    document.pointer(&pointer)?;
    Some(KeywordLocation {
        base_uri: base.to_string(),
        document,
        pointer,
    })
}
