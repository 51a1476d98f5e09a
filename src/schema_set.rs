//! A set of XSD files compiled as one schema.
//!
//! libxml2 compiles a single schema document, so a set with several members
//! is compiled through a generated driver that includes or imports each of
//! them. No target namespace is pinned here: every file keeps the one it
//! declares.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use url::Url;

use crate::error::{Error, Result};
use crate::libxml2::{LibXml2Wrapper, XmlSchemaPtr};

pub const XSD_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaMember {
    /// Canonical location of the file
    pub path: PathBuf,
    pub target_namespace: Option<String>,
}

#[derive(Debug, Default)]
pub struct SchemaSet {
    members: Vec<SchemaMember>,
}

impl SchemaSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the schema at `path` whose text is `contents`.
    ///
    /// Returns `false` when the same file is already part of the set.
    pub fn add(&mut self, path: &Path, contents: &str) -> Result<bool> {
        let document = roxmltree::Document::parse(contents).map_err(|e| Error::XsdSchema {
            details: format!("{}: {}", path.display(), e),
        })?;

        let root = document.root_element();
        if root.tag_name().name() != "schema" || root.tag_name().namespace() != Some(XSD_NAMESPACE) {
            return Err(Error::XsdSchema {
                details: format!("{}: not an XML Schema document", path.display()),
            });
        }

        let canonical = std::fs::canonicalize(path)?;
        if self.members.iter().any(|m| m.path == canonical) {
            tracing::warn!(schema = %path.display(), "schema file listed more than once, ignoring repeat");
            return Ok(false);
        }

        let target_namespace = root
            .attribute("targetNamespace")
            .filter(|ns| !ns.is_empty())
            .map(str::to_string);
        tracing::debug!(
            schema = %canonical.display(),
            namespace = target_namespace.as_deref().unwrap_or("(none)"),
            "added schema to set"
        );

        self.members.push(SchemaMember {
            path: canonical,
            target_namespace,
        });
        Ok(true)
    }

    pub fn members(&self) -> &[SchemaMember] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Compile the whole set into one schema.
    pub fn compile(&self, wrapper: &LibXml2Wrapper) -> Result<XmlSchemaPtr> {
        match self.members.as_slice() {
            [] => Err(Error::EmptySchemaList),
            [single] => Ok(wrapper.parse_schema_file(&single.path)?),
            _ => {
                let scratch = TempDir::new()?;
                let driver = self.driver_document(scratch.path())?;
                tracing::debug!(members = self.members.len(), "compiling generated driver schema");
                Ok(wrapper.parse_schema_from_memory(driver.as_bytes())?)
            }
        }
    }

    /// Build the driver schema text. Namespaces declared by more than one
    /// member get their own aggregating schema written into `scratch`.
    pub fn driver_document(&self, scratch: &Path) -> Result<String> {
        let mut driver = schema_open(None);

        for (index, (namespace, paths)) in self.namespaces().into_iter().enumerate() {
            match namespace {
                None => {
                    for path in paths {
                        include(&mut driver, path)?;
                    }
                }
                Some(namespace) => {
                    let location = match paths.as_slice() {
                        [single] => file_url(single)?,
                        _ => {
                            let mut aggregate = schema_open(Some(namespace));
                            for path in &paths {
                                include(&mut aggregate, path)?;
                            }
                            aggregate.push_str("</xs:schema>\n");

                            let aggregate_path = scratch.join(format!("namespace-{index}.xsd"));
                            std::fs::write(&aggregate_path, aggregate)?;
                            file_url(&aggregate_path)?
                        }
                    };
                    let _ = writeln!(
                        driver,
                        "  <xs:import namespace=\"{}\" schemaLocation=\"{}\"/>",
                        escape_attribute(namespace),
                        escape_attribute(&location)
                    );
                }
            }
        }

        driver.push_str("</xs:schema>\n");
        Ok(driver)
    }

    /// Members grouped by target namespace, in order of first appearance.
    fn namespaces(&self) -> Vec<(Option<&str>, Vec<&Path>)> {
        let mut groups: Vec<(Option<&str>, Vec<&Path>)> = Vec::new();
        for member in &self.members {
            let namespace = member.target_namespace.as_deref();
            match groups.iter_mut().find(|(ns, _)| *ns == namespace) {
                Some((_, paths)) => paths.push(&member.path),
                None => groups.push((namespace, vec![&member.path])),
            }
        }
        groups
    }
}

fn schema_open(target_namespace: Option<&str>) -> String {
    let mut text = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<xs:schema xmlns:xs=\"{}\"",
        XSD_NAMESPACE
    );
    if let Some(namespace) = target_namespace {
        let _ = write!(text, " targetNamespace=\"{}\"", escape_attribute(namespace));
    }
    text.push_str(">\n");
    text
}

fn include(schema: &mut String, path: &Path) -> Result<()> {
    let location = file_url(path)?;
    let _ = writeln!(
        schema,
        "  <xs:include schemaLocation=\"{}\"/>",
        escape_attribute(&location)
    );
    Ok(())
}

fn file_url(path: &Path) -> Result<String> {
    Url::from_file_path(path)
        .map(String::from)
        .map_err(|_| Error::XsdSchema {
            details: format!("{}: cannot be expressed as a file URL", path.display()),
        })
}

fn escape_attribute(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
