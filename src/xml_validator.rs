//! XML validation path: one XML document against a set of XSD files.

use std::io::{self, Write};

use crate::cli::Options;
use crate::error::Result;
use crate::libxml2::LibXml2Wrapper;
use crate::output::Output;
use crate::schema_set::SchemaSet;

/// Run the XML path, printing each validation event as it is raised.
///
/// A valid document prints nothing.
pub async fn run<W: Write>(options: &Options, output: &mut Output<W>) -> Result<()> {
    let mut set = SchemaSet::new();
    for path in &options.schema_files {
        let contents = tokio::fs::read_to_string(path).await?;
        set.add(path, &contents)?;
    }

    // libxml2 calls are synchronous and run on the current task.
    let wrapper = LibXml2Wrapper::new();
    let schema = set.compile(&wrapper)?;
    let document = wrapper.read_document(&options.input_file)?;

    let mut events = 0usize;
    let mut write_error: Option<io::Error> = None;
    let result = wrapper.validate_document(&schema, &document, &mut |event| {
        events += 1;
        if write_error.is_some() {
            return;
        }
        if let Err(e) = output.xml_event(&event) {
            write_error = Some(e);
        }
    })?;

    if let Some(e) = write_error {
        return Err(e.into());
    }
    output.flush()?;

    tracing::debug!(events, ?result, "XML validation finished");
    Ok(())
}
