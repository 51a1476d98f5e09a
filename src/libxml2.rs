//! LibXML2 FFI wrapper for XML Schema validation.
//!
//! No pure Rust crate validates against XSD, so schema compilation, document
//! loading and validation go straight to libxml2. Every pointer libxml2 hands
//! out is owned by an RAII wrapper here; callers never see raw pointers.
//!
//! ## Threading
//!
//! libxml2 initialisation is not thread-safe and is guarded by a `Once`.
//! Compiled schemas are read-only after parsing and may be shared through
//! [`XmlSchemaPtr`]; each validation run creates its own context.

use std::ffi::{CStr, CString};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::ptr;
use std::sync::{Arc, Once};

use libc::{c_char, c_int, c_void};

use crate::diagnostic::Diagnostic;
use crate::error::{LibXml2Error, LibXml2Result};

static LIBXML2_INIT: Once = Once::new();

/// Keep line numbers above 65535 and report parse problems through the
/// context instead of stderr.
const XML_PARSE_NOERROR: c_int = 1 << 5;
const XML_PARSE_NOWARNING: c_int = 1 << 6;
const XML_PARSE_BIG_LINES: c_int = 1 << 22;
const DOCUMENT_OPTIONS: c_int = XML_PARSE_BIG_LINES | XML_PARSE_NOERROR | XML_PARSE_NOWARNING;

// Opaque libxml2 structures
#[repr(C)]
pub struct XmlSchema {
    _private: [u8; 0],
}

#[repr(C)]
pub struct XmlSchemaParserCtxt {
    _private: [u8; 0],
}

#[repr(C)]
pub struct XmlSchemaValidCtxt {
    _private: [u8; 0],
}

#[repr(C)]
pub struct XmlParserCtxt {
    _private: [u8; 0],
}

#[repr(C)]
pub struct XmlDoc {
    _private: [u8; 0],
}

/// `xmlError` as laid out by libxml2.
#[repr(C)]
pub struct XmlError {
    pub domain: c_int,
    pub code: c_int,
    pub message: *const c_char,
    pub level: c_int,
    pub file: *const c_char,
    pub line: c_int,
    pub str1: *const c_char,
    pub str2: *const c_char,
    pub str3: *const c_char,
    pub int1: c_int,
    /// Column, when libxml2 knows it.
    pub int2: c_int,
    pub ctxt: *mut c_void,
    pub node: *mut c_void,
}

pub type XmlStructuredErrorFunc =
    Option<unsafe extern "C" fn(user_data: *mut c_void, error: *const XmlError)>;

#[cfg_attr(target_os = "windows", link(name = "libxml2"))]
#[cfg_attr(not(target_os = "windows"), link(name = "xml2"))]
unsafe extern "C" {
    pub fn xmlInitParser();
    pub fn xmlInitGlobals();

    // Schema parsing
    pub fn xmlSchemaNewParserCtxt(url: *const c_char) -> *mut XmlSchemaParserCtxt;
    pub fn xmlSchemaNewMemParserCtxt(
        buffer: *const c_char,
        size: c_int,
    ) -> *mut XmlSchemaParserCtxt;
    pub fn xmlSchemaSetParserStructuredErrors(
        ctxt: *mut XmlSchemaParserCtxt,
        serror: XmlStructuredErrorFunc,
        ctx: *mut c_void,
    );
    pub fn xmlSchemaParse(ctxt: *mut XmlSchemaParserCtxt) -> *mut XmlSchema;
    pub fn xmlSchemaFreeParserCtxt(ctxt: *mut XmlSchemaParserCtxt);
    pub fn xmlSchemaFree(schema: *mut XmlSchema);

    // Document parsing
    pub fn xmlNewParserCtxt() -> *mut XmlParserCtxt;
    pub fn xmlCtxtReadFile(
        ctxt: *mut XmlParserCtxt,
        filename: *const c_char,
        encoding: *const c_char,
        options: c_int,
    ) -> *mut XmlDoc;
    pub fn xmlCtxtGetLastError(ctx: *mut c_void) -> *const XmlError;
    pub fn xmlFreeParserCtxt(ctxt: *mut XmlParserCtxt);
    pub fn xmlFreeDoc(doc: *mut XmlDoc);

    // Schema validation
    pub fn xmlSchemaNewValidCtxt(schema: *const XmlSchema) -> *mut XmlSchemaValidCtxt;
    pub fn xmlSchemaFreeValidCtxt(ctxt: *mut XmlSchemaValidCtxt);
    pub fn xmlSchemaSetValidStructuredErrors(
        ctxt: *mut XmlSchemaValidCtxt,
        serror: XmlStructuredErrorFunc,
        ctx: *mut c_void,
    );
    pub fn xmlSchemaValidateDoc(ctxt: *mut XmlSchemaValidCtxt, doc: *mut XmlDoc) -> c_int;
}

/// Read a C string owned by libxml2, trimming the trailing newline it adds.
unsafe fn c_text(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    let text = unsafe { CStr::from_ptr(ptr) };
    Some(text.to_string_lossy().trim().to_string())
}

/// Parser-side callback: collect messages into a `Vec<String>`.
unsafe extern "C" fn collect_messages(user_data: *mut c_void, error: *const XmlError) {
    if user_data.is_null() || error.is_null() {
        return;
    }
    let messages = unsafe { &mut *(user_data as *mut Vec<String>) };
    if let Some(message) = unsafe { c_text((*error).message) } {
        messages.push(message);
    }
}

/// Validation-side callback: hand each event to a `&mut dyn FnMut(Diagnostic)`.
unsafe extern "C" fn forward_event(user_data: *mut c_void, error: *const XmlError) {
    if user_data.is_null() || error.is_null() {
        return;
    }
    let sink = unsafe { &mut *(user_data as *mut &mut dyn FnMut(Diagnostic)) };
    let error = unsafe { &*error };
    let message = unsafe { c_text(error.message) }.unwrap_or_default();
    sink(Diagnostic::new(
        error.line.max(0) as u32,
        error.int2.max(0) as u32,
        message,
    ));
}

fn path_to_cstring(path: &Path) -> LibXml2Result<CString> {
    path.to_str()
        .and_then(|s| CString::new(s).ok())
        .ok_or_else(|| LibXml2Error::InvalidPath {
            path: path.to_path_buf(),
        })
}

/// Shared handle to a compiled schema, freed when the last clone drops.
#[derive(Debug, Clone)]
pub struct XmlSchemaPtr {
    inner: Arc<XmlSchemaInner>,
}

#[derive(Debug)]
struct XmlSchemaInner {
    ptr: *mut XmlSchema,
    _phantom: PhantomData<XmlSchema>,
}

// Safety: a parsed xmlSchema is only read during validation.
unsafe impl Send for XmlSchemaInner {}
unsafe impl Sync for XmlSchemaInner {}

impl XmlSchemaPtr {
    /// # Safety
    ///
    /// `ptr` must come from `xmlSchemaParse` and must not be freed elsewhere.
    unsafe fn from_raw(ptr: *mut XmlSchema, messages: Vec<String>) -> LibXml2Result<Self> {
        if ptr.is_null() {
            return Err(LibXml2Error::SchemaParseFailed { messages });
        }

        Ok(XmlSchemaPtr {
            inner: Arc::new(XmlSchemaInner {
                ptr,
                _phantom: PhantomData,
            }),
        })
    }

    pub(crate) fn as_ptr(&self) -> *const XmlSchema {
        self.inner.ptr
    }

    pub fn is_valid(&self) -> bool {
        !self.inner.ptr.is_null()
    }
}

impl Drop for XmlSchemaInner {
    fn drop(&mut self) {
        if !self.ptr.is_null() {
            unsafe {
                xmlSchemaFree(self.ptr);
            }
            self.ptr = ptr::null_mut();
        }
    }
}

/// A parsed XML document with source line tracking.
#[derive(Debug)]
pub struct XmlDocument {
    ptr: *mut XmlDoc,
    path: PathBuf,
}

impl XmlDocument {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for XmlDocument {
    fn drop(&mut self) {
        if !self.ptr.is_null() {
            unsafe {
                xmlFreeDoc(self.ptr);
            }
        }
    }
}

/// Outcome of `xmlSchemaValidateDoc`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResult {
    /// Return code 0
    Valid,
    /// Positive return code: the document violates the schema
    Invalid { code: i32 },
    /// Negative return code: libxml2 failed internally
    InternalError { code: i32 },
}

impl ValidationResult {
    pub fn from_code(code: c_int) -> Self {
        match code {
            0 => ValidationResult::Valid,
            n if n > 0 => ValidationResult::Invalid { code: n },
            n => ValidationResult::InternalError { code: n },
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid)
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self, ValidationResult::Invalid { .. })
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ValidationResult::InternalError { .. })
    }
}

/// Entry point for every libxml2 operation.
///
/// Creating one initialises libxml2 on first use. Schema parsing is not
/// thread-safe and must not run concurrently.
pub struct LibXml2Wrapper {
    _phantom: PhantomData<()>,
}

impl LibXml2Wrapper {
    pub fn new() -> Self {
        LIBXML2_INIT.call_once(|| unsafe {
            xmlInitParser();
            xmlInitGlobals();
        });

        LibXml2Wrapper {
            _phantom: PhantomData,
        }
    }

    /// Compile the XSD at `path`. Relative includes and imports resolve
    /// against the file's own location.
    pub fn parse_schema_file(&self, path: &Path) -> LibXml2Result<XmlSchemaPtr> {
        let c_path = path_to_cstring(path)?;
        unsafe { Self::parse_schema(xmlSchemaNewParserCtxt(c_path.as_ptr())) }
    }

    /// Compile an XSD held in memory. Any includes or imports it makes must
    /// use absolute locations.
    pub fn parse_schema_from_memory(&self, schema_data: &[u8]) -> LibXml2Result<XmlSchemaPtr> {
        let size = c_int::try_from(schema_data.len()).map_err(|_| LibXml2Error::MemoryAllocation)?;
        unsafe {
            Self::parse_schema(xmlSchemaNewMemParserCtxt(
                schema_data.as_ptr() as *const c_char,
                size,
            ))
        }
    }

    /// Takes ownership of `parser_ctxt`.
    unsafe fn parse_schema(parser_ctxt: *mut XmlSchemaParserCtxt) -> LibXml2Result<XmlSchemaPtr> {
        if parser_ctxt.is_null() {
            return Err(LibXml2Error::MemoryAllocation);
        }

        let mut messages: Vec<String> = Vec::new();
        unsafe {
            xmlSchemaSetParserStructuredErrors(
                parser_ctxt,
                Some(collect_messages),
                &mut messages as *mut Vec<String> as *mut c_void,
            );
            let schema_ptr = xmlSchemaParse(parser_ctxt);
            xmlSchemaFreeParserCtxt(parser_ctxt);
            XmlSchemaPtr::from_raw(schema_ptr, messages)
        }
    }

    /// Load an XML document, keeping whitespace and source lines.
    pub fn read_document(&self, path: &Path) -> LibXml2Result<XmlDocument> {
        let c_path = path_to_cstring(path)?;
        unsafe {
            let ctxt = xmlNewParserCtxt();
            if ctxt.is_null() {
                return Err(LibXml2Error::MemoryAllocation);
            }

            let doc = xmlCtxtReadFile(ctxt, c_path.as_ptr(), ptr::null(), DOCUMENT_OPTIONS);
            let result = if doc.is_null() {
                Err(LibXml2Error::InvalidXml {
                    file: path.to_path_buf(),
                    details: describe_error(xmlCtxtGetLastError(ctxt as *mut c_void)),
                })
            } else {
                Ok(XmlDocument {
                    ptr: doc,
                    path: path.to_path_buf(),
                })
            };

            xmlFreeParserCtxt(ctxt);
            result
        }
    }

    /// Validate `document` against `schema`, calling `on_event` once per
    /// validation event in the order libxml2 raises them.
    pub fn validate_document(
        &self,
        schema: &XmlSchemaPtr,
        document: &XmlDocument,
        on_event: &mut dyn FnMut(Diagnostic),
    ) -> LibXml2Result<ValidationResult> {
        unsafe {
            let valid_ctxt = xmlSchemaNewValidCtxt(schema.as_ptr());
            if valid_ctxt.is_null() {
                return Err(LibXml2Error::ValidationContextCreationFailed);
            }

            let mut sink: &mut dyn FnMut(Diagnostic) = on_event;
            xmlSchemaSetValidStructuredErrors(
                valid_ctxt,
                Some(forward_event),
                &mut sink as *mut &mut dyn FnMut(Diagnostic) as *mut c_void,
            );

            let code = xmlSchemaValidateDoc(valid_ctxt, document.ptr);
            xmlSchemaFreeValidCtxt(valid_ctxt);

            match ValidationResult::from_code(code) {
                ValidationResult::InternalError { code } => Err(LibXml2Error::ValidationFailed {
                    code,
                    file: document.path.clone(),
                }),
                result => Ok(result),
            }
        }
    }
}

unsafe fn describe_error(error: *const XmlError) -> String {
    if error.is_null() {
        return "document could not be parsed".to_string();
    }
    let error = unsafe { &*error };
    let message = unsafe { c_text(error.message) }.unwrap_or_else(|| "parse error".to_string());
    format!("line {}, column {}: {}", error.line, error.int2, message)
}

impl Default for LibXml2Wrapper {
    fn default() -> Self {
        Self::new()
    }
}
