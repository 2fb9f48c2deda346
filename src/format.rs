//! Source type tags and the heuristics that pick them.
//!
//! Detection is shallow: a static extension table, a media-type table for URL
//! sources, and two content sniffs. JSON objects carrying `$schema`, `properties` or
//! `definitions` are promoted to [`FileType::JsonSchema`], and RDF documents mentioning
//! `sh:NodeShape` / `sh:PropertyShape` are promoted to [`FileType::Shacl1`]. Neither sniff parses
//! the document, so a shape name inside a comment or string literal still counts.

use serde_json::Value;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Closed set of tags describing what a source contains.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FileType {
    /// OWL ontology.
    Owl,
    /// RDF/XML document.
    Rdf,
    /// Turtle (also N3 / N-Triples).
    Turtle,
    /// XML Schema definition.
    Xsd,
    /// Generic XML.
    Xml,
    /// Generic JSON.
    Json,
    /// JSON-LD document.
    JsonLd,
    /// Excel workbook.
    Excel,
    /// Comma separated values.
    Csv,
    /// PDF document.
    Pdf,
    /// Plain text or Markdown.
    Text,
    /// Nothing matched.
    Unknown,
    /// JSON document that looks like a JSON Schema.
    JsonSchema,
    /// RDF document that already declares SHACL shapes.
    Shacl1,
}

/// Raised when a tag string is not one of the known [`FileType`] tags.
#[derive(Debug, Error)]
#[error("unknown file type '{0}' (expected one of: {tags})", tags = FileType::TAGS.join(", "))]
pub struct UnknownFileType(pub String);

const EXTENSIONS: &[(&str, FileType)] = &[
    ("owl", FileType::Owl),
    ("rdf", FileType::Rdf),
    ("ttl", FileType::Turtle),
    ("n3", FileType::Turtle),
    ("nt", FileType::Turtle),
    ("xsd", FileType::Xsd),
    ("xml", FileType::Xml),
    ("json", FileType::Json),
    ("jsonld", FileType::JsonLd),
    ("xlsx", FileType::Excel),
    ("xls", FileType::Excel),
    ("csv", FileType::Csv),
    ("pdf", FileType::Pdf),
    ("txt", FileType::Text),
    ("md", FileType::Text),
];

const MEDIA_TYPES: &[(&str, FileType)] = &[
    ("application/owl+xml", FileType::Owl),
    ("application/rdf+xml", FileType::Rdf),
    ("text/turtle", FileType::Turtle),
    ("text/n3", FileType::Turtle),
    ("application/n-triples", FileType::Turtle),
    ("application/xml", FileType::Xml),
    ("text/xml", FileType::Xml),
    ("application/json", FileType::Json),
    ("application/schema+json", FileType::JsonSchema),
    ("application/ld+json", FileType::JsonLd),
    (
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        FileType::Excel,
    ),
    ("application/vnd.ms-excel", FileType::Excel),
    ("text/csv", FileType::Csv),
    ("application/pdf", FileType::Pdf),
    ("text/plain", FileType::Text),
    ("text/markdown", FileType::Text),
];

const SCHEMA_KEYS: [&str; 3] = ["$schema", "properties", "definitions"];
const SHAPE_MARKERS: [&str; 2] = ["sh:NodeShape", "sh:PropertyShape"];

impl FileType {
    /// Every tag accepted by [`FileType::from_str`].
    pub const TAGS: [&'static str; 14] = [
        "owl",
        "rdf",
        "turtle",
        "xsd",
        "xml",
        "json",
        "jsonld",
        "excel",
        "csv",
        "pdf",
        "text",
        "unknown",
        "jsonschema",
        "shacl1",
    ];

    /// Map a file extension (with or without the leading dot) to a tag.
    pub fn from_extension(extension: &str) -> Self {
        let extension = extension.trim_start_matches('.').to_ascii_lowercase();
        EXTENSIONS
            .iter()
            .find(|(candidate, _)| *candidate == extension)
            .map_or(Self::Unknown, |(_, file_type)| *file_type)
    }

    /// Map a path to a tag using its extension.
    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|extension| extension.to_str())
            .map_or(Self::Unknown, Self::from_extension)
    }

    /// Map a `Content-Type` header value to a tag, ignoring any parameters.
    pub fn from_mime(content_type: &str) -> Self {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        MEDIA_TYPES
            .iter()
            .find(|(candidate, _)| *candidate == essence)
            .map_or(Self::Unknown, |(_, file_type)| *file_type)
    }

    /// Tag string used on the command line and in logs.
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Owl => "owl",
            Self::Rdf => "rdf",
            Self::Turtle => "turtle",
            Self::Xsd => "xsd",
            Self::Xml => "xml",
            Self::Json => "json",
            Self::JsonLd => "jsonld",
            Self::Excel => "excel",
            Self::Csv => "csv",
            Self::Pdf => "pdf",
            Self::Text => "text",
            Self::Unknown => "unknown",
            Self::JsonSchema => "jsonschema",
            Self::Shacl1 => "shacl1",
        }
    }

    /// Human-readable format name substituted for `{format}` in prompts.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Owl => "OWL",
            Self::Rdf => "RDF/XML",
            Self::Turtle => "Turtle",
            Self::Xsd => "XML Schema (XSD)",
            Self::Xml => "XML",
            Self::Json => "JSON",
            Self::JsonLd => "JSON-LD",
            Self::Excel => "Excel spreadsheet (converted to JSON)",
            Self::Csv => "CSV",
            Self::Pdf => "PDF (extracted text)",
            Self::Text => "plain text",
            Self::Unknown => "unknown format",
            Self::JsonSchema => "JSON Schema",
            Self::Shacl1 => "SHACL 1.0/1.1",
        }
    }

    /// Whether the content is binary and must be decoded before it can be sent as text.
    pub const fn is_binary(self) -> bool {
        matches!(self, Self::Excel | Self::Pdf)
    }

    /// Whether the tag denotes an RDF serialization.
    pub const fn is_rdf(self) -> bool {
        matches!(self, Self::Owl | Self::Rdf | Self::Turtle | Self::JsonLd)
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for FileType {
    type Err = UnknownFileType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "owl" => Ok(Self::Owl),
            "rdf" => Ok(Self::Rdf),
            "turtle" | "ttl" => Ok(Self::Turtle),
            "xsd" => Ok(Self::Xsd),
            "xml" => Ok(Self::Xml),
            "json" => Ok(Self::Json),
            "jsonld" | "json-ld" => Ok(Self::JsonLd),
            "excel" | "xlsx" => Ok(Self::Excel),
            "csv" => Ok(Self::Csv),
            "pdf" => Ok(Self::Pdf),
            "text" | "txt" => Ok(Self::Text),
            "unknown" => Ok(Self::Unknown),
            "jsonschema" | "json-schema" => Ok(Self::JsonSchema),
            "shacl1" => Ok(Self::Shacl1),
            _ => Err(UnknownFileType(s.to_string())),
        }
    }
}

/// Refine a detected tag by peeking at the content.
///
/// Binary tags are returned untouched. Content that parses as a JSON object with a schema
/// keyword becomes [`FileType::JsonSchema`] whatever the extension said; invalid JSON is simply
/// not a schema. RDF content containing a SHACL shape marker becomes [`FileType::Shacl1`].
pub fn classify(hint: FileType, content: &[u8]) -> FileType {
    if hint.is_binary() {
        return hint;
    }

    let text = String::from_utf8_lossy(content);
    if looks_like_json_schema(&text) {
        return FileType::JsonSchema;
    }

    if hint.is_rdf() && SHAPE_MARKERS.iter().any(|marker| text.contains(*marker)) {
        return FileType::Shacl1;
    }

    hint
}

fn looks_like_json_schema(text: &str) -> bool {
    let trimmed = text.trim_start();
    if !trimmed.starts_with('{') {
        return false;
    }
    match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Object(object)) => SCHEMA_KEYS.iter().any(|key| object.contains_key(*key)),
        _ => false,
    }
}
