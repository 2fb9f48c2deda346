//! Prompt templates, placeholder substitution, and model-output cleanup.
//!
//! Templates are plain text with `{name}` placeholders. The built-in set is compiled into the
//! binary; a prompts directory can override any of them by file name.

use crate::format::FileType;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while loading prompt templates.
#[derive(Debug, Error)]
pub enum PromptError {
    /// Override file existed but could not be read.
    #[error("Failed to read prompt template {path}: {source}")]
    Read {
        /// Template path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Which template a request is rendered with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PromptKind {
    /// OWL / RDF ontology to SHACL.
    Owl,
    /// XML Schema to SHACL.
    Xsd,
    /// JSON Schema to SHACL.
    JsonSchema,
    /// Existing SHACL 1.0/1.1 shapes to SHACL 1.2.
    Upgrade,
    /// Arbitrary data to SHACL (the generic path).
    Data,
    /// Data to SHACL, extending a base schema.
    Extend,
    /// Map data onto a SHACL schema.
    Apply,
    /// Sample data from a SHACL schema.
    Generate,
}

impl PromptKind {
    /// All kinds, in the order their templates are loaded.
    pub const ALL: [PromptKind; 8] = [
        Self::Owl,
        Self::Xsd,
        Self::JsonSchema,
        Self::Upgrade,
        Self::Data,
        Self::Extend,
        Self::Apply,
        Self::Generate,
    ];

    /// Pick the conversion template for a detected source tag.
    pub const fn for_file_type(file_type: FileType) -> Self {
        match file_type {
            FileType::Owl | FileType::Rdf | FileType::Turtle | FileType::JsonLd => Self::Owl,
            FileType::Xsd => Self::Xsd,
            FileType::JsonSchema => Self::JsonSchema,
            FileType::Shacl1 => Self::Upgrade,
            FileType::Xml
            | FileType::Json
            | FileType::Excel
            | FileType::Csv
            | FileType::Pdf
            | FileType::Text
            | FileType::Unknown => Self::Data,
        }
    }

    /// Whether a source with this tag may be rendered with this template when the template is
    /// chosen explicitly. Untyped sources (`unknown`, `text`) are accepted everywhere.
    pub const fn accepts(self, file_type: FileType) -> bool {
        if matches!(file_type, FileType::Unknown | FileType::Text) {
            return true;
        }
        match self {
            Self::Owl => matches!(
                file_type,
                FileType::Owl
                    | FileType::Rdf
                    | FileType::Turtle
                    | FileType::JsonLd
                    | FileType::Xml
                    | FileType::Shacl1
            ),
            Self::Xsd => matches!(file_type, FileType::Xsd | FileType::Xml),
            Self::JsonSchema => matches!(file_type, FileType::JsonSchema | FileType::Json),
            Self::Upgrade => matches!(
                file_type,
                FileType::Shacl1
                    | FileType::Turtle
                    | FileType::Rdf
                    | FileType::Owl
                    | FileType::JsonLd
            ),
            Self::Data | Self::Extend | Self::Apply => true,
            Self::Generate => file_type.is_rdf() || matches!(file_type, FileType::Shacl1),
        }
    }

    /// Whether requests rendered with this template carry the shape-authoring system prompt.
    /// Templates that produce instance data instead of shapes are sent without one.
    pub const fn uses_system_prompt(self) -> bool {
        !matches!(self, Self::Apply | Self::Generate)
    }

    /// File name of the template inside a prompts directory.
    pub const fn file_name(self) -> &'static str {
        match self {
            Self::Owl => "owl.txt",
            Self::Xsd => "xsd.txt",
            Self::JsonSchema => "jsonschema.txt",
            Self::Upgrade => "upgrade.txt",
            Self::Data => "data.txt",
            Self::Extend => "extend.txt",
            Self::Apply => "apply.txt",
            Self::Generate => "generate.txt",
        }
    }

    const fn builtin(self) -> &'static str {
        match self {
            Self::Owl => include_str!("../prompts/owl.txt"),
            Self::Xsd => include_str!("../prompts/xsd.txt"),
            Self::JsonSchema => include_str!("../prompts/jsonschema.txt"),
            Self::Upgrade => include_str!("../prompts/upgrade.txt"),
            Self::Data => include_str!("../prompts/data.txt"),
            Self::Extend => include_str!("../prompts/extend.txt"),
            Self::Apply => include_str!("../prompts/apply.txt"),
            Self::Generate => include_str!("../prompts/generate.txt"),
        }
    }

    const fn name(self) -> &'static str {
        match self {
            Self::Owl => "owl",
            Self::Xsd => "xsd",
            Self::JsonSchema => "jsonschema",
            Self::Upgrade => "upgrade",
            Self::Data => "data",
            Self::Extend => "extend",
            Self::Apply => "apply",
            Self::Generate => "generate",
        }
    }
}

impl fmt::Display for PromptKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

const SYSTEM_FILE_NAME: &str = "system.txt";
const BUILTIN_SYSTEM: &str = include_str!("../prompts/system.txt");

/// Loaded templates plus the system prompt sent with every request.
#[derive(Debug, Clone)]
pub struct PromptLibrary {
    system: String,
    templates: Vec<(PromptKind, String)>,
}

impl Default for PromptLibrary {
    fn default() -> Self {
        Self::builtin()
    }
}

impl PromptLibrary {
    /// Templates compiled into the binary.
    pub fn builtin() -> Self {
        Self {
            system: BUILTIN_SYSTEM.to_string(),
            templates: PromptKind::ALL
                .iter()
                .map(|kind| (*kind, kind.builtin().to_string()))
                .collect(),
        }
    }

    /// Built-in templates, overridden by any matching file found in `dir`.
    pub fn load(dir: Option<&Path>) -> Result<Self, PromptError> {
        let mut library = Self::builtin();
        let Some(dir) = dir else {
            return Ok(library);
        };

        if let Some(system) = read_override(dir, SYSTEM_FILE_NAME)? {
            library.system = system;
        }
        for (kind, template) in &mut library.templates {
            if let Some(contents) = read_override(dir, kind.file_name())? {
                tracing::debug!(kind = %kind, dir = %dir.display(), "Using prompt override");
                *template = contents;
            }
        }
        Ok(library)
    }

    /// Template text for a kind.
    pub fn template(&self, kind: PromptKind) -> &str {
        self.templates
            .iter()
            .find(|(candidate, _)| *candidate == kind)
            .map_or_else(|| kind.builtin(), |(_, template)| template.as_str())
    }

    /// System prompt.
    pub fn system(&self) -> &str {
        &self.system
    }

    /// System prompt to send with a request rendered from `kind`, if any.
    pub fn system_for(&self, kind: PromptKind) -> Option<&str> {
        kind.uses_system_prompt().then_some(self.system.as_str())
    }
}

fn read_override(dir: &Path, file_name: &str) -> Result<Option<String>, PromptError> {
    let path = dir.join(file_name);
    match std::fs::read_to_string(&path) {
        Ok(contents) => Ok(Some(contents)),
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(PromptError::Read { path, source }),
    }
}

/// Substitute `{input}` and `{format}` in a template.
pub fn compose(template: &str, input: &str, format: &str) -> String {
    compose_with(template, &[("input", input), ("format", format)])
}

/// Substitute named `{placeholders}` in a single pass over the template.
///
/// Substituted values are copied verbatim, so braces inside them are never expanded. Brace
/// sequences that do not name a binding stay as they are.
pub fn compose_with(template: &str, bindings: &[(&str, &str)]) -> String {
    let mut output = String::with_capacity(
        template.len() + bindings.iter().map(|(_, value)| value.len()).sum::<usize>(),
    );
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        output.push_str(&rest[..open]);
        let after_open = &rest[open + 1..];
        let binding = after_open.find('}').and_then(|close| {
            let name = &after_open[..close];
            bindings
                .iter()
                .find(|(candidate, _)| *candidate == name)
                .map(|(_, value)| (close, *value))
        });

        match binding {
            Some((close, value)) => {
                output.push_str(value);
                rest = &after_open[close + 1..];
            }
            None => {
                output.push('{');
                rest = after_open;
            }
        }
    }
    output.push_str(rest);
    output
}

/// Pull the body out of a Markdown code fence if the model wrapped its answer in one.
///
/// Prefers a ```` ```turtle ```` or ```` ```ttl ```` fence, then any fence. Text without a fence
/// is returned trimmed.
pub fn strip_code_fence(text: &str) -> String {
    let text = text.trim();
    for opener in ["```turtle", "```ttl", "```"] {
        if let Some(start) = text.find(opener) {
            let body = &text[start + opener.len()..];
            let end = body.find("```").unwrap_or(body.len());
            return body[..end].trim().to_string();
        }
    }
    text.to_string()
}
