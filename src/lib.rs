#![deny(missing_docs)]

//! Core library for the SHACL transformer: source loading, type detection, prompt dispatch to
//! Claude, and result routing.

/// Command-line definitions and execution.
pub mod cli;
/// Environment-driven configuration management.
pub mod config;
/// Source type tags and content sniffing.
pub mod format;
/// Chat-completion client abstraction and the Anthropic adapter.
pub mod llm;
/// Structured logging and tracing setup.
pub mod logging;
/// Result routing to files or standard output.
pub mod output;
/// Prompt templates and placeholder substitution.
pub mod prompt;
/// Source loading from paths, URLs, streams, and bytes.
pub mod source;
/// Conversion service dispatching prompts to the model.
pub mod transform;

pub use config::Config;
pub use format::FileType;
pub use llm::{AnthropicClient, ModelClient, StaticModelClient};
pub use prompt::{PromptKind, compose};
pub use source::{Source, SourceInput};
pub use transform::{ConvertOptions, TransformError, TransformService, convert_schema};
