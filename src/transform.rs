use crate::config::Config;
use crate::format::FileType;
use crate::llm::{AnthropicClient, CompletionRequest, ModelClient, ModelClientError};
use crate::output::{Destination, OutputError, deliver};
use crate::prompt::{PromptError, PromptKind, PromptLibrary, compose_with, strip_code_fence};
use crate::source::{Source, SourceError, SourceInput};
use std::path::PathBuf;
use thiserror::Error;

/// Errors emitted while turning a source into SHACL. None are recovered locally.
#[derive(Debug, Error)]
pub enum TransformError {
    /// Source could not be loaded or decoded.
    #[error(transparent)]
    Source(#[from] SourceError),
    /// Prompt templates could not be loaded.
    #[error(transparent)]
    Prompt(#[from] PromptError),
    /// Model provider failed.
    #[error(transparent)]
    Model(#[from] ModelClientError),
    /// Result could not be written.
    #[error(transparent)]
    Output(#[from] OutputError),
    /// A template was requested explicitly for a source it cannot handle.
    #[error("{origin} was detected as '{file_type}', which the '{kind}' conversion does not accept")]
    FormatMismatch {
        /// Template that was requested.
        kind: PromptKind,
        /// Tag assigned to the source.
        file_type: FileType,
        /// Source origin.
        origin: String,
    },
    /// Source rendered to empty text; nothing would be sent.
    #[error("{0} is empty")]
    EmptyInput(String),
}

/// Per-request settings shared by every conversion.
#[derive(Debug, Clone)]
pub struct RequestSettings {
    /// Model identifier.
    pub model: String,
    /// Upper bound on generated tokens.
    pub max_tokens: u32,
    /// Return the model text untouched instead of unwrapping a Markdown fence.
    pub raw: bool,
}

impl RequestSettings {
    /// Settings taken from configuration, with fence stripping enabled.
    pub fn from_config(config: &Config) -> Self {
        Self {
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            raw: false,
        }
    }
}

/// Options for a single conversion.
#[derive(Debug, Clone, Default)]
pub struct ConvertOptions {
    /// Template to use regardless of the detected tag. Incompatible tags are rejected.
    pub prompt: Option<PromptKind>,
    /// Format label substituted for `{format}` instead of the tag's own label.
    pub format_label: Option<String>,
}

/// Pick the template for a source, validating an explicitly requested one.
pub fn resolve_prompt(
    file_type: FileType,
    requested: Option<PromptKind>,
    origin: &str,
) -> Result<PromptKind, TransformError> {
    match requested {
        None => Ok(PromptKind::for_file_type(file_type)),
        Some(kind) if kind.accepts(file_type) => Ok(kind),
        Some(kind) => Err(TransformError::FormatMismatch {
            kind,
            file_type,
            origin: origin.to_string(),
        }),
    }
}

/// Dispatches composed prompts to a model provider.
///
/// Every operation renders exactly one template and issues exactly one model request. The
/// provider is injected so tests can swap in [`crate::llm::StaticModelClient`].
pub struct TransformService {
    client: Box<dyn ModelClient + Send + Sync>,
    prompts: PromptLibrary,
    settings: RequestSettings,
}

impl TransformService {
    /// Build a service backed by the Anthropic Messages API.
    ///
    /// Fails on a missing API key before touching the network or the filesystem.
    pub fn from_config(config: &Config, raw: bool) -> Result<Self, TransformError> {
        let client = AnthropicClient::from_config(config)?;
        let prompts = PromptLibrary::load(config.prompts_dir.as_deref())?;
        let mut settings = RequestSettings::from_config(config);
        settings.raw = raw;
        Ok(Self::with_client(Box::new(client), prompts, settings))
    }

    /// Build a service around any provider.
    pub fn with_client(
        client: Box<dyn ModelClient + Send + Sync>,
        prompts: PromptLibrary,
        settings: RequestSettings,
    ) -> Self {
        Self {
            client,
            prompts,
            settings,
        }
    }

    /// Convert a schema or data source to SHACL.
    ///
    /// The template follows the source tag unless one is forced through `options`.
    pub async fn convert(
        &self,
        source: &Source,
        options: &ConvertOptions,
    ) -> Result<String, TransformError> {
        let kind = resolve_prompt(source.file_type(), options.prompt, source.origin())?;
        let input = non_empty_text(source)?;
        let format = format_label(source, options);
        tracing::info!(
            origin = %source.origin(),
            file_type = %source.file_type(),
            kind = %kind,
            "Converting source"
        );

        self.submit(kind, &[("input", input.as_str()), ("format", format.as_str())])
            .await
    }

    /// Derive shapes from data, extending an existing base schema.
    pub async fn extend(
        &self,
        data: &Source,
        base: &Source,
        options: &ConvertOptions,
    ) -> Result<String, TransformError> {
        let input = non_empty_text(data)?;
        let base_text = non_empty_text(base)?;
        let format = format_label(data, options);
        tracing::info!(
            origin = %data.origin(),
            base = %base.origin(),
            "Extending base schema from data"
        );

        self.submit(
            PromptKind::Extend,
            &[
                ("input", input.as_str()),
                ("format", format.as_str()),
                ("base", base_text.as_str()),
            ],
        )
        .await
    }

    /// Map data onto a SHACL schema, producing RDF.
    pub async fn apply(
        &self,
        data: &Source,
        schema: &Source,
        options: &ConvertOptions,
    ) -> Result<String, TransformError> {
        let input = non_empty_text(data)?;
        let schema_text = non_empty_text(schema)?;
        let format = format_label(data, options);
        tracing::info!(
            origin = %data.origin(),
            schema = %schema.origin(),
            "Applying schema to data"
        );

        self.submit(
            PromptKind::Apply,
            &[
                ("input", input.as_str()),
                ("format", format.as_str()),
                ("schema", schema_text.as_str()),
            ],
        )
        .await
    }

    /// Generate `count` sample instances conforming to a SHACL schema.
    pub async fn generate(
        &self,
        schema: &Source,
        instructions: &str,
        count: u32,
    ) -> Result<String, TransformError> {
        resolve_prompt(
            schema.file_type(),
            Some(PromptKind::Generate),
            schema.origin(),
        )?;
        let schema_text = non_empty_text(schema)?;
        if instructions.trim().is_empty() {
            return Err(TransformError::EmptyInput("data prompt".to_string()));
        }
        tracing::info!(schema = %schema.origin(), count, "Generating sample data");

        let count = count.to_string();
        self.submit(
            PromptKind::Generate,
            &[
                ("schema", schema_text.as_str()),
                ("instructions", instructions),
                ("count", count.as_str()),
            ],
        )
        .await
    }

    async fn submit(
        &self,
        kind: PromptKind,
        bindings: &[(&str, &str)],
    ) -> Result<String, TransformError> {
        let prompt = compose_with(self.prompts.template(kind), bindings);
        let response = self
            .client
            .complete(CompletionRequest {
                model: self.settings.model.clone(),
                system: self.prompts.system_for(kind).map(str::to_string),
                prompt,
                max_tokens: self.settings.max_tokens,
            })
            .await?;
        tracing::debug!(kind = %kind, chars = response.len(), "Model responded");

        if self.settings.raw {
            Ok(response)
        } else {
            Ok(strip_code_fence(&response))
        }
    }
}

fn non_empty_text(source: &Source) -> Result<String, TransformError> {
    let text = source.text()?;
    if text.trim().is_empty() {
        return Err(TransformError::EmptyInput(source.origin().to_string()));
    }
    Ok(text)
}

fn format_label(source: &Source, options: &ConvertOptions) -> String {
    options
        .format_label
        .clone()
        .filter(|label| !label.trim().is_empty())
        .unwrap_or_else(|| source.file_type().label().to_string())
}

/// Load a source, convert it, and route the result.
///
/// Returns the SHACL text when no output path is given; otherwise writes the file and returns
/// `None`. The API key is checked before the source is read.
pub async fn convert_schema(
    input: &SourceInput,
    output: Option<PathBuf>,
    forced_type: Option<FileType>,
    options: &ConvertOptions,
    config: &Config,
) -> Result<Option<String>, TransformError> {
    let service = TransformService::from_config(config, false)?;
    let source = Source::load(input, forced_type).await?;
    let text = service.convert(&source, options).await?;

    match Destination::from_option(output) {
        Destination::Stdout => Ok(Some(text)),
        destination => {
            deliver(&text, &destination, &mut std::io::sink())?;
            Ok(None)
        }
    }
}
