//! Command-line surface.
//!
//! Every conversion subcommand takes a source path or URL plus the shared [`SourceArgs`]
//! options. Credentials are resolved before any source is read, so a missing key fails fast.

use crate::config::Config;
use crate::format::FileType;
use crate::output::{Destination, deliver};
use crate::prompt::PromptKind;
use crate::source::{Source, SourceInput};
use crate::transform::{ConvertOptions, TransformService, resolve_prompt};
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Top-level arguments.
#[derive(Parser, Debug)]
#[command(
    name = "shacl-transformer",
    version,
    about = "Convert ontologies, schemas and sample data into SHACL 1.2 shapes"
)]
pub struct Cli {
    /// Anthropic API key (overrides ANTHROPIC_API_KEY).
    #[arg(long, global = true)]
    pub api_key: Option<String>,
    /// Model identifier (overrides SHACL_MODEL).
    #[arg(long, global = true)]
    pub model: Option<String>,
    /// Maximum tokens in the model response (overrides SHACL_MAX_TOKENS).
    #[arg(long, global = true, value_parser = clap::value_parser!(u32).range(1..))]
    pub max_tokens: Option<u32>,
    /// Directory with prompt template overrides (overrides SHACL_PROMPTS_DIR).
    #[arg(long, global = true)]
    pub prompts_dir: Option<PathBuf>,
    /// Print the model response as-is instead of unwrapping Markdown code fences.
    #[arg(long, global = true)]
    pub raw: bool,
    /// Operation to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Options shared by every conversion subcommand.
#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// Source file path or http(s) URL.
    pub source: String,
    /// Write the result to this file instead of standard output.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    /// Force the source type instead of detecting it.
    #[arg(short = 't', long = "type", value_name = "TYPE")]
    pub file_type: Option<FileType>,
    /// Format name used in the prompt, e.g. "JSON" or "XML".
    #[arg(short = 'f', long)]
    pub data_format: Option<String>,
}

/// Subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Detect the source type and convert it with the matching template.
    Convert(SourceArgs),
    /// Convert an OWL / RDF ontology.
    Owl(SourceArgs),
    /// Convert an XML Schema.
    Xsd(SourceArgs),
    /// Convert a JSON Schema.
    Jsonschema(SourceArgs),
    /// Upgrade SHACL 1.0/1.1 shapes to SHACL 1.2.
    Upgrade(SourceArgs),
    /// Derive shapes from sample data.
    Data {
        /// Source and output options.
        #[command(flatten)]
        source: SourceArgs,
        /// Existing SHACL schema to extend instead of starting from scratch.
        #[arg(long, value_name = "SCHEMA")]
        base_schema: Option<String>,
    },
    /// Map data onto a SHACL schema, producing RDF.
    Apply {
        /// Source and output options.
        #[command(flatten)]
        source: SourceArgs,
        /// SHACL schema the data should conform to.
        #[arg(long)]
        schema: String,
    },
    /// Generate sample RDF data from a SHACL schema.
    Generate {
        /// SHACL schema file path or URL.
        schema: String,
        /// Description of the data to generate.
        #[arg(long)]
        prompt: String,
        /// Number of instances to generate.
        #[arg(long, default_value_t = 10)]
        count: u32,
        /// Write the result to this file instead of standard output.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print the detected type and the template a conversion would use.
    Detect {
        /// Source file path or http(s) URL.
        source: String,
    },
}

impl Cli {
    /// Value given on the command line for a configuration variable.
    ///
    /// Consulted before the environment, so an unparseable environment value never blocks an
    /// explicit option.
    fn config_value(&self, key: &str) -> Option<String> {
        match key {
            "ANTHROPIC_API_KEY" => self.api_key.clone(),
            "SHACL_MODEL" => self.model.clone(),
            "SHACL_MAX_TOKENS" => self.max_tokens.map(|tokens| tokens.to_string()),
            _ => None,
        }
    }

    fn apply_prompts_dir(&self, config: &mut Config) {
        if let Some(prompts_dir) = self.prompts_dir.clone() {
            config.prompts_dir = Some(prompts_dir);
        }
    }
}

/// Execute a parsed command line.
pub async fn run(cli: Cli) -> Result<()> {
    let mut config =
        Config::load_with(|key| cli.config_value(key)).context("failed to load configuration")?;
    cli.apply_prompts_dir(&mut config);

    if let Command::Detect { source } = &cli.command {
        return detect(source).await;
    }

    let service = TransformService::from_config(&config, cli.raw)?;
    match cli.command {
        Command::Convert(args) => convert(&service, args, None).await,
        Command::Owl(args) => convert(&service, args, Some(PromptKind::Owl)).await,
        Command::Xsd(args) => convert(&service, args, Some(PromptKind::Xsd)).await,
        Command::Jsonschema(args) => convert(&service, args, Some(PromptKind::JsonSchema)).await,
        Command::Upgrade(args) => convert(&service, args, Some(PromptKind::Upgrade)).await,
        Command::Data {
            source,
            base_schema: None,
        } => convert(&service, source, Some(PromptKind::Data)).await,
        Command::Data {
            source,
            base_schema: Some(base_schema),
        } => {
            let data = load(&source.source, source.file_type).await?;
            let base = load(&base_schema, None).await?;
            let text = service
                .extend(&data, &base, &options(None, source.data_format))
                .await?;
            emit(&text, source.output)
        }
        Command::Apply { source, schema } => {
            let data = load(&source.source, source.file_type).await?;
            let schema = load(&schema, None).await?;
            let text = service
                .apply(&data, &schema, &options(None, source.data_format))
                .await?;
            emit(&text, source.output)
        }
        Command::Generate {
            schema,
            prompt,
            count,
            output,
        } => {
            let schema = load(&schema, None).await?;
            let text = service.generate(&schema, &prompt, count).await?;
            emit(&text, output)
        }
        Command::Detect { .. } => Ok(()),
    }
}

async fn convert(
    service: &TransformService,
    args: SourceArgs,
    prompt: Option<PromptKind>,
) -> Result<()> {
    let source = load(&args.source, args.file_type).await?;
    let text = service
        .convert(&source, &options(prompt, args.data_format))
        .await?;
    emit(&text, args.output)
}

async fn detect(source: &str) -> Result<()> {
    let source = load(source, None).await?;
    let kind = resolve_prompt(source.file_type(), None, source.origin())?;
    println!("{}\t{kind}", source.file_type());
    Ok(())
}

async fn load(source: &str, forced: Option<FileType>) -> Result<Source> {
    let input = SourceInput::parse(source)?;
    Source::load(&input, forced).await.map_err(Into::into)
}

fn options(prompt: Option<PromptKind>, format_label: Option<String>) -> ConvertOptions {
    ConvertOptions {
        prompt,
        format_label,
    }
}

fn emit(text: &str, output: Option<PathBuf>) -> Result<()> {
    let destination = Destination::from_option(output);
    deliver(text, &destination, &mut std::io::stdout().lock())?;
    Ok(())
}
