//! Loading sources from disk, HTTP, or memory and rendering them as prompt text.

use crate::format::{FileType, classify};
use calamine::{Data, Reader, open_workbook_auto_from_rs};
use chrono::NaiveTime;
use reqwest::{Client, StatusCode, Url, header::CONTENT_TYPE};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Errors raised while fetching or decoding a source.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Path did not point at an existing file.
    #[error("Input file not found: {0}")]
    NotFound(PathBuf),
    /// File existed but could not be read.
    #[error("Failed to read {path}: {source}")]
    Io {
        /// Path that failed to load.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// Stream could not be drained.
    #[error("Failed to read input stream: {0}")]
    Stream(#[source] std::io::Error),
    /// Argument looked like a URL but could not be parsed as one.
    #[error("Invalid URL {url}: {message}")]
    InvalidUrl {
        /// Argument as given.
        url: String,
        /// Parser diagnostic.
        message: String,
    },
    /// HTTP layer failed before receiving a response.
    #[error("Failed to fetch {url}: {source}")]
    Fetch {
        /// URL being fetched.
        url: String,
        /// Underlying transport error.
        #[source]
        source: reqwest::Error,
    },
    /// Remote server answered with a non-success status.
    #[error("Fetching {url} returned {status}")]
    FetchStatus {
        /// URL being fetched.
        url: String,
        /// Status returned by the server.
        status: StatusCode,
    },
    /// Workbook could not be converted to JSON.
    #[error("Failed to read spreadsheet {origin}: {message}")]
    Spreadsheet {
        /// Where the workbook came from.
        origin: String,
        /// Decoder diagnostic.
        message: String,
    },
    /// PDF text extraction failed.
    #[error("Failed to extract text from PDF {origin}: {message}")]
    Pdf {
        /// Where the document came from.
        origin: String,
        /// Extractor diagnostic.
        message: String,
    },
}

/// Where a source should be read from.
#[derive(Debug, Clone)]
pub enum SourceInput {
    /// Local file.
    Path(PathBuf),
    /// Remote document fetched with a single GET.
    Url(Url),
    /// In-memory content; the optional name is only used for extension detection.
    Bytes {
        /// File name hint, e.g. `schema.json`.
        name: Option<String>,
        /// Raw content.
        bytes: Vec<u8>,
    },
}

impl SourceInput {
    /// Interpret a command-line argument as a URL (`http://`, `https://`) or a path.
    ///
    /// An argument with a URL scheme that fails to parse is an error, not a path.
    pub fn parse(value: &str) -> Result<Self, SourceError> {
        let lowered = value.to_ascii_lowercase();
        if lowered.starts_with("http://") || lowered.starts_with("https://") {
            return Url::parse(value)
                .map(Self::Url)
                .map_err(|error| SourceError::InvalidUrl {
                    url: value.to_string(),
                    message: error.to_string(),
                });
        }
        Ok(Self::Path(PathBuf::from(value)))
    }
}

/// A loaded source: raw bytes plus the tag chosen for them.
#[derive(Debug, Clone)]
pub struct Source {
    origin: String,
    bytes: Vec<u8>,
    file_type: FileType,
}

impl Source {
    /// Load a source and tag it.
    ///
    /// When `forced` is set the tag is taken as-is; otherwise it is detected from the extension
    /// (or `Content-Type` for URLs) and refined with [`classify`].
    pub async fn load(input: &SourceInput, forced: Option<FileType>) -> Result<Self, SourceError> {
        let (origin, bytes, detected) = match input {
            SourceInput::Path(path) => read_path(path).await?,
            SourceInput::Url(url) => fetch_url(url).await?,
            SourceInput::Bytes { name, bytes } => (
                name.clone().unwrap_or_else(|| "<bytes>".to_string()),
                bytes.clone(),
                name.as_deref()
                    .map_or(FileType::Unknown, |name| FileType::from_path(Path::new(name))),
            ),
        };

        let file_type = match forced {
            Some(file_type) => file_type,
            None => classify(detected, &bytes),
        };
        tracing::debug!(
            origin = %origin,
            bytes = bytes.len(),
            detected = %detected,
            file_type = %file_type,
            forced = forced.is_some(),
            "Loaded source"
        );

        Ok(Self {
            origin,
            bytes,
            file_type,
        })
    }

    /// Drain a reader into an in-memory source.
    pub async fn from_reader<R: AsyncRead + Unpin>(
        mut reader: R,
        name: Option<String>,
        forced: Option<FileType>,
    ) -> Result<Self, SourceError> {
        let mut bytes = Vec::new();
        reader
            .read_to_end(&mut bytes)
            .await
            .map_err(SourceError::Stream)?;
        Self::load(&SourceInput::Bytes { name, bytes }, forced).await
    }

    /// Human-readable origin (path, URL, or name hint).
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Tag assigned during loading.
    pub fn file_type(&self) -> FileType {
        self.file_type
    }

    /// Raw content.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Render the content as the text that is substituted into a prompt.
    ///
    /// Workbooks become pretty-printed JSON, PDFs become their extracted text, and everything
    /// else is decoded as (lossy) UTF-8.
    pub fn text(&self) -> Result<String, SourceError> {
        match self.file_type {
            FileType::Excel => workbook_to_json(&self.origin, &self.bytes),
            FileType::Pdf => pdf_extract::extract_text_from_mem(&self.bytes).map_err(|error| {
                SourceError::Pdf {
                    origin: self.origin.clone(),
                    message: error.to_string(),
                }
            }),
            _ => Ok(String::from_utf8_lossy(&self.bytes).into_owned()),
        }
    }
}

async fn read_path(path: &Path) -> Result<(String, Vec<u8>, FileType), SourceError> {
    let bytes = tokio::fs::read(path).await.map_err(|error| {
        if error.kind() == std::io::ErrorKind::NotFound {
            SourceError::NotFound(path.to_path_buf())
        } else {
            SourceError::Io {
                path: path.to_path_buf(),
                source: error,
            }
        }
    })?;
    Ok((path.display().to_string(), bytes, FileType::from_path(path)))
}

async fn fetch_url(url: &Url) -> Result<(String, Vec<u8>, FileType), SourceError> {
    let fetch_error = |source| SourceError::Fetch {
        url: url.to_string(),
        source,
    };
    let client = Client::builder()
        .user_agent("shacl-transformer/source")
        .build()
        .map_err(fetch_error)?;

    tracing::info!(url = %url, "Fetching source");
    let response = client
        .get(url.clone())
        .send()
        .await
        .map_err(fetch_error)?;

    if !response.status().is_success() {
        return Err(SourceError::FetchStatus {
            url: url.to_string(),
            status: response.status(),
        });
    }

    let from_extension = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .map_or(FileType::Unknown, |segment| {
            FileType::from_path(Path::new(segment))
        });
    let detected = if from_extension == FileType::Unknown {
        response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map_or(FileType::Unknown, FileType::from_mime)
    } else {
        from_extension
    };

    let bytes = response.bytes().await.map_err(fetch_error)?.to_vec();
    Ok((url.to_string(), bytes, detected))
}

/// Convert every sheet of a workbook into an array of row objects keyed by the header row.
fn workbook_to_json(origin: &str, bytes: &[u8]) -> Result<String, SourceError> {
    let spreadsheet_error = |message: String| SourceError::Spreadsheet {
        origin: origin.to_string(),
        message,
    };

    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|error| spreadsheet_error(error.to_string()))?;

    let mut sheets = Map::new();
    for name in workbook.sheet_names() {
        let range = workbook
            .worksheet_range(&name)
            .map_err(|error| spreadsheet_error(error.to_string()))?;
        let mut rows = range.rows();
        let headers = rows.next().map(unique_headers).unwrap_or_default();

        let records = rows
            .map(|row| {
                let record = headers
                    .iter()
                    .enumerate()
                    .map(|(index, header)| {
                        (
                            header.clone(),
                            row.get(index).map_or(Value::Null, cell_to_json),
                        )
                    })
                    .collect::<Map<_, _>>();
                Value::Object(record)
            })
            .collect::<Vec<_>>();
        sheets.insert(name, Value::Array(records));
    }

    serde_json::to_string_pretty(&Value::Object(sheets))
        .map_err(|error| spreadsheet_error(error.to_string()))
}

/// Object keys for a header row. Blank headers become `columnN`; repeats get a `_2`, `_3`, ...
/// suffix so no column is dropped.
fn unique_headers(row: &[Data]) -> Vec<String> {
    let mut used = HashSet::new();
    row.iter()
        .enumerate()
        .map(|(index, cell)| {
            let text = cell.to_string();
            let base = match text.trim() {
                "" => format!("column{}", index + 1),
                header => header.to_string(),
            };
            let mut key = base.clone();
            let mut suffix = 1;
            while used.contains(&key) {
                suffix += 1;
                key = format!("{base}_{suffix}");
            }
            used.insert(key.clone());
            key
        })
        .collect()
}

fn cell_to_json(cell: &Data) -> Value {
    match cell {
        Data::Empty => Value::Null,
        Data::Int(value) => Value::from(*value),
        Data::Float(value) => Value::from(*value),
        Data::Bool(value) => Value::Bool(*value),
        Data::String(value) | Data::DateTimeIso(value) | Data::DurationIso(value) => {
            Value::String(value.clone())
        }
        Data::DateTime(value) if value.is_duration() => value
            .as_duration()
            .map_or(Value::Null, |duration| {
                Value::String(format!("PT{}S", duration.num_seconds()))
            }),
        Data::DateTime(value) => value.as_datetime().map_or_else(
            || Value::from(value.as_f64()),
            |datetime| {
                let text = if datetime.time() == NaiveTime::MIN {
                    datetime.date().to_string()
                } else {
                    datetime.format("%Y-%m-%dT%H:%M:%S").to_string()
                };
                Value::String(text)
            },
        ),
        other => Value::String(other.to_string()),
    }
}
