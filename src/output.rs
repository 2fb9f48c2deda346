//! Result routing: a file when a destination is given, standard output otherwise.

use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while writing a result.
#[derive(Debug, Error)]
pub enum OutputError {
    /// Destination file could not be written.
    #[error("Failed to write {path}: {source}")]
    File {
        /// Destination path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// Standard output could not be written.
    #[error("Failed to write output: {0}")]
    Stdout(#[source] std::io::Error),
}

/// Where a result goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// Print to the supplied stdout writer.
    Stdout,
    /// Write to a file, printing nothing.
    File(PathBuf),
}

impl Destination {
    /// `File` when a path is given, `Stdout` otherwise.
    pub fn from_option(path: Option<PathBuf>) -> Self {
        path.map_or(Self::Stdout, Self::File)
    }
}

/// Deliver `text` to `destination`, newline-terminated.
pub fn deliver<W: Write>(
    text: &str,
    destination: &Destination,
    stdout: &mut W,
) -> Result<(), OutputError> {
    match destination {
        Destination::Stdout => {
            write_terminated(stdout, text).map_err(OutputError::Stdout)?;
            stdout.flush().map_err(OutputError::Stdout)
        }
        Destination::File(path) => {
            write_file(path, text)?;
            tracing::info!(path = %path.display(), bytes = text.len(), "Wrote result");
            Ok(())
        }
    }
}

fn write_file(path: &Path, text: &str) -> Result<(), OutputError> {
    let file_error = |source| OutputError::File {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(file_error)?;
    }
    let mut file = std::fs::File::create(path).map_err(file_error)?;
    write_terminated(&mut file, text).map_err(file_error)
}

fn write_terminated<W: Write>(writer: &mut W, text: &str) -> std::io::Result<()> {
    writer.write_all(text.as_bytes())?;
    if !text.ends_with('\n') {
        writer.write_all(b"\n")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stdout_destination_prints_result() {
        let mut stdout = Vec::new();
        deliver("ex:S a sh:NodeShape .", &Destination::Stdout, &mut stdout).expect("deliver");
        assert_eq!(stdout, b"ex:S a sh:NodeShape .\n");
    }

    #[test]
    fn file_destination_prints_nothing() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("nested").join("shapes.ttl");
        let mut stdout = Vec::new();

        deliver(
            "ex:S a sh:NodeShape .\n",
            &Destination::File(path.clone()),
            &mut stdout,
        )
        .expect("deliver");

        assert!(stdout.is_empty());
        assert_eq!(
            std::fs::read_to_string(path).expect("read"),
            "ex:S a sh:NodeShape .\n"
        );
    }

    #[test]
    fn from_option_maps_paths_to_files() {
        assert_eq!(Destination::from_option(None), Destination::Stdout);
        assert_eq!(
            Destination::from_option(Some("out.ttl".into())),
            Destination::File("out.ttl".into())
        );
    }
}
