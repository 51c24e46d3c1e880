//! Source reading collaborator boundary.

use async_trait::async_trait;
use tokio::fs;
use tracing::debug;

use crate::error::Result;
use crate::types::SourceUnit;

/// Fetches raw text for a unit.
///
/// The read stage delegates here; failures surface as
/// [`Error::Io`](crate::Error::Io) recorded against the unit, never as
/// pipeline aborts.
#[async_trait]
pub trait SourceReader: Send + Sync {
    /// Fetch the full text identified by `unit`.
    async fn read(&self, unit: &SourceUnit) -> Result<String>;
}

/// Reads units as filesystem paths.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsReader;

#[async_trait]
impl SourceReader for FsReader {
    async fn read(&self, unit: &SourceUnit) -> Result<String> {
        debug!(unit = %unit, "reading source file");
        let text = fs::read_to_string(unit.as_str()).await?;
        Ok(text)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::io::Write as _;

    #[tokio::test]
    async fn reads_existing_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "public class Foo {{ }}").unwrap();

        let unit = SourceUnit::from(file.path().to_string_lossy().into_owned());
        let text = FsReader.read(&unit).await.unwrap();
        assert_eq!(text, "public class Foo { }");
    }

    #[tokio::test]
    async fn missing_file_is_an_io_error() {
        let unit = SourceUnit::from("/nonexistent/definitely/missing.cs");
        let err = FsReader.read(&unit).await.unwrap_err();
        assert_eq!(err.category(), "io");
    }
}
