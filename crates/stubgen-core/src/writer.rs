//! Artifact persistence collaborator boundary.

use std::path::Path;

use async_trait::async_trait;
use tokio::fs;
use tracing::debug;

use crate::error::Result;
use crate::types::GeneratedArtifact;

/// Persists one generated artifact.
///
/// The write stage delegates here, one call per artifact in a unit's batch.
/// A failing write is recorded against the unit; artifacts already written
/// for that unit stay on disk (no rollback) and are reported as such.
#[async_trait]
pub trait ArtifactWriter: Send + Sync {
    /// Persist `artifact` at its destination name.
    async fn write(&self, artifact: &GeneratedArtifact) -> Result<()>;
}

/// Writes artifacts as plain files, creating parent directories as needed.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsWriter;

#[async_trait]
impl ArtifactWriter for FsWriter {
    async fn write(&self, artifact: &GeneratedArtifact) -> Result<()> {
        let path = Path::new(&artifact.name);
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        fs::write(path, &artifact.content).await?;
        debug!(artifact = %artifact.name, bytes = artifact.content.len(), "artifact written");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn writes_artifact_and_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let name = dir
            .path()
            .join("nested/out/FooTest")
            .to_string_lossy()
            .into_owned();
        let artifact = GeneratedArtifact {
            name: name.clone(),
            content: "generated".to_string(),
        };

        FsWriter.write(&artifact).await.unwrap();
        assert_eq!(std::fs::read_to_string(&name).unwrap(), "generated");
    }

    #[tokio::test]
    async fn unwritable_destination_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        // A directory already occupies the destination name.
        let name = dir.path().join("FooTest").to_string_lossy().into_owned();
        std::fs::create_dir(&name).unwrap();

        let artifact = GeneratedArtifact {
            name,
            content: "generated".to_string(),
        };
        let err = FsWriter.write(&artifact).await.unwrap_err();
        assert_eq!(err.category(), "io");
    }
}
