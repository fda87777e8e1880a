use std::io;
use std::path::{Path, PathBuf};

use base64::Engine as _;
use mgw_core::JobResult;
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Error, Debug)]
pub enum PackageError {
    #[error("the mp3 does not exist in the specified output folder: {}", .0.display())]
    ArtifactMissing(PathBuf),

    #[error("Failed to read and encode MP3: {0}")]
    Encode(#[from] io::Error),
}

/// What happened to the artifact after it was encoded
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cleanup {
    Removed,
    Failed(String),
}

/// An encoded artifact together with the outcome of deleting its file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackagedArtifact {
    pub payload: String,
    pub cleanup: Cleanup,
}

impl PackagedArtifact {
    pub fn into_job_result(self) -> JobResult {
        match self.cleanup {
            Cleanup::Removed => JobResult::success(self.payload),
            Cleanup::Failed(reason) => JobResult::warning(
                self.payload,
                format!("MP3 encoded successfully, but failed to delete the original file: {reason}"),
            ),
        }
    }
}

/// Read and base64-encode the artifact at `path`, then delete it.
pub fn package_artifact(path: &Path) -> Result<PackagedArtifact, PackageError> {
    package_artifact_with(path, |p| std::fs::remove_file(p))
}

/// Same as [`package_artifact`] with a caller-supplied delete step.
///
/// The file is only handed to `remove` once it has been encoded.
pub fn package_artifact_with(
    path: &Path,
    remove: impl FnOnce(&Path) -> io::Result<()>,
) -> Result<PackagedArtifact, PackageError> {
    if !path.is_file() {
        return Err(PackageError::ArtifactMissing(path.to_path_buf()));
    }

    let bytes = std::fs::read(path)?;
    let payload = base64::engine::general_purpose::STANDARD.encode(bytes);

    let cleanup = match remove(path) {
        Ok(()) => {
            info!("the mp3 was generated, converted to base64, and deleted");
            Cleanup::Removed
        }
        Err(e) => {
            warn!("Error deleting MP3 file {}: {e}", path.display());
            Cleanup::Failed(e.to_string())
        }
    };

    Ok(PackagedArtifact { payload, cleanup })
}

pub fn process_output_mp3(path: &Path) -> JobResult {
    match package_artifact(path) {
        Ok(artifact) => artifact.into_job_result(),
        Err(e) => {
            error!("Packaging {} failed: {e}", path.display());
            JobResult::error(e.to_string())
        }
    }
}
