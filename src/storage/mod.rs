use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use thiserror::Error;

const DEFAULT_TEMP_PREFIX: &str = "artifact_";
const DEFAULT_FALLBACK_TEMP_DIR: &str = "/tmp/scorecap";
const RUNTIME_SUBDIR: &str = "scorecap";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("no download directory configured and HOME is not set")]
    MissingDownloadDirectory,
    #[error("artifact is empty")]
    EmptyArtifact,
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;

#[derive(Debug, Default, Clone)]
pub struct PruneReport {
    pub removed_files: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    /// PDF returned directly by an extraction run.
    ScorePdf,
    /// PDF assembled from a reviewed inspection session.
    FinalPdf,
    /// Single preview frame.
    Frame,
}

impl ArtifactKind {
    pub const fn download_name(self) -> &'static str {
        match self {
            Self::ScorePdf => "sheet_music_score.pdf",
            Self::FinalPdf => "final_score.pdf",
            Self::Frame => "frame.jpg",
        }
    }

    const fn extension(self) -> &'static str {
        match self {
            Self::ScorePdf | Self::FinalPdf => "pdf",
            Self::Frame => "jpg",
        }
    }
}

/// Downloaded payload kept in the runtime temp directory until released.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub id: String,
    pub kind: ArtifactKind,
    pub temp_path: PathBuf,
}

pub trait ArtifactStore {
    fn stage(&self, kind: ArtifactKind, bytes: &[u8]) -> StorageResult<Artifact>;
    fn save(&self, artifact: &Artifact) -> StorageResult<PathBuf>;
    fn discard(&self, artifact: &Artifact) -> StorageResult<()>;
}

#[derive(Debug, Clone)]
pub struct StorageService {
    temp_dir: PathBuf,
    download_dir: PathBuf,
}

impl StorageService {
    pub const fn with_paths(temp_dir: PathBuf, download_dir: PathBuf) -> Self {
        Self {
            temp_dir,
            download_dir,
        }
    }

    pub fn with_default_paths(download_dir: Option<PathBuf>) -> StorageResult<Self> {
        let download_dir = download_dir.ok_or(StorageError::MissingDownloadDirectory)?;
        let temp_dir = default_runtime_temp_dir();

        fs::create_dir_all(&temp_dir)?;
        fs::create_dir_all(&download_dir)?;

        Ok(Self::with_paths(temp_dir, download_dir))
    }

    pub fn temp_dir(&self) -> &Path {
        &self.temp_dir
    }

    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }

    pub fn temp_path_for(&self, id: &str, kind: ArtifactKind) -> PathBuf {
        let mut path = self.temp_dir.clone();
        path.push(format!("{DEFAULT_TEMP_PREFIX}{id}.{}", kind.extension()));
        path
    }

    pub fn target_path_for(&self, kind: ArtifactKind) -> PathBuf {
        self.download_dir.join(kind.download_name())
    }

    pub fn stage(&self, kind: ArtifactKind, bytes: &[u8]) -> StorageResult<Artifact> {
        if bytes.is_empty() {
            return Err(StorageError::EmptyArtifact);
        }
        fs::create_dir_all(&self.temp_dir)?;
        let id = next_artifact_id();
        let temp_path = self.temp_path_for(&id, kind);
        fs::write(&temp_path, bytes)?;
        tracing::debug!(%id, ?kind, path = %temp_path.display(), "staged artifact");
        Ok(Artifact {
            id,
            kind,
            temp_path,
        })
    }

    pub fn save(&self, artifact: &Artifact) -> StorageResult<PathBuf> {
        let target = self.target_path_for(artifact.kind);
        save_overwrite(&artifact.temp_path, &target)?;
        tracing::info!(path = %target.display(), "saved artifact");
        Ok(target)
    }

    pub fn discard(&self, artifact: &Artifact) -> StorageResult<()> {
        match fs::remove_file(&artifact.temp_path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(StorageError::Io(err)),
        }
    }

    pub fn prune_stale_temp_files(&self, max_age_hours: u64) -> StorageResult<PruneReport> {
        let now = SystemTime::now();
        let mut report = PruneReport::default();
        let max_age = Duration::from_secs(max_age_hours.saturating_mul(60 * 60));

        if !self.temp_dir.exists() {
            return Ok(report);
        }

        for entry in fs::read_dir(&self.temp_dir)? {
            let entry = entry?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }

            if path
                .file_name()
                .and_then(|name| name.to_str())
                .is_none_or(|name| !name.starts_with(DEFAULT_TEMP_PREFIX))
            {
                continue;
            }

            let modified = fs::metadata(&path)?.modified()?;
            let age = now.duration_since(modified).unwrap_or(Duration::ZERO);

            if age > max_age {
                match fs::remove_file(&path) {
                    Ok(()) => {
                        report.removed_files += 1;
                    }
                    Err(err) => {
                        tracing::warn!(
                            path = %path.display(),
                            ?err,
                            "failed to remove stale artifact file"
                        );
                    }
                }
            }
        }

        Ok(report)
    }
}

impl ArtifactStore for StorageService {
    fn stage(&self, kind: ArtifactKind, bytes: &[u8]) -> StorageResult<Artifact> {
        self.stage(kind, bytes)
    }

    fn save(&self, artifact: &Artifact) -> StorageResult<PathBuf> {
        self.save(artifact)
    }

    fn discard(&self, artifact: &Artifact) -> StorageResult<()> {
        self.discard(artifact)
    }
}

fn next_artifact_id() -> String {
    static SEQUENCE: AtomicU64 = AtomicU64::new(0);
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos())
        .unwrap_or_default();
    let sequence = SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!("{nanos}-{sequence}")
}

fn save_overwrite<S: AsRef<Path>, D: AsRef<Path>>(source: S, destination: D) -> StorageResult<()> {
    let source = source.as_ref();
    let destination = destination.as_ref();

    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent)?;
    }

    let _ = fs::remove_file(destination);
    fs::copy(source, destination)?;
    Ok(())
}

fn default_runtime_temp_dir() -> PathBuf {
    std::env::var("XDG_RUNTIME_DIR")
        .map(|dir| PathBuf::from(dir).join(RUNTIME_SUBDIR))
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_FALLBACK_TEMP_DIR))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(root: &Path) -> StorageService {
        StorageService::with_paths(root.join("runtime"), root.join("Downloads"))
    }

    #[test]
    fn target_path_uses_fixed_download_name() {
        let service =
            StorageService::with_paths(PathBuf::from("/tmp"), PathBuf::from("/home/test/Downloads"));
        assert_eq!(
            service.target_path_for(ArtifactKind::ScorePdf),
            PathBuf::from("/home/test/Downloads/sheet_music_score.pdf")
        );
        assert_eq!(
            service.target_path_for(ArtifactKind::FinalPdf),
            PathBuf::from("/home/test/Downloads/final_score.pdf")
        );
    }

    #[test]
    fn stage_save_and_discard_keeps_saved_output() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let service = service(dir.path());

        let artifact = service
            .stage(ArtifactKind::ScorePdf, b"%PDF-1.4")
            .expect("stage should write temp file");
        assert!(artifact.temp_path.exists());

        let saved = service.save(&artifact).expect("save should copy artifact");
        service.discard(&artifact).expect("discard should remove temp file");
        assert!(!artifact.temp_path.exists());
        assert_eq!(std::fs::read(saved).expect("saved file"), b"%PDF-1.4");

        service
            .discard(&artifact)
            .expect("discarding twice is not an error");
    }

    #[test]
    fn save_overwrites_previous_download() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let service = service(dir.path());

        let first = service.stage(ArtifactKind::FinalPdf, b"first").expect("stage");
        let second = service.stage(ArtifactKind::FinalPdf, b"second").expect("stage");
        assert_ne!(first.id, second.id);

        service.save(&first).expect("save first");
        let target = service.save(&second).expect("save second");
        assert_eq!(std::fs::read(target).expect("saved file"), b"second");
    }

    #[test]
    fn stage_rejects_empty_payload() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        assert!(matches!(
            service(dir.path()).stage(ArtifactKind::ScorePdf, b""),
            Err(StorageError::EmptyArtifact)
        ));
    }

    #[test]
    fn prune_removes_only_stale_artifact_files() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let service = service(dir.path());
        let stale = service.stage(ArtifactKind::Frame, b"jpg").expect("stage");
        let fresh = service.stage(ArtifactKind::ScorePdf, b"pdf").expect("stage");
        let unrelated = service.temp_dir().join("keep.txt");
        std::fs::write(&unrelated, b"x").expect("write");

        let two_hours_ago = SystemTime::now() - Duration::from_secs(2 * 60 * 60);
        for path in [&stale.temp_path, &unrelated] {
            std::fs::File::options()
                .write(true)
                .open(path)
                .and_then(|file| file.set_modified(two_hours_ago))
                .expect("back-date mtime");
        }

        let report = service.prune_stale_temp_files(1).expect("prune");
        assert_eq!(report.removed_files, 1);
        assert!(!stale.temp_path.exists());
        assert!(fresh.temp_path.exists());
        assert!(unrelated.exists());
    }
}
