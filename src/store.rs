// TL;DR Studio - Artifact Store
//
// Filesystem-backed namespaces for everything the pipeline produces. Each
// artifact kind maps to one directory under the data root; stages consume
// "the latest matching file" of a kind, so multiple runs may overwrite or
// accumulate and resolution always picks the most recently modified match.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;
use walkdir::WalkDir;

use crate::error::StageError;

/// The typed namespaces of the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    Script,
    Audio,
    Transcript,
    ImageSet,
    Metadata,
    Video,
}

impl ArtifactKind {
    /// Directory under the data root that holds this kind. Metadata and the
    /// final video share the `final/` namespace.
    pub fn namespace(self) -> &'static str {
        match self {
            ArtifactKind::Script => "inputs",
            ArtifactKind::Audio => "audio",
            ArtifactKind::Transcript => "transcripts",
            ArtifactKind::ImageSet => "images",
            ArtifactKind::Metadata | ArtifactKind::Video => "final",
        }
    }

    /// Filename pattern the executor uses when resolving this kind as a
    /// stage input.
    pub fn default_pattern(self) -> &'static str {
        match self {
            ArtifactKind::Script => "*.txt",
            ArtifactKind::Audio => "*.mp3",
            ArtifactKind::Transcript => "*.csv",
            ArtifactKind::ImageSet => "images.zip",
            ArtifactKind::Metadata => "title.txt",
            ArtifactKind::Video => "*.mp4",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ArtifactKind::Script => "script",
            ArtifactKind::Audio => "audio",
            ArtifactKind::Transcript => "transcript",
            ArtifactKind::ImageSet => "image set",
            ArtifactKind::Metadata => "metadata",
            ArtifactKind::Video => "video",
        };
        f.write_str(name)
    }
}

/// A named, typed, persisted unit of pipeline output.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub kind: ArtifactKind,
    pub location: PathBuf,
    pub created_at: SystemTime,
}

/// Maps artifact kinds to directories and owns artifact lifecycle. Stages
/// write through `persist`; the executor reads through `resolve_latest`.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn dir(&self, kind: ArtifactKind) -> PathBuf {
        self.root.join(kind.namespace())
    }

    /// Create the namespace directory for `kind` if absent and return it.
    pub fn ensure_dir(&self, kind: ArtifactKind) -> Result<PathBuf, StageError> {
        let dir = self.dir(kind);
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// The most recently modified artifact of `kind` whose file name matches
    /// `pattern`, or `NotFound` if the namespace is empty or nothing matches.
    pub fn resolve_latest(
        &self,
        kind: ArtifactKind,
        pattern: &str,
    ) -> Result<Artifact, StageError> {
        let dir = self.dir(kind);
        if !dir.is_dir() {
            return Err(StageError::NotFound(kind));
        }
        let mut matches: Vec<(SystemTime, PathBuf)> = WalkDir::new(&dir)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| name_matches(&e.file_name().to_string_lossy(), pattern))
            .map(|e| {
                let mtime = e
                    .metadata()
                    .ok()
                    .and_then(|m| m.modified().ok())
                    .unwrap_or(UNIX_EPOCH);
                (mtime, e.into_path())
            })
            .collect();
        matches.sort_by(|a, b| b.0.cmp(&a.0));
        match matches.into_iter().next() {
            Some((created_at, location)) => Ok(Artifact {
                kind,
                location,
                created_at,
            }),
            None => Err(StageError::NotFound(kind)),
        }
    }

    /// Write `bytes` as `name` under the kind's namespace, creating the
    /// directory if needed. Overwrites any existing file of the same name.
    pub fn persist(
        &self,
        kind: ArtifactKind,
        name: &str,
        bytes: &[u8],
    ) -> Result<Artifact, StageError> {
        let dir = self.ensure_dir(kind)?;
        let location = dir.join(name);
        fs::write(&location, bytes)?;
        let created_at = fs::metadata(&location)?.modified()?;
        debug!("[STORE] persisted {} -> {:?}", kind, location);
        Ok(Artifact {
            kind,
            location,
            created_at,
        })
    }

    /// Register a file that an external tool (ffmpeg) wrote directly into a
    /// namespace, so it is tracked like any persisted artifact.
    pub fn adopt(&self, kind: ArtifactKind, name: &str) -> Result<Artifact, StageError> {
        let location = self.dir(kind).join(name);
        if !location.is_file() {
            return Err(StageError::NotFound(kind));
        }
        let created_at = fs::metadata(&location)?.modified()?;
        Ok(Artifact {
            kind,
            location,
            created_at,
        })
    }
}

/// Minimal glob: a single `*` wildcard at the start or end of the pattern.
fn name_matches(name: &str, pattern: &str) -> bool {
    if pattern == "*" {
        return true;
    }
    if let Some(suffix) = pattern.strip_prefix('*') {
        return name.ends_with(suffix);
    }
    if let Some(prefix) = pattern.strip_suffix('*') {
        return name.starts_with(prefix);
    }
    name == pattern
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_name_matching() {
        assert!(name_matches("my-idea.txt", "*.txt"));
        assert!(name_matches("scene_003.png", "scene_*"));
        assert!(name_matches("images.zip", "images.zip"));
        assert!(!name_matches("cover.png", "*.txt"));
        assert!(name_matches("anything", "*"));
    }

    #[test]
    fn test_empty_namespace_is_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(tmp.path());
        let err = store
            .resolve_latest(ArtifactKind::Script, "*.txt")
            .unwrap_err();
        assert!(matches!(err, StageError::NotFound(ArtifactKind::Script)));
    }

    #[test]
    fn test_latest_wins() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(tmp.path());
        store
            .persist(ArtifactKind::Script, "first.txt", b"one")
            .unwrap();
        // Ensure a distinct mtime on coarse-resolution filesystems.
        std::thread::sleep(Duration::from_millis(20));
        store
            .persist(ArtifactKind::Script, "second.txt", b"two")
            .unwrap();

        let latest = store.resolve_latest(ArtifactKind::Script, "*.txt").unwrap();
        assert!(latest.location.ends_with("second.txt"));
    }

    #[test]
    fn test_persist_overwrites_same_name() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(tmp.path());
        store
            .persist(ArtifactKind::Audio, "tts_output.mp3", b"take one")
            .unwrap();
        let again = store
            .persist(ArtifactKind::Audio, "tts_output.mp3", b"take two")
            .unwrap();

        assert_eq!(fs::read(&again.location).unwrap(), b"take two");
        let entries = fs::read_dir(store.dir(ArtifactKind::Audio)).unwrap().count();
        assert_eq!(entries, 1, "re-running must overwrite, not accumulate");
    }
}
