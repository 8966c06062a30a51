//! Structured file operations and their sandboxed executor.
//!
//! Both actions are full-file replacements. Writes go through a temporary
//! sibling file that is renamed over the target, so a failed write never
//! leaves a partially written file behind.
//!
//! Containment is checked twice: lexically on the requested name, then on
//! the real directory after symlinks are resolved.

use super::error::{AgentError, AgentResult};
use super::outcome::Outcome;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Component, Path, PathBuf};
use uuid::Uuid;

/// File mutation requested by a structured command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileAction {
    CreateFile,
    ModifyFile,
}

impl FileAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileAction::CreateFile => "create_file",
            FileAction::ModifyFile => "modify_file",
        }
    }

    /// Parse an `action` field value; anything else is non-actionable.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "create_file" => Some(FileAction::CreateFile),
            "modify_file" => Some(FileAction::ModifyFile),
            _ => None,
        }
    }
}

/// A parsed structured command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileOperation {
    pub action: FileAction,
    pub filename: String,
    pub language: Option<String>,
    pub content: String,
}

/// Applies file operations below a workspace root.
#[derive(Debug, Clone)]
pub struct FileOperationExecutor {
    root: PathBuf,
    allow_absolute: bool,
}

impl FileOperationExecutor {
    /// # Arguments
    /// * `root` - Workspace root every write must stay inside.
    /// * `allow_absolute` - Rewrite absolute paths that point inside `root`
    ///   to root-relative ones instead of rejecting them.
    pub fn new(root: impl Into<PathBuf>, allow_absolute: bool) -> Self {
        Self {
            root: root.into(),
            allow_absolute,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Apply `op`, converting every failure into an error outcome.
    pub fn apply(&self, op: &FileOperation) -> Outcome {
        match self.try_apply(op) {
            Ok(_) => Outcome::FileOpSuccess {
                action: op.action,
                filename: op.filename.clone(),
                language: op.language.clone(),
            },
            Err(e) => e.into(),
        }
    }

    /// Apply `op` and return the path that was written.
    pub fn try_apply(&self, op: &FileOperation) -> AgentResult<PathBuf> {
        if op.filename.trim().is_empty() || op.content.is_empty() {
            return Err(AgentError::validation("missing 'filename' or 'content'"));
        }

        let target = self.resolve(&op.filename)?;
        let parent = target
            .parent()
            .ok_or_else(|| AgentError::filesystem("Target path has no parent directory"))?;

        let root = self.canonical_root()?;
        confine(&root, existing_ancestor(parent), &op.filename)?;
        fs::create_dir_all(parent).map_err(|e| {
            AgentError::filesystem(format!(
                "Failed to create directory {}: {}",
                parent.display(),
                e
            ))
        })?;
        confine(&root, parent, &op.filename)?;

        AtomicWrite::new(&target)?.write(&op.content)?;
        Ok(target)
    }

    /// Map a requested filename to a path inside the workspace root.
    pub fn resolve(&self, filename: &str) -> AgentResult<PathBuf> {
        let requested = Path::new(filename.trim());

        let relative = if requested.is_absolute() {
            if !self.allow_absolute {
                return Err(AgentError::sandbox(filename));
            }
            let root = self.absolute_root()?;
            requested
                .strip_prefix(&root)
                .map(Path::to_path_buf)
                .map_err(|_| AgentError::sandbox(filename))?
        } else {
            requested.to_path_buf()
        };

        let mut cleaned = PathBuf::new();
        for component in relative.components() {
            match component {
                Component::Normal(part) => cleaned.push(part),
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    return Err(AgentError::sandbox(filename));
                }
            }
        }

        if cleaned.as_os_str().is_empty() {
            return Err(AgentError::validation("missing 'filename' or 'content'"));
        }

        Ok(self.root.join(cleaned))
    }

    /// Workspace root with every symlink resolved. Created if missing.
    fn canonical_root(&self) -> AgentResult<PathBuf> {
        fs::create_dir_all(&self.root).map_err(|e| {
            AgentError::filesystem(format!(
                "Failed to create workspace root {}: {}",
                self.root.display(),
                e
            ))
        })?;
        Ok(fs::canonicalize(&self.root)?)
    }

    fn absolute_root(&self) -> AgentResult<PathBuf> {
        if self.root.is_absolute() {
            Ok(self.root.clone())
        } else {
            Ok(std::env::current_dir()?.join(&self.root))
        }
    }
}

/// Reject `dir` when, after following symlinks, it lies outside `root`.
fn confine(root: &Path, dir: &Path, filename: &str) -> AgentResult<()> {
    let resolved = fs::canonicalize(dir)?;
    if resolved.starts_with(root) {
        Ok(())
    } else {
        Err(AgentError::sandbox(filename))
    }
}

/// Deepest prefix of `path` that exists on disk (a dangling symlink counts).
fn existing_ancestor(path: &Path) -> &Path {
    path.ancestors()
        .find(|p| p.as_os_str().is_empty() || fs::symlink_metadata(p).is_ok())
        .unwrap_or(path)
}

/// Write-temp-then-rename writer for one target file.
struct AtomicWrite {
    target: PathBuf,
    temp: PathBuf,
}

impl AtomicWrite {
    fn new(target: &Path) -> AgentResult<Self> {
        let parent = target
            .parent()
            .ok_or_else(|| AgentError::filesystem("Target path has no parent directory"))?;
        let name = target
            .file_name()
            .ok_or_else(|| AgentError::filesystem("Target path has no filename"))?;
        let temp = parent.join(format!(
            ".{}.tmp.{}",
            name.to_string_lossy(),
            Uuid::new_v4()
        ));

        Ok(Self {
            target: target.to_path_buf(),
            temp,
        })
    }

    fn write(&self, content: &str) -> AgentResult<()> {
        fs::write(&self.temp, content).map_err(|e| {
            AgentError::filesystem(format!("Failed to write {}: {}", self.target.display(), e))
        })?;

        fs::rename(&self.temp, &self.target).map_err(|e| {
            AgentError::filesystem(format!(
                "Failed to commit write to {}: {}",
                self.target.display(),
                e
            ))
        })
    }
}

impl Drop for AtomicWrite {
    fn drop(&mut self) {
        if self.temp.exists() {
            let _ = fs::remove_file(&self.temp);
        }
    }
}
