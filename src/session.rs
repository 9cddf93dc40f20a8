use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use itertools::Itertools;
use time::OffsetDateTime;

/// Aggregated information for a single Codex CLI session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: String,
    pub created_at: Option<OffsetDateTime>,
    pub updated_at: Option<OffsetDateTime>,
    pub working_dir: String,
    pub last_action: String,
    pub file_paths: Vec<PathBuf>,
}

impl Session {
    /// Fold another fragment of the same session into this record.
    ///
    /// The earliest creation time is kept. A fragment with a strictly newer update
    /// time replaces the last action and (when non-empty) the working directory;
    /// otherwise it can only backfill a missing working directory.
    pub fn merge(&mut self, other: Session) {
        debug_assert_eq!(self.id, other.id);

        if let Some(created) = other.created_at
            && self.created_at.is_none_or(|current| created < current)
        {
            self.created_at = Some(created);
        }

        let newer = match (other.updated_at, self.updated_at) {
            (Some(theirs), Some(ours)) => theirs > ours,
            (Some(_), None) => true,
            (None, _) => false,
        };
        if newer {
            self.updated_at = other.updated_at;
            self.last_action = other.last_action;
            if !other.working_dir.is_empty() {
                self.working_dir = other.working_dir;
            }
        } else if self.working_dir.is_empty() && !other.working_dir.is_empty() {
            self.working_dir = other.working_dir;
        }

        for path in other.file_paths {
            if !self.file_paths.contains(&path) {
                self.file_paths.push(path);
            }
        }
    }

    /// Sort and de-duplicate the backing file list.
    pub fn normalize_paths(&mut self) {
        self.file_paths.sort();
        self.file_paths.dedup();
    }
}

/// A single file that could not be removed.
#[derive(Debug, thiserror::Error)]
#[error("remove {}: {source}", path.display())]
pub struct DeleteError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

/// Every removal failure seen while deleting one session.
#[derive(Debug, Default)]
pub struct DeleteErrors(pub Vec<DeleteError>);

impl DeleteErrors {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for DeleteErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.iter().join("; "))
    }
}

impl std::error::Error for DeleteErrors {}

/// Remove every file backing `session`, then prune directories left empty.
///
/// Missing files are ignored. Pruning never ascends past `root` and never removes
/// a directory outside of it.
///
/// # Errors
///
/// Returns every removal failure other than "not found". All paths are attempted
/// before returning.
pub fn delete_files(session: &Session, root: &Path) -> Result<(), DeleteErrors> {
    let mut errors = DeleteErrors::default();
    for path in &session.file_paths {
        match fs::remove_file(path) {
            Ok(()) => tracing::debug!(path = %path.display(), "removed session file"),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(source) => {
                errors.0.push(DeleteError {
                    path: path.clone(),
                    source,
                });
                continue;
            }
        }
        if let Some(parent) = path.parent() {
            prune_empty_dirs(parent, root);
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Remove `start` and its ancestors while they are empty and strictly inside `stop`.
fn prune_empty_dirs(start: &Path, stop: &Path) {
    for dir in start.ancestors() {
        if dir == stop || !dir.starts_with(stop) || dir.as_os_str().is_empty() {
            return;
        }
        if fs::remove_dir(dir).is_err() {
            return;
        }
        tracing::trace!(dir = %dir.display(), "pruned empty session directory");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::TempDir;
    use assert_fs::prelude::*;
    use color_eyre::Result;
    use time::macros::datetime;

    fn fragment(id: &str, updated: Option<OffsetDateTime>, dir: &str, action: &str) -> Session {
        Session {
            id: id.into(),
            created_at: updated,
            updated_at: updated,
            working_dir: dir.into(),
            last_action: action.into(),
            file_paths: vec![PathBuf::from(format!("/sessions/{action}.jsonl"))],
        }
    }

    #[test]
    fn newer_fragment_wins_mutable_fields() {
        let mut base = fragment("S1", Some(datetime!(2024-01-01 10:00 UTC)), "/old", "a");
        let newer = fragment("S1", Some(datetime!(2024-01-02 10:00 UTC)), "/new", "b");
        base.merge(newer);
        base.normalize_paths();

        assert_eq!(base.last_action, "b");
        assert_eq!(base.working_dir, "/new");
        assert_eq!(base.updated_at, Some(datetime!(2024-01-02 10:00 UTC)));
        assert_eq!(base.created_at, Some(datetime!(2024-01-01 10:00 UTC)));
        assert_eq!(
            base.file_paths,
            vec![
                PathBuf::from("/sessions/a.jsonl"),
                PathBuf::from("/sessions/b.jsonl")
            ]
        );
    }

    #[test]
    fn newer_fragment_with_empty_dir_keeps_existing_dir() {
        let mut base = fragment("S1", Some(datetime!(2024-01-01 10:00 UTC)), "/old", "a");
        base.merge(fragment("S1", Some(datetime!(2024-01-03 10:00 UTC)), "", "b"));
        assert_eq!(base.working_dir, "/old");
        assert_eq!(base.last_action, "b");
    }

    #[test]
    fn older_fragment_only_backfills_dir_and_created() {
        let mut base = fragment("S1", Some(datetime!(2024-01-05 10:00 UTC)), "", "a");
        base.merge(fragment("S1", Some(datetime!(2024-01-01 10:00 UTC)), "/older", "b"));
        assert_eq!(base.last_action, "a");
        assert_eq!(base.working_dir, "/older");
        assert_eq!(base.created_at, Some(datetime!(2024-01-01 10:00 UTC)));
        assert_eq!(base.updated_at, Some(datetime!(2024-01-05 10:00 UTC)));
    }

    #[test]
    fn merge_does_not_duplicate_paths() {
        let mut base = fragment("S1", None, "", "a");
        base.merge(fragment("S1", None, "", "a"));
        assert_eq!(base.file_paths.len(), 1);
    }

    #[test]
    fn delete_prunes_empty_subdirectories_but_keeps_root() -> Result<()> {
        let temp = TempDir::new()?;
        let root = temp.child("sessions");
        let file = root.child("2024/05/01/rollout.jsonl");
        file.write_str("{}\n")?;

        let mut session = fragment("S1", None, "", "x");
        session.file_paths = vec![file.path().to_path_buf()];
        delete_files(&session, root.path())?;

        file.assert(predicates::path::missing());
        root.child("2024").assert(predicates::path::missing());
        root.assert(predicates::path::is_dir());
        Ok(())
    }

    #[test]
    fn delete_stops_at_non_empty_directory() -> Result<()> {
        let temp = TempDir::new()?;
        let root = temp.child("sessions");
        let doomed = root.child("2024/05/01/a.jsonl");
        let survivor = root.child("2024/05/b.jsonl");
        doomed.write_str("{}\n")?;
        survivor.write_str("{}\n")?;

        let mut session = fragment("S1", None, "", "x");
        session.file_paths = vec![doomed.path().to_path_buf()];
        delete_files(&session, root.path())?;

        root.child("2024/05/01").assert(predicates::path::missing());
        survivor.assert(predicates::path::is_file());
        Ok(())
    }

    #[test]
    fn delete_ignores_missing_files() -> Result<()> {
        let temp = TempDir::new()?;
        let mut session = fragment("S1", None, "", "x");
        session.file_paths = vec![temp.path().join("gone.jsonl")];
        delete_files(&session, temp.path())?;
        temp.assert(predicates::path::is_dir());
        Ok(())
    }

    #[test]
    fn delete_never_prunes_outside_root() -> Result<()> {
        let temp = TempDir::new()?;
        let outside = temp.child("elsewhere/x.jsonl");
        outside.write_str("{}\n")?;
        let root = temp.child("sessions");
        root.create_dir_all()?;

        let mut session = fragment("S1", None, "", "x");
        session.file_paths = vec![outside.path().to_path_buf()];
        delete_files(&session, root.path())?;

        outside.assert(predicates::path::missing());
        temp.child("elsewhere").assert(predicates::path::is_dir());
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn delete_collects_failures_and_keeps_going() -> Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new()?;
        let locked_dir = temp.child("locked");
        let locked = locked_dir.child("a.jsonl");
        locked.write_str("{}\n")?;
        let open = temp.child("open/b.jsonl");
        open.write_str("{}\n")?;
        fs::set_permissions(locked_dir.path(), fs::Permissions::from_mode(0o555))?;

        let mut session = fragment("S1", None, "", "x");
        session.file_paths = vec![locked.path().to_path_buf(), open.path().to_path_buf()];
        let result = delete_files(&session, temp.path());

        fs::set_permissions(locked_dir.path(), fs::Permissions::from_mode(0o755))?;
        open.assert(predicates::path::missing());
        if locked.path().exists() {
            let errors = result.expect_err("locked file should fail to delete");
            assert_eq!(errors.0.len(), 1);
            assert!(errors.to_string().contains("a.jsonl"));
        }
        Ok(())
    }
}
