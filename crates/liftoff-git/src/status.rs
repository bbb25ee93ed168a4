//! Repository status operations

use git2::{Status, StatusOptions};
use tracing::debug;

use crate::repository::{GitRepo, Result};

impl GitRepo {
    /// Tracked files that differ from HEAD, in the index or the working tree.
    ///
    /// Untracked and ignored files are not reported.
    pub fn uncommitted_changes(&self) -> Result<Vec<String>> {
        let repo = self.lock();
        let mut opts = StatusOptions::new();
        opts.include_untracked(false)
            .include_ignored(false)
            .renames_head_to_index(true);

        let statuses = repo.statuses(Some(&mut opts))?;
        let tracked = Status::INDEX_NEW
            | Status::INDEX_MODIFIED
            | Status::INDEX_DELETED
            | Status::INDEX_RENAMED
            | Status::INDEX_TYPECHANGE
            | Status::WT_MODIFIED
            | Status::WT_DELETED
            | Status::WT_RENAMED
            | Status::WT_TYPECHANGE;

        let mut files: Vec<String> = statuses
            .iter()
            .filter(|entry| entry.status().intersects(tracked))
            .filter_map(|entry| entry.path().map(str::to_string))
            .collect();
        files.sort();

        debug!(count = files.len(), "collected uncommitted changes");
        Ok(files)
    }

    /// Check if the working directory has no tracked changes
    pub fn is_clean(&self) -> Result<bool> {
        Ok(self.uncommitted_changes()?.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use crate::testing::setup_repo;

    #[test]
    fn test_is_clean() {
        let (_temp, repo) = setup_repo(&[("file.txt", "content")]);
        assert!(repo.is_clean().unwrap());
    }

    #[test]
    fn test_untracked_files_are_ignored() {
        let (temp, repo) = setup_repo(&[("file.txt", "content")]);
        std::fs::write(temp.path().join("LICENSE"), "MIT").unwrap();
        assert!(repo.is_clean().unwrap());
    }

    #[test]
    fn test_modified_and_deleted_files() {
        let (temp, repo) = setup_repo(&[
            ("file.txt", "content"),
            ("packages/a/package.json", "{}"),
        ]);
        std::fs::write(temp.path().join("file.txt"), "modified").unwrap();
        std::fs::remove_file(temp.path().join("packages/a/package.json")).unwrap();

        let changes = repo.uncommitted_changes().unwrap();
        assert_eq!(
            changes,
            vec!["file.txt".to_string(), "packages/a/package.json".to_string()]
        );
    }
}
