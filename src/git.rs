#[cfg(test)]
use std::collections::HashMap;
#[cfg(test)]
use std::path::PathBuf;
use std::path::Path;
use std::process::Command;

use anyhow::{bail, Context, Result};

/// Source of the "last modified" date of a descriptor file.
pub trait CommitDates {
    /// Short ISO date (`YYYY-MM-DD`) of the last change of `path`.
    fn commit_date(&self, path: &Path) -> Result<String>;
}

/// Asks `git log` in the directory of the file, i.e. the wiki checkout.
pub struct GitCommitDates;

impl CommitDates for GitCommitDates {
    fn commit_date(&self, path: &Path) -> Result<String> {
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let file_name = path
            .file_name()
            .with_context(|| format!("{} has no file name", path.display()))?;

        let output = Command::new("git")
            .args(["log", "-1", "--format=%cd", "--date=short", "--"])
            .arg(file_name)
            .current_dir(dir)
            .output()
            .context("Failed to run git")?;

        if !output.status.success() {
            bail!(
                "git log failed for {}: {}",
                path.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        let date = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if date.is_empty() {
            bail!("{} is not tracked by git", path.display());
        }
        Ok(date)
    }
}

/// Used with `--no-git`: every file gets the empty date.
pub struct NoCommitDates;

impl CommitDates for NoCommitDates {
    fn commit_date(&self, _path: &Path) -> Result<String> {
        Ok(String::new())
    }
}

/// Fixed dates keyed by path.
#[cfg(test)]
#[derive(Default)]
pub struct StaticCommitDates {
    pub dates: HashMap<PathBuf, String>,
}

#[cfg(test)]
impl CommitDates for StaticCommitDates {
    fn commit_date(&self, path: &Path) -> Result<String> {
        match self.dates.get(path) {
            Some(date) => Ok(date.clone()),
            None => bail!("no commit date for {}", path.display()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_commit_dates_is_empty() {
        assert_eq!(NoCommitDates.commit_date(Path::new("x.yml")).unwrap(), "");
    }

    #[test]
    fn test_static_commit_dates() {
        let mut dates = StaticCommitDates::default();
        dates.dates.insert(PathBuf::from("a.yml"), "2020-02-03".to_string());
        assert_eq!(dates.commit_date(Path::new("a.yml")).unwrap(), "2020-02-03");
        assert!(dates.commit_date(Path::new("b.yml")).is_err());
    }

    #[test]
    fn test_git_outside_repository_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.yml");
        std::fs::write(&path, "codename: a\n").unwrap();
        // Either git is missing or the file is not in a repository; both are errors.
        assert!(GitCommitDates.commit_date(&path).is_err());
    }
}
