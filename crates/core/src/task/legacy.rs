//! Import from the legacy delimited format
//!
//! One task per line, `name;deadline`. Only the last `;` separates the
//! fields, so a name containing `;` still imports.

use std::path::Path;

use tracing::warn;

use super::model::{parse_deadline, TaskDraft};
use crate::{Error, Result};

/// Parse legacy file content into drafts, skipping lines without a valid deadline
pub fn parse_legacy(content: &str) -> Vec<TaskDraft> {
    let mut drafts = Vec::new();

    for (number, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let Some((name, deadline)) = line.rsplit_once(';') else {
            warn!("Skipping legacy line {} without a deadline: {}", number + 1, line);
            continue;
        };

        if name.trim().is_empty() || parse_deadline(deadline).is_err() {
            warn!("Skipping malformed legacy line {}: {}", number + 1, line);
            continue;
        }

        drafts.push(TaskDraft::new(name.trim(), deadline.trim()));
    }

    drafts
}

/// Read a legacy file from disk
pub async fn import_legacy(path: impl AsRef<Path>) -> Result<Vec<TaskDraft>> {
    let path = path.as_ref();
    let content = tokio::fs::read_to_string(path).await.map_err(|e| {
        Error::Storage(format!("Failed to read legacy file {}: {}", path.display(), e))
    })?;
    Ok(parse_legacy(&content))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_parse_legacy_lines() {
        let drafts = parse_legacy("Pay rent;2025-01-01\n\nBuy milk;2025-01-02\n");
        assert_eq!(drafts.len(), 2);
        assert_eq!(drafts[0].name, "Pay rent");
        assert_eq!(drafts[0].deadline, "2025-01-01");
        assert_eq!(drafts[1].name, "Buy milk");
    }

    #[test]
    fn test_parse_legacy_name_with_semicolon() {
        let drafts = parse_legacy("Call Ann; then Bob;2025-03-04");
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].name, "Call Ann; then Bob");
    }

    #[test]
    fn test_parse_legacy_skips_bad_lines() {
        let drafts = parse_legacy("no deadline here\nBad date;tomorrow\n;2025-01-01\nOk;2025-01-01");
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].name, "Ok");
    }

    #[tokio::test]
    async fn test_import_legacy_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tasks.txt");
        tokio::fs::write(&path, "Water plants;2025-06-01\n").await.unwrap();

        let drafts = import_legacy(&path).await.unwrap();
        assert_eq!(drafts, vec![TaskDraft::new("Water plants", "2025-06-01")]);
    }

    #[tokio::test]
    async fn test_import_legacy_missing_file() {
        let dir = tempdir().unwrap();
        let result = import_legacy(dir.path().join("absent.txt")).await;
        assert!(matches!(result, Err(Error::Storage(_))));
    }
}
