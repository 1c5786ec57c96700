// fhir2omop-core/src/infrastructure/fs.rs

use crate::infrastructure::error::InfrastructureError;
use std::io::Write;
use std::path::Path;

/// Writes `content` next to `path` first, then renames it into place.
///
/// Readers see either the previous artifact or the new one, never a half-written
/// report, chart or session file. Missing parent directories are created.
pub fn atomic_write<P: AsRef<Path>, C: AsRef<[u8]>>(
    path: P,
    content: C,
) -> Result<(), InfrastructureError> {
    let path = path.as_ref();
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)?;

    let mut staged = tempfile::NamedTempFile::new_in(parent)?;
    staged.write_all(content.as_ref())?;
    staged
        .persist(path)
        .map_err(|e| InfrastructureError::Io(e.error))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_creates_missing_parents() -> Result<()> {
        let dir = tempdir()?;
        let target = dir.path().join("docs/charts/age.svg");

        atomic_write(&target, "<svg/>")?;

        assert_eq!(fs::read_to_string(target)?, "<svg/>");
        Ok(())
    }

    #[test]
    fn test_replaces_previous_artifact() -> Result<()> {
        let dir = tempdir()?;
        let target = dir.path().join("session.json");

        atomic_write(&target, "{}")?;
        atomic_write(&target, r#"{"resources":[]}"#)?;

        assert_eq!(fs::read_to_string(&target)?, r#"{"resources":[]}"#);
        // No staged file left behind
        assert_eq!(fs::read_dir(dir.path())?.count(), 1);
        Ok(())
    }
}
