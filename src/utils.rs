use chrono::NaiveDate;
use std::io;
use std::path::{Path, PathBuf};

const CACHE_DIR_NAME: &str = "geopulse_cache";

/// Resolves the default directory used for persisted diagnostics (the error
/// log), under the platform cache directory.
pub fn get_cache_dir() -> io::Result<PathBuf> {
    dirs::cache_dir()
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                "could not determine system cache directory",
            )
        })
        .map(|p| p.join(CACHE_DIR_NAME))
}

pub fn ensure_cache_dir_exists(path: &Path) -> io::Result<()> {
    match std::fs::metadata(path) {
        Ok(metadata) => {
            if !metadata.is_dir() {
                return Err(io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    format!("cache path exists but is not a directory: {}", path.display()),
                ));
            }
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => std::fs::create_dir_all(path),
        Err(e) => Err(e),
    }
}

/// The `YYYY-MM-DD` string a date is cached and exported under.
pub fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_key_is_iso_day() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 9).unwrap();
        assert_eq!(date_key(date), "2024-01-09");
    }

    #[test]
    fn ensure_cache_dir_creates_missing_directories() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        ensure_cache_dir_exists(&nested).unwrap();
        assert!(nested.is_dir());
        // Second call on an existing directory is a no-op.
        ensure_cache_dir_exists(&nested).unwrap();
    }

    #[test]
    fn ensure_cache_dir_rejects_files() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("not_a_dir");
        std::fs::write(&file, b"x").unwrap();
        assert!(ensure_cache_dir_exists(&file).is_err());
    }
}
