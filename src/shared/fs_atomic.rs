use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

pub fn atomic_write_file(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| std::io::Error::other("path has no parent"))?;
    fs::create_dir_all(parent)?;
    let tmp_name = format!(
        ".{}.tmp-{}-{}",
        path.file_name().and_then(|v| v.to_str()).unwrap_or("session"),
        std::process::id(),
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0),
    );
    let tmp_path = parent.join(tmp_name);

    {
        let mut file = fs::OpenOptions::new()
            .create_new(true)
            .write(true)
            .open(&tmp_path)?;
        file.write_all(content)?;
        file.sync_all()?;
    }

    if let Err(err) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(err);
    }
    Ok(())
}

/// Pretty-prints `value` and swaps it into place with [`atomic_write_file`].
pub fn atomic_write_json<T: Serialize>(path: &Path, value: &T) -> std::io::Result<()> {
    let mut body = serde_json::to_vec_pretty(value)
        .map_err(|source| std::io::Error::other(source.to_string()))?;
    body.push(b'\n');
    atomic_write_file(path, &body)
}

pub fn remove_if_exists(path: &Path) -> std::io::Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn atomic_write_creates_missing_parent_and_leaves_no_temp_files() {
        let temp = tempfile::tempdir().expect("tempdir");
        let target = temp.path().join("state/session.json");

        atomic_write_json(&target, &serde_json::json!({"ok": true})).expect("write");

        let body = fs::read_to_string(&target).expect("read");
        assert!(body.contains("\"ok\": true"));
        let leftovers = fs::read_dir(target.parent().expect("parent"))
            .expect("list")
            .filter_map(Result::ok)
            .filter(|entry| entry.file_name().to_string_lossy().contains(".tmp-"))
            .count();
        assert_eq!(leftovers, 0);
    }

    #[test]
    fn remove_if_exists_reports_missing_files() {
        let temp = tempfile::tempdir().expect("tempdir");
        let target = temp.path().join("gone.json");
        assert!(!remove_if_exists(&target).expect("remove missing"));
        fs::write(&target, b"{}").expect("seed");
        assert!(remove_if_exists(&target).expect("remove existing"));
    }
}
