use crate::Result;
use anyhow::Context;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Write a file, creating its parent directory if needed.
pub(crate) async fn write(path: impl AsRef<Path>, contents: impl AsRef<[u8]>) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            make_dir(parent).await?;
        }
    }
    tokio::fs::write(path, contents)
        .await
        .context(format!("Unable to write to {}", path.to_string_lossy()))
}

/// Read a file to a `String`.
pub(crate) async fn read(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read file at {}", path.display()))
}

/// Deserialize a JSON file into type `T`.
pub(crate) async fn deserialize<T>(path: &Path) -> Result<T>
where
    T: DeserializeOwned,
{
    let content = read(path).await?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse JSON file at {}", path.display()))
}

/// Serialize `value` as pretty JSON and write it to `path`.
pub(crate) async fn serialize<T>(path: &Path, value: &T) -> Result<()>
where
    T: Serialize + ?Sized,
{
    let json = serde_json::to_string_pretty(value)
        .with_context(|| format!("Unable to serialize data for {}", path.display()))?;
    write(path, json).await
}

/// Create a directory and all of its parents.
pub(crate) async fn make_dir(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    tokio::fs::create_dir_all(path)
        .await
        .with_context(|| format!("Unable to create directory {}", path.display()))
}

/// Whether `path` names an existing regular file. Errors other than "not found" also read as
/// `false`.
pub(crate) async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
}

/// Resolves `p` against `root` when it is relative.
pub(crate) fn resolve(root: &Path, p: impl Into<PathBuf>) -> PathBuf {
    let p = p.into();
    if p.is_absolute() {
        p
    } else {
        root.join(p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_creates_parent_dirs() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a").join("b").join("file.json");
        serialize(&path, &vec![1, 2, 3]).await.unwrap();
        let back: Vec<i32> = deserialize(&path).await.unwrap();
        assert_eq!(back, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_is_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        assert!(!is_file(&path).await);
        write(&path, "{}").await.unwrap();
        assert!(is_file(&path).await);
        assert!(!is_file(dir.path()).await);
    }

    #[test]
    fn test_resolve() {
        let root = Path::new("/home/x");
        assert_eq!(resolve(root, "key.json"), PathBuf::from("/home/x/key.json"));
        assert_eq!(resolve(root, "/etc/key.json"), PathBuf::from("/etc/key.json"));
    }
}
