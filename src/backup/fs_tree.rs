use crate::backup::result_error::result::Result;
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

/// Recursively copies the contents of `src` into `dst`, merging with whatever
/// `dst` already holds. Returns the number of file bytes copied.
pub fn copy_tree<P1: AsRef<Path>, P2: AsRef<Path>>(src: P1, dst: P2) -> Result<u64> {
    let (src, dst) = (src.as_ref(), dst.as_ref());
    fs::metadata(src)?;
    fs::create_dir_all(dst)?;

    let mut bytes = 0;
    for entry in WalkDir::new(src).follow_links(true).min_depth(1) {
        let entry = entry?;
        let target = dst.join(entry.path().strip_prefix(src)?);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else if entry.file_type().is_file() {
            bytes += copy_file(entry.path(), &target)?;
        } else {
            tracing::trace!("Skipping {:?}, not a file or directory", entry.path());
        }
    }
    Ok(bytes)
}

/// Copies one file, creating the destination's parent directories
pub fn copy_file<P1: AsRef<Path>, P2: AsRef<Path>>(src: P1, dst: P2) -> Result<u64> {
    if let Some(parent) = dst.as_ref().parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(fs::copy(src, dst)?)
}

/// Sum of file sizes under `path`; a plain file reports its own length
pub fn tree_size<P: AsRef<Path>>(path: P) -> Result<u64> {
    let mut total = 0;
    for entry in WalkDir::new(path).follow_links(true) {
        let entry = entry?;
        if entry.file_type().is_file() {
            total += entry.metadata()?.len();
        }
    }
    Ok(total)
}

pub fn top_level_count<P: AsRef<Path>>(dir: P) -> Result<usize> {
    let mut count = 0;
    for entry in fs::read_dir(dir)? {
        entry?;
        count += 1;
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_files(dir: &Path) -> std::io::Result<()> {
        fs::create_dir_all(dir.join("subdir/empty"))?;
        fs::write(dir.join("file1.txt"), "content1")?;
        fs::write(dir.join("subdir/file2.json"), "content22")?;
        Ok(())
    }

    #[test]
    fn test_copy_tree_preserves_layout_and_counts_bytes() {
        let temp_dir = TempDir::new().unwrap();
        let src = temp_dir.path().join("src");
        let dst = temp_dir.path().join("dst");
        create_test_files(&src).unwrap();

        let bytes = copy_tree(&src, &dst).unwrap();

        assert_eq!(bytes, 17);
        assert_eq!(fs::read_to_string(dst.join("file1.txt")).unwrap(), "content1");
        assert_eq!(fs::read_to_string(dst.join("subdir/file2.json")).unwrap(), "content22");
        assert!(dst.join("subdir/empty").is_dir());
    }

    #[test]
    fn test_copy_tree_merges_into_existing_destination() {
        let temp_dir = TempDir::new().unwrap();
        let src = temp_dir.path().join("src");
        let dst = temp_dir.path().join("dst");
        create_test_files(&src).unwrap();
        fs::create_dir_all(&dst).unwrap();
        fs::write(dst.join("keep.txt"), "untouched").unwrap();
        fs::write(dst.join("file1.txt"), "stale").unwrap();

        copy_tree(&src, &dst).unwrap();

        assert_eq!(fs::read_to_string(dst.join("keep.txt")).unwrap(), "untouched");
        assert_eq!(fs::read_to_string(dst.join("file1.txt")).unwrap(), "content1");
    }

    #[test]
    fn test_copy_tree_missing_source_is_error() {
        let temp_dir = TempDir::new().unwrap();
        assert!(copy_tree(temp_dir.path().join("nope"), temp_dir.path().join("dst")).is_err());
    }

    #[test]
    fn test_tree_size_and_top_level_count() {
        let temp_dir = TempDir::new().unwrap();
        create_test_files(temp_dir.path()).unwrap();

        assert_eq!(tree_size(temp_dir.path()).unwrap(), 17);
        assert_eq!(tree_size(temp_dir.path().join("file1.txt")).unwrap(), 8);
        assert_eq!(top_level_count(temp_dir.path()).unwrap(), 2);
    }
}
