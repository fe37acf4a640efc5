//! Non-recursive listing of regular files in a directory.

use std::io::{self, Write};
use std::path::Path;

/// Names of the regular files directly inside `dir`, sorted by name.
/// Subdirectories are skipped; symlinks are followed when deciding.
pub fn list_files(dir: &Path) -> io::Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry.path().is_file() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();
    Ok(names)
}

/// Write `"<index> <name>"` for each file in `dir`, indices starting at 0.
pub fn print_files<W: Write>(dir: &Path, out: &mut W) -> io::Result<()> {
    for (i, name) in list_files(dir)?.iter().enumerate() {
        writeln!(out, "{} {}", i, name)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn lists_only_regular_files() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("b.csv"), "x").unwrap();
        fs::write(dir.path().join("a.txt"), "y").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested").join("c.csv"), "z").unwrap();

        let names = list_files(dir.path()).unwrap();
        assert_eq!(names, vec!["a.txt".to_string(), "b.csv".to_string()]);
    }

    #[test]
    fn prints_zero_based_index() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("report1.csv"), "").unwrap();
        fs::write(dir.path().join("summary.txt"), "").unwrap();

        let mut out = Vec::new();
        print_files(dir.path(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "0 report1.csv\n1 summary.txt\n");
    }

    #[test]
    fn missing_directory_is_an_error() {
        let dir = TempDir::new().unwrap();
        assert!(list_files(&dir.path().join("absent")).is_err());
    }
}
