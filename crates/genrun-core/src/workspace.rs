//! Workspace materialization for extracted files.
//!
//! Classifies each extracted file as a runnable entry point or a shared
//! dependency and writes it into the per-request working directory. The
//! directory is exclusive to one generation request; no locking is done
//! here, so concurrent requests must use distinct directories.

use std::fs;
use std::path::{Path, PathBuf};

use crate::core_types::Language;
use crate::errors::AgentError;

/// Result of writing an extracted file set: disjoint ordered lists of
/// entry files and dependency files, as absolute host paths.
#[derive(Debug, Clone, Default)]
pub struct ClassifiedFiles {
    pub entry_files: Vec<PathBuf>,
    pub dependency_files: Vec<PathBuf>,
}

/// Write extracted files under `work_dir` and classify them.
///
/// Python has no namespace concept: every file lands at the root and is
/// an entry file. For Go, the first `package` declaration decides: the
/// `main` package (or no declaration at all) means an entry file at the
/// root, anything else a dependency file under `<work_dir>/<package>/`.
///
/// A write failure aborts immediately; files already written stay in
/// place, so callers must treat partial writes as possible on error.
pub fn write_files(
    files: &[(String, String)],
    work_dir: &Path,
    language: Language,
) -> Result<ClassifiedFiles, AgentError> {
    let mut classified = ClassifiedFiles::default();

    for (name, code) in files {
        if language != Language::Go {
            let path = work_dir.join(name);
            fs::write(&path, code)?;
            classified.entry_files.push(path);
            continue;
        }

        let pkg = declared_package(code, language);
        if pkg == language.entry_namespace() {
            let path = work_dir.join(name);
            fs::write(&path, code)?;
            classified.entry_files.push(path);
        } else {
            let dir = work_dir.join(&pkg);
            fs::create_dir_all(&dir)?;
            let path = dir.join(name);
            fs::write(&path, code)?;
            classified.dependency_files.push(path);
        }
    }

    Ok(classified)
}

/// First line starting with `package ` names the namespace; a file with
/// no declaration defaults to the entry namespace.
fn declared_package(code: &str, language: Language) -> String {
    for line in code.lines() {
        if let Some(rest) = line.strip_prefix("package ") {
            return rest.trim().to_string();
        }
    }
    language.entry_namespace().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_go_files_split_into_entry_and_dependency() {
        let dir = tempfile::tempdir().unwrap();
        let files = vec![
            (
                "main.go".to_string(),
                "package main\n\nfunc main() {}".to_string(),
            ),
            (
                "main2.go".to_string(),
                "package util\n\nfunc Add(a, b int) int { return a + b }".to_string(),
            ),
        ];

        let classified = write_files(&files, dir.path(), Language::Go).unwrap();

        assert_eq!(classified.entry_files, vec![dir.path().join("main.go")]);
        assert_eq!(
            classified.dependency_files,
            vec![dir.path().join("util").join("main2.go")]
        );
    }

    #[test]
    fn test_written_contents_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let files = vec![
            (
                "main.go".to_string(),
                "package main\n\nfunc main() {}".to_string(),
            ),
            ("main2.go".to_string(), "package util\n\nvar X = 1".to_string()),
        ];

        let classified = write_files(&files, dir.path(), Language::Go).unwrap();

        for (path, expected) in classified
            .entry_files
            .iter()
            .chain(classified.dependency_files.iter())
            .zip(files.iter().map(|(_, code)| code))
        {
            assert_eq!(&fs::read_to_string(path).unwrap(), expected);
        }
    }

    #[test]
    fn test_python_files_are_all_entries_at_the_root() {
        let dir = tempfile::tempdir().unwrap();
        let files = vec![
            ("main.py".to_string(), "print('a')".to_string()),
            ("main2.py".to_string(), "print('b')".to_string()),
        ];

        let classified = write_files(&files, dir.path(), Language::Python).unwrap();

        assert_eq!(
            classified.entry_files,
            vec![dir.path().join("main.py"), dir.path().join("main2.py")]
        );
        assert!(classified.dependency_files.is_empty());
    }

    #[test]
    fn test_go_file_without_package_declaration_is_an_entry() {
        let dir = tempfile::tempdir().unwrap();
        let files = vec![("main.go".to_string(), "func main() {}".to_string())];

        let classified = write_files(&files, dir.path(), Language::Go).unwrap();
        assert_eq!(classified.entry_files.len(), 1);
        assert!(classified.dependency_files.is_empty());
    }

    #[test]
    fn test_write_failure_surfaces_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("does-not-exist");
        let files = vec![("main.py".to_string(), "print('a')".to_string())];

        assert!(write_files(&files, &missing, Language::Python).is_err());
    }
}
