use std::path::Path;

use super::types::ReferenceDocument;
use super::StorageError;
use crate::models::ReferenceCategory;

/// Load every non-empty `.txt` file under `dir`, recursively.
///
/// A missing directory yields no documents. Unreadable files are skipped.
pub fn load_documents(
    dir: &Path,
    category: ReferenceCategory,
) -> Result<Vec<ReferenceDocument>, StorageError> {
    let mut documents = Vec::new();

    if !dir.is_dir() {
        tracing::warn!(dir = %dir.display(), "Reference directory not found");
        return Ok(documents);
    }

    let mut files = Vec::new();
    collect_txt_files(dir, &mut files)?;
    files.sort();

    for path in files {
        match std::fs::read_to_string(&path) {
            Ok(content) if !content.trim().is_empty() => {
                documents.push(ReferenceDocument {
                    content,
                    source: path.display().to_string(),
                    filename: path
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_default(),
                    category,
                });
            }
            Ok(_) => {
                tracing::debug!(path = %path.display(), "Skipping empty reference file");
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to read reference file");
            }
        }
    }

    Ok(documents)
}

fn collect_txt_files(dir: &Path, out: &mut Vec<std::path::PathBuf>) -> Result<(), StorageError> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_txt_files(&path, out)?;
        } else if path.extension().is_some_and(|ext| ext == "txt") {
            out.push(path);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_nested_txt_files_only() {
        let tmp = tempfile::tempdir().unwrap();
        let nested = tmp.path().join("blood");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(tmp.path().join("hemoglobin.txt"), "Hemoglobin carries oxygen.").unwrap();
        std::fs::write(nested.join("ferritin.txt"), "Ferritin stores iron.").unwrap();
        std::fs::write(tmp.path().join("notes.md"), "ignored").unwrap();

        let docs = load_documents(tmp.path(), ReferenceCategory::LabMarkers).unwrap();

        let mut names: Vec<&str> = docs.iter().map(|d| d.filename.as_str()).collect();
        names.sort();
        assert_eq!(names, vec!["ferritin.txt", "hemoglobin.txt"]);
        assert!(docs.iter().all(|d| d.category == ReferenceCategory::LabMarkers));
    }

    #[test]
    fn skips_whitespace_only_files() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("empty.txt"), "  \n\t").unwrap();
        let docs = load_documents(tmp.path(), ReferenceCategory::Nutrition).unwrap();
        assert!(docs.is_empty());
    }

    #[test]
    fn missing_directory_yields_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let docs = load_documents(&tmp.path().join("absent"), ReferenceCategory::Conditions).unwrap();
        assert!(docs.is_empty());
    }

    #[test]
    fn source_records_full_path() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("iron.txt");
        std::fs::write(&path, "Iron-rich foods include spinach.").unwrap();
        let docs = load_documents(tmp.path(), ReferenceCategory::Nutrition).unwrap();
        assert_eq!(docs[0].source, path.display().to_string());
    }
}
