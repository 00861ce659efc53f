use std::path::Path;
use walkdir::WalkDir;

use super::Document;
use crate::error::{QacurateError, Result};
use crate::jsonl;

/// Load documents from a JSON-lines file of `{"id": ..., "text": ...}` records.
pub fn load_jsonl_documents(path: &Path) -> Result<Vec<Document>> {
    jsonl::read_jsonl(path)
}

/// Discover plain-text documents under `root`.
///
/// Recursively walks the tree and loads every `.txt` / `.md` file; the
/// document id is the file stem (`Richard_Broxton_Onians.txt` ->
/// `Richard_Broxton_Onians`). Duplicate stems are rejected since ids must be
/// unique in the store.
pub fn discover_text_documents(root: &Path) -> Result<Vec<Document>> {
    let mut docs = Vec::new();
    let mut seen = std::collections::HashSet::new();

    for entry in WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        let extension = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or("")
            .to_lowercase();
        if !matches!(extension.as_str(), "txt" | "md") {
            continue;
        }

        let id = match path.file_stem().and_then(|s| s.to_str()) {
            Some(stem) => stem.to_string(),
            None => {
                log::warn!("Skipping non UTF-8 file name: {}", path.display());
                continue;
            }
        };
        if !seen.insert(id.clone()) {
            return Err(QacurateError::InvalidInput(format!(
                "duplicate document id '{}' ({})",
                id,
                path.display()
            )));
        }

        let text = std::fs::read_to_string(path).map_err(QacurateError::Io)?;
        docs.push(Document { id, text });
    }

    Ok(docs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_discover_text_documents() {
        let root = TempDir::new().unwrap();
        let sub = root.path().join("nested");
        fs::create_dir_all(&sub).unwrap();
        fs::write(root.path().join("Paris.txt"), "Paris text").unwrap();
        fs::write(sub.join("Lyon.md"), "Lyon text").unwrap();
        fs::write(root.path().join("image.png"), [0u8, 1, 2]).unwrap();

        let docs = discover_text_documents(root.path()).unwrap();
        let mut ids: Vec<_> = docs.iter().map(|d| d.id.as_str()).collect();
        ids.sort();
        assert_eq!(ids, vec!["Lyon", "Paris"]);
    }

    #[test]
    fn test_discover_rejects_duplicate_ids() {
        let root = TempDir::new().unwrap();
        let sub = root.path().join("b");
        fs::create_dir_all(&sub).unwrap();
        fs::write(root.path().join("Same.txt"), "one").unwrap();
        fs::write(sub.join("Same.md"), "two").unwrap();

        assert!(matches!(
            discover_text_documents(root.path()),
            Err(QacurateError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_load_jsonl_documents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("docs.jsonl");
        fs::write(&path, "{\"id\": \"a\", \"text\": \"alpha\"}\n\n{\"id\": \"b\", \"text\": \"beta\"}\n").unwrap();

        let docs = load_jsonl_documents(&path).unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[1], Document { id: "b".to_string(), text: "beta".to_string() });
    }
}
