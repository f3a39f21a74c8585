//! Reading and writing workspace documents on disk.

use std::fs;
use std::path::Path;

use crate::document::Document;
use crate::error::StoreError;
use crate::workspace::Workspace;

/// Write a document as pretty JSON.
///
/// Goes through a temp file + rename in the target directory so a reader
/// never sees a half written document.
pub fn save_document(path: &Path, document: &Document) -> Result<(), StoreError> {
    let json = serde_json::to_string_pretty(document)?;
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "workspace.json".to_string());
    let tmp = path.with_file_name(format!(".{file_name}.tmp"));
    fs::write(&tmp, json)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

pub fn load_document(path: &Path) -> Result<Document, StoreError> {
    let raw = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

/// Load a document and rebuild the workspace it describes.
pub fn load_workspace(path: &Path) -> Result<Workspace, StoreError> {
    Ok(load_document(path)?.into_workspace()?)
}
