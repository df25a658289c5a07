use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{ExtractError, ExtractResult};
use crate::model::{pages_from_text, Page};

/// Page text for one input file, in page order.
#[derive(Debug, Clone)]
pub struct Document {
    pub path: PathBuf,
    pub pages: Vec<Page>,
}

impl Document {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn readable_pages(&self) -> usize {
        self.pages.iter().filter(|p| p.text.is_some()).count()
    }
}

/// Load a `.pdf` or `.txt` file and split it into pages at form feeds.
pub fn read_document(path: &Path) -> ExtractResult<Document> {
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    let text = match extension.as_str() {
        "pdf" => {
            let bytes = std::fs::read(path).map_err(|source| ExtractError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            pdf_extract::extract_text_from_mem(&bytes).map_err(|e| {
                ExtractError::DocumentUnreadable {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                }
            })?
        }
        "txt" => std::fs::read_to_string(path).map_err(|source| ExtractError::Io {
            path: path.to_path_buf(),
            source,
        })?,
        _ => {
            return Err(ExtractError::UnsupportedFormat {
                path: path.to_path_buf(),
                extension,
            })
        }
    };

    let document = Document {
        path: path.to_path_buf(),
        pages: pages_from_text(&text),
    };
    if document.readable_pages() == 0 {
        return Err(ExtractError::DocumentUnreadable {
            path: path.to_path_buf(),
            reason: "no page yielded any text".into(),
        });
    }
    debug!(
        file = %document.file_name(),
        pages = document.pages.len(),
        readable = document.readable_pages(),
        "document loaded"
    );
    Ok(document)
}
