use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use narrator_core::LocalItem;
use narrator_engine::{AtomicFileWriter, PersistError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("failed to read document {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("document {path:?} is not valid: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode document: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("failed to write document: {0}")]
    Write(#[from] PersistError),
}

/// The editable document whose items receive reconciled narration.
pub trait HostDocument {
    fn identity(&self) -> Option<String>;
    fn read_items(&self) -> Vec<LocalItem>;
    /// Replace the items and, when the document has none yet, adopt `identity`.
    fn apply_merged_items(
        &mut self,
        items: Vec<LocalItem>,
        identity: Option<String>,
    ) -> Result<(), DocumentError>;
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
struct DocumentFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    identity: Option<String>,
    #[serde(default)]
    items: Vec<LocalItem>,
    /// Host fields this tool does not own; written back untouched.
    #[serde(flatten)]
    extra: Map<String, Value>,
}

/// A JSON file on disk: `{"identity": "...", "items": [...]}` plus any other host fields.
#[derive(Debug)]
pub struct JsonFileDocument {
    path: PathBuf,
    file: DocumentFile,
}

impl JsonFileDocument {
    pub fn open(path: &Path) -> Result<Self, DocumentError> {
        let content = fs::read(path).map_err(|source| DocumentError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut file: DocumentFile =
            serde_json::from_slice(&content).map_err(|source| DocumentError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        for item in &mut file.items {
            item.ensure_fingerprint();
        }
        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    fn save(&self) -> Result<(), DocumentError> {
        let content = serde_json::to_vec_pretty(&self.file).map_err(DocumentError::Encode)?;
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let filename = self
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document.json".to_string());
        AtomicFileWriter::new(dir).write(&filename, content)?;
        Ok(())
    }
}

impl HostDocument for JsonFileDocument {
    fn identity(&self) -> Option<String> {
        self.file
            .identity
            .as_deref()
            .map(str::trim)
            .filter(|identity| !identity.is_empty())
            .map(str::to_string)
    }

    fn read_items(&self) -> Vec<LocalItem> {
        self.file.items.clone()
    }

    fn apply_merged_items(
        &mut self,
        items: Vec<LocalItem>,
        identity: Option<String>,
    ) -> Result<(), DocumentError> {
        self.file.items = items;
        if self.identity().is_none() {
            if let Some(identity) = identity {
                self.file.identity = Some(identity);
            }
        }
        self.save()
    }
}
