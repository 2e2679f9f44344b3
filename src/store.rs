use std::fmt::Display;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::info;
use serde::Serialize;

use crate::answer_key::{AnswerKey, AnswerKeyError};

/// Where answer keys live between runs. The scoring pipeline never touches
/// a store; callers load a key and pass it in.
pub trait AnswerKeyStore {
    /// Names of the stored keys, sorted.
    fn list(&self) -> Result<Vec<String>, StoreError>;
    fn load(&self, name: &str) -> Result<AnswerKey, StoreError>;
    fn save(&self, name: &str, key: &AnswerKey) -> Result<(), StoreError>;
}

#[derive(Debug)]
pub enum StoreError {
    Io(PathBuf, io::Error),
    InvalidName(String),
    Key(PathBuf, AnswerKeyError),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Io(path, e) => write!(f, "{}: {}", path.display(), e),
            StoreError::InvalidName(name) => write!(
                f,
                "invalid answer key name {:?}: must be a plain file name ending in .json",
                name
            ),
            StoreError::Key(path, e) => write!(f, "{}: {}", path.display(), e),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Io(_, e) => Some(e),
            StoreError::InvalidName(_) => None,
            StoreError::Key(_, e) => Some(e),
        }
    }
}

/// Keeps each key as `<name>.json` in a single directory.
#[derive(Debug, Clone)]
pub struct DirectoryKeyStore {
    root: PathBuf,
}

impl DirectoryKeyStore {
    /// Opens the store, creating the directory if needed.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| StoreError::Io(root.clone(), e))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn key_path(&self, name: &str) -> Result<PathBuf, StoreError> {
        let is_plain_name = Path::new(name)
            .file_name()
            .map_or(false, |file_name| file_name == name);
        if !is_plain_name || !name.ends_with(".json") || name == ".json" {
            return Err(StoreError::InvalidName(name.to_string()));
        }
        Ok(self.root.join(name))
    }
}

/// Reads a key from any JSON file in the persisted shape.
pub fn load_answer_key_file(path: &Path) -> Result<AnswerKey, StoreError> {
    let json = fs::read_to_string(path).map_err(|e| StoreError::Io(path.to_path_buf(), e))?;
    AnswerKey::from_json(&json).map_err(|e| StoreError::Key(path.to_path_buf(), e))
}

impl AnswerKeyStore for DirectoryKeyStore {
    fn list(&self) -> Result<Vec<String>, StoreError> {
        let entries = fs::read_dir(&self.root).map_err(|e| StoreError::Io(self.root.clone(), e))?;
        let mut names = vec![];
        for entry in entries {
            let entry = entry.map_err(|e| StoreError::Io(self.root.clone(), e))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.ends_with(".json") && entry.path().is_file() {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    fn load(&self, name: &str) -> Result<AnswerKey, StoreError> {
        load_answer_key_file(&self.key_path(name)?)
    }

    fn save(&self, name: &str, key: &AnswerKey) -> Result<(), StoreError> {
        let path = self.key_path(name)?;
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        key.serialize(&mut serializer)
            .map_err(|e| StoreError::Key(path.clone(), AnswerKeyError::Json(e)))?;
        fs::write(&path, buf).map_err(|e| StoreError::Io(path.clone(), e))?;
        info!("saved answer key {}", path.display());
        Ok(())
    }
}
