//! File references
//!
//! A file argument must carry either an uploaded file (`fileid` and
//! `filename`) or a `url`. A local file that has not been uploaded yet is a
//! client-only state; the engine uploads it and rewrites the argument before
//! the command is sent.

use serde_json::{json, Map, Value};
use std::path::PathBuf;

/// Value of a `fileid` argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileArgument {
    /// File already in the project's file store
    Uploaded {
        /// Server-side file id
        file_id: String,
        /// Original file name
        file_name: String,
        /// Source URL, if the file was fetched from one
        url: Option<String>,
    },
    /// File the server fetches itself
    Url {
        /// Remote location
        url: String,
        /// Display name
        file_name: Option<String>,
    },
    /// Local file waiting to be uploaded
    Local {
        /// Path on the local file system
        path: PathBuf,
        /// Name reported to the server
        file_name: String,
    },
}

fn non_empty(map: &Map<String, Value>, key: &str) -> Option<String> {
    map.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
}

impl FileArgument {
    /// Local file, named after the last path component
    #[must_use]
    pub fn local(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self::Local { path, file_name }
    }

    /// Decode an argument value
    ///
    /// Returns `None` for values that are neither an uploaded file, a URL nor
    /// a pending local file.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        let map = value.as_object()?;

        if let (Some(file_id), Some(file_name)) = (non_empty(map, "fileid"), non_empty(map, "filename")) {
            return Some(Self::Uploaded {
                file_id,
                file_name,
                url: non_empty(map, "url"),
            });
        }
        if let Some(url) = non_empty(map, "url") {
            return Some(Self::Url {
                url,
                file_name: non_empty(map, "filename"),
            });
        }
        if let Some(path) = non_empty(map, "file") {
            let file_name = non_empty(map, "filename").unwrap_or_else(|| {
                PathBuf::from(&path)
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default()
            });
            return Some(Self::Local {
                path: PathBuf::from(path),
                file_name,
            });
        }
        None
    }

    /// Encode as an argument value
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::Uploaded {
                file_id,
                file_name,
                url,
            } => {
                let mut value = json!({"fileid": file_id, "filename": file_name});
                if let Some(url) = url {
                    value["url"] = json!(url);
                }
                value
            }
            Self::Url { url, file_name } => {
                let mut value = json!({"url": url});
                if let Some(name) = file_name {
                    value["filename"] = json!(name);
                }
                value
            }
            Self::Local { path, file_name } => {
                json!({"file": path.to_string_lossy(), "filename": file_name})
            }
        }
    }

    /// Check whether an upload is still needed
    #[inline]
    #[must_use]
    pub fn needs_upload(&self) -> bool {
        matches!(self, Self::Local { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_variants() {
        assert!(matches!(
            FileArgument::from_value(&json!({"fileid": "f1", "filename": "a.csv"})),
            Some(FileArgument::Uploaded { .. })
        ));
        assert!(matches!(
            FileArgument::from_value(&json!({"url": "http://x/a.csv"})),
            Some(FileArgument::Url { .. })
        ));
        assert!(matches!(
            FileArgument::from_value(&json!({"file": "/tmp/a.csv"})),
            Some(FileArgument::Local { .. })
        ));
    }

    #[test]
    fn neither_id_nor_url_is_rejected() {
        assert_eq!(FileArgument::from_value(&json!({"filename": "a.csv"})), None);
        assert_eq!(FileArgument::from_value(&json!({"fileid": "f1"})), None);
        assert_eq!(FileArgument::from_value(&json!({"url": "  "})), None);
        assert_eq!(FileArgument::from_value(&json!("a.csv")), None);
    }

    #[test]
    fn local_file_name_from_path() {
        let arg = FileArgument::local("/data/people.csv");
        assert!(arg.needs_upload());
        assert_eq!(arg.to_value()["filename"], json!("people.csv"));
    }
}
