use std::{
  fs::File,
  io::BufReader,
  path::{Path, PathBuf},
};

use anyhow::Result;
use thiserror::Error;

use super::serialized::SerializedType;

/// Source of raw provider schemas.
pub trait TypeLoader: Send + Sync {
  fn load_types(&self, provider_namespace: &str, api_version: &str) -> Result<Vec<SerializedType>>;
}

#[derive(Error, Debug)]
pub enum TypeLoadError {
  #[error("no types for `{namespace}@{api_version}` (looked at `{}`)", .path.display())]
  NotFound {
    namespace: String,
    api_version: String,
    path: PathBuf,
  },

  #[error("cannot read `{}`: {source}", .path.display())]
  Io {
    path: PathBuf,
    source: std::io::Error,
  },

  #[error("corrupt type file `{}` at `{}`: {}", .path.display(), .source.path(), .source.inner())]
  Corrupt {
    path: PathBuf,
    source: serde_path_to_error::Error<serde_json::Error>,
  },
}

pub const TYPES_FILE_NAME: &str = "types.json";

/// Reads `<root>/<namespace, lowercased>/<apiVersion>/types.json`.
pub struct DirectoryTypeLoader {
  root: PathBuf,
}

impl DirectoryTypeLoader {
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  pub fn path_for(&self, provider_namespace: &str, api_version: &str) -> PathBuf {
    self
      .root
      .join(provider_namespace.to_ascii_lowercase())
      .join(api_version)
      .join(TYPES_FILE_NAME)
  }
}

impl TypeLoader for DirectoryTypeLoader {
  fn load_types(&self, provider_namespace: &str, api_version: &str) -> Result<Vec<SerializedType>> {
    let path = self.path_for(provider_namespace, api_version);
    if !path.is_file() {
      return Err(
        TypeLoadError::NotFound {
          namespace: provider_namespace.to_string(),
          api_version: api_version.to_string(),
          path,
        }
        .into(),
      );
    }

    let file = File::open(&path).map_err(|source| TypeLoadError::Io {
      path: path.clone(),
      source,
    })?;
    let de = &mut serde_json::Deserializer::from_reader(BufReader::new(file));
    let types: Vec<SerializedType> = serde_path_to_error::deserialize(de)
      .map_err(|source| TypeLoadError::Corrupt { path: path.clone(), source })?;

    log::debug!("loaded {} node(s) from `{}`", types.len(), path.display());
    Ok(types)
  }
}
