//! Native module manifest (`module.yaml`)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::application::errors::ModuleError;

/// Module metadata
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ModuleManifest {
    /// Module name (required)
    pub name: String,

    /// Module version (required)
    pub version: String,

    pub description: Option<String>,

    pub author: Option<String>,

    /// Path to the shared library, relative to the module directory
    pub library: Option<PathBuf>,
}

impl ModuleManifest {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ModuleError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ModuleError::Internal(format!("Failed to read manifest {}: {}", path.display(), e))
        })?;

        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ModuleError> {
        serde_yaml::from_str(content)
            .map_err(|e| ModuleError::Internal(format!("Failed to parse manifest: {}", e)))
    }

    /// Library path inside `dir`, defaulting to the platform name for `lib<name>`
    pub fn library_path(&self, dir: &Path) -> PathBuf {
        match &self.library {
            Some(lib) => dir.join(lib),
            None => dir.join(libloading::library_filename(&self.name)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_manifest() {
        let manifest = ModuleManifest::from_yaml("name: weather\nversion: 0.2.0\nlibrary: libweather.so\n").unwrap();
        assert_eq!(manifest.name, "weather");
        assert_eq!(manifest.version, "0.2.0");
        assert!(manifest.description.is_none());
        assert_eq!(
            manifest.library_path(Path::new("/mods/weather")),
            PathBuf::from("/mods/weather/libweather.so")
        );
    }

    #[test]
    fn test_default_library_name() {
        let manifest = ModuleManifest::from_yaml("name: weather\nversion: 1.0.0\n").unwrap();
        let path = manifest.library_path(Path::new("/mods/weather"));
        assert!(path.to_string_lossy().contains("weather"));
        assert!(path.starts_with("/mods/weather"));
    }

    #[test]
    fn test_missing_version_is_rejected() {
        assert!(ModuleManifest::from_yaml("name: weather\n").is_err());
    }
}
