use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crate::error::LoopError;

/// File name of the default font inside the resource directory
pub const DEFAULT_FONT: &str = "font.ttf";

/// File name of the background music inside the resource directory
pub const BACKGROUND_MUSIC: &str = "bgMusic.ogg";

/// In-memory copy of the resource directory, keyed by file name
#[derive(Debug, Clone, Default)]
pub struct Resources {
    files: HashMap<String, Arc<[u8]>>,
}

impl Resources {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read every regular file directly inside `dir`
    pub fn load_dir(dir: &Path) -> Result<Self, LoopError> {
        let io_err = |source| LoopError::Io {
            path: dir.to_path_buf(),
            source,
        };

        let mut resources = Self::new();
        for entry in std::fs::read_dir(dir).map_err(io_err)? {
            let entry = entry.map_err(io_err)?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let data = std::fs::read(&path).map_err(|source| LoopError::Io {
                path: path.clone(),
                source,
            })?;
            log::debug!("loaded resource {name} ({} bytes)", data.len());
            resources.files.insert(name.to_string(), data.into());
        }

        log::info!("loaded {} resources from {}", resources.len(), dir.display());
        Ok(resources)
    }

    /// Add a file from memory (builder style)
    pub fn with_file(mut self, name: impl Into<String>, data: impl Into<Arc<[u8]>>) -> Self {
        self.files.insert(name.into(), data.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<[u8]>> {
        self.files.get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn clear(&mut self) {
        self.files.clear();
    }
}

/// Font file handed to the text renderer. Rasterization happens elsewhere;
/// this only guarantees a TrueType/OpenType container is present.
#[derive(Debug, Clone)]
pub struct FontFace {
    name: String,
    data: Arc<[u8]>,
}

impl FontFace {
    const MAGICS: [[u8; 4]; 4] = [*b"\x00\x01\x00\x00", *b"OTTO", *b"true", *b"ttcf"];

    pub fn from_bytes(name: impl Into<String>, data: Arc<[u8]>) -> Result<Self, LoopError> {
        let name = name.into();
        let valid = data
            .get(..4)
            .is_some_and(|magic| Self::MAGICS.iter().any(|m| m == magic));
        if !valid {
            return Err(LoopError::InvalidFont(name));
        }
        Ok(Self { name, data })
    }

    /// Default font from the resource set; its absence is fatal
    pub fn from_resources(resources: &Resources, name: &str) -> Result<Self, LoopError> {
        let data = resources
            .get(name)
            .ok_or_else(|| LoopError::MissingFont(name.to_string()))?;
        Self::from_bytes(name, data)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ttf_bytes() -> Vec<u8> {
        let mut data = vec![0x00, 0x01, 0x00, 0x00];
        data.extend_from_slice(&[0u8; 28]);
        data
    }

    #[test]
    fn test_font_from_resources() {
        let resources = Resources::new().with_file(DEFAULT_FONT, ttf_bytes());
        let font = FontFace::from_resources(&resources, DEFAULT_FONT).unwrap();
        assert_eq!(font.name(), DEFAULT_FONT);
        assert_eq!(font.data().len(), 32);
    }

    #[test]
    fn test_missing_font_is_fatal() {
        let resources = Resources::new();
        assert!(matches!(
            FontFace::from_resources(&resources, DEFAULT_FONT),
            Err(LoopError::MissingFont(_))
        ));
    }

    #[test]
    fn test_garbage_font_rejected() {
        let resources = Resources::new().with_file(DEFAULT_FONT, b"<html>".to_vec());
        assert!(matches!(
            FontFace::from_resources(&resources, DEFAULT_FONT),
            Err(LoopError::InvalidFont(_))
        ));

        let resources = Resources::new().with_file(DEFAULT_FONT, vec![0u8; 2]);
        assert!(FontFace::from_resources(&resources, DEFAULT_FONT).is_err());
    }

    #[test]
    fn test_opentype_magic_accepted() {
        assert!(FontFace::from_bytes("a.otf", Arc::from(&b"OTTO...."[..])).is_ok());
        assert!(FontFace::from_bytes("a.ttc", Arc::from(&b"ttcf...."[..])).is_ok());
    }

    #[test]
    fn test_load_dir_reads_files() {
        let dir = std::env::temp_dir().join(format!("dualscreen-resources-{}", std::process::id()));
        std::fs::create_dir_all(dir.join("nested")).unwrap();
        std::fs::write(dir.join(DEFAULT_FONT), ttf_bytes()).unwrap();
        std::fs::write(dir.join(BACKGROUND_MUSIC), b"OggS").unwrap();

        let mut resources = Resources::load_dir(&dir).unwrap();
        assert_eq!(resources.len(), 2);
        assert_eq!(resources.get(BACKGROUND_MUSIC).as_deref(), Some(&b"OggS"[..]));

        resources.clear();
        assert!(resources.is_empty());
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_load_missing_dir_fails() {
        let err = Resources::load_dir(Path::new("no/such/resources")).unwrap_err();
        assert!(matches!(err, LoopError::Io { .. }));
    }
}
