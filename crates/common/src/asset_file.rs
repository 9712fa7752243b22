use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha3::{Digest, Sha3_512};

use crate::record::AssetId;

/// Fingerprint prefix for SHA3-512 content digests
const FINGERPRINT_PREFIX: &str = "01";

/// Whether uploaded content is stored in the clear or encrypted under a
/// content key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Accessibility {
    Public,
    #[default]
    Private,
}

impl fmt::Display for Accessibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Accessibility::Public => write!(f, "public"),
            Accessibility::Private => write!(f, "private"),
        }
    }
}

/// Asset content to register and upload
#[derive(Clone, PartialEq, Eq)]
pub struct AssetFile {
    pub name: String,
    pub content: Vec<u8>,
    pub fingerprint: String,
    pub accessibility: Accessibility,
}

impl fmt::Debug for AssetFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssetFile")
            .field("name", &self.name)
            .field("size", &self.content.len())
            .field("fingerprint", &self.fingerprint)
            .field("accessibility", &self.accessibility)
            .finish()
    }
}

impl AssetFile {
    pub fn new(name: impl Into<String>, content: Vec<u8>, accessibility: Accessibility) -> Self {
        let fingerprint = fingerprint(&content);
        Self {
            name: name.into(),
            content,
            fingerprint,
            accessibility,
        }
    }

    /// Read a file from disk, named after its final path component
    pub fn from_path(
        path: impl AsRef<Path>,
        accessibility: Accessibility,
    ) -> std::io::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self::new(name, content, accessibility))
    }

    pub fn id(&self) -> AssetId {
        AssetId::from_fingerprint(&self.fingerprint)
    }
}

/// `"01" || hex(SHA3-512(content))`
pub fn fingerprint(content: &[u8]) -> String {
    let digest = Sha3_512::digest(content);
    format!("{FINGERPRINT_PREFIX}{}", hex::encode(digest))
}
