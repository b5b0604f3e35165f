//! Masking key files
//!
//! A key file is a small TOML document:
//!
//! ```toml
//! group = "ristretto255"
//! scalar = "<hex>"
//! ```
//!
//! Written with 0600 permissions on unix. The scalar is the party's secret
//! exponent; anyone holding it can unmask that party's values.

use blindset::crypto::{derive_scalar, CommutativeCipher, GroupId, Scalar};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use zeroize::Zeroize;

/// On-disk masking key
#[derive(Serialize, Deserialize)]
pub struct KeyFile {
    pub group: String,
    scalar: String,
}

impl Drop for KeyFile {
    fn drop(&mut self) {
        self.scalar.zeroize();
    }
}

impl KeyFile {
    /// Fresh random key
    pub fn generate(group: GroupId) -> Result<Self, Box<dyn std::error::Error>> {
        let handle = group.handle();
        let scalar = handle.random_nonzero_scalar(&mut OsRng);
        Self::from_scalar(group, &scalar)
    }

    /// Key derived from seed material, bound to `tag`
    pub fn derive(
        group: GroupId,
        seed: &[u8],
        tag: &str,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let handle = group.handle();
        let scalar = derive_scalar(handle.as_ref(), seed, tag.as_bytes())?;
        Self::from_scalar(group, &scalar)
    }

    fn from_scalar(group: GroupId, scalar: &Scalar) -> Result<Self, Box<dyn std::error::Error>> {
        let bytes = group.handle().scalar_to_bytes(scalar)?;
        Ok(Self {
            group: group.name().to_string(),
            scalar: hex::encode(bytes.as_slice()),
        })
    }

    pub fn group_id(&self) -> Result<GroupId, Box<dyn std::error::Error>> {
        Ok(self.group.parse::<GroupId>()?)
    }

    /// Decode the stored scalar
    pub fn scalar(&self) -> Result<Scalar, Box<dyn std::error::Error>> {
        let group = self.group_id()?;
        let bytes = zeroize::Zeroizing::new(
            hex::decode(&self.scalar).map_err(|e| format!("Key file scalar is not hex: {}", e))?,
        );
        Ok(group.handle().scalar_from_bytes(&bytes)?)
    }

    /// Cipher for this key under `tag`
    pub fn cipher(&self, tag: &str) -> Result<CommutativeCipher, Box<dyn std::error::Error>> {
        let cipher = CommutativeCipher::builder()
            .group(self.group_id()?.handle())
            .tag(tag)
            .key(&self.scalar()?)
            .build()?;
        Ok(cipher)
    }

    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = zeroize::Zeroizing::new(
            fs::read_to_string(path)
                .map_err(|e| format!("Failed to read key file '{}': {}", path.display(), e))?,
        );
        let key: KeyFile = toml::from_str(&contents)
            .map_err(|e| format!("Failed to parse key file '{}': {}", path.display(), e))?;
        Ok(key)
    }

    /// Write with owner-only permissions; refuses to replace an existing file
    pub fn save(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let contents = zeroize::Zeroizing::new(
            toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize key: {}", e))?,
        );

        let mut options = fs::OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = options
            .open(path)
            .map_err(|e| format!("Failed to create key file '{}': {}", path.display(), e))?;
        file.write_all(contents.as_bytes())
            .map_err(|e| format!("Failed to write key file '{}': {}", path.display(), e))?;

        Ok(())
    }
}

/// Generate a key file
pub fn execute(
    group: GroupId,
    tag: &str,
    seed_file: Option<PathBuf>,
    out: PathBuf,
) -> Result<(), Box<dyn std::error::Error>> {
    let key = match seed_file {
        Some(seed_path) => {
            let seed = zeroize::Zeroizing::new(fs::read(&seed_path).map_err(|e| {
                format!("Failed to read seed file '{}': {}", seed_path.display(), e)
            })?);
            KeyFile::derive(group, &seed, tag)?
        }
        None => KeyFile::generate(group)?,
    };

    key.save(&out)?;
    tracing::info!(group = group.name(), path = %out.display(), "key written");
    println!("Wrote {} key to {}", group.name(), out.display());
    Ok(())
}
