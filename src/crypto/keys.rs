//! Masking key material
//!
//! A [`KeyPair`] holds the private masking scalar `r` and its inverse `r⁻¹`.
//! It is created once per cipher and never leaves the crate: callers only ever
//! see the masks it produces.
//!
//! ## Key Sources
//!
//! ```text
//! OS CSPRNG ──────────────► random nonzero scalar ─┐
//! caller scalar ──────────► copied, never aliased ─┼─► KeyPair { r, r⁻¹ }
//! seed ─► HKDF-SHA256 ────► hash_to_scalar ────────┘
//! ```
//!
//! Deterministic derivation lets one party keep a stable key across runs
//! (identical key => identical masks => matching still works).

use super::group::{CyclicGroup, GroupError, GroupId, Scalar, SecureRng};
use hkdf::Hkdf;
use sha2::Sha256;
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// HKDF salt for masking-key derivation (versioned for rotation)
const KEY_SALT: &[u8] = b"blindset-key-v1";

/// Domain separation tag for hashing HKDF output into the scalar field
const KEY_DST: &[u8] = b"BLINDSET-V01-KEYGEN";

/// HKDF output length before reduction into the scalar field
const OKM_LEN: usize = 64;

/// Errors raised while building key material
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KeyError {
    /// Scalar was produced under another group
    #[error("key belongs to group {found}, cipher is configured for {expected}")]
    GroupMismatch { expected: GroupId, found: GroupId },

    /// Zero cannot mask anything and has no inverse
    #[error("masking key must be nonzero")]
    ZeroScalar,

    /// Seed was empty
    #[error("key derivation seed must not be empty")]
    EmptySeed,

    /// HKDF expansion failed (should never happen with valid lengths)
    #[error("key derivation failed: {0}")]
    Derivation(String),

    /// The group backend rejected the scalar
    #[error(transparent)]
    Group(#[from] GroupError),
}

/// Private masking scalar and its inverse
///
/// Both halves are zeroized on drop.
pub(crate) struct KeyPair {
    private: Scalar,
    inverse: Scalar,
}

impl KeyPair {
    /// Draw a fresh key from `rng`
    pub(crate) fn generate(
        group: &dyn CyclicGroup,
        rng: &mut dyn SecureRng,
    ) -> Result<Self, KeyError> {
        let private = group.random_nonzero_scalar(rng);
        Self::from_owned(group, private)
    }

    /// Copy a caller-supplied scalar and derive its inverse
    ///
    /// The group check runs before any arithmetic so a foreign scalar is a
    /// typed error, never a backend failure.
    pub(crate) fn from_scalar(
        group: &dyn CyclicGroup,
        scalar: &Scalar,
    ) -> Result<Self, KeyError> {
        if scalar.group_id() != group.id() {
            return Err(KeyError::GroupMismatch {
                expected: group.id(),
                found: scalar.group_id(),
            });
        }
        Self::from_owned(group, scalar.clone())
    }

    fn from_owned(group: &dyn CyclicGroup, private: Scalar) -> Result<Self, KeyError> {
        if private.is_zero() {
            return Err(KeyError::ZeroScalar);
        }
        let inverse = group.invert_scalar(&private)?;
        Ok(Self { private, inverse })
    }

    pub(crate) fn private(&self) -> &Scalar {
        &self.private
    }

    pub(crate) fn inverse(&self) -> &Scalar {
        &self.inverse
    }
}

impl Zeroize for KeyPair {
    fn zeroize(&mut self) {
        self.private.zeroize();
        self.inverse.zeroize();
    }
}

// Scalar zeroizes itself on drop
impl ZeroizeOnDrop for KeyPair {}

/// Deterministically derive a masking scalar from seed material
///
/// `context` binds the key to its use (typically the domain separation tag),
/// so the same seed gives unrelated keys for unrelated applications.
pub fn derive_scalar(
    group: &dyn CyclicGroup,
    seed: &[u8],
    context: &[u8],
) -> Result<Scalar, KeyError> {
    if seed.is_empty() {
        return Err(KeyError::EmptySeed);
    }

    let hk = Hkdf::<Sha256>::new(Some(KEY_SALT), seed);
    let mut okm = Zeroizing::new([0u8; OKM_LEN]);
    hk.expand(context, okm.as_mut_slice())
        .map_err(|e| KeyError::Derivation(e.to_string()))?;

    let scalar = group.hash_to_scalar(okm.as_slice(), KEY_DST)?;
    if scalar.is_zero() {
        return Err(KeyError::ZeroScalar);
    }
    Ok(scalar)
}
