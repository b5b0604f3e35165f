//! Prime-order group capability interface
//!
//! The commutative cipher never touches curve arithmetic directly. It talks to
//! a [`CyclicGroup`] backend chosen explicitly by the caller and passed around
//! as a [`GroupHandle`]. Four backends ship with the crate:
//!
//! - [`Ristretto255`]: `ristretto255_XMD:SHA-512_R255MAP_RO_`, 32-byte elements
//! - [`P256`]: `P256_XMD:SHA-256_SSWU_RO_`, 33-byte SEC1 compressed elements
//! - [`P384`]: `P384_XMD:SHA-384_SSWU_RO_`, 49-byte SEC1 compressed elements
//! - [`P521`]: `P521_XMD:SHA-512_SSWU_RO_`, 67-byte SEC1 compressed elements
//!
//! # Opaque Values
//!
//! [`Scalar`] and [`Element`] remember which backend produced them. Handing a
//! value from one backend to another returns [`GroupError::TypeMismatch`]
//! instead of aborting.
//!
//! See: RFC 9380 (hashing to elliptic curves), RFC 9496 (ristretto255)

mod nist;
mod ristretto;

pub use self::nist::{P256, P384, P521};
pub use self::ristretto::Ristretto255;

use elliptic_curve::ff::Field as _;
use rand::{CryptoRng, RngCore};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use zeroize::{Zeroize, Zeroizing};

/// Shared handle to a group backend
pub type GroupHandle = Arc<dyn CyclicGroup>;

/// Errors raised at the group-arithmetic boundary
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GroupError {
    /// A scalar or element from one backend was given to another
    #[error("value belongs to group {found}, expected {expected}")]
    TypeMismatch { expected: GroupId, found: GroupId },

    /// Byte string is not a valid compressed element of this group
    #[error("invalid {group} element encoding: {reason}")]
    InvalidEncoding { group: GroupId, reason: String },

    /// Byte string is not a canonical scalar of this group
    #[error("invalid {group} scalar encoding")]
    InvalidScalar { group: GroupId },

    /// Zero has no multiplicative inverse
    #[error("zero scalar has no inverse")]
    ZeroScalar,

    /// expand_message / hash-to-curve rejected its inputs
    #[error("hash to {group} failed: {reason}")]
    HashToGroup { group: GroupId, reason: String },
}

/// Identifier of a supported prime-order group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupId {
    Ristretto255,
    P256,
    P384,
    P521,
}

impl GroupId {
    /// Every group shipped with the crate
    pub const ALL: [GroupId; 4] = [
        GroupId::Ristretto255,
        GroupId::P256,
        GroupId::P384,
        GroupId::P521,
    ];

    /// Canonical lowercase name, as used in config and key files
    pub fn name(self) -> &'static str {
        match self {
            GroupId::Ristretto255 => "ristretto255",
            GroupId::P256 => "p256",
            GroupId::P384 => "p384",
            GroupId::P521 => "p521",
        }
    }

    /// Build a fresh backend handle for this group
    pub fn handle(self) -> GroupHandle {
        match self {
            GroupId::Ristretto255 => ristretto255(),
            GroupId::P256 => p256(),
            GroupId::P384 => p384(),
            GroupId::P521 => p521(),
        }
    }

    /// Recommended domain separation tag for this group
    pub fn default_tag(self) -> &'static str {
        match self {
            GroupId::Ristretto255 => "BLINDSET-V01-CS01-ristretto255_XMD:SHA-512_R255MAP_RO_",
            GroupId::P256 => "BLINDSET-V01-CS02-P256_XMD:SHA-256_SSWU_RO_",
            GroupId::P384 => "BLINDSET-V01-CS03-P384_XMD:SHA-384_SSWU_RO_",
            GroupId::P521 => "BLINDSET-V01-CS04-P521_XMD:SHA-512_SSWU_RO_",
        }
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for GroupId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "ristretto255" => Ok(GroupId::Ristretto255),
            "p256" | "nistp256" | "secp256r1" => Ok(GroupId::P256),
            "p384" | "nistp384" | "secp384r1" => Ok(GroupId::P384),
            "p521" | "nistp521" | "secp521r1" => Ok(GroupId::P521),
            other => Err(format!(
                "unknown group '{}' (supported: ristretto255, p256, p384, p521)",
                other
            )),
        }
    }
}

/// Handle to the ristretto255 backend
pub fn ristretto255() -> GroupHandle {
    Arc::new(Ristretto255)
}

/// Handle to the NIST P-256 backend
pub fn p256() -> GroupHandle {
    Arc::new(P256)
}

/// Handle to the NIST P-384 backend
pub fn p384() -> GroupHandle {
    Arc::new(P384)
}

/// Handle to the NIST P-521 backend
pub fn p521() -> GroupHandle {
    Arc::new(P521)
}

/// Cryptographically secure randomness source usable through `dyn`
pub trait SecureRng: RngCore + CryptoRng {}

impl<T: RngCore + CryptoRng> SecureRng for T {}

/// Sized adapter so backends can hand a `dyn SecureRng` to generic curve APIs
pub(crate) struct RngAdapter<'a>(pub(crate) &'a mut dyn SecureRng);

impl RngCore for RngAdapter<'_> {
    fn next_u32(&mut self) -> u32 {
        self.0.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.0.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.0.fill_bytes(dest)
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.0.try_fill_bytes(dest)
    }
}

impl CryptoRng for RngAdapter<'_> {}

/// Capabilities the commutative cipher needs from a prime-order group
///
/// Implementations must be safe for concurrent read-only use: the cipher
/// shares one handle across worker threads.
pub trait CyclicGroup: Send + Sync + fmt::Debug {
    /// Which group this backend implements
    fn id(&self) -> GroupId;

    /// Human-readable group name
    fn name(&self) -> &'static str {
        self.id().name()
    }

    /// Length in bytes of a compressed element
    fn element_len(&self) -> usize;

    /// Uniformly random nonzero scalar
    fn random_nonzero_scalar(&self, rng: &mut dyn SecureRng) -> Scalar;

    /// Multiplicative inverse modulo the group order
    fn invert_scalar(&self, scalar: &Scalar) -> Result<Scalar, GroupError>;

    /// Domain-separated hash of `msg` onto the group
    fn hash_to_element(&self, msg: &[u8], dst: &[u8]) -> Result<Element, GroupError>;

    /// Domain-separated hash of `msg` into the scalar field
    fn hash_to_scalar(&self, msg: &[u8], dst: &[u8]) -> Result<Scalar, GroupError>;

    /// `element^scalar` (written multiplicatively)
    fn scalar_mul(&self, element: &Element, scalar: &Scalar) -> Result<Element, GroupError>;

    /// Compressed byte encoding of an element
    fn compress(&self, element: &Element) -> Result<Vec<u8>, GroupError>;

    /// Decode a compressed element, rejecting the identity
    fn decompress(&self, bytes: &[u8]) -> Result<Element, GroupError>;

    /// Canonical scalar encoding
    fn scalar_to_bytes(&self, scalar: &Scalar) -> Result<Zeroizing<Vec<u8>>, GroupError>;

    /// Decode a canonical scalar
    fn scalar_from_bytes(&self, bytes: &[u8]) -> Result<Scalar, GroupError>;
}

/// Element of a group's scalar field
///
/// Zeroized on drop. `Debug` never prints the value.
#[derive(Clone)]
pub struct Scalar(pub(crate) ScalarRepr);

#[derive(Clone)]
pub(crate) enum ScalarRepr {
    Ristretto255(curve25519_dalek::Scalar),
    P256(::p256::Scalar),
    P384(::p384::Scalar),
    P521(::p521::Scalar),
}

impl Scalar {
    /// Group this scalar was produced under
    pub fn group_id(&self) -> GroupId {
        match self.0 {
            ScalarRepr::Ristretto255(_) => GroupId::Ristretto255,
            ScalarRepr::P256(_) => GroupId::P256,
            ScalarRepr::P384(_) => GroupId::P384,
            ScalarRepr::P521(_) => GroupId::P521,
        }
    }

    /// Fresh random nonzero scalar from the OS CSPRNG
    pub fn random(group: &dyn CyclicGroup) -> Self {
        group.random_nonzero_scalar(&mut rand::rngs::OsRng)
    }

    /// Whether this is the zero scalar
    pub fn is_zero(&self) -> bool {
        match &self.0 {
            ScalarRepr::Ristretto255(s) => *s == curve25519_dalek::Scalar::ZERO,
            ScalarRepr::P256(s) => bool::from(s.is_zero()),
            ScalarRepr::P384(s) => bool::from(s.is_zero()),
            ScalarRepr::P521(s) => bool::from(s.is_zero()),
        }
    }
}

impl Zeroize for Scalar {
    fn zeroize(&mut self) {
        match &mut self.0 {
            ScalarRepr::Ristretto255(s) => s.zeroize(),
            ScalarRepr::P256(s) => s.zeroize(),
            ScalarRepr::P384(s) => s.zeroize(),
            ScalarRepr::P521(s) => s.zeroize(),
        }
    }
}

impl Drop for Scalar {
    fn drop(&mut self) {
        self.zeroize();
    }
}

impl fmt::Debug for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Scalar({}, <redacted>)", self.group_id())
    }
}

/// Point in a prime-order group
#[derive(Clone, Debug)]
pub struct Element(pub(crate) ElementRepr);

#[derive(Clone, Debug)]
pub(crate) enum ElementRepr {
    Ristretto255(curve25519_dalek::RistrettoPoint),
    P256(::p256::ProjectivePoint),
    P384(::p384::ProjectivePoint),
    P521(::p521::ProjectivePoint),
}

impl Element {
    /// Group this element lives in
    pub fn group_id(&self) -> GroupId {
        match self.0 {
            ElementRepr::Ristretto255(_) => GroupId::Ristretto255,
            ElementRepr::P256(_) => GroupId::P256,
            ElementRepr::P384(_) => GroupId::P384,
            ElementRepr::P521(_) => GroupId::P521,
        }
    }
}
