/// Cryptographic core for private set intersection
///
/// This module implements:
/// - Prime-order group capability interface with ristretto255 and P-256 backends
/// - Masking key material (random, caller-supplied, or seed-derived)
/// - The commutative cipher (encrypt / re-encrypt / decrypt)
pub mod cipher;
pub mod group;
pub mod keys;

pub use cipher::{CipherBuilder, CipherError, CommutativeCipher, MaskedValue, SuiteFingerprint};
pub use group::{CyclicGroup, GroupError, GroupHandle, GroupId, Scalar, SecureRng};
pub use keys::{derive_scalar, KeyError};
