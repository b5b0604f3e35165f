//! Blindset - Commutative Encryption for Private Set Intersection
//!
//! Two parties each hold a private set. Each masks its elements with a secret
//! exponent in a prime-order group; because exponentiation commutes, an
//! element masked by both parties lands on the same group element regardless
//! of who masked first. Comparing doubly-masked values reveals the
//! intersection and nothing else.
//!
//! Key principles:
//! - Group arithmetic comes from audited backends (ristretto255, NIST P-256/384/521)
//! - Keys are zeroized on drop and never logged
//! - Every malformed input is a typed error, never a panic
//!
//! Layers:
//! - [`crypto`]: group backends, key material, the commutative cipher
//! - [`psi`]: server/client roles, batch masking, membership filters
//! - [`serialization`]: CBOR wire encoding

pub mod crypto;
pub mod psi;
pub mod serialization;

pub use crypto::{CipherError, CommutativeCipher, GroupId, MaskedValue};
pub use psi::{Intersection, MatchMode, PsiClient, PsiError, PsiServer};
