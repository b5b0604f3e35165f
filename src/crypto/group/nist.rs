//! NIST prime-order curves (p256 / p384 / p521 on RustCrypto elliptic-curve)
//!
//! All three curves share one implementation, stamped out per curve by
//! `sec1_backend!`. Elements travel as SEC1 compressed points.

use super::{
    CyclicGroup, Element, ElementRepr, GroupError, GroupId, RngAdapter, Scalar, ScalarRepr,
    SecureRng,
};
use elliptic_curve::ff::{Field as _, PrimeField};
use elliptic_curve::group::{Group, GroupEncoding};
use elliptic_curve::hash2curve::{ExpandMsgXmd, GroupDigest};
use sha2::{Sha256, Sha384, Sha512};
use zeroize::Zeroizing;

/// SEC1 tag bytes of a compressed point (even / odd y)
const SEC1_COMPRESSED_TAGS: [u8; 2] = [0x02, 0x03];

macro_rules! sec1_backend {
    (
        $(#[$meta:meta])*
        $name:ident, $id:ident, $krate:ident, $curve:ident, $hash:ty,
        element_len = $element_len:expr, scalar_len = $scalar_len:expr,
        display = $display:literal
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default)]
        pub struct $name;

        impl $name {
            fn scalar<'a>(&self, scalar: &'a Scalar) -> Result<&'a ::$krate::Scalar, GroupError> {
                match &scalar.0 {
                    ScalarRepr::$id(s) => Ok(s),
                    _ => Err(GroupError::TypeMismatch {
                        expected: GroupId::$id,
                        found: scalar.group_id(),
                    }),
                }
            }

            fn point<'a>(
                &self,
                element: &'a Element,
            ) -> Result<&'a ::$krate::ProjectivePoint, GroupError> {
                match &element.0 {
                    ElementRepr::$id(p) => Ok(p),
                    _ => Err(GroupError::TypeMismatch {
                        expected: GroupId::$id,
                        found: element.group_id(),
                    }),
                }
            }

            fn hash_error(e: elliptic_curve::Error) -> GroupError {
                GroupError::HashToGroup {
                    group: GroupId::$id,
                    reason: e.to_string(),
                }
            }
        }

        impl CyclicGroup for $name {
            fn id(&self) -> GroupId {
                GroupId::$id
            }

            fn element_len(&self) -> usize {
                $element_len
            }

            fn random_nonzero_scalar(&self, rng: &mut dyn SecureRng) -> Scalar {
                let mut rng = RngAdapter(rng);
                let s = ::$krate::NonZeroScalar::random(&mut rng);
                Scalar(ScalarRepr::$id(*s))
            }

            fn invert_scalar(&self, scalar: &Scalar) -> Result<Scalar, GroupError> {
                let s = self.scalar(scalar)?;
                Option::<::$krate::Scalar>::from(s.invert())
                    .map(|inv| Scalar(ScalarRepr::$id(inv)))
                    .ok_or(GroupError::ZeroScalar)
            }

            fn hash_to_element(&self, msg: &[u8], dst: &[u8]) -> Result<Element, GroupError> {
                let point = ::$krate::$curve::hash_from_bytes::<ExpandMsgXmd<$hash>>(&[msg], &[dst])
                    .map_err(Self::hash_error)?;
                Ok(Element(ElementRepr::$id(point)))
            }

            fn hash_to_scalar(&self, msg: &[u8], dst: &[u8]) -> Result<Scalar, GroupError> {
                let s = ::$krate::$curve::hash_to_scalar::<ExpandMsgXmd<$hash>>(&[msg], &[dst])
                    .map_err(Self::hash_error)?;
                Ok(Scalar(ScalarRepr::$id(s)))
            }

            fn scalar_mul(&self, element: &Element, scalar: &Scalar) -> Result<Element, GroupError> {
                let p = self.point(element)?;
                let s = self.scalar(scalar)?;
                Ok(Element(ElementRepr::$id(*p * s)))
            }

            fn compress(&self, element: &Element) -> Result<Vec<u8>, GroupError> {
                let p = self.point(element)?;
                // GroupEncoding maps the identity to an all-zero buffer
                if bool::from(p.is_identity()) {
                    return Err(GroupError::InvalidEncoding {
                        group: GroupId::$id,
                        reason: "identity element has no compressed encoding".to_string(),
                    });
                }
                Ok(p.to_bytes().to_vec())
            }

            fn decompress(&self, bytes: &[u8]) -> Result<Element, GroupError> {
                let invalid = |reason: &str| GroupError::InvalidEncoding {
                    group: GroupId::$id,
                    reason: reason.to_string(),
                };

                let mut repr = <::$krate::ProjectivePoint as GroupEncoding>::Repr::default();
                if bytes.len() != repr.len() {
                    return Err(invalid(&format!(
                        "expected {} bytes, got {}",
                        repr.len(),
                        bytes.len()
                    )));
                }
                // from_bytes also takes the compact (0x05) form
                if !SEC1_COMPRESSED_TAGS.contains(&bytes[0]) {
                    return Err(invalid(&format!(
                        "SEC1 tag 0x{:02x} is not a compressed point",
                        bytes[0]
                    )));
                }
                repr.copy_from_slice(bytes);

                let point =
                    Option::<::$krate::ProjectivePoint>::from(::$krate::ProjectivePoint::from_bytes(&repr))
                        .ok_or_else(|| invalid(concat!("not a point on ", $display)))?;

                if bool::from(point.is_identity()) {
                    return Err(invalid("identity element"));
                }

                Ok(Element(ElementRepr::$id(point)))
            }

            fn scalar_to_bytes(&self, scalar: &Scalar) -> Result<Zeroizing<Vec<u8>>, GroupError> {
                let s = self.scalar(scalar)?;
                Ok(Zeroizing::new(s.to_repr().to_vec()))
            }

            fn scalar_from_bytes(&self, bytes: &[u8]) -> Result<Scalar, GroupError> {
                let invalid = GroupError::InvalidScalar {
                    group: GroupId::$id,
                };
                if bytes.len() != $scalar_len {
                    return Err(invalid);
                }
                let repr = ::$krate::FieldBytes::clone_from_slice(bytes);

                Option::<::$krate::Scalar>::from(::$krate::Scalar::from_repr(repr))
                    .map(|s| Scalar(ScalarRepr::$id(s)))
                    .ok_or(invalid)
            }
        }
    };
}

sec1_backend!(
    /// NIST P-256 with `P256_XMD:SHA-256_SSWU_RO_` hashing
    P256, P256, p256, NistP256, Sha256,
    element_len = 33, scalar_len = 32,
    display = "P-256"
);

sec1_backend!(
    /// NIST P-384 with `P384_XMD:SHA-384_SSWU_RO_` hashing
    P384, P384, p384, NistP384, Sha384,
    element_len = 49, scalar_len = 48,
    display = "P-384"
);

sec1_backend!(
    /// NIST P-521 with `P521_XMD:SHA-512_SSWU_RO_` hashing
    P521, P521, p521, NistP521, Sha512,
    element_len = 67, scalar_len = 66,
    display = "P-521"
);
