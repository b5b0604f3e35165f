//! ristretto255 backend (curve25519-dalek)

use super::{
    CyclicGroup, Element, ElementRepr, GroupError, GroupId, RngAdapter, Scalar, ScalarRepr,
    SecureRng,
};
use curve25519_dalek::ristretto::{CompressedRistretto, RistrettoPoint};
use curve25519_dalek::traits::IsIdentity;
use elliptic_curve::hash2curve::{ExpandMsg, ExpandMsgXmd, Expander};
use sha2::Sha512;
use zeroize::Zeroizing;

type DalekScalar = curve25519_dalek::Scalar;

/// Compressed ristretto255 element length
const ELEMENT_LEN: usize = 32;

/// Uniform bytes fed to the one-way map (RFC 9496 § 4.3.4)
const UNIFORM_LEN: usize = 64;

/// ristretto255 with `expand_message_xmd` over SHA-512
#[derive(Debug, Clone, Copy, Default)]
pub struct Ristretto255;

impl Ristretto255 {
    fn scalar<'a>(&self, scalar: &'a Scalar) -> Result<&'a DalekScalar, GroupError> {
        match &scalar.0 {
            ScalarRepr::Ristretto255(s) => Ok(s),
            _ => Err(GroupError::TypeMismatch {
                expected: GroupId::Ristretto255,
                found: scalar.group_id(),
            }),
        }
    }

    fn point<'a>(&self, element: &'a Element) -> Result<&'a RistrettoPoint, GroupError> {
        match &element.0 {
            ElementRepr::Ristretto255(p) => Ok(p),
            _ => Err(GroupError::TypeMismatch {
                expected: GroupId::Ristretto255,
                found: element.group_id(),
            }),
        }
    }

    fn expand(&self, msg: &[u8], dst: &[u8]) -> Result<Zeroizing<[u8; UNIFORM_LEN]>, GroupError> {
        let mut uniform = Zeroizing::new([0u8; UNIFORM_LEN]);
        ExpandMsgXmd::<Sha512>::expand_message(&[msg], &[dst], UNIFORM_LEN)
            .map_err(|e| GroupError::HashToGroup {
                group: GroupId::Ristretto255,
                reason: e.to_string(),
            })?
            .fill_bytes(&mut uniform[..]);
        Ok(uniform)
    }
}

impl CyclicGroup for Ristretto255 {
    fn id(&self) -> GroupId {
        GroupId::Ristretto255
    }

    fn element_len(&self) -> usize {
        ELEMENT_LEN
    }

    fn random_nonzero_scalar(&self, rng: &mut dyn SecureRng) -> Scalar {
        let mut rng = RngAdapter(rng);
        loop {
            let s = DalekScalar::random(&mut rng);
            if s != DalekScalar::ZERO {
                return Scalar(ScalarRepr::Ristretto255(s));
            }
        }
    }

    fn invert_scalar(&self, scalar: &Scalar) -> Result<Scalar, GroupError> {
        let s = self.scalar(scalar)?;
        if *s == DalekScalar::ZERO {
            return Err(GroupError::ZeroScalar);
        }
        Ok(Scalar(ScalarRepr::Ristretto255(s.invert())))
    }

    fn hash_to_element(&self, msg: &[u8], dst: &[u8]) -> Result<Element, GroupError> {
        let uniform = self.expand(msg, dst)?;
        let point = RistrettoPoint::from_uniform_bytes(&uniform);
        Ok(Element(ElementRepr::Ristretto255(point)))
    }

    fn hash_to_scalar(&self, msg: &[u8], dst: &[u8]) -> Result<Scalar, GroupError> {
        let uniform = self.expand(msg, dst)?;
        let s = DalekScalar::from_bytes_mod_order_wide(&uniform);
        Ok(Scalar(ScalarRepr::Ristretto255(s)))
    }

    fn scalar_mul(&self, element: &Element, scalar: &Scalar) -> Result<Element, GroupError> {
        let p = self.point(element)?;
        let s = self.scalar(scalar)?;
        Ok(Element(ElementRepr::Ristretto255(p * s)))
    }

    fn compress(&self, element: &Element) -> Result<Vec<u8>, GroupError> {
        let p = self.point(element)?;
        Ok(p.compress().to_bytes().to_vec())
    }

    fn decompress(&self, bytes: &[u8]) -> Result<Element, GroupError> {
        let invalid = |reason: &str| GroupError::InvalidEncoding {
            group: GroupId::Ristretto255,
            reason: reason.to_string(),
        };

        if bytes.len() != ELEMENT_LEN {
            return Err(invalid(&format!(
                "expected {} bytes, got {}",
                ELEMENT_LEN,
                bytes.len()
            )));
        }

        let compressed =
            CompressedRistretto::from_slice(bytes).map_err(|e| invalid(&e.to_string()))?;
        let point = compressed
            .decompress()
            .ok_or_else(|| invalid("not a canonical ristretto255 encoding"))?;

        if point.is_identity() {
            return Err(invalid("identity element"));
        }

        Ok(Element(ElementRepr::Ristretto255(point)))
    }

    fn scalar_to_bytes(&self, scalar: &Scalar) -> Result<Zeroizing<Vec<u8>>, GroupError> {
        let s = self.scalar(scalar)?;
        Ok(Zeroizing::new(s.to_bytes().to_vec()))
    }

    fn scalar_from_bytes(&self, bytes: &[u8]) -> Result<Scalar, GroupError> {
        let invalid = GroupError::InvalidScalar {
            group: GroupId::Ristretto255,
        };
        let mut repr = Zeroizing::new([0u8; 32]);
        if bytes.len() != repr.len() {
            return Err(invalid);
        }
        repr.copy_from_slice(bytes);

        Option::<DalekScalar>::from(DalekScalar::from_canonical_bytes(*repr))
            .map(|s| Scalar(ScalarRepr::Ristretto255(s)))
            .ok_or(invalid)
    }
}
