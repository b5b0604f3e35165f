//! Bloom filter over masked values
//!
//! Lets the server ship a compact membership structure instead of its whole
//! masked set. No false negatives; the false-positive rate is set at
//! construction.
//!
//! The bit array and SipHash probing come from the `bloomfilter` crate. Items
//! are condensed to a fixed-width SHA-256 key first so a filter built on one
//! platform answers identically on another.
//!
//! Decoding checks the bit count, hash count and bit array length before a
//! filter is rebuilt, so every live filter has a bit array covering its bit
//! count.

use bloomfilter::Bloom;
use serde::de::{self, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;
use thiserror::Error;

/// Upper bound on hash functions (keeps decode of hostile filters cheap)
const MAX_HASHES: u32 = 64;

/// Upper bound on filter size in bits (1 GiB of bits)
const MAX_BITS: u64 = 8 * 1024 * 1024 * 1024;

/// Bloom filter errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FilterError {
    #[error("false positive rate must be in (0, 1), got {0}")]
    InvalidRate(f64),

    #[error("filter for {items} items at rate {rate} exceeds size limit")]
    TooLarge { items: usize, rate: f64 },

    #[error("corrupt filter: {0}")]
    Corrupt(String),
}

/// Hash input fed to the bit array
type FilterKey = (u64, u64);

/// Probabilistic set membership over byte strings
#[derive(Serialize, Deserialize)]
#[serde(try_from = "RawBloomFilter", into = "RawBloomFilter")]
pub struct BloomFilter {
    bloom: Bloom<FilterKey>,
    items: u64,
}

impl BloomFilter {
    /// Filter sized for `expected_items` at `false_positive_rate`
    pub fn with_false_positive_rate(
        expected_items: usize,
        false_positive_rate: f64,
    ) -> Result<Self, FilterError> {
        if !(false_positive_rate > 0.0 && false_positive_rate < 1.0) {
            return Err(FilterError::InvalidRate(false_positive_rate));
        }

        let n = expected_items.max(1);
        let ln2 = std::f64::consts::LN_2;
        let m = -(n as f64) * false_positive_rate.ln() / (ln2 * ln2);
        if m > MAX_BITS as f64 {
            return Err(FilterError::TooLarge {
                items: expected_items,
                rate: false_positive_rate,
            });
        }

        Ok(Self {
            bloom: Bloom::new_for_fp_rate(n, false_positive_rate),
            items: 0,
        })
    }

    /// Add an item
    pub fn insert(&mut self, item: &[u8]) {
        self.bloom.set(&filter_key(item));
        self.items += 1;
    }

    /// True if `item` may be in the set, false if it definitely is not
    pub fn contains(&self, item: &[u8]) -> bool {
        self.bloom.check(&filter_key(item))
    }

    /// Number of items inserted
    pub fn len(&self) -> u64 {
        self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items == 0
    }

    pub fn num_bits(&self) -> u64 {
        self.bloom.number_of_bits()
    }

    pub fn num_hashes(&self) -> u32 {
        self.bloom.number_of_hash_functions()
    }

    /// Expected false-positive rate given the items inserted so far
    pub fn estimated_false_positive_rate(&self) -> f64 {
        let k = self.num_hashes() as f64;
        let exponent = -k * self.items as f64 / self.num_bits() as f64;
        (1.0 - exponent.exp()).powf(k)
    }

    fn from_parts(
        bitmap: &[u8],
        num_bits: u64,
        num_hashes: u32,
        sip_keys: [(u64, u64); 2],
        items: u64,
    ) -> Self {
        Self {
            bloom: Bloom::from_existing(bitmap, num_bits, num_hashes, sip_keys),
            items,
        }
    }
}

fn filter_key(item: &[u8]) -> FilterKey {
    let digest = Sha256::digest(item);
    let mut hi = [0u8; 8];
    let mut lo = [0u8; 8];
    hi.copy_from_slice(&digest[..8]);
    lo.copy_from_slice(&digest[8..16]);
    (u64::from_le_bytes(hi), u64::from_le_bytes(lo))
}

impl Clone for BloomFilter {
    fn clone(&self) -> Self {
        Self::from_parts(
            &self.bloom.bitmap(),
            self.num_bits(),
            self.num_hashes(),
            self.bloom.sip_keys(),
            self.items,
        )
    }
}

impl PartialEq for BloomFilter {
    fn eq(&self, other: &Self) -> bool {
        self.items == other.items
            && self.num_bits() == other.num_bits()
            && self.num_hashes() == other.num_hashes()
            && self.bloom.sip_keys() == other.bloom.sip_keys()
            && self.bloom.bitmap() == other.bloom.bitmap()
    }
}

impl Eq for BloomFilter {}

impl fmt::Debug for BloomFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BloomFilter")
            .field("num_bits", &self.num_bits())
            .field("num_hashes", &self.num_hashes())
            .field("items", &self.items)
            .finish()
    }
}

/// Wire form of [`BloomFilter`], checked before a filter is rebuilt from it
#[derive(Serialize, Deserialize)]
struct RawBloomFilter {
    bitmap: Bitmap,
    num_bits: u64,
    num_hashes: u32,
    sip_keys: [(u64, u64); 2],
    items: u64,
}

impl From<BloomFilter> for RawBloomFilter {
    fn from(filter: BloomFilter) -> Self {
        Self {
            bitmap: Bitmap(filter.bloom.bitmap()),
            num_bits: filter.num_bits(),
            num_hashes: filter.num_hashes(),
            sip_keys: filter.bloom.sip_keys(),
            items: filter.items,
        }
    }
}

impl TryFrom<RawBloomFilter> for BloomFilter {
    type Error = FilterError;

    fn try_from(raw: RawBloomFilter) -> Result<Self, FilterError> {
        if raw.num_bits == 0 || raw.num_bits > MAX_BITS {
            return Err(FilterError::Corrupt(format!(
                "bit count {} out of range",
                raw.num_bits
            )));
        }
        if raw.num_hashes == 0 || raw.num_hashes > MAX_HASHES {
            return Err(FilterError::Corrupt(format!(
                "hash count {} out of range",
                raw.num_hashes
            )));
        }
        if raw.bitmap.0.len() as u64 != raw.num_bits.div_ceil(8) {
            return Err(FilterError::Corrupt(format!(
                "{} bytes cannot hold {} bits",
                raw.bitmap.0.len(),
                raw.num_bits
            )));
        }
        Ok(Self::from_parts(
            &raw.bitmap.0,
            raw.num_bits,
            raw.num_hashes,
            raw.sip_keys,
            raw.items,
        ))
    }
}

/// Bit array carried as a CBOR byte string
struct Bitmap(Vec<u8>);

impl Serialize for Bitmap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bytes(&self.0)
    }
}

impl<'de> Deserialize<'de> for Bitmap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct BitmapVisitor;

        impl<'de> Visitor<'de> for BitmapVisitor {
            type Value = Bitmap;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a filter bit array")
            }

            fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<Bitmap, E> {
                Ok(Bitmap(v.to_vec()))
            }

            fn visit_byte_buf<E: de::Error>(self, v: Vec<u8>) -> Result<Bitmap, E> {
                Ok(Bitmap(v))
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Bitmap, A::Error> {
                let mut bytes = Vec::with_capacity(seq.size_hint().unwrap_or(0).min(4096));
                while let Some(b) = seq.next_element::<u8>()? {
                    bytes.push(b);
                }
                Ok(Bitmap(bytes))
            }
        }

        deserializer.deserialize_bytes(BitmapVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serialization::{from_cbor, to_cbor};

    fn raw(bitmap: Vec<u8>, num_bits: u64, num_hashes: u32) -> RawBloomFilter {
        RawBloomFilter {
            bitmap: Bitmap(bitmap),
            num_bits,
            num_hashes,
            sip_keys: [(1, 2), (3, 4)],
            items: 1,
        }
    }

    #[test]
    fn test_sizing_for_ten_items_at_three_percent() {
        let filter = BloomFilter::with_false_positive_rate(10, 0.03).unwrap();
        // 73 bits rounded up to whole bytes
        assert!((73..=80).contains(&filter.num_bits()), "{:?}", filter);
        assert!((5..=6).contains(&filter.num_hashes()), "{:?}", filter);
        assert!(filter.is_empty());
    }

    #[test]
    fn test_no_false_negatives() {
        let mut filter = BloomFilter::with_false_positive_rate(500, 0.01).unwrap();
        let items: Vec<String> = (0..500).map(|i| format!("item-{}", i)).collect();
        for item in &items {
            filter.insert(item.as_bytes());
        }
        assert_eq!(filter.len(), 500);
        for item in &items {
            assert!(filter.contains(item.as_bytes()));
        }
    }

    #[test]
    fn test_false_positive_rate_within_bound() {
        let mut filter = BloomFilter::with_false_positive_rate(1000, 0.03).unwrap();
        for i in 0..1000 {
            filter.insert(format!("member-{}", i).as_bytes());
        }

        let trials = 20_000;
        let false_positives = (0..trials)
            .filter(|i| filter.contains(format!("outsider-{}", i).as_bytes()))
            .count();
        let observed = false_positives as f64 / trials as f64;

        // 3% target; 4.5% is more than ten standard deviations above it
        assert!(observed < 0.045, "observed false positive rate {}", observed);
        assert!(filter.estimated_false_positive_rate() < 0.035);
    }

    #[test]
    fn test_invalid_rate() {
        assert!(matches!(
            BloomFilter::with_false_positive_rate(10, 0.0),
            Err(FilterError::InvalidRate(_))
        ));
        assert!(matches!(
            BloomFilter::with_false_positive_rate(10, 1.0),
            Err(FilterError::InvalidRate(_))
        ));
        assert!(BloomFilter::with_false_positive_rate(10, f64::NAN).is_err());
    }

    #[test]
    fn test_zero_expected_items_still_usable() {
        let mut filter = BloomFilter::with_false_positive_rate(0, 0.03).unwrap();
        filter.insert(b"x");
        assert!(filter.contains(b"x"));
    }

    #[test]
    fn test_clone_answers_identically() {
        let mut filter = BloomFilter::with_false_positive_rate(10, 0.03).unwrap();
        filter.insert(b"kept");
        let copy = filter.clone();
        assert_eq!(copy, filter);
        assert!(copy.contains(b"kept"));
    }

    #[test]
    fn test_cbor_roundtrip_keeps_membership() {
        let mut filter = BloomFilter::with_false_positive_rate(10, 0.03).unwrap();
        filter.insert(b"member");

        let decoded: BloomFilter = from_cbor(&to_cbor(&filter).unwrap()).unwrap();
        assert_eq!(decoded, filter);
        assert!(decoded.contains(b"member"));
        assert_eq!(decoded.len(), 1);
    }

    #[test]
    fn test_decode_rejects_short_bitmap() {
        let bytes = to_cbor(&raw(vec![0], 4096, 3)).unwrap();
        assert!(from_cbor::<BloomFilter>(&bytes).is_err());
    }

    #[test]
    fn test_decode_rejects_empty_filter() {
        let bytes = to_cbor(&raw(Vec::new(), 0, 3)).unwrap();
        assert!(from_cbor::<BloomFilter>(&bytes).is_err());
    }

    #[test]
    fn test_decode_rejects_hash_count_out_of_range() {
        for num_hashes in [0, MAX_HASHES + 1] {
            let bytes = to_cbor(&raw(vec![0; 8], 64, num_hashes)).unwrap();
            assert!(from_cbor::<BloomFilter>(&bytes).is_err());
        }
    }

    #[test]
    fn test_try_from_reports_corruption() {
        assert!(matches!(
            BloomFilter::try_from(raw(vec![0; 2], 64, 3)),
            Err(FilterError::Corrupt(_))
        ));
        assert!(BloomFilter::try_from(raw(vec![0; 8], 64, 3)).is_ok());
    }
}
