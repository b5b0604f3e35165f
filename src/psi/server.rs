//! Server role: publishes its masked set and re-masks client requests

use super::batch::{BatchMasker, BatchOptions};
use super::filter::BloomFilter;
use super::messages::{ClientRequest, MembershipIndex, ServerResponse, ServerSetup};
use super::{check_fingerprint, MatchMode, PsiError};
use crate::crypto::{CommutativeCipher, MaskedValue};

/// Server side of one PSI session
///
/// The masked set U is computed once in [`PsiServer::new`]; the same
/// instance can then answer any number of client requests. A server built
/// with [`PsiServer::responder`] holds no set and can only answer requests.
pub struct PsiServer {
    cipher: CommutativeCipher,
    masker: BatchMasker,
    masked: Option<Vec<MaskedValue>>,
}

impl PsiServer {
    /// Mask the server set under `cipher`
    pub fn new<T>(
        cipher: CommutativeCipher,
        elements: &[T],
        options: BatchOptions,
    ) -> Result<Self, PsiError>
    where
        T: AsRef<[u8]> + Sync,
    {
        let masker = BatchMasker::new(options)?;
        let masked = masker.encrypt_all(&cipher, elements)?;

        tracing::info!(
            group = cipher.group_name(),
            set_size = masked.len(),
            "server set masked"
        );

        Ok(Self {
            cipher,
            masker,
            masked: Some(masked),
        })
    }

    /// Server that answers client requests with `cipher` but publishes no set
    pub fn responder(cipher: CommutativeCipher, options: BatchOptions) -> Result<Self, PsiError> {
        let masker = BatchMasker::new(options)?;
        tracing::debug!(group = cipher.group_name(), "responder ready");
        Ok(Self {
            cipher,
            masker,
            masked: None,
        })
    }

    pub fn cipher(&self) -> &CommutativeCipher {
        &self.cipher
    }

    /// Size of the masked set (0 for a responder)
    pub fn set_size(&self) -> usize {
        self.masked.as_ref().map_or(0, Vec::len)
    }

    /// Build the setup message for `mode`
    pub fn setup(&self, mode: MatchMode) -> Result<ServerSetup, PsiError> {
        let masked = self.masked.as_ref().ok_or(PsiError::NoServerSet)?;
        let index = match mode {
            MatchMode::Exact => MembershipIndex::Exact(masked.iter().cloned().collect()),
            MatchMode::Filter {
                false_positive_rate,
            } => {
                let mut filter =
                    BloomFilter::with_false_positive_rate(masked.len(), false_positive_rate)?;
                for value in masked {
                    filter.insert(value.as_bytes());
                }
                tracing::debug!(
                    bits = filter.num_bits(),
                    hashes = filter.num_hashes(),
                    "membership filter built"
                );
                MembershipIndex::Filter(filter)
            }
        };

        Ok(ServerSetup {
            fingerprint: self.cipher.suite_fingerprint(),
            set_size: masked.len() as u64,
            index,
        })
    }

    /// Re-mask a client request, preserving order
    pub fn respond(&self, request: &ClientRequest) -> Result<ServerResponse, PsiError> {
        check_fingerprint(
            "client request",
            self.cipher.suite_fingerprint(),
            request.fingerprint,
        )?;

        let masked = self.masker.reencrypt_all(&self.cipher, &request.masked)?;
        tracing::info!(count = masked.len(), "client request re-masked");

        Ok(ServerResponse {
            fingerprint: self.cipher.suite_fingerprint(),
            masked,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::group::{p256, ristretto255};
    use crate::crypto::SuiteFingerprint;
    use crate::crypto::{GroupId, Scalar};
    use crate::psi::BatchError;

    const DST: &str = "SERVER-TEST-V01";

    fn server_set() -> Vec<String> {
        (0..8).map(|i| format!("Example {}", i)).collect()
    }

    #[test]
    fn test_exact_setup_contains_every_masked_element() {
        let cipher = CommutativeCipher::with_new_key(ristretto255(), DST).unwrap();
        let items = server_set();
        let expected: Vec<MaskedValue> =
            items.iter().map(|s| cipher.encrypt(s.as_bytes()).unwrap()).collect();

        let server = PsiServer::new(cipher, &items, BatchOptions::default()).unwrap();
        let setup = server.setup(MatchMode::Exact).unwrap();

        assert_eq!(setup.set_size, 8);
        assert_eq!(setup.fingerprint, server.cipher().suite_fingerprint());
        for value in &expected {
            assert!(setup.index.contains(value));
        }
    }

    #[test]
    fn test_filter_setup_has_no_false_negatives() {
        let cipher = CommutativeCipher::with_new_key(p256(), DST).unwrap();
        let items = server_set();
        let expected: Vec<MaskedValue> =
            items.iter().map(|s| cipher.encrypt(s.as_bytes()).unwrap()).collect();

        let server = PsiServer::new(cipher, &items, BatchOptions::with_threads(2)).unwrap();
        let setup = server
            .setup(MatchMode::Filter {
                false_positive_rate: 0.01,
            })
            .unwrap();

        assert!(setup.index.is_filter());
        for value in &expected {
            assert!(setup.index.contains(value));
        }
    }

    #[test]
    fn test_invalid_filter_rate_rejected() {
        let cipher = CommutativeCipher::with_new_key(ristretto255(), DST).unwrap();
        let server = PsiServer::new(cipher, &server_set(), BatchOptions::default()).unwrap();
        assert!(matches!(
            server.setup(MatchMode::Filter {
                false_positive_rate: 1.5
            }),
            Err(PsiError::Filter(_))
        ));
    }

    #[test]
    fn test_responder_remasks_without_set() {
        let key = Scalar::random(ristretto255().as_ref());
        let full = PsiServer::new(
            CommutativeCipher::from_key(ristretto255(), DST, &key).unwrap(),
            &server_set(),
            BatchOptions::default(),
        )
        .unwrap();
        let responder = PsiServer::responder(
            CommutativeCipher::from_key(ristretto255(), DST, &key).unwrap(),
            BatchOptions::with_threads(1),
        )
        .unwrap();
        assert_eq!(responder.set_size(), 0);

        let client = CommutativeCipher::with_new_key(ristretto255(), DST).unwrap();
        let request = ClientRequest {
            fingerprint: client.suite_fingerprint(),
            masked: vec![
                client.encrypt(b"Example 1").unwrap(),
                client.encrypt(b"outsider").unwrap(),
            ],
        };

        assert_eq!(
            responder.respond(&request).unwrap(),
            full.respond(&request).unwrap()
        );
    }

    #[test]
    fn test_responder_cannot_publish_setup() {
        let cipher = CommutativeCipher::with_new_key(ristretto255(), DST).unwrap();
        let responder = PsiServer::responder(cipher, BatchOptions::default()).unwrap();
        assert!(matches!(
            responder.setup(MatchMode::Exact),
            Err(PsiError::NoServerSet)
        ));
    }

    #[test]
    fn test_respond_rejects_foreign_suite() {
        let cipher = CommutativeCipher::with_new_key(ristretto255(), DST).unwrap();
        let server = PsiServer::new(cipher, &server_set(), BatchOptions::default()).unwrap();

        let request = ClientRequest {
            fingerprint: SuiteFingerprint::new(GroupId::P256, DST),
            masked: Vec::new(),
        };
        assert!(matches!(
            server.respond(&request),
            Err(PsiError::SuiteMismatch { .. })
        ));
    }

    #[test]
    fn test_respond_reports_bad_element_index() {
        let cipher = CommutativeCipher::with_new_key(ristretto255(), DST).unwrap();
        let fingerprint = cipher.suite_fingerprint();
        let server = PsiServer::new(cipher, &server_set(), BatchOptions::default()).unwrap();

        let good = server.cipher().encrypt(b"anything").unwrap();
        let request = ClientRequest {
            fingerprint,
            masked: vec![good, MaskedValue::from_bytes(vec![0u8; 3])],
        };
        assert!(matches!(
            server.respond(&request),
            Err(PsiError::Batch(BatchError::Element { index: 1, .. }))
        ));
    }
}
