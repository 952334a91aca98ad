use crate::cipher::Cipher;
use crate::codec::{decode, Grammar};
use crate::error::Result;
use crate::keystore::KeyStore;
use crate::ledger::Ledger;
use crate::observe::{Event, Observer};
use crate::record::HistoryEntry;
use crate::sink::{ByteResource, PrimarySink};
use std::sync::Arc;

/// The two operations consumers call: `convert` and `history`
pub struct Service {
    grammar: Grammar,
    ledger: Ledger,
    observer: Arc<dyn Observer>,
}

impl Service {
    pub fn new(grammar: Grammar, ledger: Ledger, observer: Arc<dyn Observer>) -> Self {
        Self {
            grammar,
            ledger,
            observer,
        }
    }

    /// Load the key, then wire cipher, ledger and sinks together
    /// Fails with `KeyUnavailable` before anything can be served
    pub fn open(
        grammar: Grammar,
        keys: &dyn KeyStore,
        primary: Arc<dyn PrimarySink>,
        secondary: Arc<dyn ByteResource>,
        observer: Arc<dyn Observer>,
    ) -> Result<Self> {
        let key = keys.load_key()?;
        let cipher = Cipher::new(&key);
        tracing::debug!(fingerprint = %cipher.fingerprint(), %grammar, "service ready");
        let ledger = Ledger::new(cipher, primary, secondary, observer.clone());
        Ok(Self::new(grammar, ledger, observer))
    }

    pub fn grammar(&self) -> Grammar {
        self.grammar
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Decode `input` and record the conversion
    /// Decode errors are returned and nothing is recorded. Recording errors
    /// are reported by the ledger and do not affect the returned totals.
    pub fn convert(&self, input: &str) -> Result<Vec<u64>> {
        let totals = match decode(input, self.grammar) {
            Ok(totals) => totals,
            Err(e) => {
                self.observer.observe(&Event::DecodeFailed {
                    error: e.to_string(),
                });
                return Err(e);
            }
        };

        if self.ledger.append(input, &totals).is_ok() {
            self.observer.observe(&Event::Converted {
                packages: totals.len(),
            });
        }
        Ok(totals)
    }

    /// Decrypted history from the primary sink
    pub fn history(&self) -> Result<Vec<HistoryEntry>> {
        self.ledger.read_all()
    }
}

impl std::fmt::Debug for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Service")
            .field("grammar", &self.grammar)
            .field("ledger", &self.ledger)
            .finish_non_exhaustive()
    }
}
