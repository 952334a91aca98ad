//! Encrypted conversion history, fanned out to two independent sinks.
//!
//! Every append is attempted on both sinks; there is no transaction between
//! them. The primary sink is authoritative for reads. The secondary sink is a
//! JSON array rewritten on each append; the resource serializes concurrent
//! updates, so any number of ledgers may share one file.

use crate::cipher::Cipher;
use crate::error::{MeasursError, Result};
use crate::observe::{Event, Observer, SinkKind};
use crate::record::{HistoryEntry, HistoryRecord};
use crate::sink::{parse_records, read_records, ByteResource, PrimarySink};
use std::sync::Arc;

pub struct Ledger {
    cipher: Cipher,
    primary: Arc<dyn PrimarySink>,
    secondary: Arc<dyn ByteResource>,
    observer: Arc<dyn Observer>,
}

impl Ledger {
    pub fn new(
        cipher: Cipher,
        primary: Arc<dyn PrimarySink>,
        secondary: Arc<dyn ByteResource>,
        observer: Arc<dyn Observer>,
    ) -> Self {
        Self {
            cipher,
            primary,
            secondary,
            observer,
        }
    }

    pub fn cipher(&self) -> &Cipher {
        &self.cipher
    }

    /// Encrypt an (input, output) pair into a storable record
    pub fn seal(&self, input: &str, output: &[u64]) -> Result<HistoryRecord> {
        let serialized = serde_json::to_vec(output)?;
        Ok(HistoryRecord {
            input: self.cipher.encrypt(input.as_bytes())?,
            output: self.cipher.encrypt(&serialized)?,
        })
    }

    /// Encrypt and write one record to both sinks
    /// Both sinks are always attempted; the error names every sink that failed
    pub fn append(&self, input: &str, output: &[u64]) -> Result<()> {
        let record = match self.seal(input, output) {
            Ok(record) => record,
            Err(e) => {
                self.observer.observe(&Event::EncryptFailed {
                    error: e.to_string(),
                });
                return Err(e);
            }
        };

        let mut failures = Vec::new();
        if let Err(e) = self.primary.insert(&record) {
            failures.push((SinkKind::Primary, e));
        }
        if let Err(e) = self.append_secondary(&record) {
            failures.push((SinkKind::Secondary, e));
        }

        if failures.is_empty() {
            return Ok(());
        }

        for (sink, error) in &failures {
            self.observer.observe(&Event::PersistenceFailed {
                sink: *sink,
                error: error.to_string(),
            });
        }
        Err(MeasursError::PersistenceFailure {
            sinks: failures
                .iter()
                .map(|(sink, _)| sink.to_string())
                .collect::<Vec<_>>()
                .join(", "),
            detail: failures
                .iter()
                .map(|(sink, error)| format!("{}: {}", sink, error))
                .collect::<Vec<_>>()
                .join("; "),
        })
    }

    /// Every primary record that decrypts, in primary order
    /// Records that fail to parse or decrypt are reported to the observer
    /// and left out
    pub fn read_all(&self) -> Result<Vec<HistoryEntry>> {
        let scan = self.primary.scan()?;
        for position in scan.unreadable {
            self.observer.observe(&Event::UnreadableSkipped {
                sink: SinkKind::Primary,
                position,
            });
        }

        let records = scan.records;
        let mut entries = Vec::with_capacity(records.len());

        for (index, record) in records.iter().enumerate() {
            match self.decrypt_record(record) {
                Ok(entry) => entries.push(entry),
                Err(e) => self.observer.observe(&Event::DecryptSkipped {
                    index,
                    error: e.to_string(),
                }),
            }
        }

        Ok(entries)
    }

    /// Decrypt both fields of one record
    pub fn decrypt_record(&self, record: &HistoryRecord) -> Result<HistoryEntry> {
        let input = String::from_utf8(self.cipher.decrypt(&record.input)?).map_err(|_| {
            MeasursError::AuthenticationOrPaddingError("input is not valid UTF-8".into())
        })?;
        let output = serde_json::from_slice(&self.cipher.decrypt(&record.output)?)?;
        Ok(HistoryEntry { input, output })
    }

    /// Raw encrypted contents of the secondary sink
    pub fn read_secondary(&self) -> Result<Vec<HistoryRecord>> {
        read_records(self.secondary.as_ref())
    }

    fn append_secondary(&self, record: &HistoryRecord) -> Result<()> {
        self.secondary.update(&mut |current| {
            // An unparsable array fails here instead of being overwritten
            let mut records = parse_records(current)?;
            records.push(record.clone());
            Ok(serde_json::to_vec_pretty(&records)?)
        })
    }
}

impl std::fmt::Debug for Ledger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ledger")
            .field("cipher", &self.cipher)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cipher::EncryptionKey;
    use crate::observe::RecordingObserver;
    use crate::sink::{MemoryCollection, MemoryResource};

    struct Fixture {
        ledger: Ledger,
        primary: Arc<MemoryCollection>,
        secondary: Arc<MemoryResource>,
        observer: Arc<RecordingObserver>,
    }

    fn fixture() -> Fixture {
        let primary = Arc::new(MemoryCollection::new());
        let secondary = Arc::new(MemoryResource::new());
        let observer = Arc::new(RecordingObserver::new());
        let ledger = Ledger::new(
            Cipher::new(&EncryptionKey::generate()),
            primary.clone(),
            secondary.clone(),
            observer.clone(),
        );
        Fixture {
            ledger,
            primary,
            secondary,
            observer,
        }
    }

    #[test]
    fn test_append_writes_both_sinks() {
        let f = fixture();
        f.ledger.append("abbcc", &[2, 6]).unwrap();

        assert_eq!(f.primary.len(), 1);
        let secondary = f.ledger.read_secondary().unwrap();
        assert_eq!(secondary.len(), 1);
        assert_eq!(secondary, f.primary.find_all().unwrap());
    }

    #[test]
    fn test_records_are_encrypted() {
        let f = fixture();
        f.ledger.append("abbcc", &[2, 6]).unwrap();

        let raw = f.secondary.read().unwrap().unwrap();
        let text = String::from_utf8(raw).unwrap();
        assert!(!text.contains("abbcc"));
        assert!(!text.contains("[2,6]"));
    }

    #[test]
    fn test_read_all_decrypts_in_order() {
        let f = fixture();
        f.ledger.append("abbcc", &[2, 6]).unwrap();
        f.ledger.append("", &[]).unwrap();

        let entries = f.ledger.read_all().unwrap();
        assert_eq!(
            entries,
            vec![
                HistoryEntry {
                    input: "abbcc".into(),
                    output: vec![2, 6],
                },
                HistoryEntry {
                    input: String::new(),
                    output: vec![],
                },
            ]
        );
        assert!(f.observer.events().is_empty());
    }

    #[test]
    fn test_foreign_key_record_is_skipped() {
        let f = fixture();
        let old = fixture();
        let stale = old.ledger.seal("aa", &[1]).unwrap();
        f.primary.insert(&stale).unwrap();
        f.ledger.append("abbcc", &[2, 6]).unwrap();

        let entries = f.ledger.read_all().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].input, "abbcc");
        assert_eq!(f.observer.decrypt_skips(), 1);
        assert!(matches!(
            f.observer.events()[0],
            Event::DecryptSkipped { index: 0, .. }
        ));
    }

    #[test]
    fn test_corrupt_secondary_is_not_overwritten() {
        let primary = Arc::new(MemoryCollection::new());
        let secondary = Arc::new(MemoryResource::with_contents("{ not an array"));
        let observer = Arc::new(RecordingObserver::new());
        let ledger = Ledger::new(
            Cipher::new(&EncryptionKey::generate()),
            primary.clone(),
            secondary.clone(),
            observer.clone(),
        );

        let err = ledger.append("aa", &[1]).unwrap_err();
        assert!(matches!(
            err,
            MeasursError::PersistenceFailure { ref sinks, .. } if sinks == "secondary"
        ));
        assert_eq!(primary.len(), 1);
        assert_eq!(secondary.read().unwrap().unwrap(), b"{ not an array");
        assert_eq!(observer.persistence_failures(), 1);
    }

    #[test]
    fn test_unreadable_primary_line_is_observed() {
        let dir = tempfile::tempdir().unwrap();
        let primary = Arc::new(crate::sink::JsonlCollection::new(dir.path().join("h.jsonl")));
        let observer = Arc::new(RecordingObserver::new());
        let ledger = Ledger::new(
            Cipher::new(&EncryptionKey::generate()),
            primary.clone(),
            Arc::new(MemoryResource::new()),
            observer.clone(),
        );

        ledger.append("aa", &[1]).unwrap();
        std::fs::write(
            primary.path(),
            format!("garbage\n{}", std::fs::read_to_string(primary.path()).unwrap()),
        )
        .unwrap();

        assert_eq!(ledger.read_all().unwrap().len(), 1);
        assert_eq!(
            observer.events(),
            vec![Event::UnreadableSkipped {
                sink: SinkKind::Primary,
                position: 1,
            }]
        );
    }

    #[test]
    fn test_blank_secondary_counts_as_empty() {
        let f = fixture();
        f.secondary.write(b"  \n").unwrap();
        assert!(f.ledger.read_secondary().unwrap().is_empty());
        f.ledger.append("aa", &[1]).unwrap();
        assert_eq!(f.ledger.read_secondary().unwrap().len(), 1);
    }
}
