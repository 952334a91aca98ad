use measurs::cipher::{Cipher, EncryptionKey};
use measurs::config::Config;
use measurs::keystore::StaticKeyStore;
use measurs::ledger::Ledger;
use measurs::observe::{Event, RecordingObserver};
use measurs::sink::{
    read_records, ByteResource, FileResource, JsonlCollection, MemoryCollection, PrimarySink,
};
use measurs::{Grammar, HistoryRecord, Service};
use std::error::Error;
use std::sync::Arc;
use std::thread;
use tempfile::tempdir;

fn file_ledger(
    dir: &std::path::Path,
    key: &EncryptionKey,
    observer: Arc<RecordingObserver>,
) -> Ledger {
    Ledger::new(
        Cipher::new(key),
        Arc::new(JsonlCollection::new(dir.join("history.jsonl"))),
        Arc::new(FileResource::new(dir.join("history.json"))),
        observer,
    )
}

#[test]
fn concurrent_appends_lose_no_records() -> Result<(), Box<dyn Error>> {
    const THREADS: usize = 8;
    const PER_THREAD: usize = 10;

    let dir = tempdir()?;
    let observer = Arc::new(RecordingObserver::new());
    let ledger = Arc::new(file_ledger(dir.path(), &EncryptionKey::generate(), observer.clone()));

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let ledger = Arc::clone(&ledger);
            thread::spawn(move || {
                for i in 0..PER_THREAD {
                    let input = format!("a{}", char::from(b'a' + (t as u8)));
                    ledger
                        .append(&input, &[(t * PER_THREAD + i) as u64])
                        .expect("append should succeed");
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("worker panicked");
    }

    let expected = THREADS * PER_THREAD;
    assert_eq!(ledger.read_secondary()?.len(), expected);
    assert_eq!(ledger.read_all()?.len(), expected);
    assert_eq!(observer.persistence_failures(), 0);

    // Every appended total appears exactly once
    let mut totals: Vec<u64> = ledger
        .read_all()?
        .into_iter()
        .flat_map(|entry| entry.output)
        .collect();
    totals.sort();
    assert_eq!(totals, (0..expected as u64).collect::<Vec<_>>());

    Ok(())
}

#[test]
fn services_sharing_a_directory_lose_no_records() -> Result<(), Box<dyn Error>> {
    const SERVICES: usize = 8;
    const PER_SERVICE: usize = 20;

    let dir = tempdir()?;
    let config = Config::in_dir(dir.path());
    // Create the key once so every service opens with the same one
    config.open_service(Arc::new(RecordingObserver::new()))?;

    let observer = Arc::new(RecordingObserver::new());
    let handles: Vec<_> = (0..SERVICES)
        .map(|_| {
            let config = config.clone();
            let observer = observer.clone();
            thread::spawn(move || {
                let service = config
                    .open_service(observer)
                    .expect("service should open");
                for _ in 0..PER_SERVICE {
                    service.convert("abbcc").expect("convert should succeed");
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("worker panicked");
    }

    let expected = SERVICES * PER_SERVICE;
    let primary = JsonlCollection::new(&config.collection_file).find_all()?;
    let secondary = read_records(&FileResource::new(&config.history_file))?;
    assert_eq!(primary.len(), expected);
    assert_eq!(secondary.len(), expected);
    assert_eq!(observer.persistence_failures(), 0);

    let mut left = primary.clone();
    let mut right = secondary;
    left.sort_by(|a, b| a.input.cmp(&b.input));
    right.sort_by(|a, b| a.input.cmp(&b.input));
    assert_eq!(left, right);

    Ok(())
}

#[test]
fn history_skips_records_from_an_old_key() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let old_key = EncryptionKey::generate();
    let new_key = EncryptionKey::generate();

    let old_observer = Arc::new(RecordingObserver::new());
    file_ledger(dir.path(), &old_key, old_observer).append("aa", &[1])?;

    let observer = Arc::new(RecordingObserver::new());
    let service = Service::open(
        Grammar::Package,
        &StaticKeyStore::new(new_key),
        Arc::new(JsonlCollection::new(dir.path().join("history.jsonl"))),
        Arc::new(FileResource::new(dir.path().join("history.json"))),
        observer.clone(),
    )?;
    service.convert("abbcc")?;

    let history = service.history()?;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].input, "abbcc");
    assert_eq!(history[0].output, vec![2, 6]);
    assert_eq!(observer.decrypt_skips(), 1);

    // Both records are still stored; nothing was discarded
    assert_eq!(service.ledger().read_secondary()?.len(), 2);

    Ok(())
}

#[test]
fn garbage_record_is_skipped_not_fatal() -> Result<(), Box<dyn Error>> {
    let primary = Arc::new(MemoryCollection::new());
    let observer = Arc::new(RecordingObserver::new());
    let ledger = Ledger::new(
        Cipher::new(&EncryptionKey::generate()),
        primary.clone(),
        Arc::new(measurs::sink::MemoryResource::new()),
        observer.clone(),
    );

    primary.insert(&HistoryRecord {
        input: vec![1, 2, 3],
        output: Vec::new(),
    })?;
    ledger.append("a_", &[0])?;

    let entries = ledger.read_all()?;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].input, "a_");
    assert_eq!(
        observer.count(|e| matches!(e, Event::DecryptSkipped { index: 0, .. })),
        1
    );

    Ok(())
}

#[test]
fn secondary_file_is_a_json_array_of_records() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let config = Config::in_dir(dir.path());
    let service = config.open_service(Arc::new(RecordingObserver::new()))?;

    service.convert("abbcc")?;
    service.convert("")?;

    let raw = FileResource::new(&config.history_file)
        .read()?
        .expect("history file should exist");
    let records: Vec<HistoryRecord> = serde_json::from_slice(&raw)?;
    assert_eq!(records.len(), 2);

    let collection = JsonlCollection::new(&config.collection_file).find_all()?;
    assert_eq!(records, collection);

    let decrypted: Vec<_> = records
        .iter()
        .map(|r| service.ledger().decrypt_record(r))
        .collect::<Result<_, _>>()?;
    assert_eq!(decrypted[1].input, "");
    assert!(decrypted[1].output.is_empty());

    Ok(())
}
