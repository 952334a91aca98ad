use crate::error::Result;
use crate::record::HistoryRecord;
use parking_lot::Mutex;
use std::fs::{self, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Result of reading a whole primary sink
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scan {
    pub records: Vec<HistoryRecord>,
    /// 1-based positions of stored entries that could not be parsed
    pub unreadable: Vec<usize>,
}

/// Queryable append-only record store
/// Each insert is atomic per record; ordering of `scan` is the store's own
pub trait PrimarySink: Send + Sync {
    fn insert(&self, record: &HistoryRecord) -> Result<()>;
    fn scan(&self) -> Result<Scan>;

    /// Parsed records only
    fn find_all(&self) -> Result<Vec<HistoryRecord>> {
        Ok(self.scan()?.records)
    }
}

/// In-process collection, insertion ordered
#[derive(Debug, Default)]
pub struct MemoryCollection {
    records: Mutex<Vec<HistoryRecord>>,
}

impl MemoryCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl PrimarySink for MemoryCollection {
    fn insert(&self, record: &HistoryRecord) -> Result<()> {
        self.records.lock().push(record.clone());
        Ok(())
    }

    fn scan(&self) -> Result<Scan> {
        Ok(Scan {
            records: self.records.lock().clone(),
            unreadable: Vec::new(),
        })
    }
}

/// Collection file with one JSON record per line
#[derive(Debug)]
pub struct JsonlCollection {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlCollection {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PrimarySink for JsonlCollection {
    fn insert(&self, record: &HistoryRecord) -> Result<()> {
        let encoded = serde_json::to_string(record)?;

        let _guard = self.write_lock.lock();
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)?;

        let mut line = String::with_capacity(encoded.len() + 2);
        if !ends_with_newline(&mut file)? {
            // Terminate a line left unfinished by an interrupted write
            line.push('\n');
        }
        line.push_str(&encoded);
        line.push('\n');

        // Single write per record keeps lines whole
        file.write_all(line.as_bytes())?;
        file.flush()?;
        Ok(())
    }

    fn scan(&self) -> Result<Scan> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Scan::default()),
            Err(e) => return Err(e.into()),
        };

        let mut scan = Scan::default();
        for (index, line) in contents.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<HistoryRecord>(line) {
                Ok(record) => scan.records.push(record),
                Err(_) => scan.unreadable.push(index + 1),
            }
        }
        Ok(scan)
    }
}

/// Empty files count as terminated
fn ends_with_newline(file: &mut fs::File) -> Result<bool> {
    if file.metadata()?.len() == 0 {
        return Ok(true);
    }
    let mut last = [0u8; 1];
    file.seek(SeekFrom::End(-1))?;
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}
