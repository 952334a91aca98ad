use crate::error::Result;
use crate::record::HistoryRecord;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use tempfile::NamedTempFile;

/// Single serialized byte resource backing the secondary sink
pub trait ByteResource: Send + Sync {
    /// Current contents, `None` if the resource was never written
    fn read(&self) -> Result<Option<Vec<u8>>>;

    /// Replace the contents with `f(current)`
    /// Updates of the same underlying resource are serialized within the
    /// process, however many handles point at it
    fn update(&self, f: &mut dyn FnMut(Option<&[u8]>) -> Result<Vec<u8>>) -> Result<()>;

    /// Replace the whole contents
    fn write(&self, bytes: &[u8]) -> Result<()> {
        self.update(&mut |_| Ok(bytes.to_vec()))
    }
}

/// Parse a secondary resource's contents as a record array
/// Missing or whitespace-only contents are an empty history
pub fn parse_records(bytes: Option<&[u8]>) -> Result<Vec<HistoryRecord>> {
    match bytes {
        Some(bytes) if !bytes.iter().all(u8::is_ascii_whitespace) => {
            Ok(serde_json::from_slice(bytes)?)
        }
        _ => Ok(Vec::new()),
    }
}

/// Read and parse every record held by `resource`
pub fn read_records(resource: &dyn ByteResource) -> Result<Vec<HistoryRecord>> {
    parse_records(resource.read()?.as_deref())
}

/// Local file, replaced atomically on every write
#[derive(Debug, Clone)]
pub struct FileResource {
    path: PathBuf,
}

impl FileResource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn parent(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }
}

impl ByteResource for FileResource {
    fn read(&self) -> Result<Option<Vec<u8>>> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn update(&self, f: &mut dyn FnMut(Option<&[u8]>) -> Result<Vec<u8>>) -> Result<()> {
        let parent = self.parent();
        fs::create_dir_all(parent)?;

        let lock = file_lock(parent, &self.path)?;
        let _guard = lock.lock();

        let current = self.read()?;
        let next = f(current.as_deref())?;
        atomic_write(parent, &self.path, &next)
    }
}

/// One lock per canonical file path, shared by every handle in the process
fn file_lock(parent: &Path, path: &Path) -> Result<Arc<Mutex<()>>> {
    static LOCKS: OnceLock<Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>> = OnceLock::new();

    let mut key = fs::canonicalize(parent)?;
    if let Some(name) = path.file_name() {
        key.push(name);
    }
    let locks = LOCKS.get_or_init(Default::default);
    Ok(locks.lock().entry(key).or_default().clone())
}

fn atomic_write(dir: &Path, path: &Path, data: &[u8]) -> Result<()> {
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// In-memory resource
#[derive(Debug, Default)]
pub struct MemoryResource {
    bytes: Mutex<Option<Vec<u8>>>,
}

impl MemoryResource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from existing contents
    pub fn with_contents(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: Mutex::new(Some(bytes.into())),
        }
    }
}

impl ByteResource for MemoryResource {
    fn read(&self) -> Result<Option<Vec<u8>>> {
        Ok(self.bytes.lock().clone())
    }

    fn update(&self, f: &mut dyn FnMut(Option<&[u8]>) -> Result<Vec<u8>>) -> Result<()> {
        let mut bytes = self.bytes.lock();
        let next = f(bytes.as_deref())?;
        *bytes = Some(next);
        Ok(())
    }
}
