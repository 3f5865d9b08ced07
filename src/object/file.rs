//! File Object Implementation
//!
//! File objects expose named byte stores to AtomicReadFile and
//! AtomicWriteFile. Each object is bound to one [`BackingStore`]; the
//! default store is a file on the local filesystem.
//!
//! Only stream access is supported. Reads never lock; writes to the same
//! object are serialized so a concurrent writer cannot interleave octets.

use std::fs::{self, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};

use chrono::{DateTime, Local, NaiveDateTime};
use log::{debug, error, warn};
use thiserror::Error;

use super::registry::{ObjectFunctions, ObjectRegistry, PropertyLists};
use super::{
    Date, DispatchError, ObjectType, PropertyError, PropertyIdentifier, PropertyReadRequest,
    PropertyValue, PropertyWriteRequest, Time,
};
use crate::encoding;

/// BACnetFileAccessMethod stream-access
pub const FILE_STREAM_ACCESS: u32 = 1;

pub type Result<T> = core::result::Result<T, FileError>;

#[derive(Debug, Error)]
pub enum FileError {
    #[error("no file object with instance {0}")]
    NotFound(u32),
    #[error("negative start position {0}")]
    InvalidStartPosition(i32),
    #[error("file {instance}: {source}")]
    Io {
        instance: u32,
        #[source]
        source: io::Error,
    },
}

impl FileError {
    /// The pair reported to a peer.
    pub fn to_property_error(&self) -> PropertyError {
        match self {
            FileError::NotFound(_) => PropertyError::UNKNOWN_OBJECT,
            FileError::InvalidStartPosition(_) => PropertyError::INVALID_FILE_START_POSITION,
            FileError::Io { .. } => PropertyError::FILE_ACCESS_DENIED,
        }
    }
}

/// Byte storage behind one file object
pub trait BackingStore: Send + Sync {
    /// Current size, or `None` when the store does not exist yet
    fn size(&self) -> io::Result<Option<u64>>;

    /// Up to `max_len` octets from `offset`, or `None` when the store does
    /// not exist
    fn read(&self, offset: u64, max_len: usize) -> io::Result<Option<Vec<u8>>>;

    /// Write `data` at `offset`. Offset 0 replaces the whole contents; any
    /// other offset requires an existing store.
    fn write(&self, offset: u64, data: &[u8]) -> io::Result<()>;

    /// Time of the last change, if known
    fn modified(&self) -> io::Result<Option<NaiveDateTime>>;
}

/// A file on the local filesystem
#[derive(Debug, Clone)]
pub struct FileSystemStore {
    path: PathBuf,
}

impl FileSystemStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn missing_as_none<T>(result: io::Result<T>) -> io::Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

impl BackingStore for FileSystemStore {
    fn size(&self) -> io::Result<Option<u64>> {
        Ok(missing_as_none(fs::metadata(&self.path))?.map(|m| m.len()))
    }

    fn read(&self, offset: u64, max_len: usize) -> io::Result<Option<Vec<u8>>> {
        let Some(mut file) = missing_as_none(fs::File::open(&self.path))? else {
            return Ok(None);
        };
        file.seek(SeekFrom::Start(offset))?;
        let mut data = Vec::with_capacity(max_len.min(4096));
        file.take(max_len as u64).read_to_end(&mut data)?;
        Ok(Some(data))
    }

    fn write(&self, offset: u64, data: &[u8]) -> io::Result<()> {
        let mut file = if offset == 0 {
            fs::File::create(&self.path)?
        } else {
            OpenOptions::new().read(true).write(true).open(&self.path)?
        };
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(data)?;
        file.flush()
    }

    fn modified(&self) -> io::Result<Option<NaiveDateTime>> {
        let Some(metadata) = missing_as_none(fs::metadata(&self.path))? else {
            return Ok(None);
        };
        let modified = metadata.modified()?;
        Ok(Some(DateTime::<Local>::from(modified).naive_local()))
    }
}

/// An in-memory store
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: RwLock<Option<Vec<u8>>>,
    modified: RwLock<Option<NaiveDateTime>>,
}

fn poisoned<T>(_: std::sync::PoisonError<T>) -> io::Error {
    io::Error::other("memory store lock poisoned")
}

impl MemoryStore {
    /// A store that does not exist until first written at offset 0
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_contents(contents: impl Into<Vec<u8>>) -> Self {
        Self {
            data: RwLock::new(Some(contents.into())),
            modified: RwLock::new(Some(Local::now().naive_local())),
        }
    }
}

impl BackingStore for MemoryStore {
    fn size(&self) -> io::Result<Option<u64>> {
        Ok(self.data.read().map_err(poisoned)?.as_ref().map(|d| d.len() as u64))
    }

    fn read(&self, offset: u64, max_len: usize) -> io::Result<Option<Vec<u8>>> {
        let data = self.data.read().map_err(poisoned)?;
        Ok(data.as_ref().map(|d| {
            let start = usize::try_from(offset).unwrap_or(usize::MAX).min(d.len());
            let end = start.saturating_add(max_len).min(d.len());
            d[start..end].to_vec()
        }))
    }

    fn write(&self, offset: u64, bytes: &[u8]) -> io::Result<()> {
        let offset = usize::try_from(offset).map_err(|_| io::Error::from(io::ErrorKind::InvalidInput))?;
        let mut data = self.data.write().map_err(poisoned)?;
        if offset == 0 {
            *data = Some(Vec::new());
        }
        let contents = data
            .as_mut()
            .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))?;
        let end = offset + bytes.len();
        if contents.len() < end {
            contents.resize(end, 0);
        }
        contents[offset..end].copy_from_slice(bytes);
        *self.modified.write().map_err(poisoned)? = Some(Local::now().naive_local());
        Ok(())
    }

    fn modified(&self) -> io::Result<Option<NaiveDateTime>> {
        Ok(*self.modified.read().map_err(poisoned)?)
    }
}

/// Configuration of one file object
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FileEntry {
    pub instance: u32,
    /// Path of the backing file; also reported as the description
    pub path: String,
    /// Value of the file-type property
    pub file_type: String,
}

impl FileEntry {
    pub fn new(instance: u32, path: impl Into<String>) -> Self {
        Self {
            instance,
            path: path.into(),
            file_type: "TEXT".into(),
        }
    }

    /// Three text files, `temp_0.txt` to `temp_2.txt`
    pub fn defaults() -> Vec<FileEntry> {
        (0..3).map(|i| FileEntry::new(i, format!("temp_{i}.txt"))).collect()
    }
}

/// Outcome of a stream read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtomicReadResult {
    pub data: Vec<u8>,
    pub end_of_file: bool,
}

struct FileSlot {
    entry: FileEntry,
    store: Box<dyn BackingStore>,
    write_lock: Mutex<()>,
}

/// All file objects of the device
#[derive(Default)]
pub struct FileObjects {
    files: Vec<FileSlot>,
}

impl std::fmt::Debug for FileObjects {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.files.iter().map(|s| &s.entry))
            .finish()
    }
}

static FILE_REQUIRED: [PropertyIdentifier; 9] = [
    PropertyIdentifier::ObjectIdentifier,
    PropertyIdentifier::ObjectName,
    PropertyIdentifier::ObjectType,
    PropertyIdentifier::FileType,
    PropertyIdentifier::FileSize,
    PropertyIdentifier::ModificationDate,
    PropertyIdentifier::Archive,
    PropertyIdentifier::ReadOnly,
    PropertyIdentifier::FileAccessMethod,
];

static FILE_OPTIONAL: [PropertyIdentifier; 1] = [PropertyIdentifier::Description];

impl FileObjects {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind each entry to a file under `base_dir`.
    pub fn on_filesystem(entries: Vec<FileEntry>, base_dir: impl AsRef<Path>) -> Self {
        let base_dir = base_dir.as_ref();
        entries.into_iter().fold(Self::new(), |files, entry| {
            let store = FileSystemStore::new(base_dir.join(&entry.path));
            files.with_file(entry, store)
        })
    }

    /// Add a file object. An entry reusing an instance number replaces the
    /// earlier one.
    pub fn with_file(mut self, entry: FileEntry, store: impl BackingStore + 'static) -> Self {
        self.files.retain(|s| s.entry.instance != entry.instance);
        self.files.push(FileSlot {
            entry,
            store: Box::new(store),
            write_lock: Mutex::new(()),
        });
        self
    }

    fn slot(&self, instance: u32) -> Result<&FileSlot> {
        self.files
            .iter()
            .find(|s| s.entry.instance == instance)
            .ok_or(FileError::NotFound(instance))
    }

    /// Path of a file object
    pub fn file_name(&self, instance: u32) -> Option<&str> {
        self.slot(instance).ok().map(|s| s.entry.path.as_str())
    }

    /// Instance bound to `path`, first match wins
    pub fn instance_by_name(&self, path: &str) -> Option<u32> {
        self.files
            .iter()
            .find(|s| s.entry.path == path)
            .map(|s| s.entry.instance)
    }

    /// Current size in octets; a store that does not exist yet is empty
    pub fn file_size(&self, instance: u32) -> Result<u64> {
        let slot = self.slot(instance)?;
        let size = slot
            .store
            .size()
            .map_err(|source| FileError::Io { instance, source })?;
        Ok(size.unwrap_or(0))
    }

    /// Read up to `count` octets from `start`.
    ///
    /// Fewer octets than requested means the end of the file was reached.
    /// A store that does not exist reads as empty at end of file.
    pub fn atomic_read(&self, instance: u32, start: i32, count: u32) -> Result<AtomicReadResult> {
        let slot = self.slot(instance)?;
        let offset = u64::try_from(start).map_err(|_| FileError::InvalidStartPosition(start))?;
        let data = slot
            .store
            .read(offset, count as usize)
            .map_err(|source| FileError::Io { instance, source })?;

        let result = match data {
            Some(data) => AtomicReadResult {
                end_of_file: data.len() < count as usize,
                data,
            },
            None => AtomicReadResult {
                data: Vec::new(),
                end_of_file: true,
            },
        };
        debug!(
            "file {instance}: read {} octets at {start}, eof={}",
            result.data.len(),
            result.end_of_file
        );
        Ok(result)
    }

    /// Write `data` at `start`. Writing at 0 replaces the file.
    ///
    /// Returns the position written at.
    pub fn atomic_write_stream(&self, instance: u32, start: i32, data: &[u8]) -> Result<u32> {
        let slot = self.slot(instance)?;
        let offset = u32::try_from(start).map_err(|_| FileError::InvalidStartPosition(start))?;

        let _guard = slot.write_lock.lock().map_err(|_| FileError::Io {
            instance,
            source: io::Error::other("file write lock poisoned"),
        })?;
        slot.store.write(offset as u64, data).map_err(|source| {
            warn!("file {instance}: write of {} octets at {offset} failed: {source}", data.len());
            FileError::Io { instance, source }
        })?;
        debug!("file {instance}: wrote {} octets at {offset}", data.len());
        Ok(offset)
    }

    fn encode_modification_date(&self, instance: u32, apdu: &mut Vec<u8>) -> super::Result<()> {
        let slot = self.slot(instance).map_err(|_| PropertyError::UNKNOWN_OBJECT)?;
        let modified = slot.store.modified().unwrap_or_else(|e| {
            warn!("file {instance}: modification time unavailable: {e}");
            None
        });
        let (date, time) = match modified {
            Some(at) => (Date::from(at.date()), Time::from(at.time())),
            None => (Date::unspecified(), Time::unspecified()),
        };
        encoding::encode_application_date(apdu, &date)?;
        encoding::encode_application_time(apdu, &time)?;
        Ok(())
    }
}

impl ObjectFunctions for FileObjects {
    fn object_type(&self) -> ObjectType {
        ObjectType::File
    }

    fn count(&self) -> usize {
        self.files.len()
    }

    fn index_to_instance(&self, index: usize) -> Option<u32> {
        self.files.get(index).map(|s| s.entry.instance)
    }

    fn valid_instance(&self, instance: u32) -> bool {
        self.slot(instance).is_ok()
    }

    fn object_name(&self, instance: u32) -> Option<String> {
        self.valid_instance(instance)
            .then(|| format!("FILE {instance}"))
    }

    fn supports_read(&self) -> bool {
        true
    }

    fn read_property(
        &self,
        _registry: &ObjectRegistry,
        request: &PropertyReadRequest,
        apdu: &mut Vec<u8>,
    ) -> super::Result<()> {
        let instance = request.object_instance;
        let slot = self.slot(instance).map_err(|_| PropertyError::UNKNOWN_OBJECT)?;
        match request.property {
            PropertyIdentifier::Description => {
                encoding::encode_application_character_string(apdu, &slot.entry.path)?
            }
            PropertyIdentifier::FileType => {
                encoding::encode_application_character_string(apdu, &slot.entry.file_type)?
            }
            PropertyIdentifier::FileSize => {
                let size = self.file_size(instance).map_err(|e| {
                    error!("{e}");
                    DispatchError::Internal(e.to_string())
                })?;
                let size = u32::try_from(size).unwrap_or(u32::MAX);
                encoding::encode_application_unsigned(apdu, size)?
            }
            PropertyIdentifier::ModificationDate => self.encode_modification_date(instance, apdu)?,
            PropertyIdentifier::Archive | PropertyIdentifier::ReadOnly => {
                encoding::encode_application_boolean(apdu, true)?
            }
            PropertyIdentifier::FileAccessMethod => {
                encoding::encode_application_enumerated(apdu, FILE_STREAM_ACCESS)?
            }
            _ => return Err(PropertyError::UNKNOWN_PROPERTY.into()),
        }
        Ok(())
    }

    fn supports_write(&self) -> bool {
        true
    }

    /// Archive and file-size accept only their own data type and are
    /// otherwise not writable.
    fn write_property(&self, request: &PropertyWriteRequest<'_>) -> super::Result<()> {
        match request.property {
            PropertyIdentifier::Archive => match request.decode_value()? {
                PropertyValue::Boolean(_) => Err(PropertyError::WRITE_ACCESS_DENIED.into()),
                _ => Err(PropertyError::INVALID_DATA_TYPE.into()),
            },
            PropertyIdentifier::FileSize => match request.decode_value()? {
                PropertyValue::UnsignedInteger(_) => Err(PropertyError::WRITE_ACCESS_DENIED.into()),
                _ => Err(PropertyError::INVALID_DATA_TYPE.into()),
            },
            _ => Err(PropertyError::WRITE_ACCESS_DENIED.into()),
        }
    }

    fn property_lists(&self) -> PropertyLists {
        PropertyLists {
            required: &FILE_REQUIRED,
            optional: &FILE_OPTIONAL,
            proprietary: &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::ObjectIdentifier;

    fn memory_files() -> FileObjects {
        FileObjects::new()
            .with_file(FileEntry::new(0, "temp_0.txt"), MemoryStore::with_contents(vec![7u8; 100]))
            .with_file(FileEntry::new(1, "temp_1.txt"), MemoryStore::new())
            .with_file(FileEntry::new(2, "temp_2.txt"), MemoryStore::with_contents(b"hello"))
    }

    #[test]
    fn test_end_of_file_inference() {
        let files = memory_files();

        let short = files.atomic_read(0, 0, 40).unwrap();
        assert_eq!(short.data.len(), 40);
        assert!(!short.end_of_file);

        let long = files.atomic_read(0, 0, 200).unwrap();
        assert_eq!(long.data.len(), 100);
        assert!(long.end_of_file);

        let tail = files.atomic_read(0, 80, 40).unwrap();
        assert_eq!(tail.data.len(), 20);
        assert!(tail.end_of_file);

        let missing = files.atomic_read(1, 0, 40).unwrap();
        assert!(missing.data.is_empty());
        assert!(missing.end_of_file);
    }

    #[test]
    fn test_read_errors() {
        let files = memory_files();
        assert!(matches!(files.atomic_read(9, 0, 10), Err(FileError::NotFound(9))));
        let err = files.atomic_read(0, -1, 10).unwrap_err();
        assert_eq!(err.to_property_error(), PropertyError::INVALID_FILE_START_POSITION);
    }

    #[test]
    fn test_write_from_zero_truncates() {
        let files = memory_files();
        assert_eq!(files.atomic_write_stream(0, 0, b"abc").unwrap(), 0);
        assert_eq!(files.file_size(0).unwrap(), 3);
        assert_eq!(files.atomic_read(0, 0, 10).unwrap().data, b"abc");

        files.atomic_write_stream(0, 5, b"xy").unwrap();
        assert_eq!(files.atomic_read(0, 0, 10).unwrap().data, b"abc\0\0xy");
    }

    #[test]
    fn test_write_needs_existing_store_past_zero() {
        let files = memory_files();
        let err = files.atomic_write_stream(1, 10, b"abc").unwrap_err();
        assert!(matches!(err, FileError::Io { instance: 1, .. }));
        assert_eq!(err.to_property_error(), PropertyError::FILE_ACCESS_DENIED);

        files.atomic_write_stream(1, 0, b"new").unwrap();
        assert_eq!(files.file_size(1).unwrap(), 3);
    }

    #[test]
    fn test_filesystem_store() {
        let dir = tempfile::tempdir().unwrap();
        let files = FileObjects::on_filesystem(FileEntry::defaults(), dir.path());
        assert_eq!(files.count(), 3);

        // nothing on disk yet
        assert_eq!(files.file_size(2).unwrap(), 0);
        assert!(files.atomic_read(2, 0, 10).unwrap().end_of_file);

        files.atomic_write_stream(2, 0, b"0123456789").unwrap();
        files.atomic_write_stream(2, 4, b"ab").unwrap();
        let read = files.atomic_read(2, 2, 4).unwrap();
        assert_eq!(read.data, b"23ab");
        assert!(!read.end_of_file);
        assert_eq!(
            fs::read(dir.path().join("temp_2.txt")).unwrap(),
            b"0123ab6789"
        );

        files.atomic_write_stream(2, 0, b"z").unwrap();
        assert_eq!(files.file_size(2).unwrap(), 1);
    }

    #[test]
    fn test_filesystem_write_failure_surfaces() {
        let dir = tempfile::tempdir().unwrap();
        let files = FileObjects::new().with_file(
            FileEntry::new(0, "missing/dir/file.txt"),
            FileSystemStore::new(dir.path().join("missing/dir/file.txt")),
        );
        assert!(matches!(
            files.atomic_write_stream(0, 0, b"abc"),
            Err(FileError::Io { instance: 0, .. })
        ));
    }

    #[test]
    fn test_instance_by_name() {
        let files = memory_files();
        assert_eq!(files.instance_by_name("temp_2.txt"), Some(2));
        assert_eq!(files.instance_by_name("temp_9.txt"), None);
        assert_eq!(files.file_name(1), Some("temp_1.txt"));
    }

    #[test]
    fn test_properties() {
        let files = memory_files();
        let registry = ObjectRegistry::builder()
            .with_device(crate::object::registry::tests::Fixed::new(ObjectType::Device, &[1]))
            .build()
            .unwrap();
        let object = ObjectIdentifier::new(ObjectType::File, 2);

        let read = |property| {
            let mut apdu = Vec::new();
            files
                .read_property(&registry, &PropertyReadRequest::new(object, property), &mut apdu)
                .map(|_| apdu)
        };
        assert_eq!(read(PropertyIdentifier::FileSize).unwrap(), [0x21, 0x05]);
        assert_eq!(read(PropertyIdentifier::FileAccessMethod).unwrap(), [0x91, 0x01]);
        assert_eq!(read(PropertyIdentifier::ReadOnly).unwrap(), [0x11]);
        assert_eq!(read(PropertyIdentifier::ModificationDate).unwrap().len(), 10);
        assert_eq!(
            read(PropertyIdentifier::PresentValue),
            Err(PropertyError::UNKNOWN_PROPERTY.into())
        );
        assert_eq!(files.object_name(2).as_deref(), Some("FILE 2"));
    }

    #[test]
    fn test_property_writes() {
        let files = memory_files();
        let object = ObjectIdentifier::new(ObjectType::File, 0);
        let write = |property, value: &[u8]| {
            files.write_property(&PropertyWriteRequest::new(object, property, value))
        };
        assert_eq!(
            write(PropertyIdentifier::Archive, &[0x21, 0x01]),
            Err(PropertyError::INVALID_DATA_TYPE.into())
        );
        assert_eq!(
            write(PropertyIdentifier::Archive, &[0x11]),
            Err(PropertyError::WRITE_ACCESS_DENIED.into())
        );
        assert_eq!(
            write(PropertyIdentifier::FileSize, &[0x11]),
            Err(PropertyError::INVALID_DATA_TYPE.into())
        );
        assert_eq!(
            write(PropertyIdentifier::FileType, &[0x11]),
            Err(PropertyError::WRITE_ACCESS_DENIED.into())
        );
    }
}
