//! Byte streams used as message bodies
//!
//! The `ByteStream` owns a `Resource`: an in-memory buffer, an open file or
//! anything that implements the trait. The stream tracks the capabilities
//! of the resource and caches its size. Once the stream is closed or
//! detached every capability reads as false and size/metadata are absent.
use std::cell::Cell;
use std::collections::BTreeMap;
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use once_cell::unsync::OnceCell;

use crate::context::READ_CHUNK_SIZE;
use crate::error::{Error, Result};


/// Locator reported by in-memory streams
pub const MEMORY_URI: &str = "memory://";

const DETACHED: &str = "stream is detached";

/// Single value of the stream metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetaValue {
    Bool(bool),
    Int(u64),
    Str(String),
}

/// Metadata of the resource, keyed by names like `mode` or `uri`
pub type Metadata = BTreeMap<&'static str, MetaValue>;

/// An underlying byte resource the stream calls into
///
/// The mode string follows the usual `fopen` convention (`r`, `w+b`, `a`,
/// ...). Capabilities of the stream are derived from it exactly once.
pub trait Resource: Read + Write + Seek {
    /// Mode the resource was opened with
    fn mode(&self) -> &str;
    /// Kind of the resource, reported in metadata as `wrapper_type`
    fn wrapper_type(&self) -> &str;
    /// Path or URI of the resource if there is one
    fn locator(&self) -> Option<&str> {
        None
    }
    fn is_seekable(&self) -> bool {
        true
    }
    /// Full size of the resource in bytes if it's known
    fn size(&self) -> Option<u64>;
    /// Current position
    fn tell(&mut self) -> io::Result<u64> {
        self.stream_position()
    }
    /// Returns true when there is no more data to read
    fn at_eof(&mut self) -> bool {
        match (self.tell(), self.size()) {
            (Ok(pos), Some(size)) => pos >= size,
            _ => false,
        }
    }
}

/// A growable buffer in memory
#[derive(Debug, Default)]
pub struct MemoryResource {
    buf: Cursor<Vec<u8>>,
}

impl MemoryResource {
    pub fn new(bytes: Vec<u8>) -> MemoryResource {
        MemoryResource { buf: Cursor::new(bytes) }
    }
    pub fn into_inner(self) -> Vec<u8> {
        self.buf.into_inner()
    }
}

impl Read for MemoryResource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.buf.read(buf)
    }
}

impl Write for MemoryResource {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buf.write(buf)
    }
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Seek for MemoryResource {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.buf.seek(pos)
    }
}

impl Resource for MemoryResource {
    fn mode(&self) -> &str {
        "w+b"
    }
    fn wrapper_type(&self) -> &str {
        "memory"
    }
    fn locator(&self) -> Option<&str> {
        Some(MEMORY_URI)
    }
    fn size(&self) -> Option<u64> {
        Some(self.buf.get_ref().len() as u64)
    }
}

/// A file opened with an `fopen`-like mode string
#[derive(Debug)]
pub struct FileResource {
    file: File,
    path: PathBuf,
    locator: String,
    mode: String,
}

impl FileResource {
    /// Opens the file
    ///
    /// The first character of the mode must be one of `r`, `w`, `a`, `x`,
    /// `c`, optionally followed by `+`, `b` or `t`.
    pub fn open<P: AsRef<Path>>(path: P, mode: &str) -> Result<FileResource> {
        let path = path.as_ref();
        let file = open_options(mode)?.open(path)
            .map_err(|e| Error::Io("unable to open file", e))?;
        Ok(FileResource {
            file,
            path: path.to_path_buf(),
            locator: path.to_string_lossy().into_owned(),
            mode: mode.to_string(),
        })
    }
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Read for FileResource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }
}

impl Write for FileResource {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }
    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl Seek for FileResource {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.file.seek(pos)
    }
}

impl Resource for FileResource {
    fn mode(&self) -> &str {
        &self.mode
    }
    fn wrapper_type(&self) -> &str {
        "plainfile"
    }
    fn locator(&self) -> Option<&str> {
        Some(&self.locator)
    }
    fn size(&self) -> Option<u64> {
        self.file.metadata().ok().map(|m| m.len())
    }
}

fn open_options(mode: &str) -> Result<OpenOptions> {
    let mut chars = mode.chars();
    let first = chars.next()
        .ok_or_else(|| Error::invalid("stream mode is empty"))?;
    let mut plus = false;
    for ch in chars {
        match ch {
            '+' => plus = true,
            'b' | 't' => {}
            _ => return Err(Error::invalid(
                format!("unrecognized stream mode {:?}", mode))),
        }
    }
    let mut options = OpenOptions::new();
    match first {
        'r' => { options.read(true).write(plus); }
        'w' => { options.write(true).create(true).truncate(true).read(plus); }
        'a' => { options.append(true).create(true).read(plus); }
        'x' => { options.write(true).create_new(true).read(plus); }
        'c' => { options.write(true).create(true).read(plus); }
        _ => return Err(Error::invalid(
            format!("unrecognized stream mode {:?}", mode))),
    }
    Ok(options)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Capabilities {
    seekable: bool,
    readable: bool,
    writable: bool,
}

impl Capabilities {
    fn from_mode(mode: &str, seekable: bool) -> Capabilities {
        let plus = mode.contains('+');
        let read_only = mode.starts_with('r');
        Capabilities {
            seekable,
            readable: read_only || plus,
            writable: !read_only || plus,
        }
    }
}

fn describe(res: &dyn Resource) -> Metadata {
    let mut meta = Metadata::new();
    meta.insert("mode", MetaValue::Str(res.mode().to_string()));
    meta.insert("seekable", MetaValue::Bool(res.is_seekable()));
    meta.insert("wrapper_type", MetaValue::Str(res.wrapper_type().to_string()));
    if let Some(uri) = res.locator() {
        meta.insert("uri", MetaValue::Str(uri.to_string()));
    }
    meta
}

/// A byte stream over an exclusively owned resource
///
/// The resource is released on `close()`, on `detach()` (which gives it
/// back to the caller) or when the stream is dropped, whichever comes
/// first.
pub struct ByteStream {
    resource: Option<Box<dyn Resource>>,
    size: Cell<Option<u64>>,
    capabilities: OnceCell<Capabilities>,
    metadata: OnceCell<Metadata>,
    uri: OnceCell<Option<String>>,
}

impl ByteStream {
    /// Readable, writable and seekable in-memory stream holding `bytes`
    ///
    /// The position is at the start of the data.
    pub fn from_bytes<B: Into<Vec<u8>>>(bytes: B) -> ByteStream {
        ByteStream::from_resource(
            Box::new(MemoryResource::new(bytes.into())))
    }
    /// Empty in-memory stream
    pub fn empty() -> ByteStream {
        ByteStream::from_bytes(Vec::new())
    }
    /// Opens a file with `fopen`-like mode string
    pub fn open<P: AsRef<Path>>(path: P, mode: &str) -> Result<ByteStream> {
        let res = FileResource::open(path, mode)?;
        debug!("opened stream {:?} in mode {:?}", res.locator, mode);
        Ok(ByteStream::from_resource(Box::new(res)))
    }
    /// Wraps an externally supplied resource
    pub fn from_resource(resource: Box<dyn Resource>) -> ByteStream {
        ByteStream {
            resource: Some(resource),
            size: Cell::new(None),
            capabilities: OnceCell::new(),
            metadata: OnceCell::new(),
            uri: OnceCell::new(),
        }
    }

    fn capabilities(&self) -> Capabilities {
        match self.resource {
            Some(ref res) => *self.capabilities.get_or_init(|| {
                Capabilities::from_mode(res.mode(), res.is_seekable())
            }),
            None => Capabilities::default(),
        }
    }
    fn resource_mut(&mut self) -> Result<&mut dyn Resource> {
        match self.resource {
            Some(ref mut res) => Ok(&mut **res),
            None => Err(Error::State(DETACHED)),
        }
    }

    pub fn is_detached(&self) -> bool {
        self.resource.is_none()
    }
    pub fn is_seekable(&self) -> bool {
        self.capabilities().seekable
    }
    pub fn is_readable(&self) -> bool {
        self.capabilities().readable
    }
    pub fn is_writable(&self) -> bool {
        self.capabilities().writable
    }

    /// Size of the stream in bytes, `None` if it's unknown or the stream
    /// is detached
    pub fn size(&self) -> Option<u64> {
        if let Some(size) = self.size.get() {
            return Some(size);
        }
        let size = self.resource.as_ref()?.size()?;
        self.size.set(Some(size));
        Some(size)
    }
    /// Current offset in the stream
    pub fn position(&mut self) -> Result<u64> {
        self.resource_mut()?.tell()
            .map_err(|e| Error::Io("unable to determine stream position", e))
    }
    /// Returns true if the stream is detached or there is nothing left
    /// to read
    pub fn at_end(&mut self) -> bool {
        match self.resource {
            Some(ref mut res) => res.at_eof(),
            None => true,
        }
    }
    pub fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        if self.is_detached() {
            return Err(Error::State(DETACHED));
        }
        if !self.is_seekable() {
            return Err(Error::unsupported("stream is not seekable"));
        }
        self.resource_mut()?.seek(pos)
            .map_err(|e| Error::Io("unable to seek to stream position", e))
    }
    /// Seeks to the start of the stream
    pub fn rewind(&mut self) -> Result<()> {
        self.seek(SeekFrom::Start(0)).map(|_| ())
    }
    /// Writes all of the `data`, returns number of bytes written
    ///
    /// Cached size is dropped, it's fetched from the resource again on the
    /// next `size()` call.
    pub fn write(&mut self, data: &[u8]) -> Result<usize> {
        if self.is_detached() {
            return Err(Error::State(DETACHED));
        }
        if !self.is_writable() {
            return Err(Error::unsupported("stream is not writable"));
        }
        self.size.set(None);
        self.resource_mut()?.write_all(data)
            .map_err(|e| Error::Io("unable to write to stream", e))?;
        Ok(data.len())
    }
    /// Reads up to `length` bytes
    ///
    /// Fewer bytes are returned only when the end of the stream is reached.
    pub fn read(&mut self, length: usize) -> Result<Vec<u8>> {
        if self.is_detached() {
            return Err(Error::State(DETACHED));
        }
        if !self.is_readable() {
            return Err(Error::unsupported("stream is not readable"));
        }
        let res = self.resource_mut()?;
        let mut buf = Vec::with_capacity(length.min(READ_CHUNK_SIZE));
        (&mut *res).take(length as u64).read_to_end(&mut buf)
            .map_err(|e| Error::Io("unable to read from stream", e))?;
        Ok(buf)
    }
    /// Reads everything from the current position to the end
    pub fn read_to_end(&mut self) -> Result<Vec<u8>> {
        if self.is_detached() {
            return Err(Error::State(DETACHED));
        }
        if !self.is_readable() {
            return Err(Error::unsupported("stream is not readable"));
        }
        let mut buf = Vec::new();
        self.resource_mut()?.read_to_end(&mut buf)
            .map_err(|e| Error::Io("unable to read stream contents", e))?;
        Ok(buf)
    }
    /// Metadata of the resource, empty when detached
    pub fn metadata(&self) -> Metadata {
        match self.resource {
            Some(ref res) => self.metadata.get_or_init(|| describe(&**res))
                .clone(),
            None => Metadata::new(),
        }
    }
    /// Single key of the metadata
    pub fn metadata_value(&self, key: &str) -> Option<MetaValue> {
        self.metadata().remove(key)
    }
    /// Path or URI of the resource
    pub fn uri(&self) -> Option<&str> {
        match self.resource {
            Some(ref res) => self.uri
                .get_or_init(|| res.locator().map(String::from))
                .as_deref(),
            None => None,
        }
    }
    /// Separates the resource from the stream
    ///
    /// The stream is left in the same state as after `close()`.
    pub fn detach(&mut self) -> Option<Box<dyn Resource>> {
        let res = self.resource.take();
        if let Some(ref res) = res {
            trace!("stream detached from {}",
                res.locator().unwrap_or("<unnamed>"));
        }
        self.size.set(None);
        self.capabilities = OnceCell::new();
        self.metadata = OnceCell::new();
        self.uri = OnceCell::new();
        res
    }
    /// Releases the resource, may be called any number of times
    pub fn close(&mut self) {
        if let Some(mut res) = self.detach() {
            debug!("closing stream {}", res.locator().unwrap_or("<unnamed>"));
            if let Err(e) = res.flush() {
                warn!("error flushing stream on close: {}", e);
            }
        }
    }
    /// Whole contents of the stream as text
    ///
    /// Seeks to the start if possible. Never fails: an empty string is
    /// returned if anything goes wrong. Invalid UTF-8 is replaced.
    pub fn to_string_lossy(&mut self) -> String {
        if self.is_seekable() {
            if let Err(e) = self.rewind() {
                trace!("stream snapshot failed: {}", e);
                return String::new();
            }
        }
        match self.read_to_end() {
            Ok(data) => String::from_utf8_lossy(&data).into_owned(),
            Err(e) => {
                trace!("stream snapshot failed: {}", e);
                String::new()
            }
        }
    }
}

impl Drop for ByteStream {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for ByteStream {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ByteStream")
            .field("uri", &self.uri())
            .field("size", &self.size.get())
            .field("detached", &self.is_detached())
            .finish()
    }
}

impl Default for ByteStream {
    fn default() -> ByteStream {
        ByteStream::empty()
    }
}

#[cfg(test)]
mod test {
    use std::fs;
    use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};

    use super::{ByteStream, MetaValue, MemoryResource, Resource, MEMORY_URI};

    /// Read-only resource which can't seek
    struct Pipe(Cursor<Vec<u8>>);

    impl Read for Pipe {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.0.read(buf)
        }
    }
    impl Write for Pipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::Other, "pipe is read only"))
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }
    impl Seek for Pipe {
        fn seek(&mut self, _pos: SeekFrom) -> io::Result<u64> {
            Err(io::Error::new(io::ErrorKind::Other, "illegal seek"))
        }
    }
    impl Resource for Pipe {
        fn mode(&self) -> &str { "r" }
        fn wrapper_type(&self) -> &str { "pipe" }
        fn is_seekable(&self) -> bool { false }
        fn size(&self) -> Option<u64> { None }
        fn tell(&mut self) -> io::Result<u64> {
            Err(io::Error::new(io::ErrorKind::Other, "no position"))
        }
    }

    #[test]
    fn test_read_after_rewind() {
        let mut stream = ByteStream::from_bytes("hello");
        assert!(stream.is_readable());
        assert!(stream.is_writable());
        assert!(stream.is_seekable());
        stream.read_to_end().unwrap();
        assert!(stream.at_end());
        stream.rewind().unwrap();
        assert_eq!(stream.read(5).unwrap(), b"hello");
        assert_eq!(stream.position().unwrap(), 5);
    }

    #[test]
    fn test_short_read() {
        let mut stream = ByteStream::from_bytes("abc");
        assert_eq!(stream.read(2).unwrap(), b"ab");
        assert_eq!(stream.read(10).unwrap(), b"c");
        assert_eq!(stream.read(10).unwrap(), b"");
    }

    #[test]
    fn test_huge_read_length() {
        let mut stream = ByteStream::from_bytes("hello");
        assert_eq!(stream.read(usize::MAX).unwrap(), b"hello");
        stream.rewind().unwrap();
        assert_eq!(stream.read(1 << 40).unwrap(), b"hello");
    }

    #[test]
    fn test_write_drops_size() {
        let mut stream = ByteStream::from_bytes("abc");
        assert_eq!(stream.size(), Some(3));
        stream.seek(SeekFrom::End(0)).unwrap();
        assert_eq!(stream.write(b"defg").unwrap(), 4);
        assert_eq!(stream.size(), Some(7));
        assert_eq!(stream.to_string_lossy(), "abcdefg");
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut stream = ByteStream::from_bytes("abc");
        stream.close();
        stream.close();
        assert!(stream.is_detached());
        assert!(!stream.is_readable());
        assert!(!stream.is_writable());
        assert!(!stream.is_seekable());
        assert_eq!(stream.size(), None);
        assert!(stream.metadata().is_empty());
        assert!(stream.at_end());
        assert_eq!(stream.uri(), None);
        assert_eq!(stream.to_string_lossy(), "");
    }

    #[test]
    fn test_write_after_close() {
        let mut stream = ByteStream::from_bytes("");
        stream.close();
        assert!(stream.write(b"x").unwrap_err().is_state());
        assert!(stream.read(1).unwrap_err().is_state());
        assert!(stream.seek(SeekFrom::Start(0)).unwrap_err().is_state());
        assert!(stream.position().unwrap_err().is_state());
    }

    #[test]
    fn test_detach() {
        let mut stream = ByteStream::from_bytes("data");
        let res = stream.detach().unwrap();
        assert_eq!(res.size(), Some(4));
        assert!(stream.is_detached());
        assert!(stream.detach().is_none());
        assert!(stream.read_to_end().unwrap_err().is_state());
    }

    #[test]
    fn test_metadata() {
        let stream = ByteStream::from_bytes("data");
        let meta = stream.metadata();
        assert_eq!(meta.get("mode"), Some(&MetaValue::Str("w+b".into())));
        assert_eq!(stream.metadata_value("seekable"),
                   Some(MetaValue::Bool(true)));
        assert_eq!(stream.metadata_value("uri"),
                   Some(MetaValue::Str(MEMORY_URI.into())));
        assert_eq!(stream.metadata_value("nothing"), None);
        assert_eq!(stream.uri(), Some(MEMORY_URI));
    }

    #[test]
    fn test_not_seekable() {
        let pipe = Pipe(Cursor::new(b"streamed".to_vec()));
        let mut stream = ByteStream::from_resource(Box::new(pipe));
        assert!(!stream.is_seekable());
        assert!(stream.is_readable());
        assert!(!stream.is_writable());
        assert!(stream.seek(SeekFrom::Start(0)).unwrap_err().is_io());
        assert!(stream.position().unwrap_err().is_io());
        assert!(stream.write(b"x").unwrap_err().is_io());
        assert_eq!(stream.size(), None);
        // snapshot doesn't rewind streams which can't seek
        assert_eq!(stream.read(3).unwrap(), b"str");
        assert_eq!(stream.to_string_lossy(), "eamed");
    }

    #[test]
    fn test_memory_resource() {
        let mut res = MemoryResource::new(b"abc".to_vec());
        res.seek(SeekFrom::Start(1)).unwrap();
        res.write_all(b"XY").unwrap();
        assert_eq!(res.into_inner(), b"aXY");
    }

    #[test]
    fn test_open_modes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("body.txt");

        let mut stream = ByteStream::open(&path, "wb").unwrap();
        assert!(stream.is_writable());
        assert!(!stream.is_readable());
        stream.write(b"file contents").unwrap();
        assert!(stream.read(1).unwrap_err().is_io());
        assert_eq!(stream.uri(), Some(path.to_str().unwrap()));
        stream.close();

        let mut stream = ByteStream::open(&path, "r").unwrap();
        assert!(stream.is_readable());
        assert!(!stream.is_writable());
        assert_eq!(stream.size(), Some(13));
        assert_eq!(stream.read_to_end().unwrap(), b"file contents");
        assert!(stream.at_end());
        drop(stream);

        let mut stream = ByteStream::open(&path, "a+").unwrap();
        assert!(stream.is_readable());
        assert!(stream.is_writable());
        stream.write(b"!").unwrap();
        assert_eq!(stream.to_string_lossy(), "file contents!");
        drop(stream);

        assert!(ByteStream::open(&path, "x").unwrap_err().is_io());
        assert_eq!(fs::read(&path).unwrap(), b"file contents!");
    }

    #[test]
    fn test_bad_mode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("body.txt");
        assert!(ByteStream::open(&path, "").unwrap_err().is_validation());
        assert!(ByteStream::open(&path, "q").unwrap_err().is_validation());
        assert!(ByteStream::open(&path, "rz").unwrap_err().is_validation());
        assert!(ByteStream::open(dir.path().join("missing"), "r")
                .unwrap_err().is_io());
    }
}
