use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use once_cell::unsync::OnceCell;

use crate::body::Body;
use crate::context::READ_CHUNK_SIZE;
use crate::error::{Error, Result};
use crate::stream::ByteStream;


/// Outcome of receiving an uploaded file
///
/// Numeric codes are the ones used by form upload handlers, note that
/// there is no code 5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UploadStatus {
    Ok,
    /// File exceeds the server-wide size limit
    IniSize,
    /// File exceeds the size limit declared in the form
    FormSize,
    Partial,
    NoFile,
    NoTmpDir,
    CantWrite,
    /// Upload was stopped by an extension
    Extension,
}

impl UploadStatus {
    pub fn code(&self) -> u8 {
        use self::UploadStatus::*;
        match *self {
            Ok => 0,
            IniSize => 1,
            FormSize => 2,
            Partial => 3,
            NoFile => 4,
            NoTmpDir => 6,
            CantWrite => 7,
            Extension => 8,
        }
    }
}

impl TryFrom<i64> for UploadStatus {
    type Error = Error;
    fn try_from(code: i64) -> Result<UploadStatus> {
        use self::UploadStatus::*;
        let status = match code {
            0 => Ok,
            1 => IniSize,
            2 => FormSize,
            3 => Partial,
            4 => NoFile,
            6 => NoTmpDir,
            7 => CantWrite,
            8 => Extension,
            _ => return Err(Error::invalid(
                format!("unknown upload status code {}", code))),
        };
        std::result::Result::Ok(status)
    }
}

#[derive(Debug)]
enum Source {
    Stream(Body),
    Path(PathBuf),
}

/// A file received with a request
///
/// The file may be moved to its final place exactly once. Files which
/// failed to upload can be inspected but can't be read or moved.
#[derive(Debug)]
pub struct UploadedFile {
    source: Source,
    stream: OnceCell<Body>,
    size: Option<u64>,
    client_filename: Option<String>,
    client_media_type: Option<String>,
    status: UploadStatus,
    moved: bool,
}

impl UploadedFile {
    /// Upload whose contents are held by a stream
    pub fn from_stream<B: Into<Body>>(body: B, status: UploadStatus)
        -> UploadedFile
    {
        let body = body.into();
        UploadedFile {
            size: body.size(),
            source: Source::Stream(body),
            stream: OnceCell::new(),
            client_filename: None,
            client_media_type: None,
            status,
            moved: false,
        }
    }
    /// Upload stored in a temporary file
    ///
    /// The file is opened lazily by `stream()`, `move_to` renames it.
    pub fn from_path<P: Into<PathBuf>>(path: P, status: UploadStatus)
        -> UploadedFile
    {
        let path = path.into();
        UploadedFile {
            size: fs::metadata(&path).ok().map(|m| m.len()),
            source: Source::Path(path),
            stream: OnceCell::new(),
            client_filename: None,
            client_media_type: None,
            status,
            moved: false,
        }
    }
    /// Overrides the size, e.g. with the one reported by the client
    pub fn with_size(mut self, size: u64) -> UploadedFile {
        self.size = Some(size);
        self
    }
    pub fn with_client_filename(mut self, name: &str) -> UploadedFile {
        self.client_filename = Some(name.to_string());
        self
    }
    pub fn with_client_media_type(mut self, media_type: &str)
        -> UploadedFile
    {
        self.client_media_type = Some(media_type.to_string());
        self
    }

    pub fn size(&self) -> Option<u64> {
        self.size
    }
    /// File name sent by the client, not to be trusted
    pub fn client_filename(&self) -> Option<&str> {
        self.client_filename.as_deref()
    }
    /// Media type sent by the client, not to be trusted
    pub fn client_media_type(&self) -> Option<&str> {
        self.client_media_type.as_deref()
    }
    pub fn status(&self) -> UploadStatus {
        self.status
    }
    pub fn is_moved(&self) -> bool {
        self.moved
    }

    fn check_usable(&self) -> Result<()> {
        if self.status != UploadStatus::Ok {
            return Err(Error::State("upload has failed"));
        }
        if self.moved {
            return Err(Error::State("uploaded file has already been moved"));
        }
        Ok(())
    }

    /// Stream with the contents of the file
    pub fn stream(&self) -> Result<Body> {
        self.check_usable()?;
        match self.source {
            Source::Stream(ref body) => Ok(body.clone()),
            Source::Path(ref path) => self.stream
                .get_or_try_init(|| ByteStream::open(path, "rb").map(Body::new))
                .map(Body::clone),
        }
    }

    /// Moves the file to `target`
    ///
    /// Can be done only once for a successful upload. The stream of the
    /// file is closed afterwards.
    pub fn move_to<P: AsRef<Path>>(&mut self, target: P) -> Result<()> {
        self.check_usable()?;
        let target = target.as_ref();
        if target.as_os_str().is_empty() {
            return Err(Error::invalid("target path must not be empty"));
        }
        match self.source {
            Source::Path(ref path) => {
                move_file(path, target)?;
                if let Some(body) = self.stream.get() {
                    body.stream_mut().close();
                }
            }
            Source::Stream(ref body) => {
                let copied = copy_stream(&mut body.stream_mut(), target);
                if let Err(e) = copied {
                    if let Err(err) = fs::remove_file(target) {
                        trace!("partial file {:?} not removed: {}",
                            target, err);
                    }
                    return Err(e);
                }
                body.stream_mut().close();
            }
        }
        debug!("uploaded file moved to {:?}", target);
        self.moved = true;
        Ok(())
    }
}

fn move_file(source: &Path, target: &Path) -> Result<()> {
    if let Err(e) = fs::rename(source, target) {
        debug!("rename of {:?} failed: {}, copying instead", source, e);
        fs::copy(source, target)
            .map_err(|e| Error::Io("unable to copy uploaded file", e))?;
        fs::remove_file(source)
            .map_err(|e| Error::Io("unable to remove uploaded file", e))?;
    }
    Ok(())
}

fn copy_stream(stream: &mut ByteStream, target: &Path) -> Result<()> {
    if stream.is_seekable() {
        stream.rewind()?;
    }
    let mut file = File::create(target)
        .map_err(|e| Error::Io("unable to create target file", e))?;
    loop {
        let chunk = stream.read(READ_CHUNK_SIZE)?;
        if chunk.is_empty() {
            break;
        }
        file.write_all(&chunk)
            .map_err(|e| Error::Io("unable to write target file", e))?;
    }
    file.flush()
        .map_err(|e| Error::Io("unable to write target file", e))
}

#[cfg(test)]
mod test {
    use std::fs;

    use super::{UploadStatus, UploadedFile};
    use crate::body::Body;

    fn init_logging() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(UploadStatus::try_from(0i64).unwrap(), UploadStatus::Ok);
        assert_eq!(UploadStatus::try_from(6i64).unwrap(), UploadStatus::NoTmpDir);
        assert_eq!(UploadStatus::Extension.code(), 8);
        assert!(UploadStatus::try_from(5i64).unwrap_err().is_validation());
        assert!(UploadStatus::try_from(-1i64).is_err());
    }

    #[test]
    fn test_failed_upload() {
        let mut file = UploadedFile::from_stream("x", UploadStatus::Partial);
        assert!(file.stream().unwrap_err().is_state());
        let dir = tempfile::tempdir().unwrap();
        assert!(file.move_to(dir.path().join("out")).unwrap_err().is_state());
        assert_eq!(file.status(), UploadStatus::Partial);
    }

    #[test]
    fn test_move_stream() {
        init_logging();
        let dir = tempfile::tempdir().unwrap();
        let body = Body::from("uploaded data");
        let mut file = UploadedFile::from_stream(body.clone(), UploadStatus::Ok)
            .with_client_filename("report.txt")
            .with_client_media_type("text/plain");
        assert_eq!(file.size(), Some(13));
        assert_eq!(file.client_filename(), Some("report.txt"));
        assert_eq!(file.client_media_type(), Some("text/plain"));
        assert!(file.stream().unwrap().ptr_eq(&body));

        let target = dir.path().join("report.txt");
        file.move_to(&target).unwrap();
        assert_eq!(fs::read_to_string(&target).unwrap(), "uploaded data");
        assert!(body.stream().is_detached());
        assert!(file.is_moved());
        assert!(file.move_to(dir.path().join("again")).unwrap_err().is_state());
        assert!(file.stream().unwrap_err().is_state());
    }

    #[test]
    fn test_move_path() {
        init_logging();
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("upload.tmp");
        fs::write(&source, b"file body").unwrap();
        let mut file = UploadedFile::from_path(&source, UploadStatus::Ok);
        assert_eq!(file.size(), Some(9));
        assert_eq!(file.stream().unwrap().contents(), "file body");

        let target = dir.path().join("final.bin");
        file.move_to(&target).unwrap();
        assert!(!source.exists());
        assert_eq!(fs::read(&target).unwrap(), b"file body");
    }

    #[test]
    fn test_empty_target() {
        let mut file = UploadedFile::from_stream("x", UploadStatus::Ok);
        assert!(file.move_to("").unwrap_err().is_validation());
        assert!(!file.is_moved());
    }

    #[test]
    fn test_unreachable_target() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = UploadedFile::from_stream("x", UploadStatus::Ok);
        let target = dir.path().join("missing").join("out");
        assert!(file.move_to(&target).unwrap_err().is_io());
        assert!(!file.is_moved());
        assert_eq!(file.stream().unwrap().contents(), "x");
    }

    #[test]
    fn test_failed_move_keeps_file_readable() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("upload.tmp");
        fs::write(&source, b"file body").unwrap();
        let mut file = UploadedFile::from_path(&source, UploadStatus::Ok);
        let body = file.stream().unwrap();
        let target = dir.path().join("missing").join("out");
        assert!(file.move_to(&target).unwrap_err().is_io());
        assert!(!file.is_moved());
        assert!(source.exists());
        assert!(!body.stream().is_detached());
        assert_eq!(file.stream().unwrap().contents(), "file body");

        let target = dir.path().join("out");
        file.move_to(&target).unwrap();
        assert!(body.stream().is_detached());
        assert_eq!(fs::read(&target).unwrap(), b"file body");
    }

    #[test]
    fn test_failed_copy_removes_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let body = Body::from("data");
        body.stream_mut().close();
        let mut file = UploadedFile::from_stream(body, UploadStatus::Ok);
        let target = dir.path().join("out");
        assert!(file.move_to(&target).unwrap_err().is_state());
        assert!(!target.exists());
        assert!(!file.is_moved());
    }
}
