use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

use crate::stream::ByteStream;


/// Message body: a shared handle to a `ByteStream`
///
/// Cloning the body (or a message holding it) doesn't copy the stream,
/// all clones read from and write to the same stream. Use `Body::ptr_eq` to
/// find out whether two bodies are the same instance.
#[derive(Clone)]
pub struct Body(Rc<RefCell<ByteStream>>);

impl Body {
    pub fn new(stream: ByteStream) -> Body {
        Body(Rc::new(RefCell::new(stream)))
    }
    /// Empty in-memory body
    pub fn empty() -> Body {
        Body::new(ByteStream::empty())
    }
    /// In-memory body holding `bytes`
    pub fn from_bytes<B: Into<Vec<u8>>>(bytes: B) -> Body {
        Body::new(ByteStream::from_bytes(bytes))
    }
    /// Returns true if both handles point to the same stream
    pub fn ptr_eq(&self, other: &Body) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
    /// Borrows the stream
    ///
    /// # Panics
    ///
    /// When the stream is currently borrowed mutably
    pub fn stream(&self) -> Ref<ByteStream> {
        self.0.borrow()
    }
    /// Borrows the stream mutably
    ///
    /// # Panics
    ///
    /// When the stream is already borrowed
    pub fn stream_mut(&self) -> RefMut<ByteStream> {
        self.0.borrow_mut()
    }
    /// Size of the stream, `None` when unknown or the stream is busy
    pub fn size(&self) -> Option<u64> {
        self.0.try_borrow().ok().and_then(|s| s.size())
    }
    /// Whole contents of the body as text, see `ByteStream::to_string_lossy`
    ///
    /// Returns an empty string if the stream is borrowed elsewhere.
    pub fn contents(&self) -> String {
        match self.0.try_borrow_mut() {
            Ok(mut stream) => stream.to_string_lossy(),
            Err(_) => {
                trace!("body snapshot skipped: stream is busy");
                String::new()
            }
        }
    }
}

impl From<ByteStream> for Body {
    fn from(stream: ByteStream) -> Body {
        Body::new(stream)
    }
}

impl<'a> From<&'a str> for Body {
    fn from(text: &'a str) -> Body {
        Body::from_bytes(text)
    }
}

impl From<String> for Body {
    fn from(text: String) -> Body {
        Body::from_bytes(text)
    }
}

impl From<Vec<u8>> for Body {
    fn from(data: Vec<u8>) -> Body {
        Body::from_bytes(data)
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.0.try_borrow() {
            Ok(stream) => f.debug_tuple("Body").field(&*stream).finish(),
            Err(_) => f.write_str("Body(<busy>)"),
        }
    }
}
