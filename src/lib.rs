//! HTTP messages as values
//!
//! Requests, responses and URIs are never changed in place: every `with_*`
//! method consumes the value and returns the changed one, leaving clones
//! untouched. The only shared part is the body, a `ByteStream` behind a
//! reference-counted handle.
//!
//! ```
//! use http_value::{HttpMessage, Request, Uri};
//!
//! let req = Request::new("GET", Uri::parse("http://example.com/").unwrap())
//!     .unwrap()
//!     .with_header("Accept", ["text/html"]).unwrap();
//! assert_eq!(req.header_line("host"), "example.com");
//! ```
#[macro_use] extern crate quick_error;
#[macro_use] extern crate log;

mod error;
mod version;
mod context;
mod status;
pub mod stream;
mod body;
pub mod headers;
mod message;
mod uri;
mod cookie;
mod request;
mod response;
mod upload;

pub use error::{Error, Result, HttpError};
pub use version::Version;
pub use context::{Context, DefaultContext};
pub use context::{DELETED_COOKIE_MAX_AGE, READ_CHUNK_SIZE, HTTP_DATE_FORMAT};
pub use status::reason_phrase;
pub use stream::{ByteStream, Resource, MemoryResource, FileResource};
pub use stream::{MetaValue, Metadata};
pub use body::Body;
pub use headers::HeaderTable;
pub use message::{Message, HttpMessage};
pub use uri::Uri;
pub use cookie::{Cookie, SameSite};
pub use request::{Method, Request};
pub use response::Response;
pub use upload::{UploadedFile, UploadStatus};
