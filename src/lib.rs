//! A pull-based, forward-only parser for `multipart/form-data` bodies.
//!
//! The body is scanned once through a bounded buffer, and each field is
//! handed out together with a single-use reader over its data. Nothing is
//! ever collected in memory unless a field's data is explicitly read into it.
//!
//! Moving to the next field discards the unread data of the current one and
//! invalidates its reader, so fields must be consumed in the order they
//! appear in the body.
//!
//! # Examples
//!
//! ```
//! use partstream::Multipart;
//!
//! let data = "--X-BOUNDARY\r\nContent-Disposition: form-data; name=\"a\"\r\n\r\n1\r\n--X-BOUNDARY\r\nContent-Disposition: form-data; name=\"b\"\r\n\r\n2\r\n--X-BOUNDARY--\r\n";
//! let mut multipart = Multipart::with_reader(data.as_bytes(), "X-BOUNDARY").unwrap();
//!
//! while multipart.has_next().unwrap() {
//!     let mut field = multipart.next_field().unwrap();
//!     let name = field.name().to_owned();
//!     let value = field.open().unwrap().text().unwrap();
//!
//!     println!("{} = {}", name, value);
//! }
//! ```
//!
//! # Optional Features
//!
//! * `tokio-io`: Reads the body from a tokio `AsyncRead` through
//!   [`Multipart::with_async_reader`].
//! * `log`: Emits parsing events through the `log` crate.

pub use bytes;
pub use error::Error;
pub use field::Field;
pub use multipart::Multipart;
pub use options::Options;
pub use reader::FieldReader;

#[macro_use]
mod macros;

mod buffer;
mod constants;
mod content_disposition;
mod error;
mod field;
mod helpers;
mod multipart;
mod options;
mod reader;
mod source;
mod state;

/// A Result type often returned from methods that can have `partstream` errors.
pub type Result<T> = std::result::Result<T, Error>;

/// Parses the `Content-Type` header to extract the boundary value.
///
/// # Examples
///
/// ```
/// let content_type = "multipart/form-data; boundary=ABCDEFG";
///
/// assert_eq!(partstream::parse_boundary(content_type), Ok("ABCDEFG".to_owned()));
/// ```
pub fn parse_boundary<T: AsRef<str>>(content_type: T) -> crate::Result<String> {
    let m = content_type
        .as_ref()
        .parse::<mime::Mime>()
        .map_err(crate::Error::DecodeContentType)?;

    if !(m.type_() == mime::MULTIPART && m.subtype() == mime::FORM_DATA) {
        return Err(crate::Error::NoMultipart);
    }

    m.get_param(mime::BOUNDARY)
        .map(|name| name.as_str().to_owned())
        .ok_or(crate::Error::NoBoundary)
}
