use std::fmt::{self, Debug, Display, Formatter};
use std::io;

use derive_more::Display;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A set of errors that can occur while scanning a multipart body, iterating
/// its fields or reading a field's data.
#[derive(Display)]
#[non_exhaustive]
pub enum Error {
    /// The body ended before the delimiter closing a field was found.
    #[display(
        fmt = "field '{}' received with incomplete data",
        "field_name.as_deref().unwrap_or(\"<unknown>\")"
    )]
    IncompleteFieldData { field_name: Option<String> },

    /// Couldn't read the field headers completely.
    #[display(fmt = "failed to read field complete headers")]
    IncompleteHeaders,

    /// The field header block is larger than
    /// [`Options::max_header_size`](crate::Options::max_header_size).
    #[display(fmt = "field headers exceeded the maximum size limit: {} bytes", limit)]
    HeadersTooLarge { limit: usize },

    /// Failed to read headers.
    #[display(fmt = "failed to read headers: {}", _0)]
    ReadHeaderFailed(httparse::Error),

    /// Failed to decode the field's raw header name to
    /// [`HeaderName`](http::header::HeaderName) type.
    #[display(fmt = "failed to decode field's raw header name: {:?} {}", name, cause)]
    DecodeHeaderName { name: String, cause: BoxError },

    /// Failed to decode the field's raw header value to
    /// [`HeaderValue`](http::header::HeaderValue) type.
    #[display(fmt = "failed to decode field's raw header value: {}", cause)]
    DecodeHeaderValue { value: Vec<u8>, cause: BoxError },

    /// The field headers carry no `Content-Disposition` with a `name`
    /// parameter.
    #[display(fmt = "field headers are missing the Content-Disposition name parameter")]
    MissingFieldName,

    /// A boundary was followed by something other than `--`, transport
    /// padding or CRLF.
    #[display(fmt = "unexpected characters follow a boundary")]
    UnexpectedBoundarySuffix,

    /// Multipart stream is incomplete.
    #[display(fmt = "incomplete multipart stream")]
    IncompleteStream,

    /// The unread data of a field couldn't be skipped because the source
    /// failed.
    #[display(
        fmt = "failed to skip the unread data of field '{}': {}",
        "field_name.as_deref().unwrap_or(\"<unknown>\")",
        cause
    )]
    DiscardFailed { field_name: Option<String>, cause: io::Error },

    /// A read was attempted on a field which has been left behind by the
    /// iterator.
    #[display(
        fmt = "field '{}' was skipped, its data is no longer available",
        "field_name.as_deref().unwrap_or(\"<unknown>\")"
    )]
    ItemSkipped { field_name: Option<String> },

    /// [`Field::open`](crate::Field::open) was called more than once.
    #[display(fmt = "stream of field '{}' already opened", field_name)]
    StreamAlreadyOpened { field_name: String },

    /// [`Multipart::next_field`](crate::Multipart::next_field) was called
    /// without a preceding successful
    /// [`Multipart::has_next`](crate::Multipart::has_next).
    #[display(fmt = "no field is ready, call has_next first")]
    FieldNotReady,

    /// Iteration was attempted after the final boundary.
    #[display(fmt = "multipart stream is exhausted")]
    StreamExhausted,

    /// An earlier error left the multipart session unusable.
    #[display(fmt = "multipart session aborted by an earlier error")]
    SessionFailed,

    /// Stream read failed.
    #[display(fmt = "stream read failed: {}", _0)]
    StreamReadFailed(io::Error),

    /// The `Content-Type` header is not `multipart/form-data`.
    #[display(fmt = "Content-Type is not multipart/form-data")]
    NoMultipart,

    /// Failed to convert the `Content-Type` to [`mime::Mime`] type.
    #[display(fmt = "Failed to convert Content-Type to `mime::Mime` type: {}", _0)]
    DecodeContentType(mime::FromStrError),

    /// No boundary found in `Content-Type` header.
    #[display(fmt = "multipart boundary not found in Content-Type")]
    NoBoundary,

    /// The boundary is empty, too long, or doesn't fit in the scan buffer.
    #[display(fmt = "invalid multipart boundary: {}", _0)]
    InvalidBoundary(String),
}

impl Error {
    /// Returns `true` when the body itself is malformed. The session can't
    /// continue after such an error.
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            Error::IncompleteFieldData { .. }
                | Error::IncompleteHeaders
                | Error::HeadersTooLarge { .. }
                | Error::ReadHeaderFailed(_)
                | Error::DecodeHeaderName { .. }
                | Error::DecodeHeaderValue { .. }
                | Error::MissingFieldName
                | Error::UnexpectedBoundarySuffix
                | Error::IncompleteStream
                | Error::DiscardFailed { .. }
        )
    }

    /// Returns `true` for errors caused by calling the API out of order.
    pub fn is_illegal_state(&self) -> bool {
        matches!(
            self,
            Error::StreamAlreadyOpened { .. } | Error::FieldNotReady | Error::StreamExhausted | Error::SessionFailed
        )
    }

    pub(crate) fn into_io(self) -> io::Error {
        match self {
            Error::StreamReadFailed(err) => err,
            err @ Error::ItemSkipped { .. } => io::Error::new(io::ErrorKind::Other, err),
            err => io::Error::new(io::ErrorKind::InvalidData, err),
        }
    }
}

impl Debug for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(self, f)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::ReadHeaderFailed(err) => Some(err),
            Error::DecodeHeaderName { cause, .. } | Error::DecodeHeaderValue { cause, .. } => Some(cause.as_ref()),
            Error::DiscardFailed { cause, .. } | Error::StreamReadFailed(cause) => Some(cause),
            Error::DecodeContentType(err) => Some(err),
            _ => None,
        }
    }
}

impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        self.to_string().eq(&other.to_string())
    }
}

impl Eq for Error {}
