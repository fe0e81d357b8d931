use crate::buffer::{BoundaryKind, StreamBuffer};
use crate::content_disposition::ContentDisposition;
use crate::helpers;
use crate::source::ChunkSource;
use crate::state::{MultipartState, StreamingStage};
use crate::{Field, Options};
use bytes::Bytes;
use http::header::{self, HeaderMap};
use spin::mutex::spin::SpinMutex as Mutex;
use std::io::Read;
use std::sync::{Arc, Weak};
#[cfg(feature = "tokio-io")]
use tokio::io::AsyncRead;
#[cfg(feature = "tokio-io")]
use tokio_util::io::SyncIoBridge;

/// Represents the implementation of `multipart/form-data` formatted data.
///
/// This will parse the source into [`Field`] instances one at a time, pulling
/// bytes from the source only as the fields and their data are asked for.
///
/// To keep the single pass over the body consistent, only the latest
/// [`Field`] is alive: moving on with [`has_next`](Multipart::has_next)
/// discards whatever data of the previous field is still unread and makes
/// every read on it fail with [`Error::ItemSkipped`](crate::Error::ItemSkipped).
///
/// The fields can be accessed with the [`has_next`](Multipart::has_next) and
/// [`next_field`](Multipart::next_field) pair or through the [`Iterator`]
/// implementation.
///
/// # Examples
///
/// ```
/// use partstream::Multipart;
///
/// let data = "--X-BOUNDARY\r\nContent-Disposition: form-data; name=\"my_text_field\"\r\n\r\nabcd\r\n--X-BOUNDARY--\r\n";
/// let mut multipart = Multipart::with_reader(data.as_bytes(), "X-BOUNDARY").unwrap();
///
/// while multipart.has_next().unwrap() {
///     let mut field = multipart.next_field().unwrap();
///     println!("Field: {:?}", field.open().unwrap().text());
/// }
/// ```
#[derive(Debug)]
pub struct Multipart<'r> {
    state: Arc<Mutex<MultipartState<'r>>>,
    prepared: Option<Field<'r>>,
    content_length: Option<u64>,
    fused: bool,
}

impl<'r> Multipart<'r> {
    /// Construct a new `Multipart` instance with the given chunks of the body
    /// and the boundary.
    ///
    /// # Examples
    ///
    /// ```
    /// use partstream::Multipart;
    /// use bytes::Bytes;
    /// use std::convert::Infallible;
    ///
    /// let chunks = vec![
    ///     Bytes::from("--X-BOUNDARY\r\nContent-Disposition: form-data; "),
    ///     Bytes::from("name=\"my_text_field\"\r\n\r\nabcd\r\n--X-BOUNDARY--\r\n"),
    /// ];
    /// let stream = chunks.into_iter().map(Result::<Bytes, Infallible>::Ok);
    /// let multipart = Multipart::new(stream, "X-BOUNDARY").unwrap();
    ///
    /// for field in multipart {
    ///     let mut field = field.unwrap();
    ///     assert_eq!(field.open().unwrap().text().unwrap(), "abcd");
    /// }
    /// ```
    pub fn new<S, O, E, B>(stream: S, boundary: B) -> crate::Result<Multipart<'r>>
    where
        S: IntoIterator<Item = Result<O, E>>,
        S::IntoIter: Send + 'r,
        O: Into<Bytes> + 'r,
        E: Into<Box<dyn std::error::Error + Send + Sync>> + 'r,
        B: Into<String>,
    {
        Multipart::new_with_options(stream, boundary, Options::default())
    }

    /// Construct a new `Multipart` instance with the given chunks of the body,
    /// the boundary and the [`Options`].
    pub fn new_with_options<S, O, E, B>(stream: S, boundary: B, options: Options) -> crate::Result<Multipart<'r>>
    where
        S: IntoIterator<Item = Result<O, E>>,
        S::IntoIter: Send + 'r,
        O: Into<Bytes> + 'r,
        E: Into<Box<dyn std::error::Error + Send + Sync>> + 'r,
        B: Into<String>,
    {
        let source = ChunkSource::new(stream.into_iter());
        Multipart::with_reader_with_options(source, boundary, options)
    }

    /// Construct a new `Multipart` instance with the given [`Read`] source and
    /// the boundary.
    pub fn with_reader<R, B>(reader: R, boundary: B) -> crate::Result<Multipart<'r>>
    where
        R: Read + Send + 'r,
        B: Into<String>,
    {
        Multipart::with_reader_with_options(reader, boundary, Options::default())
    }

    /// Construct a new `Multipart` instance with the given [`Read`] source, the
    /// boundary and the [`Options`].
    ///
    /// Fails with [`Error::InvalidBoundary`](crate::Error::InvalidBoundary)
    /// when the boundary is empty, longer than 70 bytes or doesn't fit in the
    /// scan buffer.
    pub fn with_reader_with_options<R, B>(reader: R, boundary: B, options: Options) -> crate::Result<Multipart<'r>>
    where
        R: Read + Send + 'r,
        B: Into<String>,
    {
        let boundary = boundary.into();
        options.validate(&boundary)?;

        debug!(
            "starting multipart session, boundary: {:?}, buffer size: {}",
            boundary, options.buffer_size
        );

        let state = MultipartState {
            buffer: StreamBuffer::new(Box::new(reader), &boundary, options.buffer_size),
            stage: StreamingStage::FindingFirstBoundary,
            generation: 0,
            next_field_idx: 0,
            curr_field_name: None,
            max_header_size: options.max_header_size,
        };

        Ok(Multipart {
            state: Arc::new(Mutex::new(state)),
            prepared: None,
            content_length: None,
            fused: false,
        })
    }

    /// Construct a new `Multipart` instance from an HTTP request, taking the
    /// boundary from its `Content-Type` header.
    ///
    /// # Examples
    ///
    /// ```
    /// use partstream::Multipart;
    ///
    /// let body = "--X-BOUNDARY\r\nContent-Disposition: form-data; name=\"my_text_field\"\r\n\r\nabcd\r\n--X-BOUNDARY--\r\n";
    /// let request = http::Request::post("/upload")
    ///     .header("content-type", "multipart/form-data; boundary=X-BOUNDARY")
    ///     .header("content-length", body.len())
    ///     .body(body.as_bytes())
    ///     .unwrap();
    ///
    /// let multipart = Multipart::from_request(request).unwrap();
    /// assert_eq!(multipart.content_length(), Some(body.len() as u64));
    /// ```
    pub fn from_request<R>(request: http::Request<R>) -> crate::Result<Multipart<'r>>
    where
        R: Read + Send + 'r,
    {
        Multipart::from_request_with_options(request, Options::default())
    }

    /// Like [`from_request`](Multipart::from_request), with the given
    /// [`Options`].
    pub fn from_request_with_options<R>(request: http::Request<R>, options: Options) -> crate::Result<Multipart<'r>>
    where
        R: Read + Send + 'r,
    {
        let (parts, body) = request.into_parts();

        let content_type = parts
            .headers
            .get(header::CONTENT_TYPE)
            .and_then(|val| val.to_str().ok())
            .ok_or(crate::Error::NoMultipart)?;
        let boundary = crate::parse_boundary(content_type)?;

        let mut multipart = Multipart::with_reader_with_options(body, boundary, options)?;
        multipart.content_length = content_length(&parts.headers);

        Ok(multipart)
    }

    /// Construct a new `Multipart` instance with the given tokio
    /// [`AsyncRead`] source and the boundary.
    ///
    /// Reads block on the given runtime `handle`, so the returned session has
    /// to be driven from a blocking context such as
    /// [`spawn_blocking`](tokio::task::spawn_blocking), never from an async
    /// task.
    ///
    /// # Optional
    ///
    /// This requires the optional `tokio-io` feature to be enabled.
    #[cfg(feature = "tokio-io")]
    pub fn with_async_reader<R, B>(reader: R, boundary: B, handle: tokio::runtime::Handle) -> crate::Result<Multipart<'r>>
    where
        R: AsyncRead + Unpin + Send + 'r,
        B: Into<String>,
    {
        Multipart::with_async_reader_with_options(reader, boundary, handle, Options::default())
    }

    /// Like [`with_async_reader`](Multipart::with_async_reader), with the
    /// given [`Options`].
    ///
    /// # Optional
    ///
    /// This requires the optional `tokio-io` feature to be enabled.
    #[cfg(feature = "tokio-io")]
    pub fn with_async_reader_with_options<R, B>(
        reader: R,
        boundary: B,
        handle: tokio::runtime::Handle,
        options: Options,
    ) -> crate::Result<Multipart<'r>>
    where
        R: AsyncRead + Unpin + Send + 'r,
        B: Into<String>,
    {
        let reader = SyncIoBridge::new_with_handle(reader, handle);
        Multipart::with_reader_with_options(reader, boundary, options)
    }

    /// The advisory body length taken from the request's `Content-Length`
    /// header, if the session was built with
    /// [`from_request`](Multipart::from_request).
    pub fn content_length(&self) -> Option<u64> {
        self.content_length
    }

    /// Moves to the next field and returns `true` if there is one.
    ///
    /// Any unread data of the current field is discarded first, and the
    /// current field and its reader are superseded. Calling this again
    /// before [`next_field`](Multipart::next_field) doesn't move any further.
    ///
    /// Returns `false` once the closing boundary was reached. Errors are
    /// fatal: afterwards every call fails with
    /// [`Error::SessionFailed`](crate::Error::SessionFailed).
    pub fn has_next(&mut self) -> crate::Result<bool> {
        if self.prepared.is_some() {
            return Ok(true);
        }

        let weak = Arc::downgrade(&self.state);
        let mut state = self.state.lock();

        if state.stage == StreamingStage::Failed {
            return Err(crate::Error::SessionFailed);
        }

        if state.buffer.at_final_boundary() {
            return Ok(false);
        }

        match advance(&mut state, weak) {
            Ok(field) => {
                let has_next = field.is_some();
                self.prepared = field;
                Ok(has_next)
            }
            Err(err) => {
                debug!("multipart session failed: {}", err);
                state.stage = StreamingStage::Failed;
                state.generation += 1;
                Err(err)
            }
        }
    }

    /// Returns the field found by the preceding [`has_next`](Multipart::has_next).
    ///
    /// Fails with [`Error::FieldNotReady`](crate::Error::FieldNotReady) if
    /// `has_next` wasn't called or didn't return `true`, and with
    /// [`Error::StreamExhausted`](crate::Error::StreamExhausted) after the
    /// last field.
    pub fn next_field(&mut self) -> crate::Result<Field<'r>> {
        if let Some(field) = self.prepared.take() {
            return Ok(field);
        }

        let state = self.state.lock();

        if state.stage == StreamingStage::Failed {
            Err(crate::Error::SessionFailed)
        } else if state.buffer.at_final_boundary() {
            Err(crate::Error::StreamExhausted)
        } else {
            Err(crate::Error::FieldNotReady)
        }
    }
}

impl<'r> Iterator for Multipart<'r> {
    type Item = crate::Result<Field<'r>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.fused {
            return None;
        }

        let next = match self.has_next() {
            Ok(true) => self.next_field().map(Some),
            Ok(false) => Ok(None),
            Err(err) => Err(err),
        };

        match next {
            Ok(field) => field.map(Ok),
            Err(err) => {
                self.fused = true;
                Some(Err(err))
            }
        }
    }
}

/// Leaves the current field, if any, and reads up to the data of the next
/// one.
fn advance<'r>(
    state: &mut MultipartState<'r>,
    weak: Weak<Mutex<MultipartState<'r>>>,
) -> crate::Result<Option<Field<'r>>> {
    match state.stage {
        StreamingStage::FindingFirstBoundary => {
            let preamble = state.buffer.discard_to_boundary(None)?;
            trace!("skipped {} bytes before the first boundary", preamble);
        }
        StreamingStage::ReadingFieldData => {
            let field_name = state.curr_field_name.take();
            let discarded = state
                .buffer
                .discard_to_boundary(field_name.as_deref())
                .map_err(|err| match err {
                    crate::Error::StreamReadFailed(cause) => crate::Error::DiscardFailed {
                        field_name: field_name.clone(),
                        cause,
                    },
                    err => err,
                })?;
            trace!("discarded {} unread bytes of field {:?}", discarded, field_name);
        }
        _ => {}
    }

    state.stage = StreamingStage::ReadingBoundary;
    state.curr_field_name = None;
    state.generation += 1;

    if state.buffer.read_boundary_suffix()? == BoundaryKind::Final {
        debug!("reached the closing boundary after {} fields", state.next_field_idx);
        return Ok(None);
    }

    let raw_headers = state.buffer.read_headers(state.max_header_size)?;
    let headers = helpers::parse_headers(&raw_headers)?;
    let content_disposition = ContentDisposition::parse(&headers);

    let field_name = content_disposition.field_name.ok_or(crate::Error::MissingFieldName)?;
    let field_idx = state.next_field_idx;
    state.next_field_idx += 1;

    trace!("reading field #{} named {:?}", field_idx, field_name);

    state.stage = StreamingStage::ReadingFieldData;
    state.curr_field_name = Some(field_name.clone());

    Ok(Some(Field::new(
        weak,
        headers,
        field_name,
        content_disposition.file_name,
        field_idx,
        state.generation,
    )))
}

fn content_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(header::CONTENT_LENGTH)
        .and_then(|val| val.to_str().ok())
        .and_then(|val| val.trim().parse::<u64>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    const DATA: &str = "--X-BOUNDARY\r\nContent-Disposition: form-data; name=\"a\"\r\n\r\n1\r\n--X-BOUNDARY\r\nContent-Disposition: form-data; name=\"b\"\r\n\r\n2\r\n--X-BOUNDARY--\r\n";

    #[test]
    fn test_has_next_is_idempotent() {
        let mut m = Multipart::with_reader(DATA.as_bytes(), "X-BOUNDARY").unwrap();

        assert!(m.has_next().unwrap());
        assert!(m.has_next().unwrap());
        assert_eq!(m.next_field().unwrap().name(), "a");

        assert!(m.has_next().unwrap());
        assert_eq!(m.next_field().unwrap().name(), "b");

        assert!(!m.has_next().unwrap());
        assert!(!m.has_next().unwrap());
    }

    #[test]
    fn test_next_field_without_has_next() {
        let mut m = Multipart::with_reader(DATA.as_bytes(), "X-BOUNDARY").unwrap();
        assert_eq!(m.next_field().unwrap_err(), Error::FieldNotReady);

        assert!(m.has_next().unwrap());
        m.next_field().unwrap();
        assert_eq!(m.next_field().unwrap_err(), Error::FieldNotReady);

        assert!(m.has_next().unwrap());
        m.next_field().unwrap();
        assert!(!m.has_next().unwrap());
        assert_eq!(m.next_field().unwrap_err(), Error::StreamExhausted);
    }

    #[test]
    fn test_failed_session_stays_failed() {
        let data = "--X-BOUNDARY\r\nContent-Type: text/plain\r\n\r\n1\r\n--X-BOUNDARY--\r\n";
        let mut m = Multipart::with_reader(data.as_bytes(), "X-BOUNDARY").unwrap();

        assert_eq!(m.has_next().unwrap_err(), Error::MissingFieldName);
        assert_eq!(m.has_next().unwrap_err(), Error::SessionFailed);
        assert_eq!(m.next_field().unwrap_err(), Error::SessionFailed);
    }

    #[test]
    fn test_iterator_is_fused_after_error() {
        let data = "--X-BOUNDARY\r\nContent-Disposition: form-data; name=\"a\"\r\n\r\n1";
        let mut m = Multipart::with_reader(data.as_bytes(), "X-BOUNDARY").unwrap();

        assert!(m.next().unwrap().is_ok());
        let err = m.next().unwrap().unwrap_err();
        assert!(err.is_malformed());
        assert!(m.next().is_none());
    }

    #[test]
    fn test_invalid_boundary() {
        assert!(Multipart::with_reader(DATA.as_bytes(), "").is_err());

        let options = Options::new().buffer_size(8);
        assert!(Multipart::with_reader_with_options(DATA.as_bytes(), "X-BOUNDARY", options).is_err());
    }

    #[test]
    fn test_from_request() {
        let request = http::Request::post("/")
            .header(header::CONTENT_TYPE, "multipart/form-data; boundary=X-BOUNDARY")
            .header(header::CONTENT_LENGTH, DATA.len())
            .body(DATA.as_bytes())
            .unwrap();

        let m = Multipart::from_request(request).unwrap();
        assert_eq!(m.content_length(), Some(DATA.len() as u64));
        assert_eq!(m.count(), 2);

        let request = http::Request::post("/")
            .header(header::CONTENT_TYPE, "text/plain")
            .body(DATA.as_bytes())
            .unwrap();
        assert_eq!(Multipart::from_request(request).unwrap_err(), Error::NoMultipart);

        let request = http::Request::post("/").body(DATA.as_bytes()).unwrap();
        assert_eq!(Multipart::from_request(request).unwrap_err(), Error::NoMultipart);
    }
}
