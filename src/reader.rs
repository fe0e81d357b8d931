use crate::state::{MultipartState, StreamingStage};
use bytes::{Bytes, BytesMut};
use encoding_rs::{Encoding, UTF_8};
use spin::mutex::spin::SpinMutex as Mutex;
use std::io::{self, Read};
use std::sync::Weak;

/// The data of one field, read forward and only once.
///
/// A `FieldReader` doesn't buffer anything itself: every read pulls bytes
/// straight out of the shared scan buffer, up to the next boundary. Once the
/// [`Multipart`](crate::Multipart) moves on to another field (or is dropped)
/// every read fails with [`Error::ItemSkipped`](crate::Error::ItemSkipped),
/// even if the data had been read to its end.
///
/// Besides [`chunk`](FieldReader::chunk) it implements [`std::io::Read`], so it
/// can be handed to `io::copy` and friends.
///
/// # Examples
///
/// ```
/// use partstream::Multipart;
/// use std::io::Read;
///
/// let data = "--X-BOUNDARY\r\nContent-Disposition: form-data; name=\"my_text_field\"\r\n\r\nabcd\r\n--X-BOUNDARY--\r\n";
/// let mut multipart = Multipart::with_reader(data.as_bytes(), "X-BOUNDARY").unwrap();
///
/// while multipart.has_next().unwrap() {
///     let mut field = multipart.next_field().unwrap();
///     let mut text = String::new();
///     field.open().unwrap().read_to_string(&mut text).unwrap();
///     assert_eq!(text, "abcd");
/// }
/// ```
#[derive(Debug)]
pub struct FieldReader<'r> {
    state: Weak<Mutex<MultipartState<'r>>>,
    generation: u64,
    field_name: String,
    content_type: Option<mime::Mime>,
    done: bool,
}

impl<'r> FieldReader<'r> {
    pub(crate) fn new(
        state: Weak<Mutex<MultipartState<'r>>>,
        generation: u64,
        field_name: String,
        content_type: Option<mime::Mime>,
    ) -> Self {
        FieldReader {
            state,
            generation,
            field_name,
            content_type,
            done: false,
        }
    }

    /// Returns `true` once the field data was read to its end.
    pub fn is_consumed(&self) -> bool {
        self.done
    }

    /// Reads the next chunk of the field data, `None` at its end.
    pub fn chunk(&mut self) -> crate::Result<Option<Bytes>> {
        self.next_chunk(usize::MAX)
    }

    fn next_chunk(&mut self, max: usize) -> crate::Result<Option<Bytes>> {
        let state = self.state.upgrade().ok_or_else(|| self.skipped())?;
        let mut state = state.lock();

        if !state.is_current(self.generation) {
            return Err(self.skipped());
        }

        if self.done {
            return Ok(None);
        }

        if state.stage == StreamingStage::Failed {
            return Err(crate::Error::SessionFailed);
        }

        match state.buffer.next_chunk(Some(self.field_name.as_str()), max) {
            Ok(Some(bytes)) => Ok(Some(bytes)),
            Ok(None) => {
                trace!("field '{}' read to its end", self.field_name);
                self.done = true;
                state.stage = StreamingStage::ReadingBoundary;
                Ok(None)
            }
            Err(err) => {
                state.stage = StreamingStage::Failed;
                Err(err)
            }
        }
    }

    fn skipped(&self) -> crate::Error {
        crate::Error::ItemSkipped {
            field_name: Some(self.field_name.clone()),
        }
    }

    /// Reads the rest of the field data into memory.
    pub fn bytes(mut self) -> crate::Result<Bytes> {
        let mut buf = BytesMut::new();

        while let Some(bytes) = self.chunk()? {
            buf.extend_from_slice(&bytes);
        }

        Ok(buf.freeze())
    }

    /// Reads the rest of the field data as text, decoded with the `charset`
    /// of the field's `Content-Type`, UTF-8 by default.
    pub fn text(self) -> crate::Result<String> {
        self.text_with_charset("utf-8")
    }

    /// Like [`text`](FieldReader::text), with a custom default charset for
    /// fields whose `Content-Type` doesn't name one.
    pub fn text_with_charset(self, default_encoding: &str) -> crate::Result<String> {
        let encoding_name = self
            .content_type
            .as_ref()
            .and_then(|mime| mime.get_param(mime::CHARSET))
            .map(|charset| charset.as_str().to_owned())
            .unwrap_or_else(|| default_encoding.to_owned());

        let encoding = Encoding::for_label(encoding_name.as_bytes()).unwrap_or(UTF_8);

        let bytes = self.bytes()?;

        let (text, _, _) = encoding.decode(&bytes);

        Ok(text.into_owned())
    }
}

impl Read for FieldReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        match self.next_chunk(buf.len()) {
            Ok(Some(bytes)) => {
                buf[..bytes.len()].copy_from_slice(&bytes);
                Ok(bytes.len())
            }
            Ok(None) => Ok(0),
            Err(err) => Err(err.into_io()),
        }
    }
}
