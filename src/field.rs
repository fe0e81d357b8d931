use crate::reader::FieldReader;
use crate::state::MultipartState;
use http::header::{self, HeaderMap};
use spin::mutex::spin::SpinMutex as Mutex;
use std::sync::Weak;

/// A single field of a multipart body: its name, file name, content type and
/// headers, plus the capability to open its data as a [`FieldReader`].
///
/// # Warning about superseded fields
///
/// Fields are produced one at a time and the body is read only once. As soon
/// as [`Multipart::has_next`](crate::Multipart::has_next) moves past a field,
/// the unread data of that field is discarded, and every later attempt to
/// open or read it fails with [`Error::ItemSkipped`](crate::Error::ItemSkipped).
/// The same happens to all fields once the [`Multipart`](crate::Multipart) is
/// dropped.
///
/// # Examples
///
/// ```
/// use partstream::Multipart;
///
/// let data = "--X-BOUNDARY\r\nContent-Disposition: form-data; name=\"upload\"; filename=\"a.txt\"\r\nContent-Type: text/plain\r\n\r\nabcd\r\n--X-BOUNDARY--\r\n";
/// let mut multipart = Multipart::with_reader(data.as_bytes(), "X-BOUNDARY").unwrap();
///
/// assert!(multipart.has_next().unwrap());
/// let mut field = multipart.next_field().unwrap();
///
/// assert_eq!(field.name(), "upload");
/// assert_eq!(field.file_name(), Some("a.txt"));
/// assert!(!field.is_form_field());
/// assert_eq!(field.open().unwrap().text().unwrap(), "abcd");
/// ```
#[derive(Debug)]
pub struct Field<'r> {
    state: Weak<Mutex<MultipartState<'r>>>,
    headers: HeaderMap,
    opened: bool,
    meta: FieldMeta,
}

#[derive(Debug)]
struct FieldMeta {
    name: String,
    file_name: Option<String>,
    content_type: Option<mime::Mime>,
    idx: usize,
    generation: u64,
}

impl<'r> Field<'r> {
    pub(crate) fn new(
        state: Weak<Mutex<MultipartState<'r>>>,
        headers: HeaderMap,
        name: String,
        file_name: Option<String>,
        idx: usize,
        generation: u64,
    ) -> Self {
        let content_type = parse_content_type(&headers);

        Field {
            state,
            headers,
            opened: false,
            meta: FieldMeta {
                name,
                file_name,
                content_type,
                idx,
                generation,
            },
        }
    }

    /// The field name found in the
    /// [`Content-Disposition`](https://developer.mozilla.org/en-US/docs/Web/HTTP/Headers/Content-Disposition)
    /// header.
    pub fn name(&self) -> &str {
        &self.meta.name
    }

    /// The file name found in the `Content-Disposition` header, as sent by
    /// the client. Some clients include path information.
    pub fn file_name(&self) -> Option<&str> {
        self.meta.file_name.as_deref()
    }

    /// Get the content type of the field.
    pub fn content_type(&self) -> Option<&mime::Mime> {
        self.meta.content_type.as_ref()
    }

    /// Returns `true` for a simple form field and `false` for an uploaded
    /// file, that is a field carrying a `filename` parameter.
    pub fn is_form_field(&self) -> bool {
        self.meta.file_name.is_none()
    }

    /// Get a map of headers as [`HeaderMap`].
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Get the index of this field in order they appeared in the stream.
    pub fn index(&self) -> usize {
        self.meta.idx
    }

    /// Returns `true` once the iterator moved past this field or was dropped.
    pub fn is_superseded(&self) -> bool {
        match self.state.upgrade() {
            Some(state) => !state.lock().is_current(self.meta.generation),
            None => true,
        }
    }

    /// Opens the field data for reading.
    ///
    /// The data can be read only once, so this fails with
    /// [`Error::StreamAlreadyOpened`](crate::Error::StreamAlreadyOpened) when
    /// called again, and with [`Error::ItemSkipped`](crate::Error::ItemSkipped)
    /// when the field is superseded.
    pub fn open(&mut self) -> crate::Result<FieldReader<'r>> {
        if self.opened {
            return Err(crate::Error::StreamAlreadyOpened {
                field_name: self.meta.name.clone(),
            });
        }

        if self.is_superseded() {
            return Err(crate::Error::ItemSkipped {
                field_name: Some(self.meta.name.clone()),
            });
        }

        self.opened = true;

        Ok(FieldReader::new(
            Weak::clone(&self.state),
            self.meta.generation,
            self.meta.name.clone(),
            self.meta.content_type.clone(),
        ))
    }
}

fn parse_content_type(headers: &HeaderMap) -> Option<mime::Mime> {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|val| val.to_str().ok())
        .and_then(|val| val.parse::<mime::Mime>().ok())
}
