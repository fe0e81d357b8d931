use crate::constants;

/// Tunables of a multipart scan session.
///
/// # Examples
///
/// ```
/// use partstream::{Multipart, Options};
///
/// let data = "--X-BOUNDARY\r\nContent-Disposition: form-data; name=\"a\"\r\n\r\n1\r\n--X-BOUNDARY--\r\n";
/// let options = Options::new().buffer_size(1024).max_header_size(2048);
///
/// let mut multipart = Multipart::with_reader_with_options(data.as_bytes(), "X-BOUNDARY", options).unwrap();
/// assert!(multipart.has_next().unwrap());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Options {
    pub(crate) buffer_size: usize,
    pub(crate) max_header_size: usize,
}

impl Options {
    /// Creates the default options: an 8 KiB scan buffer and at most 10 KiB
    /// of headers per field.
    pub fn new() -> Options {
        Options::default()
    }

    /// Sets the size of the scan buffer, which is the largest amount of body
    /// data read from the source at once.
    ///
    /// It must be larger than the delimiter (`\r\n--` plus the boundary),
    /// otherwise building the session fails.
    pub fn buffer_size(mut self, size: usize) -> Options {
        self.buffer_size = size;
        self
    }

    /// Sets the largest header block accepted for a single field.
    pub fn max_header_size(mut self, size: usize) -> Options {
        self.max_header_size = size;
        self
    }

    pub(crate) fn validate(&self, boundary: &str) -> crate::Result<()> {
        if boundary.is_empty() {
            return Err(crate::Error::InvalidBoundary("boundary is empty".to_owned()));
        }

        if boundary.len() > constants::MAX_BOUNDARY_LEN {
            return Err(crate::Error::InvalidBoundary(format!(
                "boundary is longer than {} bytes",
                constants::MAX_BOUNDARY_LEN
            )));
        }

        let delimiter_len = constants::CRLF.len() + constants::BOUNDARY_EXT.len() + boundary.len();
        if self.buffer_size <= delimiter_len {
            return Err(crate::Error::InvalidBoundary(format!(
                "buffer size {} can't hold the {} bytes delimiter",
                self.buffer_size, delimiter_len
            )));
        }

        Ok(())
    }
}

impl Default for Options {
    fn default() -> Self {
        Options {
            buffer_size: constants::DEFAULT_BUFFER_SIZE,
            max_header_size: constants::DEFAULT_MAX_HEADER_SIZE,
        }
    }
}
