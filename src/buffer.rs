use crate::constants;
use bytes::{Buf, Bytes, BytesMut};
use memchr::memmem::{self, Finder};
use std::cmp;
use std::fmt::{self, Debug, Formatter};
use std::io::{self, Read};

/// What followed a delimiter in the body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BoundaryKind {
    /// `\r\n`: another field follows.
    Next,
    /// `--`: the closing boundary.
    Final,
}

/// Outcome of the last delimiter search over the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scan {
    /// The delimiter starts this many bytes ahead of the cursor.
    Delimiter(usize),
    /// This many bytes ahead of the cursor can't be part of a delimiter.
    Safe(usize),
}

/// The scan buffer over the body source.
///
/// The front of `buf` is the read cursor and its length the fill level. The
/// buffer starts with a synthetic `\r\n` so the very first boundary line is
/// matched by the same `\r\n--<boundary>` delimiter as all later ones, and
/// any preamble is consumed like the data of an abandoned field.
///
/// The result of a delimiter search is kept in `scan` and shrunk as bytes are
/// handed out, so the window is searched again only after a refill.
pub(crate) struct StreamBuffer<'r> {
    pub(crate) eof: bool,
    pub(crate) buf: BytesMut,
    capacity: usize,
    delimiter: Finder<'static>,
    scan: Option<Scan>,
    final_seen: bool,
    source: Box<dyn Read + Send + 'r>,
}

impl<'r> StreamBuffer<'r> {
    pub fn new(source: Box<dyn Read + Send + 'r>, boundary: &str, capacity: usize) -> Self {
        let delimiter = constants::delimiter_for(boundary);

        let mut buf = BytesMut::with_capacity(capacity);
        buf.extend_from_slice(constants::CRLF.as_bytes());

        StreamBuffer {
            eof: false,
            buf,
            capacity,
            delimiter: Finder::new(&delimiter).into_owned(),
            scan: None,
            final_seen: false,
            source,
        }
    }

    /// Reads from the source until the buffer holds `limit` bytes at most.
    /// Returns the number of bytes read, zero once the source is exhausted.
    fn fill(&mut self, limit: usize) -> crate::Result<usize> {
        let len = self.buf.len();
        if self.eof || len >= limit {
            return Ok(0);
        }

        self.buf.resize(limit, 0);

        let read = loop {
            match self.source.read(&mut self.buf[len..]) {
                Ok(read) => break read,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => {
                    self.buf.truncate(len);
                    return Err(crate::Error::StreamReadFailed(err));
                }
            }
        };

        self.buf.truncate(len + read);
        self.scan = None;

        if read == 0 {
            trace!("body source reached its end");
            self.eof = true;
        }

        Ok(read)
    }

    fn fill_at_least(&mut self, size: usize) -> crate::Result<()> {
        while self.buf.len() < size {
            if self.fill(self.capacity)? == 0 {
                return Err(crate::Error::IncompleteStream);
            }
        }

        Ok(())
    }

    /// Length of the longest buffer suffix which is a proper prefix of the
    /// delimiter. Those bytes can't be handed out before more data arrives.
    fn partial_delimiter_len(&self) -> usize {
        let needle = self.delimiter.needle();
        let start = self.buf.len().saturating_sub(needle.len() - 1);

        memchr::memchr_iter(constants::CR.as_bytes()[0], &self.buf[start..])
            .map(|rel_idx| start + rel_idx)
            .find(|&idx| needle.starts_with(&self.buf[idx..]))
            .map(|idx| self.buf.len() - idx)
            .unwrap_or(0)
    }

    fn find_delimiter(&self) -> Scan {
        match self.delimiter.find(&self.buf) {
            Some(idx) => Scan::Delimiter(idx),
            None => Scan::Safe(self.buf.len() - self.partial_delimiter_len()),
        }
    }

    /// Returns the next run of at most `max` bytes preceding the delimiter,
    /// or `None` once the delimiter is reached, which is consumed then.
    pub fn next_chunk(&mut self, field_name: Option<&str>, max: usize) -> crate::Result<Option<Bytes>> {
        loop {
            let scan = match self.scan {
                Some(scan) => scan,
                None => self.find_delimiter(),
            };

            match scan {
                Scan::Delimiter(0) => {
                    self.buf.advance(self.delimiter.needle().len());
                    self.scan = None;
                    return Ok(None);
                }
                Scan::Delimiter(idx) => {
                    let len = cmp::min(idx, max);
                    self.scan = Some(Scan::Delimiter(idx - len));
                    return Ok(Some(self.buf.split_to(len).freeze()));
                }
                Scan::Safe(safe_len) if safe_len > 0 => {
                    let len = cmp::min(safe_len, max);
                    self.scan = Some(Scan::Safe(safe_len - len));
                    return Ok(Some(self.buf.split_to(len).freeze()));
                }
                Scan::Safe(_) => {}
            }

            // Everything left might be the start of a delimiter.
            self.scan = None;
            if self.fill(self.capacity)? == 0 {
                return Err(crate::Error::IncompleteFieldData {
                    field_name: field_name.map(|name| name.to_owned()),
                });
            }
        }
    }

    /// Drops everything up to and including the next delimiter. Returns the
    /// number of dropped data bytes.
    pub fn discard_to_boundary(&mut self, field_name: Option<&str>) -> crate::Result<u64> {
        let mut discarded = 0;

        while let Some(bytes) = self.next_chunk(field_name, usize::MAX)? {
            discarded += bytes.len() as u64;
        }

        Ok(discarded)
    }

    /// Classifies the delimiter just consumed. For [`BoundaryKind::Next`] the
    /// line's `\r\n` stays in the buffer, it opens the header block.
    pub fn read_boundary_suffix(&mut self) -> crate::Result<BoundaryKind> {
        self.scan = None;
        self.fill_at_least(2)?;

        if self.buf.starts_with(constants::BOUNDARY_EXT.as_bytes()) {
            self.buf.advance(constants::BOUNDARY_EXT.len());
            self.final_seen = true;
            return Ok(BoundaryKind::Final);
        }

        // Transport padding is allowed between the boundary and its CRLF.
        loop {
            self.fill_at_least(2)?;

            match self.buf[0] {
                b' ' | b'\t' => self.buf.advance(1),
                _ => break,
            }
        }

        if self.buf.starts_with(constants::CRLF.as_bytes()) {
            Ok(BoundaryKind::Next)
        } else {
            Err(crate::Error::UnexpectedBoundarySuffix)
        }
    }

    /// Reads a header block, from the CRLF ending the boundary line through
    /// the blank line. The returned bytes hold the header lines and the
    /// terminating blank line, ready for `httparse`.
    pub fn read_headers(&mut self, max_size: usize) -> crate::Result<Bytes> {
        self.scan = None;

        let crlf_crlf = constants::CRLF_CRLF.as_bytes();
        let limit = constants::CRLF.len() + max_size + crlf_crlf.len();
        let mut searched: usize = 0;

        loop {
            let from = searched.saturating_sub(crlf_crlf.len() - 1);

            if let Some(rel_idx) = memmem::find(&self.buf[from..], crlf_crlf) {
                let mut block = self.buf.split_to(from + rel_idx + crlf_crlf.len());
                block.advance(constants::CRLF.len());
                return Ok(block.freeze());
            }

            searched = self.buf.len();
            if searched >= limit {
                return Err(crate::Error::HeadersTooLarge { limit: max_size });
            }

            let window = if searched < self.capacity { self.capacity } else { limit };
            if self.fill(window)? == 0 {
                return Err(crate::Error::IncompleteHeaders);
            }
        }
    }

    pub fn at_final_boundary(&self) -> bool {
        self.final_seen
    }
}

impl Debug for StreamBuffer<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamBuffer")
            .field("eof", &self.eof)
            .field("buffered", &self.buf.len())
            .field("capacity", &self.capacity)
            .field("final_seen", &self.final_seen)
            .finish()
    }
}
