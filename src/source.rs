use bytes::{Buf, Bytes};
use std::cmp;
use std::io::{self, Read};

/// Turns an iterator of body chunks into a byte source.
pub(crate) struct ChunkSource<I> {
    chunks: I,
    current: Bytes,
}

impl<I> ChunkSource<I> {
    pub fn new(chunks: I) -> Self {
        ChunkSource {
            chunks,
            current: Bytes::new(),
        }
    }
}

impl<I, O, E> Read for ChunkSource<I>
where
    I: Iterator<Item = Result<O, E>>,
    O: Into<Bytes>,
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        while self.current.is_empty() {
            match self.chunks.next() {
                Some(Ok(chunk)) => self.current = chunk.into(),
                Some(Err(err)) => return Err(io::Error::new(io::ErrorKind::Other, err)),
                None => return Ok(0),
            }
        }

        let len = cmp::min(buf.len(), self.current.len());
        buf[..len].copy_from_slice(&self.current[..len]);
        self.current.advance(len);

        Ok(len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;

    #[test]
    fn test_chunk_source_read() {
        let chunks = vec!["ab", "", "cde"]
            .into_iter()
            .map(|chunk| Result::<_, Infallible>::Ok(Bytes::from(chunk)));
        let mut source = ChunkSource::new(chunks);

        let mut out = String::new();
        source.read_to_string(&mut out).unwrap();
        assert_eq!(out, "abcde");
    }

    #[test]
    fn test_chunk_source_error() {
        let chunks = vec![Ok("ab"), Err("connection lost")].into_iter();
        let mut source = ChunkSource::new(chunks);

        let mut buf = [0; 8];
        assert_eq!(source.read(&mut buf).unwrap(), 2);

        let err = source.read(&mut buf).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::Other);
        assert_eq!(err.to_string(), "connection lost");
    }
}
