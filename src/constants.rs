pub(crate) const DEFAULT_BUFFER_SIZE: usize = 8 * 1024;
pub(crate) const DEFAULT_MAX_HEADER_SIZE: usize = 10 * 1024;

pub(crate) const MAX_HEADERS: usize = 32;
pub(crate) const MAX_BOUNDARY_LEN: usize = 70;
pub(crate) const BOUNDARY_EXT: &str = "--";
pub(crate) const CR: &str = "\r";
pub(crate) const CRLF: &str = "\r\n";
pub(crate) const CRLF_CRLF: &str = "\r\n\r\n";

/// The delimiter searched for inside the body: `\r\n--<boundary>`.
pub(crate) fn delimiter_for(boundary: &str) -> Vec<u8> {
    format!("{}{}{}", CRLF, BOUNDARY_EXT, boundary).into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delimiter_for() {
        assert_eq!(delimiter_for("X-BOUNDARY"), b"\r\n--X-BOUNDARY".to_vec());
        assert_eq!(delimiter_for("-"), b"\r\n---".to_vec());
    }
}
