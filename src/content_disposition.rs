use encoding_rs::{Encoding, UTF_8};
use http::header::{self, HeaderMap};

pub(crate) struct ContentDisposition {
    pub(crate) field_name: Option<String>,
    pub(crate) file_name: Option<String>,
}

impl ContentDisposition {
    pub fn parse(headers: &HeaderMap) -> ContentDisposition {
        let value = headers
            .get(header::CONTENT_DISPOSITION)
            .map(|val| val.as_bytes())
            .unwrap_or_default();

        let mut field_name = None;
        let mut file_name = None;
        let mut ext_file_name = None;

        for (name, value) in Params::new(value) {
            if name.eq_ignore_ascii_case(b"name") {
                field_name = Some(String::from_utf8_lossy(value).into_owned());
            } else if name.eq_ignore_ascii_case(b"filename") {
                file_name = Some(String::from_utf8_lossy(value).into_owned());
            } else if name.eq_ignore_ascii_case(b"filename*") {
                ext_file_name = decode_ext_value(value);
            }
        }

        ContentDisposition {
            field_name,
            file_name: ext_file_name.or(file_name),
        }
    }
}

/// Iterates the `name=value` parameters following the disposition type.
///
/// Quoted values end at the first unescaped quote. Backslashes are kept as
/// they are, since browsers send unescaped Windows paths as file names.
struct Params<'a> {
    rest: &'a [u8],
}

impl<'a> Params<'a> {
    fn new(value: &'a [u8]) -> Params<'a> {
        let rest: &[u8] = match memchr::memchr(b';', value) {
            Some(idx) => &value[idx + 1..],
            None => &[],
        };

        Params { rest }
    }
}

impl<'a> Iterator for Params<'a> {
    type Item = (&'a [u8], &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let rest = trim(self.rest);
            if rest.is_empty() {
                self.rest = rest;
                return None;
            }

            let idx = match memchr::memchr2(b';', b'=', rest) {
                Some(idx) if rest[idx] == b'=' => idx,
                // A parameter without value.
                Some(idx) => {
                    self.rest = &rest[idx + 1..];
                    continue;
                }
                None => {
                    self.rest = &[];
                    return None;
                }
            };

            let name = trim(&rest[..idx]);
            let rest = trim(&rest[idx + 1..]);

            let (value, rest) = if rest.first() == Some(&b'"') {
                let (value, end) = quoted(&rest[1..]);
                let after = &rest[1 + end..];
                let rest = match memchr::memchr(b';', after) {
                    Some(idx) => &after[idx + 1..],
                    None => &after[after.len()..],
                };
                (value, rest)
            } else {
                match memchr::memchr(b';', rest) {
                    Some(idx) => (trim(&rest[..idx]), &rest[idx + 1..]),
                    None => (trim(rest), &rest[rest.len()..]),
                }
            };

            self.rest = rest;
            return Some((name, value));
        }
    }
}

/// Splits a quoted string body. Returns the content and the index just past
/// the closing quote, or the whole input when the quote is never closed.
fn quoted(input: &[u8]) -> (&[u8], usize) {
    let mut escaped = false;

    for (idx, &b) in input.iter().enumerate() {
        match b {
            b'"' if !escaped => return (&input[..idx], idx + 1),
            b'\\' => escaped = !escaped,
            _ => escaped = false,
        }
    }

    (input, input.len())
}

fn trim(mut bytes: &[u8]) -> &[u8] {
    while let [first, rest @ ..] = bytes {
        if first.is_ascii_whitespace() {
            bytes = rest;
        } else {
            break;
        }
    }

    while let [rest @ .., last] = bytes {
        if last.is_ascii_whitespace() {
            bytes = rest;
        } else {
            break;
        }
    }

    bytes
}

/// Decodes an RFC 5987 extended value: `charset'language'percent-encoded`.
fn decode_ext_value(value: &[u8]) -> Option<String> {
    let mut parts = value.splitn(3, |&b| b == b'\'');
    let charset = parts.next()?;
    let _language = parts.next()?;
    let encoded = parts.next()?;

    let encoding = Encoding::for_label(charset).unwrap_or(UTF_8);
    let bytes = percent_decode(encoded)?;
    let (text, _, _) = encoding.decode(&bytes);

    Some(text.into_owned())
}

/// Percent-decodes an extended value, refusing `%` not followed by two hex
/// digits.
fn percent_decode(input: &[u8]) -> Option<Vec<u8>> {
    let well_formed = memchr::memchr_iter(b'%', input).all(|idx| {
        input
            .get(idx + 1..idx + 3)
            .map_or(false, |hex| hex.iter().all(u8::is_ascii_hexdigit))
    });

    if !well_formed {
        return None;
    }

    Some(percent_encoding::percent_decode(input).collect())
}
