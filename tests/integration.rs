use bytes::Bytes;
use partstream::Multipart;

fn char_stream(data: &'static str) -> impl Iterator<Item = partstream::Result<Bytes>> {
    data.chars()
        .map(|ch| ch.to_string())
        .map(|part| partstream::Result::Ok(Bytes::copy_from_slice(part.as_bytes())))
}

#[test]
fn test_multipart_basic() {
    let data = "--X-BOUNDARY\r\nContent-Disposition: form-data; name=\"My Field\"\r\n\r\nabcd\r\n--X-BOUNDARY\r\nContent-Disposition: form-data; name=\"File Field\"; filename=\"a-text-file.txt\"\r\nContent-Type: text/plain\r\n\r\nHello world\nHello\r\nWorld\rAgain\r\n--X-BOUNDARY--\r\n";
    let mut m = Multipart::new(char_stream(data), "X-BOUNDARY").unwrap();

    while m.has_next().unwrap() {
        let mut field = m.next_field().unwrap();
        let idx = field.index();

        if idx == 0 {
            assert_eq!(field.name(), "My Field");
            assert_eq!(field.file_name(), None);
            assert_eq!(field.content_type(), None);
            assert!(field.is_form_field());

            assert_eq!(field.open().unwrap().text(), Ok("abcd".to_owned()));
        } else if idx == 1 {
            assert_eq!(field.name(), "File Field");
            assert_eq!(field.file_name(), Some("a-text-file.txt"));
            assert_eq!(field.content_type(), Some(&mime::TEXT_PLAIN));
            assert!(!field.is_form_field());

            assert_eq!(
                field.open().unwrap().text(),
                Ok("Hello world\nHello\r\nWorld\rAgain".to_owned())
            );
        } else {
            panic!("unexpected field #{}", idx);
        }
    }
}

#[test]
fn test_multipart_empty() {
    let mut m = Multipart::new(char_stream("--X-BOUNDARY--\r\n"), "X-BOUNDARY").unwrap();

    assert!(!m.has_next().unwrap());
    assert!(!m.has_next().unwrap());
    assert!(m.next().is_none());
}

#[test]
fn test_multipart_clean_field() {
    let data = "--X-BOUNDARY\r\nContent-Disposition: form-data; name=\"My Field\"\r\n\r\nabcd\r\n--X-BOUNDARY\r\nContent-Disposition: form-data; name=\"File Field\"; filename=\"a-text-file.txt\"\r\nContent-Type: text/plain\r\n\r\nHello world\nHello\r\nWorld\rAgain\r\n--X-BOUNDARY--\r\n";
    let mut m = Multipart::new(char_stream(data), "X-BOUNDARY").unwrap();

    assert!(m.next().unwrap().is_ok());
    assert!(m.next().unwrap().is_ok());
    assert!(m.next().is_none());
}

#[test]
fn test_multipart_preamble_and_epilogue() {
    let data = "This is the preamble.\r\n--X-BOUNDARY\r\nContent-Disposition: form-data; name=\"a\"\r\n\r\n1\r\n--X-BOUNDARY--\r\nThis is the epilogue, never read as a field.";
    let m = Multipart::with_reader(data.as_bytes(), "X-BOUNDARY").unwrap();

    let names = m.map(|field| field.unwrap().name().to_owned()).collect::<Vec<_>>();
    assert_eq!(names, vec!["a"]);
}

#[test]
fn test_multipart_boundary_like_data() {
    let data = "--X-BOUNDARY\r\nContent-Disposition: form-data; name=\"a\"\r\n\r\n--X-BOUNDARY\r\n--X-BOUNDAR\r\n-X-BOUNDARY\r\n--X-BOUNDARY--\r\n";
    let mut m = Multipart::new(char_stream(data), "X-BOUNDARY").unwrap();

    assert!(m.has_next().unwrap());
    let text = m.next_field().unwrap().open().unwrap().text().unwrap();
    assert_eq!(text, "--X-BOUNDARY\r\n--X-BOUNDAR\r\n-X-BOUNDARY");
    assert!(!m.has_next().unwrap());
}

#[test]
fn test_multipart_binary_data() {
    let mut body = b"--X-BOUNDARY\r\nContent-Disposition: form-data; name=\"blob\"; filename=\"blob.bin\"\r\nContent-Type: application/octet-stream\r\n\r\n".to_vec();
    let payload = (0..=255u8).cycle().take(50_000).collect::<Vec<u8>>();
    body.extend_from_slice(&payload);
    body.extend_from_slice(b"\r\n--X-BOUNDARY--\r\n");

    let options = partstream::Options::new().buffer_size(64);
    let mut m = Multipart::with_reader_with_options(&body[..], "X-BOUNDARY", options).unwrap();

    assert!(m.has_next().unwrap());
    let data = m.next_field().unwrap().open().unwrap().bytes().unwrap();
    assert_eq!(&data[..], &payload[..]);
    assert!(!m.has_next().unwrap());
}

#[test]
fn test_multipart_large_field_single_byte_reads() {
    use std::io::Read;

    let mut body = b"--X-BOUNDARY\r\nContent-Disposition: form-data; name=\"blob\"; filename=\"blob.bin\"\r\n\r\n".to_vec();
    let payload = (0..=255u8).cycle().take(512 * 1024).collect::<Vec<u8>>();
    body.extend_from_slice(&payload);
    body.extend_from_slice(b"\r\n--X-BOUNDARY--\r\n");

    let mut m = Multipart::with_reader(&body[..], "X-BOUNDARY").unwrap();
    assert!(m.has_next().unwrap());
    let mut reader = m.next_field().unwrap().open().unwrap();

    let mut data = Vec::with_capacity(payload.len());
    let mut byte = [0; 1];
    while reader.read(&mut byte).unwrap() == 1 {
        data.push(byte[0]);
    }

    assert_eq!(data.len(), payload.len());
    assert!(data == payload);
    assert!(!m.has_next().unwrap());
}

#[test]
fn test_multipart_stream_error() {
    let chunks = vec![
        Ok(Bytes::from_static(
            b"--X-BOUNDARY\r\nContent-Disposition: form-data; name=\"a\"\r\n\r\nab",
        )),
        Err(std::io::Error::new(std::io::ErrorKind::ConnectionAborted, "aborted")),
    ];
    let mut m = Multipart::new(chunks, "X-BOUNDARY").unwrap();

    assert!(m.has_next().unwrap());
    let mut reader = m.next_field().unwrap().open().unwrap();
    assert_eq!(reader.chunk().unwrap(), Some(Bytes::from_static(b"ab")));

    match reader.chunk() {
        Err(partstream::Error::StreamReadFailed(err)) => assert_eq!(err.to_string(), "aborted"),
        other => panic!("unexpected result: {:?}", other),
    }

    assert_eq!(m.has_next().unwrap_err(), partstream::Error::SessionFailed);
}

#[cfg(feature = "tokio-io")]
#[tokio::test(flavor = "multi_thread")]
async fn test_multipart_async_reader() {
    let data: &'static [u8] = b"--X-BOUNDARY\r\nContent-Disposition: form-data; name=\"a\"\r\n\r\n1\r\n--X-BOUNDARY\r\nContent-Disposition: form-data; name=\"b\"\r\n\r\n2\r\n--X-BOUNDARY--\r\n";
    let handle = tokio::runtime::Handle::current();

    let fields = tokio::task::spawn_blocking(move || {
        let m = Multipart::with_async_reader(data, "X-BOUNDARY", handle).unwrap();

        m.map(|field| {
            let mut field = field.unwrap();
            let value = field.open().unwrap().text().unwrap();
            (field.name().to_owned(), value)
        })
        .collect::<Vec<_>>()
    })
    .await
    .unwrap();

    assert_eq!(
        fields,
        vec![("a".to_owned(), "1".to_owned()), ("b".to_owned(), "2".to_owned())]
    );
}

#[cfg(feature = "tokio-io")]
#[tokio::test(flavor = "multi_thread")]
async fn test_multipart_async_reader_with_options() {
    let data: &'static [u8] = b"--X-BOUNDARY\r\nContent-Disposition: form-data; name=\"a\"; filename=\"a.txt\"\r\n\r\nsome longer file content\r\n--X-BOUNDARY--\r\n";
    let handle = tokio::runtime::Handle::current();

    let result = tokio::task::spawn_blocking(move || {
        let options = partstream::Options::new().buffer_size(16).max_header_size(1024);
        let mut m = Multipart::with_async_reader_with_options(data, "X-BOUNDARY", handle, options).unwrap();

        assert!(m.has_next().unwrap());
        let text = m.next_field().unwrap().open().unwrap().text().unwrap();
        assert!(!m.has_next().unwrap());
        text
    })
    .await
    .unwrap();

    assert_eq!(result, "some longer file content");

    let options = partstream::Options::new().buffer_size(8);
    let err = Multipart::with_async_reader_with_options(&b""[..], "X-BOUNDARY", tokio::runtime::Handle::current(), options)
        .unwrap_err();
    assert!(matches!(err, partstream::Error::InvalidBoundary(_)));
}
