#![no_main]

use std::io::Read;

use libfuzzer_sys::fuzz_target;
use partstream::{Multipart, Options};

fuzz_target!(|data: &[u8]| {
    let options = Options::new().buffer_size(32);
    let mut multipart = match Multipart::with_reader_with_options(data, "X-BOUNDARY", options) {
        Ok(multipart) => multipart,
        Err(_) => return,
    };

    let mut sink = Vec::new();
    let mut open = true;
    loop {
        match multipart.has_next() {
            Ok(true) => {}
            Ok(false) | Err(_) => break,
        }

        let mut field = match multipart.next_field() {
            Ok(field) => field,
            Err(_) => break,
        };

        // Alternate between reading fields and skipping them.
        open = !open;
        if open {
            if let Ok(mut reader) = field.open() {
                let _ = reader.read_to_end(&mut sink);
            }
        }
    }
});
