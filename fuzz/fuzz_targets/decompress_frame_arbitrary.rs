#![no_main]
use std::io::Cursor;

use libfuzzer_sys::fuzz_target;
use lz4framed::Decompressor;

fuzz_target!(|data: &[u8]| {
    // Errors are expected; panics are not.
    let _ = lz4framed::decompress(data);

    let d = Decompressor::new(Cursor::new(data.to_vec()));
    for chunk in &d {
        if chunk.is_err() {
            break;
        }
    }
});
