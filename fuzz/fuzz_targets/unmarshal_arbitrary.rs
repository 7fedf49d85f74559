#![no_main]
use libfuzzer_sys::fuzz_target;
use lz4framed::DecompressionContext;

fuzz_target!(|data: &[u8]| {
    // A restored context must either be rejected or keep decoding safely.
    let split = data.first().map_or(0, |&b| usize::from(b)).min(data.len());
    let (blob, tail) = data.split_at(split);
    if let Ok(mut ctx) = DecompressionContext::unmarshal(blob) {
        let _ = ctx.update(tail, 32);
    }
});
