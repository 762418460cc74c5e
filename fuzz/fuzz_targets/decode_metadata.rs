#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let decoder = if let Ok(d) = tiff_meta::decoder::Decoder::new(data) {
        d
    } else {
        return;
    };

    let mut limits = tiff_meta::decoder::Limits::default();
    limits.max_value_size = 1_000_000;
    limits.max_directories = 256;

    let tree = match decoder.with_limits(limits).decode() {
        Ok(tree) => tree,
        Err(_) => return,
    };

    // Whatever decodes and encodes must decode again.
    if let Ok(bytes) = tiff_meta::encode(&tree) {
        tiff_meta::decode(&bytes).expect("re-encoded structure must decode");
    }
});
