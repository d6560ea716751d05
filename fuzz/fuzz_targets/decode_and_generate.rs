#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let data = if data.len() > 64 * 1024 {
        &data[..64 * 1024]
    } else {
        data
    };

    let Ok(req) = tsd1gen_core::wire::decode_request(data) else {
        return;
    };

    let _ = tsd1gen_core::generate(&req);
});
