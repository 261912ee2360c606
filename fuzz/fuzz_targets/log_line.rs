#![no_main]

use libfuzzer_sys::fuzz_target;
use netwarden_detection::codec::LogLineDecoder;

fuzz_target!(|data: &[u8]| {
    // 로더는 UTF-8이 아닌 라인을 디코더에 넘기지 않음
    let Ok(line) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(decoder) = LogLineDecoder::new() else {
        return;
    };

    // 크래시나 패닉 없이 Ok 또는 Err을 반환해야 한다
    let _ = decoder.decode(line);
});
