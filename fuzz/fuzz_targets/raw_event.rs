#![no_main]

use libfuzzer_sys::fuzz_target;
use netwarden_core::event::RawEvent;
use netwarden_detection::extractor::{FieldExtractor, FieldSelection};
use netwarden_detection::codec::encode;

fuzz_target!(|data: &[u8]| {
    let Ok(json) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(event) = RawEvent::from_json(json) else {
        return;
    };

    // 임의로 중첩된 EventData/UserData에서도 패닉 없이 추출 및 인코딩
    let record = FieldExtractor::new(FieldSelection::All).extract(&event, "fuzz");
    let _ = encode(&record);
});
