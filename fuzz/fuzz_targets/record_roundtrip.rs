#![no_main]

use arbitrary::Arbitrary;
use chrono::{TimeZone, Utc};
use libfuzzer_sys::fuzz_target;

use netwarden_core::types::{NOT_APPLICABLE, NormalizedRecord};
use netwarden_detection::codec::{LogLineDecoder, encode};

/// 퍼저용 구조적 입력
#[derive(Arbitrary, Debug)]
struct FuzzInput {
    event_id: u16,
    /// u32 초 범위 (1970 ~ 2106)
    seconds: u32,
    nanos: u32,
    provider: String,
    fields: Vec<(String, String)>,
}

fuzz_target!(|input: FuzzInput| {
    let Some(ts) = Utc
        .timestamp_opt(i64::from(input.seconds), input.nanos % 1_000_000_000)
        .single()
    else {
        return;
    };

    // 키는 단어 문자만, 예약 키는 제외
    let mut record = NormalizedRecord::new(input.provider.clone(), input.event_id, ts);
    for (key, value) in input.fields.into_iter().take(16) {
        let valid = !key.is_empty()
            && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
            && !["time", "level", "msg", "provider"].contains(&key.as_str());
        if valid {
            record = record.with_field(key, value);
        }
    }

    let line = encode(&record);
    let Ok(decoder) = LogLineDecoder::new() else {
        return;
    };
    let entry = decoder.decode(&line).expect("encoded record must decode");

    assert_eq!(entry.timestamp, Some(ts));
    assert_eq!(u32::from(input.event_id), entry.event_id);
    for (key, value) in &record.fields {
        let value = value.to_string();
        if value == NOT_APPLICABLE {
            assert!(entry.field(key).is_none());
        } else {
            assert_eq!(entry.field(key), Some(value.as_str()), "field {key}");
        }
    }
});
