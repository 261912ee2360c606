//! 헤더 필드 디스크립터 테이블
//!
//! ETW 공통 헤더(`System`)에서 추출 가능한 필드를 정적 테이블로 선언합니다.
//! 각 디스크립터는 필드명과 타입이 정해진 추출 함수로 구성되며,
//! 런타임 리플렉션 없이 테이블 순회만으로 헤더를 평탄화합니다.

use netwarden_core::event::SystemHeader;
use netwarden_core::types::FieldValue;

/// 헤더 필드 추출 함수
pub type HeaderExtractFn = fn(&SystemHeader) -> Option<FieldValue>;

/// 헤더 필드 디스크립터
#[derive(Debug, Clone, Copy)]
pub struct HeaderField {
    /// 레코드에 기록되는 필드명
    pub name: &'static str,
    /// 값 추출 함수. 값이 없으면 `None`
    pub extract: HeaderExtractFn,
}

/// 모든 이벤트에 공통으로 적용되는 헤더 필드
pub static HEADER_FIELDS: &[HeaderField] = &[
    HeaderField {
        name: "EventID",
        extract: |h| Some(h.event_id.into()),
    },
    HeaderField {
        name: "Channel",
        extract: |h| non_empty(&h.channel),
    },
    HeaderField {
        name: "Computer",
        extract: |h| non_empty(&h.computer),
    },
    HeaderField {
        name: "Level",
        extract: |h| Some(h.level.value.into()),
    },
    HeaderField {
        name: "Opcode",
        extract: |h| Some(h.opcode.value.into()),
    },
    HeaderField {
        name: "Task",
        extract: |h| Some(h.task.value.into()),
    },
    HeaderField {
        name: "Keywords",
        extract: |h| Some(h.keywords.value.into()),
    },
    HeaderField {
        name: "ActivityID",
        extract: |h| non_empty(&h.correlation.activity_id),
    },
    HeaderField {
        name: "RelatedActivityID",
        extract: |h| non_empty(&h.correlation.related_activity_id),
    },
    HeaderField {
        name: "ProcessID",
        extract: |h| Some(h.execution.process_id.into()),
    },
    HeaderField {
        name: "ThreadID",
        extract: |h| Some(h.execution.thread_id.into()),
    },
    HeaderField {
        name: "ProviderName",
        extract: |h| non_empty(&h.provider.name),
    },
    HeaderField {
        name: "ProviderGuid",
        extract: |h| non_empty(&h.provider.guid),
    },
];

fn non_empty(s: &str) -> Option<FieldValue> {
    (!s.is_empty()).then(|| FieldValue::from(s))
}
