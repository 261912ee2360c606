//! 필드 추출기 -- 원시 이벤트를 평탄한 필드 맵으로 정규화합니다.
//!
//! 추출 순서:
//! 1. 헤더 디스크립터 테이블([`schema::HEADER_FIELDS`]) 순회
//! 2. `EventData` / `UserData`의 이름 있는 멤버를 재귀적으로 방문
//! 3. [`address::split_address_fields`]로 주소 필드 분리
//!
//! 선택 목록에 없는 필드, 이벤트에 없는 필드, `"NA"` 값은 레코드에 포함되지 않습니다.

pub mod address;
pub mod schema;

use std::collections::{BTreeMap, BTreeSet};

use serde_json::{Map, Value};

use netwarden_core::event::RawEvent;
use netwarden_core::types::{FieldValue, NOT_APPLICABLE, NormalizedRecord};

pub use address::{split_address_fields, split_host_port};

/// 전체 캡처를 뜻하는 필드 선택자
pub const CAPTURE_ALL: &str = "*";

/// 로그 라인에서 예약된 키. 이벤트 필드로는 기록하지 않습니다.
pub const RESERVED_KEYS: &[&str] = &["time", "level", "msg", "provider"];

/// 필드 선택
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldSelection {
    /// 모든 필드 기록
    All,
    /// 명시된 필드만 기록
    Only(BTreeSet<String>),
}

impl FieldSelection {
    /// 설정의 필드 목록으로 선택을 생성합니다. `"*"`가 있으면 전체 캡처입니다.
    pub fn from_fields<S: AsRef<str>>(fields: &[S]) -> Self {
        if fields.iter().any(|f| f.as_ref() == CAPTURE_ALL) {
            Self::All
        } else {
            Self::Only(fields.iter().map(|f| f.as_ref().to_owned()).collect())
        }
    }

    /// 필드를 기록해야 하는지 확인합니다.
    pub fn wants(&self, name: &str) -> bool {
        match self {
            Self::All => true,
            Self::Only(names) => names.contains(name),
        }
    }
}

/// 필드 추출기
#[derive(Debug, Clone)]
pub struct FieldExtractor {
    selection: FieldSelection,
}

impl FieldExtractor {
    /// 새 추출기를 생성합니다.
    pub fn new(selection: FieldSelection) -> Self {
        Self { selection }
    }

    /// 필드 선택을 반환합니다.
    pub fn selection(&self) -> &FieldSelection {
        &self.selection
    }

    /// 원시 이벤트를 정규화된 레코드로 변환합니다.
    ///
    /// `provider`는 설정에 정의된 프로바이더 식별자이며 항상 레코드에 기록됩니다.
    pub fn extract(&self, event: &RawEvent, provider: &str) -> NormalizedRecord {
        let mut fields = BTreeMap::new();

        for descriptor in schema::HEADER_FIELDS {
            if !self.selection.wants(descriptor.name) {
                continue;
            }
            if let Some(value) = (descriptor.extract)(&event.system) {
                self.insert(&mut fields, descriptor.name, value);
            }
        }

        self.visit_object(&event.event_data, &mut fields);
        self.visit_object(&event.user_data, &mut fields);

        split_address_fields(&mut fields);

        NormalizedRecord {
            provider: provider.to_owned(),
            event_id: event.event_id(),
            timestamp: event.timestamp(),
            fields,
        }
    }

    fn visit_object(&self, object: &Map<String, Value>, out: &mut BTreeMap<String, FieldValue>) {
        for (name, value) in object {
            self.visit_member(name, value, out);
        }
    }

    fn visit_member(&self, name: &str, value: &Value, out: &mut BTreeMap<String, FieldValue>) {
        match value {
            Value::Object(object) => self.visit_object(object, out),
            Value::Array(items) => {
                // 배열 원소는 이름이 없으므로 객체 원소만 방문
                for item in items {
                    if let Value::Object(object) = item {
                        self.visit_object(object, out);
                    }
                }
            }
            Value::Null => {}
            scalar => {
                if !self.selection.wants(name) {
                    return;
                }
                if let Some(value) = scalar_to_field(scalar) {
                    self.insert(out, name, value);
                }
            }
        }
    }

    fn insert(&self, out: &mut BTreeMap<String, FieldValue>, name: &str, value: FieldValue) {
        if RESERVED_KEYS.contains(&name) {
            return;
        }
        if value.as_str().is_some_and(|s| s.is_empty() || s == NOT_APPLICABLE) {
            return;
        }
        out.insert(name.to_owned(), value);
    }
}

fn scalar_to_field(value: &Value) -> Option<FieldValue> {
    match value {
        Value::String(s) => Some(FieldValue::Str(s.clone())),
        Value::Bool(b) => Some(FieldValue::Bool(*b)),
        Value::Number(n) => {
            if let Some(v) = n.as_u64() {
                Some(FieldValue::UInt(v))
            } else if let Some(v) = n.as_i64() {
                Some(FieldValue::Int(v))
            } else {
                n.as_f64().map(FieldValue::Float)
            }
        }
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}
