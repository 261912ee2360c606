//! 도메인 타입 -- 시스템 전역에서 사용되는 공통 타입
//!
//! 정규화 경로(이벤트 → 레코드)와 탐지 경로(로그 라인 → 엔트리)가
//! 공유하는 데이터 구조를 정의합니다.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 필드가 적용되지 않음을 나타내는 센티널 값
///
/// 이 값을 가진 필드는 저장되지 않고 생략됩니다.
pub const NOT_APPLICABLE: &str = "NA";

/// 정규화된 필드 값
///
/// 원시 이벤트의 스칼라 리프 값을 표현합니다. 로그 라인에는
/// [`Display`](fmt::Display) 결과가 기록됩니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// 문자열
    Str(String),
    /// 부호 있는 정수
    Int(i64),
    /// 부호 없는 정수
    UInt(u64),
    /// 부동소수점
    Float(f64),
    /// 불리언
    Bool(bool),
}

impl FieldValue {
    /// 문자열 값이면 참조를 반환합니다.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => f.write_str(s),
            Self::Int(v) => write!(f, "{v}"),
            Self::UInt(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Bool(v) => write!(f, "{v}"),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        Self::Str(s.to_owned())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<u64> for FieldValue {
    fn from(v: u64) -> Self {
        Self::UInt(v)
    }
}

impl From<u32> for FieldValue {
    fn from(v: u32) -> Self {
        Self::UInt(u64::from(v))
    }
}

impl From<u16> for FieldValue {
    fn from(v: u16) -> Self {
        Self::UInt(u64::from(v))
    }
}

impl From<u8> for FieldValue {
    fn from(v: u8) -> Self {
        Self::UInt(u64::from(v))
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

/// 정규화된 레코드
///
/// 원시 이벤트 하나당 한 번 생성되며 이후 변경되지 않습니다.
/// `fields`는 키 순서로 정렬되어 로그 라인 배치가 항상 동일합니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    /// 프로바이더 식별자 (설정의 이름 또는 GUID)
    pub provider: String,
    /// 이벤트 유형 ID
    pub event_id: u16,
    /// 이벤트 발생 시각
    pub timestamp: DateTime<Utc>,
    /// 추출된 필드 (필드명 -> 값)
    pub fields: BTreeMap<String, FieldValue>,
}

impl NormalizedRecord {
    /// 빈 필드 맵으로 레코드를 생성합니다.
    pub fn new(provider: impl Into<String>, event_id: u16, timestamp: DateTime<Utc>) -> Self {
        Self {
            provider: provider.into(),
            event_id,
            timestamp,
            fields: BTreeMap::new(),
        }
    }

    /// 필드를 추가합니다.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// 필드 값을 조회합니다.
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }
}

/// 로그 파일에서 다시 읽어들인 엔트리
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedLogEntry {
    /// 타임스탬프. `time` 키가 없는 라인은 `None`
    pub timestamp: Option<DateTime<Utc>>,
    /// 이벤트 유형 ID (`msg`에 없으면 0)
    pub event_id: u32,
    /// 나머지 필드 (`"NA"` 값은 포함되지 않음)
    pub fields: BTreeMap<String, String>,
}

impl ParsedLogEntry {
    /// 필드 값을 조회합니다.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

impl fmt::Display for ParsedLogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.timestamp {
            Some(ts) => write!(f, "[{}] event {}", ts.to_rfc3339(), self.event_id)?,
            None => write!(f, "[-] event {}", self.event_id)?,
        }
        write!(f, " ({} fields)", self.fields.len())
    }
}

/// 규칙이 조회할 시간 범위
///
/// 양 끝을 모두 포함합니다. `Unbounded`는 모든 엔트리를 포함합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeWindow {
    /// 시간 제한 없음
    #[default]
    Unbounded,
    /// `start <= t <= end`
    Range {
        /// 시작 시각 (포함)
        start: DateTime<Utc>,
        /// 종료 시각 (포함)
        end: DateTime<Utc>,
    },
}

impl TimeWindow {
    /// `[start, end]` 범위를 생성합니다.
    pub fn between(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self::Range { start, end }
    }

    /// `now` 기준 최근 `duration` 범위를 생성합니다.
    pub fn last(duration: Duration, now: DateTime<Utc>) -> Self {
        let span = chrono::Duration::from_std(duration).unwrap_or(chrono::Duration::zero());
        Self::Range {
            start: now - span,
            end: now,
        }
    }

    /// 타임스탬프가 범위에 포함되는지 확인합니다.
    ///
    /// 타임스탬프가 없는 엔트리는 `Unbounded`에서만 포함됩니다.
    pub fn contains(&self, timestamp: Option<DateTime<Utc>>) -> bool {
        match (self, timestamp) {
            (Self::Unbounded, _) => true,
            (Self::Range { start, end }, Some(ts)) => *start <= ts && ts <= *end,
            (Self::Range { .. }, None) => false,
        }
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unbounded => write!(f, "unbounded"),
            Self::Range { start, end } => {
                write!(f, "{} .. {}", start.to_rfc3339(), end.to_rfc3339())
            }
        }
    }
}

/// 보안 알림
///
/// 규칙의 히트 수가 임계값에 도달했을 때 생성됩니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    /// 알림 ID
    pub id: String,
    /// 규칙명
    pub rule: String,
    /// 사람이 읽는 알림 메시지
    pub message: String,
    /// 히트 수
    pub hits: u64,
    /// 지목된 원격 주소
    pub culprit: String,
    /// 생성 시각
    pub created_at: DateTime<Utc>,
}

impl Alert {
    /// 새 알림을 생성합니다.
    pub fn new(
        rule: impl Into<String>,
        message: impl Into<String>,
        hits: u64,
        culprit: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            rule: rule.into(),
            message: message.into(),
            hits,
            culprit: culprit.into(),
            created_at: Utc::now(),
        }
    }
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} (hits: {})", self.rule, self.message, self.hits)
    }
}
