//! 원시 이벤트 -- 캡처 계층이 생성하는 입력 레코드
//!
//! [`RawEvent`]는 OS 이벤트 캡처 계층(ETW 소비자 등)이 전달하는
//! 읽기 전용 레코드입니다. JSON 직렬화 형태는 ETW 이벤트의
//! `System` / `EventData` / `UserData` 구조를 그대로 따릅니다.
//!
//! ```json
//! {
//!   "System": {
//!     "Provider": { "Name": "Microsoft-Windows-TCPIP", "Guid": "{2F07E2EE-...}" },
//!     "EventID": 1033,
//!     "Correlation": { "ActivityID": "{...}" },
//!     "TimeCreated": { "SystemTime": "2024-01-15T12:00:00Z" }
//!   },
//!   "EventData": { "LocalSockAddr": "10.0.0.2:445", "RemoteSockAddr": "10.0.0.5:4444" }
//! }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ParseError;

/// 캡처 계층이 생성한 원시 이벤트
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawEvent {
    /// 공통 헤더
    #[serde(rename = "System")]
    pub system: SystemHeader,
    /// 이벤트별 페이로드
    #[serde(rename = "EventData", default)]
    pub event_data: Map<String, Value>,
    /// 사용자 정의 페이로드
    #[serde(rename = "UserData", default)]
    pub user_data: Map<String, Value>,
}

impl RawEvent {
    /// JSON 한 줄을 원시 이벤트로 역직렬화합니다.
    pub fn from_json(raw: &str) -> Result<Self, ParseError> {
        serde_json::from_str(raw).map_err(|e| ParseError::RawEvent {
            reason: e.to_string(),
        })
    }

    /// 이벤트 유형 ID
    pub fn event_id(&self) -> u16 {
        self.system.event_id
    }

    /// 이벤트 발생 시각
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.system.time_created.system_time
    }

    /// 프로바이더 이름 또는 GUID가 `id`와 일치하는지 확인합니다.
    pub fn is_from(&self, id: &str) -> bool {
        let provider = &self.system.provider;
        (!provider.name.is_empty() && provider.name == id)
            || (!provider.guid.is_empty() && provider.guid.eq_ignore_ascii_case(id))
    }
}

/// ETW 이벤트 공통 헤더
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemHeader {
    /// 프로바이더
    #[serde(rename = "Provider")]
    pub provider: ProviderInfo,
    /// 이벤트 ID
    #[serde(rename = "EventID")]
    pub event_id: u16,
    /// 채널
    #[serde(rename = "Channel")]
    pub channel: String,
    /// 호스트명
    #[serde(rename = "Computer")]
    pub computer: String,
    /// 레벨
    #[serde(rename = "Level")]
    pub level: ValueName<u8>,
    /// 옵코드
    #[serde(rename = "Opcode")]
    pub opcode: ValueName<u8>,
    /// 태스크
    #[serde(rename = "Task")]
    pub task: ValueName<u16>,
    /// 키워드 비트마스크
    #[serde(rename = "Keywords")]
    pub keywords: ValueName<u64>,
    /// 상관관계 ID
    #[serde(rename = "Correlation")]
    pub correlation: Correlation,
    /// 실행 컨텍스트
    #[serde(rename = "Execution")]
    pub execution: Execution,
    /// 생성 시각
    #[serde(rename = "TimeCreated")]
    pub time_created: TimeCreated,
}

/// 프로바이더 식별 정보
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderInfo {
    /// 프로바이더 이름 (예: `Microsoft-Windows-TCPIP`)
    #[serde(rename = "Name")]
    pub name: String,
    /// 프로바이더 GUID
    #[serde(rename = "Guid")]
    pub guid: String,
}

/// 숫자 값과 표시 이름 쌍
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ValueName<T> {
    /// 숫자 값
    #[serde(rename = "Value")]
    pub value: T,
    /// 표시 이름
    #[serde(rename = "Name")]
    pub name: String,
}

/// 활동(activity) 상관관계 ID
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Correlation {
    /// 활동 ID
    #[serde(rename = "ActivityID")]
    pub activity_id: String,
    /// 연관 활동 ID
    #[serde(rename = "RelatedActivityID")]
    pub related_activity_id: String,
}

/// 이벤트를 생성한 프로세스/스레드
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Execution {
    /// 프로세스 ID
    #[serde(rename = "ProcessID")]
    pub process_id: u32,
    /// 스레드 ID
    #[serde(rename = "ThreadID")]
    pub thread_id: u32,
}

/// 이벤트 생성 시각
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeCreated {
    /// UTC 시각
    #[serde(rename = "SystemTime")]
    pub system_time: DateTime<Utc>,
}

impl Default for TimeCreated {
    fn default() -> Self {
        Self {
            system_time: Utc::now(),
        }
    }
}
