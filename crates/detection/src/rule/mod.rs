//! 탐지 규칙 엔진
//!
//! `rules.yml`의 규칙을 주기적으로 평가합니다. 규칙마다 최근 시간 범위의
//! 로그를 [`WindowedLogLoader`](crate::loader::WindowedLogLoader)로 읽고,
//! 규칙 종류에 맞는 탐지기로 히트 수를 계산한 뒤 임계값과 비교합니다.
//!
//! # 탐지기
//! - [`ScanDetector`]: 원격 주소별 고유 로컬 포트 수
//! - [`BruteForceDetector`]: 연결 시도(131)와 종료(103, 사유 14)의 활동 ID 상관관계
//! - [`SessionHijackDetector`]: 자리표시자 (항상 0)

pub mod brute_force;
pub mod engine;
pub mod hijack;
pub mod loader;
pub mod scan;
pub mod types;

use netwarden_core::types::ParsedLogEntry;

pub use brute_force::BruteForceDetector;
pub use engine::{RuleEngine, RuleOutcome, TickReport};
pub use hijack::SessionHijackDetector;
pub use loader::RuleLoader;
pub use scan::ScanDetector;
pub use types::{CorrelationPolicy, Rule, RuleKind, RuleSet, RuleSettings};

/// 탐지기 한 번의 평가 결과
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Detection {
    /// 히트 수
    pub hits: u64,
    /// 최대 히트 수를 기록한 주소. 히트가 없으면 `None`
    pub culprit: Option<String>,
}

impl Detection {
    /// 히트가 없는 결과
    pub fn none() -> Self {
        Self::default()
    }
}

/// 시간 범위 내 엔트리를 평가하는 탐지기
///
/// 상태는 평가마다 새로 만들고 평가가 끝나면 버립니다.
pub trait WindowDetector: Send + Sync {
    /// 탐지기 이름
    fn name(&self) -> &str;

    /// 타임스탬프 순으로 정렬된 엔트리를 평가합니다.
    fn evaluate(&self, entries: &[ParsedLogEntry]) -> Detection;
}

/// 최댓값과 그 값에 처음 도달한 주소를 추적합니다.
///
/// 값이 현재 최댓값보다 클 때만 선두가 바뀌므로, 같은 값에 나중에 도달한
/// 주소는 선두를 가져가지 못합니다.
#[derive(Debug, Default)]
pub(crate) struct Leader<'a> {
    max: u64,
    address: Option<&'a str>,
}

impl<'a> Leader<'a> {
    pub(crate) fn offer(&mut self, address: &'a str, value: u64) {
        if value > self.max {
            self.max = value;
            self.address = Some(address);
        }
    }

    pub(crate) fn into_detection(self) -> Detection {
        Detection {
            hits: self.max,
            culprit: self.address.map(str::to_owned),
        }
    }
}
