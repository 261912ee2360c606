//! 탐지 규칙 데이터 타입
//!
//! `rules.yml`에서 역직렬화되는 규칙 설정과 규칙 종류를 정의합니다.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::check_log_file_name;
use crate::error::DetectionError;

/// 알려진 규칙 종류
///
/// 규칙 이름으로 결정되며, 알 수 없는 이름은 [`RuleKind::Unknown`]입니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleKind {
    /// 포트 스캔 탐지 (`scan_detection`)
    ScanDetection,
    /// RDP 무차별 대입 탐지 (`rdp_brute_force`)
    RdpBruteForce,
    /// RDP 세션 하이재킹 탐지 (`rdp_session_hijack`, 미구현 자리표시자)
    RdpSessionHijack,
    /// 대응하는 탐지 알고리즘이 없는 규칙
    Unknown,
}

impl RuleKind {
    /// 규칙 이름으로 종류를 결정합니다.
    pub fn from_name(name: &str) -> Self {
        match name {
            "scan_detection" => Self::ScanDetection,
            "rdp_brute_force" => Self::RdpBruteForce,
            "rdp_session_hijack" => Self::RdpSessionHijack,
            _ => Self::Unknown,
        }
    }

    /// 규칙이 조회하는 최근 시간 범위. 알 수 없는 규칙은 `None`
    pub fn lookback(self) -> Option<Duration> {
        match self {
            Self::ScanDetection | Self::RdpBruteForce => Some(Duration::from_secs(60)),
            Self::RdpSessionHijack => Some(Duration::from_secs(30 * 60)),
            Self::Unknown => None,
        }
    }

    /// 지목된 주소를 포함한 알림 메시지
    pub fn alert_message(self, culprit: &str) -> String {
        match self {
            Self::ScanDetection => format!("Host is currently being scanned by {culprit}"),
            Self::RdpBruteForce => {
                format!("Host is currently being RDP Brute Forced by {culprit}")
            }
            Self::RdpSessionHijack => {
                format!("Host is currently being RDP Session Hijacked by {culprit}")
            }
            Self::Unknown => format!("Suspicious activity from {culprit}"),
        }
    }
}

/// `rules.yml`의 규칙 하나에 대한 설정
///
/// ```yaml
/// rules:
///   scan_detection:
///     enabled: true
///     alert_threshold: 20
///     files: [tcpip.log]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleSettings {
    /// 활성화 여부
    pub enabled: bool,
    /// 알림 임계값 (히트 수가 이 값 이상이면 알림)
    pub alert_threshold: u64,
    /// 읽을 로그 파일 이름 (로그 디렉토리 기준)
    pub files: Vec<String>,
}

/// 이름이 붙은 탐지 규칙
///
/// 런타임에 변경되지 않는 읽기 전용 설정입니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    /// 규칙 이름
    pub name: String,
    /// 규칙 종류
    pub kind: RuleKind,
    /// 활성화 여부
    pub enabled: bool,
    /// 알림 임계값
    pub alert_threshold: u64,
    /// 로그 파일 이름
    pub files: Vec<String>,
}

impl Rule {
    /// 이름과 설정으로 규칙을 생성합니다.
    pub fn new(name: impl Into<String>, settings: RuleSettings) -> Self {
        let name = name.into();
        Self {
            kind: RuleKind::from_name(&name),
            name,
            enabled: settings.enabled,
            alert_threshold: settings.alert_threshold,
            files: settings.files,
        }
    }

    /// 규칙의 유효성을 검증합니다.
    ///
    /// 비활성화된 규칙과 알 수 없는 규칙은 이름만 검사합니다.
    /// 알 수 없는 규칙은 파일을 읽지 않고 알림도 보내지 않습니다.
    pub fn validate(&self) -> Result<(), DetectionError> {
        if self.name.trim().is_empty() {
            return Err(DetectionError::RuleValidation {
                rule: "(empty)".to_owned(),
                reason: "rule name must not be empty".to_owned(),
            });
        }

        if !self.enabled || self.kind == RuleKind::Unknown {
            return Ok(());
        }

        if self.alert_threshold == 0 {
            return Err(DetectionError::RuleValidation {
                rule: self.name.clone(),
                reason: "alert_threshold must be at least 1".to_owned(),
            });
        }

        if self.files.is_empty() {
            return Err(DetectionError::RuleValidation {
                rule: self.name.clone(),
                reason: "at least one log file is required".to_owned(),
            });
        }

        for file in &self.files {
            check_log_file_name(file).map_err(|reason| DetectionError::RuleValidation {
                rule: self.name.clone(),
                reason,
            })?;
        }

        Ok(())
    }
}

/// 규칙 집합 (파일에 정의된 순서 유지)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    /// 규칙 목록으로 집합을 생성합니다.
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    /// 모든 규칙을 정의 순서대로 순회합니다.
    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }

    /// 활성화된 규칙만 순회합니다.
    pub fn enabled(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter().filter(|r| r.enabled)
    }

    /// 이름으로 규칙을 찾습니다.
    pub fn get(&self, name: &str) -> Option<&Rule> {
        self.rules.iter().find(|r| r.name == name)
    }

    /// 규칙 수
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// 규칙이 없는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// RDP 활동 ID 상관관계 정책
///
/// 하나의 활동 ID가 여러 주소의 대기 집합에 있을 때 어느 주소의 카운터를
/// 올릴지 정합니다.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrelationPolicy {
    /// 일치하는 모든 주소의 카운터 증가 (기본값)
    #[default]
    AllMatches,
    /// 처음 관측된 주소 하나만 증가
    FirstMatch,
}

impl FromStr for CorrelationPolicy {
    type Err = DetectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all_matches" => Ok(Self::AllMatches),
            "first_match" => Ok(Self::FirstMatch),
            other => Err(DetectionError::Config {
                field: "engine.correlation".to_owned(),
                reason: format!("unknown correlation policy '{other}'"),
            }),
        }
    }
}

impl fmt::Display for CorrelationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AllMatches => f.write_str("all_matches"),
            Self::FirstMatch => f.write_str("first_match"),
        }
    }
}
