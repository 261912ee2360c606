#![doc = include_str!("../README.md")]
//!
//! # 모듈 구성
//!
//! - [`extractor`]: 원시 이벤트를 평탄한 필드 맵으로 정규화
//! - [`codec`]: 정규화 레코드 <-> 텍스트 로그 라인
//! - [`loader`]: 시간 범위 기반 로그 파일 로더
//! - [`rule`]: 규칙 로딩, 탐지기, 규칙 엔진
//! - [`capture`]: 원시 이벤트 소스, 캡처 세션, 프로바이더별 기록기
//! - [`alert`]: 알림 싱크 구현
//! - [`config`]: 탐지 설정 (core 설정 변환)
//! - [`error`]: 도메인 에러 타입

pub mod alert;
pub mod capture;
pub mod codec;
pub mod config;
pub mod error;
pub mod extractor;
pub mod loader;
pub mod rule;

// --- 주요 타입 re-export ---

// 설정 / 에러
pub use config::DetectionConfig;
pub use error::DetectionError;

// 정규화 / 코덱
pub use codec::{LogLineDecoder, encode};
pub use extractor::{FieldExtractor, FieldSelection};

// 로더
pub use loader::{LoadedWindow, WindowedLogLoader};

// 규칙 엔진
pub use rule::{CorrelationPolicy, RuleEngine, RuleLoader, RuleSet, TickReport};

// 캡처
pub use capture::{CaptureSession, JsonEventSource, ProviderLoader, ProviderLogWriter, ProviderSet};

// 알림
pub use alert::{CommandAlertSink, LogAlertSink, sink_from_config};
