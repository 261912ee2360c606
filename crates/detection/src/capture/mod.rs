//! 캡처 모듈 -- 원시 이벤트를 받아 프로바이더별 정규화 로그로 기록합니다.
//!
//! # 구성
//! - [`JsonEventSource`]: 줄 단위 JSON 원시 이벤트를 읽어 mpsc 채널로 전달
//! - [`CaptureSession`]: 프로바이더 매칭, 이벤트 ID 필터, 필드 추출, 기록
//! - [`ProviderLogWriter`]: 프로바이더마다 로그 파일 하나 (파일을 열 수 없으면 stdout)
//! - [`ProviderLoader`]: `providers.yml` 로딩 및 검증
//!
//! ```text
//! JsonEventSource --mpsc<RawEvent>--> CaptureSession --encode--> <log_dir>/<logFile>
//! ```

pub mod provider;
pub mod session;
pub mod source;
pub mod writer;

pub use provider::{Provider, ProviderLoader, ProviderSet, ProviderSettings};
pub use session::{CaptureSession, CaptureStats, StopReason};
pub use source::{JsonEventSource, STDIN_SOURCE};
pub use writer::ProviderLogWriter;

/// 소스와 세션 사이 채널의 기본 용량
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;
