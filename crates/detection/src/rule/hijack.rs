//! RDP 세션 하이재킹 탐지 (자리표시자)

use netwarden_core::types::ParsedLogEntry;

use super::{Detection, WindowDetector};

/// 세션 하이재킹 탐지기
///
/// 아직 알고리즘이 없으며 항상 히트 0을 보고합니다. 따라서 알림을 만들지 않습니다.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionHijackDetector;

impl WindowDetector for SessionHijackDetector {
    fn name(&self) -> &str {
        "rdp_session_hijack"
    }

    fn evaluate(&self, _entries: &[ParsedLogEntry]) -> Detection {
        Detection::none()
    }
}
