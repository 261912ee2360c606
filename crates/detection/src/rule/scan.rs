//! 포트 스캔 탐지
//!
//! 원격 주소별로 관측된 고유 로컬 포트 수를 셉니다. 가장 많은 포트에 접근한
//! 주소가 지목되며 그 포트 수가 히트 수입니다.

use std::collections::{HashMap, HashSet};

use netwarden_core::types::ParsedLogEntry;

use super::{Detection, Leader, WindowDetector};

/// 로컬 포트 필드
pub const LOCAL_PORT_FIELD: &str = "LocalSockAddr_PORT";
/// 원격 주소 필드
pub const REMOTE_IP_FIELD: &str = "RemoteSockAddr_IP";

/// 포트 스캔 탐지기
#[derive(Debug, Clone, Copy, Default)]
pub struct ScanDetector;

impl WindowDetector for ScanDetector {
    fn name(&self) -> &str {
        "scan_detection"
    }

    fn evaluate(&self, entries: &[ParsedLogEntry]) -> Detection {
        let mut ports_by_remote: HashMap<&str, HashSet<&str>> = HashMap::new();
        let mut leader = Leader::default();

        for entry in entries {
            let (Some(port), Some(remote)) =
                (entry.field(LOCAL_PORT_FIELD), entry.field(REMOTE_IP_FIELD))
            else {
                continue;
            };

            let ports = ports_by_remote.entry(remote).or_default();
            if ports.insert(port) {
                leader.offer(remote, ports.len() as u64);
            }
        }

        leader.into_detection()
    }
}
