//! RDP 무차별 대입 탐지
//!
//! 두 이벤트를 짝지어 실패한 접속 시도를 셉니다.
//!
//! - `131` (연결 시도): 클라이언트 주소의 대기 집합에 활동 ID를 등록
//! - `103` (연결 종료): 사유 코드가 `14`이면 그 활동 ID를 대기 중인 주소의 카운터 증가
//!
//! 히트 수는 주소별 카운터의 최댓값입니다. 하나의 활동 ID가 여러 주소에
//! 대기 중일 때의 처리는 [`CorrelationPolicy`]가 정합니다.

use std::collections::{HashMap, HashSet};

use netwarden_core::types::ParsedLogEntry;

use super::types::CorrelationPolicy;
use super::{Detection, Leader, WindowDetector};

/// 연결 시도 이벤트 ID
pub const CONNECT_EVENT_ID: u32 = 131;
/// 연결 종료 이벤트 ID
pub const DISCONNECT_EVENT_ID: u32 = 103;
/// 실패한 접속 시도를 뜻하는 종료 사유 코드
pub const FAILED_ATTEMPT_REASON: &str = "14";

/// 클라이언트 주소 필드
pub const CLIENT_IP_FIELD: &str = "ClientIP_IP";
/// 활동 ID 필드
pub const ACTIVITY_ID_FIELD: &str = "ActivityID";
/// 종료 사유 필드
pub const REASON_CODE_FIELD: &str = "ReasonCode";

/// 주소별 상관관계 상태
#[derive(Debug)]
struct CorrelationState<'a> {
    address: &'a str,
    pending: HashSet<&'a str>,
    confirmed: u64,
}

/// RDP 무차별 대입 탐지기
#[derive(Debug, Clone, Copy, Default)]
pub struct BruteForceDetector {
    policy: CorrelationPolicy,
}

impl BruteForceDetector {
    /// 주어진 상관관계 정책으로 탐지기를 생성합니다.
    pub fn new(policy: CorrelationPolicy) -> Self {
        Self { policy }
    }

    /// 상관관계 정책
    pub fn policy(&self) -> CorrelationPolicy {
        self.policy
    }
}

impl WindowDetector for BruteForceDetector {
    fn name(&self) -> &str {
        "rdp_brute_force"
    }

    fn evaluate(&self, entries: &[ParsedLogEntry]) -> Detection {
        // 처음 관측된 순서로 유지
        let mut states: Vec<CorrelationState<'_>> = Vec::new();
        let mut index: HashMap<&str, usize> = HashMap::new();
        let mut leader = Leader::default();

        for entry in entries {
            match entry.event_id {
                CONNECT_EVENT_ID => {
                    let (Some(activity), Some(address)) =
                        (entry.field(ACTIVITY_ID_FIELD), entry.field(CLIENT_IP_FIELD))
                    else {
                        continue;
                    };

                    let slot = *index.entry(address).or_insert_with(|| {
                        states.push(CorrelationState {
                            address,
                            pending: HashSet::new(),
                            confirmed: 0,
                        });
                        states.len() - 1
                    });
                    states[slot].pending.insert(activity);
                }
                DISCONNECT_EVENT_ID => {
                    let (Some(reason), Some(activity)) =
                        (entry.field(REASON_CODE_FIELD), entry.field(ACTIVITY_ID_FIELD))
                    else {
                        continue;
                    };
                    if reason != FAILED_ATTEMPT_REASON {
                        continue;
                    }

                    for state in states.iter_mut() {
                        if !state.pending.contains(activity) {
                            continue;
                        }
                        state.confirmed += 1;
                        leader.offer(state.address, state.confirmed);
                        if self.policy == CorrelationPolicy::FirstMatch {
                            break;
                        }
                    }
                }
                _ => {}
            }
        }

        leader.into_detection()
    }
}
