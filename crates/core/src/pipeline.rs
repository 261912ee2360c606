//! 알림 싱크 trait -- 탐지 결과를 외부로 내보내는 확장 지점

use std::future::Future;
use std::pin::Pin;

use crate::error::NetwardenError;
use crate::types::Alert;

/// `dyn` 호환 trait에서 사용하는 boxed future
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// 알림 싱크 trait
///
/// 규칙 엔진은 전역 훅 대신 이 객체를 명시적으로 전달받아 알림을 보냅니다.
/// 전달 실패는 `Err`로 보고되며, 호출자는 이를 기록만 하고 계속 진행합니다.
pub trait AlertSink: Send + Sync {
    /// 싱크 이름
    fn name(&self) -> &str;

    /// 알림 하나를 전달합니다.
    fn deliver<'a>(&'a self, alert: &'a Alert) -> BoxFuture<'a, Result<(), NetwardenError>>;
}
