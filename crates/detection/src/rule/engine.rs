//! 규칙 엔진 -- 주기적으로 규칙을 평가하고 임계값을 넘으면 알림을 보냅니다.
//!
//! # 스케줄링
//! 첫 평가는 시작 직후가 아니라 한 주기가 지난 뒤에 실행됩니다.
//! 한 번의 틱에서 활성화된 규칙을 정의 순서대로 하나씩 평가하며,
//! 규칙 평가끼리 또는 다음 틱과 겹치지 않습니다.
//!
//! # 에러 격리
//! 한 규칙의 파일/라인/알림 오류는 같은 틱의 다른 규칙에 영향을 주지 않습니다.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use netwarden_core::metrics as m;
use netwarden_core::pipeline::AlertSink;
use netwarden_core::types::{Alert, TimeWindow};

use crate::error::DetectionError;
use crate::loader::WindowedLogLoader;

use super::brute_force::BruteForceDetector;
use super::hijack::SessionHijackDetector;
use super::scan::ScanDetector;
use super::types::{CorrelationPolicy, Rule, RuleKind, RuleSet};
use super::{Detection, WindowDetector};

/// 기본 평가 주기
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(30);

/// 규칙 하나의 평가 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleOutcome {
    /// 규칙 이름
    pub rule: String,
    /// 히트 수
    pub hits: u64,
    /// 지목된 주소
    pub culprit: Option<String>,
    /// 알림 임계값
    pub threshold: u64,
    /// 평가에 사용된 엔트리 수
    pub entries: usize,
    /// 알림 싱크 호출 여부
    pub alerted: bool,
    /// 알림 전달 성공 여부 (호출하지 않았으면 `false`)
    pub delivered: bool,
}

/// 한 번의 틱 결과
#[derive(Debug, Clone, Default)]
pub struct TickReport {
    /// 평가 순서대로의 규칙별 결과
    pub outcomes: Vec<RuleOutcome>,
    /// 틱 도중 취소되었는지 여부
    pub cancelled: bool,
}

impl TickReport {
    /// 규칙 이름으로 결과를 찾습니다.
    pub fn outcome(&self, rule: &str) -> Option<&RuleOutcome> {
        self.outcomes.iter().find(|o| o.rule == rule)
    }

    /// 알림 싱크를 호출한 횟수
    pub fn alerts(&self) -> usize {
        self.outcomes.iter().filter(|o| o.alerted).count()
    }
}

/// 규칙 엔진
pub struct RuleEngine {
    rules: RuleSet,
    loader: WindowedLogLoader,
    sink: Arc<dyn AlertSink>,
    interval: Duration,
    scan: ScanDetector,
    brute_force: BruteForceDetector,
    hijack: SessionHijackDetector,
}

impl RuleEngine {
    /// 새 규칙 엔진을 생성합니다.
    pub fn new(
        rules: RuleSet,
        loader: WindowedLogLoader,
        sink: Arc<dyn AlertSink>,
        policy: CorrelationPolicy,
    ) -> Self {
        Self {
            rules,
            loader,
            sink,
            interval: DEFAULT_INTERVAL,
            scan: ScanDetector,
            brute_force: BruteForceDetector::new(policy),
            hijack: SessionHijackDetector,
        }
    }

    /// 평가 주기를 설정합니다.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// 평가 주기
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// 규칙 집합
    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    fn detector(&self, kind: RuleKind) -> Option<&dyn WindowDetector> {
        match kind {
            RuleKind::ScanDetection => Some(&self.scan),
            RuleKind::RdpBruteForce => Some(&self.brute_force),
            RuleKind::RdpSessionHijack => Some(&self.hijack),
            RuleKind::Unknown => None,
        }
    }

    /// 취소되거나 주기가 0이 아닌 한 계속 틱을 실행합니다.
    ///
    /// 첫 틱은 한 주기가 지난 뒤 발생합니다. 취소 토큰은 대기 중과
    /// 규칙마다 윈도우를 읽기 전에 확인합니다.
    pub async fn run(self, cancel: CancellationToken) -> Result<(), DetectionError> {
        if self.interval.is_zero() {
            return Err(DetectionError::Config {
                field: "engine.interval_secs".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }

        let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            interval_secs = self.interval.as_secs(),
            rules = self.rules.len(),
            enabled = self.rules.enabled().count(),
            "rule engine started"
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("rule engine received shutdown signal");
                    break;
                }
                _ = ticker.tick() => {
                    let report = self.tick(Utc::now(), &cancel).await;
                    debug!(
                        evaluated = report.outcomes.len(),
                        alerts = report.alerts(),
                        "rule tick completed"
                    );
                    if report.cancelled {
                        break;
                    }
                }
            }
        }

        Ok(())
    }

    /// 활성화된 모든 규칙을 `now` 기준으로 한 번씩 평가합니다.
    pub async fn tick(&self, now: DateTime<Utc>, cancel: &CancellationToken) -> TickReport {
        let mut report = TickReport::default();

        for rule in self.rules.enabled() {
            if cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }
            report.outcomes.push(self.evaluate_rule(rule, now).await);
        }

        report
    }

    /// 규칙 하나를 평가하고 필요하면 알림을 보냅니다.
    pub async fn evaluate_rule(&self, rule: &Rule, now: DateTime<Utc>) -> RuleOutcome {
        let mut outcome = RuleOutcome {
            rule: rule.name.clone(),
            hits: 0,
            culprit: None,
            threshold: rule.alert_threshold,
            entries: 0,
            alerted: false,
            delivered: false,
        };

        let (Some(detector), Some(lookback)) = (self.detector(rule.kind), rule.kind.lookback())
        else {
            warn!(
                rule = %rule.name,
                "rule does not have a matching detection algorithm, skipping"
            );
            return outcome;
        };

        let window = TimeWindow::last(lookback, now);
        let loaded = self.loader.load(&rule.files, window).await;
        let Detection { hits, culprit } = detector.evaluate(&loaded.entries);

        metrics::counter!(m::ENGINE_RULE_EVALUATIONS_TOTAL, m::LABEL_RULE => rule.name.clone())
            .increment(1);
        metrics::gauge!(m::ENGINE_RULE_HITS, m::LABEL_RULE => rule.name.clone()).set(hits as f64);

        debug!(
            rule = %rule.name,
            detector = detector.name(),
            %window,
            entries = loaded.entries.len(),
            discarded_lines = loaded.discarded_lines,
            skipped_files = loaded.skipped_files,
            hits,
            "rule evaluated"
        );

        outcome.entries = loaded.entries.len();
        outcome.hits = hits;
        outcome.culprit = culprit;

        // 지목된 주소가 없으면 임계값과 관계없이 알림하지 않음
        let Some(culprit) = outcome.culprit.as_deref() else {
            return outcome;
        };
        if hits < rule.alert_threshold {
            return outcome;
        }

        let alert = Alert::new(
            rule.name.clone(),
            rule.kind.alert_message(culprit),
            hits,
            culprit,
        );
        outcome.alerted = true;

        match self.sink.deliver(&alert).await {
            Ok(()) => {
                outcome.delivered = true;
                metrics::counter!(m::ENGINE_ALERTS_SENT_TOTAL, m::LABEL_RULE => rule.name.clone())
                    .increment(1);
            }
            Err(e) => {
                metrics::counter!(m::ENGINE_ALERT_FAILURES_TOTAL, m::LABEL_RULE => rule.name.clone())
                    .increment(1);
                warn!(
                    rule = %rule.name,
                    sink = self.sink.name(),
                    error = %e,
                    "unable to alert"
                );
            }
        }

        outcome
    }
}
