//! 탐지기 벤치마크
//!
//! 윈도우 크기에 따른 스캔/무차별 대입 탐지 비용을 측정합니다.

use std::collections::BTreeMap;

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use netwarden_core::types::ParsedLogEntry;
use netwarden_detection::rule::brute_force::{
    ACTIVITY_ID_FIELD, CLIENT_IP_FIELD, CONNECT_EVENT_ID, DISCONNECT_EVENT_ID, REASON_CODE_FIELD,
};
use netwarden_detection::rule::scan::{LOCAL_PORT_FIELD, REMOTE_IP_FIELD};
use netwarden_detection::rule::{BruteForceDetector, CorrelationPolicy, ScanDetector};
use netwarden_detection::rule::WindowDetector;

fn entry(event_id: u32, fields: &[(&str, String)]) -> ParsedLogEntry {
    ParsedLogEntry {
        timestamp: None,
        event_id,
        fields: fields
            .iter()
            .map(|(k, v)| ((*k).to_owned(), v.clone()))
            .collect::<BTreeMap<_, _>>(),
    }
}

fn scan_entries(count: usize) -> Vec<ParsedLogEntry> {
    (0..count)
        .map(|i| {
            entry(
                1033,
                &[
                    (LOCAL_PORT_FIELD, (i % 1024).to_string()),
                    (REMOTE_IP_FIELD, format!("10.0.{}.{}", i % 16, i % 251)),
                ],
            )
        })
        .collect()
}

fn rdp_entries(count: usize) -> Vec<ParsedLogEntry> {
    (0..count)
        .flat_map(|i| {
            let activity = format!("{{{i:08X}}}");
            [
                entry(
                    CONNECT_EVENT_ID,
                    &[
                        (CLIENT_IP_FIELD, format!("192.168.1.{}", i % 32)),
                        (ACTIVITY_ID_FIELD, activity.clone()),
                    ],
                ),
                entry(
                    DISCONNECT_EVENT_ID,
                    &[
                        (REASON_CODE_FIELD, "14".to_owned()),
                        (ACTIVITY_ID_FIELD, activity),
                    ],
                ),
            ]
        })
        .collect()
}

fn bench_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("scan_detection");
    for size in [100usize, 1_000, 10_000] {
        let entries = scan_entries(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &entries, |b, e| {
            b.iter(|| ScanDetector.evaluate(black_box(e)))
        });
    }
    group.finish();
}

fn bench_brute_force(c: &mut Criterion) {
    let mut group = c.benchmark_group("rdp_brute_force");
    for size in [100usize, 1_000, 5_000] {
        let entries = rdp_entries(size);
        group.throughput(Throughput::Elements(entries.len() as u64));
        for policy in [CorrelationPolicy::AllMatches, CorrelationPolicy::FirstMatch] {
            let detector = BruteForceDetector::new(policy);
            group.bench_with_input(
                BenchmarkId::new(policy.to_string(), size),
                &entries,
                |b, e| b.iter(|| detector.evaluate(black_box(e))),
            );
        }
    }
    group.finish();
}

criterion_group!(benches, bench_scan, bench_brute_force);
criterion_main!(benches);
