//! 로그 코덱 벤치마크
//!
//! 라인 디코딩과 레코드 인코딩 처리량을 측정합니다.

use chrono::{TimeZone, Utc};
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use netwarden_core::types::NormalizedRecord;
use netwarden_detection::codec::{LogLineDecoder, encode};

/// TCPIP 연결 이벤트 라인
const TCPIP_LINE: &str = r#"time="2024-01-15T12:00:00.123456789Z" level=info msg="Event ID: 1033" provider=Microsoft-Windows-TCPIP LocalSockAddr_IP=10.0.0.2 LocalSockAddr_PORT=445 RemoteSockAddr_IP=10.0.0.5 RemoteSockAddr_PORT=4444"#;

/// 따옴표와 이스케이프가 많은 라인
const QUOTED_LINE: &str = r#"time="2024-01-15T12:00:00Z" level=info msg="Event ID: 131" provider=Microsoft-Windows-RemoteDesktopServices-RdpCoreTS ActivityID="{7C1D3E55-0000-0000-0000-000000000000}" ClientIP_IP=192.168.1.50 Message="The server accepted a new \"TCP\" connection from client 192.168.1.50" Path="C:\\Windows\\System32\\svchost.exe""#;

fn bench_decode(c: &mut Criterion) {
    let decoder = LogLineDecoder::new().unwrap();

    let mut group = c.benchmark_group("decode");
    group.throughput(Throughput::Elements(1));
    group.bench_function("tcpip", |b| {
        b.iter(|| decoder.decode(black_box(TCPIP_LINE)).unwrap())
    });
    group.bench_function("quoted", |b| {
        b.iter(|| decoder.decode(black_box(QUOTED_LINE)).unwrap())
    });

    // 잘못된 라인은 빠르게 거부되어야 함
    group.bench_function("malformed", |b| {
        b.iter(|| decoder.decode(black_box(r#"time="yesterday" msg="Event ID: 1""#)).is_err())
    });
    group.finish();
}

fn bench_encode(c: &mut Criterion) {
    let ts = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();

    let mut group = c.benchmark_group("encode");
    for field_count in [4usize, 16, 64] {
        let record = (0..field_count).fold(
            NormalizedRecord::new("Microsoft-Windows-TCPIP", 1033, ts),
            |r, i| r.with_field(format!("Field{i}"), format!("value {i}")),
        );
        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::from_parameter(field_count), &record, |b, r| {
            b.iter(|| encode(black_box(r)))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_decode, bench_encode);
criterion_main!(benches);
