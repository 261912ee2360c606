//! 로그 레코드 코덱 -- 정규화된 레코드와 텍스트 로그 라인 간 변환
//!
//! # 라인 형식
//! ```text
//! time="2024-01-15T12:00:00.000000000Z" level=info msg="Event ID: 1033" provider=Microsoft-Windows-TCPIP RemoteSockAddr_IP=10.0.0.5
//! ```
//!
//! - 공백으로 구분된 `key=value` / `key="value"` 토큰
//! - `time`: RFC 3339 타임스탬프
//! - `msg`: 세 번째 공백 구분 토큰이 이벤트 ID
//! - 값이 `"NA"`인 필드는 생략된 것으로 취급

use std::collections::BTreeMap;
use std::fmt::Write as _;

use chrono::{DateTime, SecondsFormat, Utc};
use regex::Regex;

use netwarden_core::error::ParseError;
use netwarden_core::types::{NOT_APPLICABLE, NormalizedRecord, ParsedLogEntry};

use crate::error::DetectionError;

/// 타임스탬프 키
pub const TIME_KEY: &str = "time";
/// 메시지 키
pub const MSG_KEY: &str = "msg";
/// 레벨 키
pub const LEVEL_KEY: &str = "level";
/// 프로바이더 키
pub const PROVIDER_KEY: &str = "provider";

/// 토큰 패턴: `key="quoted value"` 또는 `key=unquoted`
const TOKEN_PATTERN: &str = r#"(\w+)="((?:[^"\\]|\\.)*)"|(\w+)=(\S+)"#;

/// 레코드를 로그 라인 하나로 인코딩합니다 (개행 미포함).
pub fn encode(record: &NormalizedRecord) -> String {
    let mut line = String::with_capacity(128 + record.fields.len() * 32);

    let time = record.timestamp.to_rfc3339_opts(SecondsFormat::Nanos, true);
    push_pair(&mut line, TIME_KEY, &time);
    push_pair(&mut line, LEVEL_KEY, "info");
    push_pair(&mut line, MSG_KEY, &format!("Event ID: {}", record.event_id));
    push_pair(&mut line, PROVIDER_KEY, &record.provider);

    for (name, value) in &record.fields {
        push_pair(&mut line, &sanitize_key(name), &value.to_string());
    }

    line
}

fn push_pair(line: &mut String, key: &str, value: &str) {
    if !line.is_empty() {
        line.push(' ');
    }
    line.push_str(key);
    line.push('=');
    if needs_quoting(value) {
        line.push('"');
        for c in value.chars() {
            match c {
                '"' => line.push_str("\\\""),
                '\\' => line.push_str("\\\\"),
                '\n' => line.push_str("\\n"),
                '\r' => line.push_str("\\r"),
                '\t' => line.push_str("\\t"),
                c => line.push(c),
            }
        }
        line.push('"');
    } else {
        line.push_str(value);
    }
}

fn needs_quoting(value: &str) -> bool {
    value.is_empty()
        || !value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_' | '/' | '@' | '^' | '+'))
}

fn sanitize_key(name: &str) -> String {
    if name.is_empty() {
        return "_".to_owned();
    }
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

/// 로그 라인 디코더
///
/// 토큰 정규식을 한 번 컴파일해 재사용합니다.
#[derive(Debug, Clone)]
pub struct LogLineDecoder {
    pattern: Regex,
}

impl LogLineDecoder {
    /// 새 디코더를 생성합니다.
    pub fn new() -> Result<Self, DetectionError> {
        Ok(Self {
            pattern: Regex::new(TOKEN_PATTERN)?,
        })
    }

    /// 로그 라인 하나를 엔트리로 디코딩합니다.
    ///
    /// `time` 또는 `msg`의 이벤트 ID 파싱 실패, 닫히지 않은 따옴표,
    /// 토큰이 없는 라인은 에러이며 부분 결과를 반환하지 않습니다.
    /// `msg`가 세 토큰 미만이면 이벤트 ID는 0으로 남습니다.
    pub fn decode(&self, line: &str) -> Result<ParsedLogEntry, ParseError> {
        let line = line.trim_end_matches(['\r', '\n']);

        let mut timestamp = None;
        let mut event_id = 0;
        let mut fields = BTreeMap::new();
        let mut tokens = 0usize;

        for caps in self.pattern.captures_iter(line) {
            tokens += 1;
            let (key, value) = match (caps.get(1), caps.get(2), caps.get(3), caps.get(4)) {
                (Some(k), Some(v), _, _) => (k.as_str(), unescape(v.as_str())),
                (_, _, Some(k), Some(v)) => {
                    if v.as_str().starts_with('"') {
                        return Err(ParseError::Malformed {
                            reason: format!("unterminated quote in value of '{}'", k.as_str()),
                        });
                    }
                    (k.as_str(), v.as_str().to_owned())
                }
                _ => continue,
            };

            match key {
                TIME_KEY => timestamp = Some(parse_time(&value)?),
                MSG_KEY => {
                    if let Some(id) = parse_event_id(&value)? {
                        event_id = id;
                    }
                }
                _ => {
                    if value != NOT_APPLICABLE {
                        fields.insert(key.to_owned(), value);
                    }
                }
            }
        }

        if tokens == 0 {
            return Err(ParseError::Malformed {
                reason: "no key=value tokens".to_owned(),
            });
        }

        Ok(ParsedLogEntry {
            timestamp,
            event_id,
            fields,
        })
    }
}

fn parse_time(value: &str) -> Result<DateTime<Utc>, ParseError> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| ParseError::Timestamp {
            value: value.to_owned(),
            reason: e.to_string(),
        })
}

/// `"Event ID: <id>"` 형태에서 세 번째 토큰을 이벤트 ID로 해석합니다.
fn parse_event_id(msg: &str) -> Result<Option<u32>, ParseError> {
    let mut parts = msg.splitn(3, ' ');
    let third = match (parts.next(), parts.next(), parts.next()) {
        (Some(_), Some(_), Some(third)) => third,
        _ => return Ok(None),
    };
    third
        .parse::<u32>()
        .map(Some)
        .map_err(|_| ParseError::EventId {
            value: third.to_owned(),
        })
}

fn unescape(raw: &str) -> String {
    if !raw.contains('\\') {
        return raw.to_owned();
    }
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some(other) => {
                // 알 수 없는 이스케이프는 원문 유지
                let _ = write!(out, "\\{other}");
            }
            None => out.push('\\'),
        }
    }
    out
}
