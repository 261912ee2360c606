//! 주소 필드 분리
//!
//! `host:port` 형태의 문자열 필드를 `<name>_IP` / `<name>_PORT` 두 필드로 나눕니다.

use std::collections::BTreeMap;
use std::net::IpAddr;

use netwarden_core::types::FieldValue;

/// 분리된 호스트 필드 접미어
pub const IP_SUFFIX: &str = "_IP";
/// 분리된 포트 필드 접미어
pub const PORT_SUFFIX: &str = "_PORT";

/// 문자열을 `(host, port)`로 나눕니다.
///
/// `host:port`와 `[host]:port` 형식을 지원합니다. host는 IP 주소여야 하고
/// port는 10진수 u16이어야 합니다. 조건을 만족하지 않으면 `None`을 반환합니다.
pub fn split_host_port(value: &str) -> Option<(&str, &str)> {
    let (host, port) = if let Some(rest) = value.strip_prefix('[') {
        let (host, tail) = rest.split_once(']')?;
        (host, tail.strip_prefix(':')?)
    } else {
        let (host, port) = value.rsplit_once(':')?;
        // 괄호 없는 IPv6는 포트와 구분할 수 없음
        if host.contains(':') {
            return None;
        }
        (host, port)
    };

    host.parse::<IpAddr>().ok()?;
    if port.is_empty() || !port.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    port.parse::<u16>().ok()?;

    Some((host, port))
}

/// 주소 형태의 문자열 필드를 분리합니다.
///
/// 최상위 필드만 검사합니다. 분리된 필드는 원래 필드를 대체하고,
/// 주소로 해석되지 않는 값은 그대로 둡니다.
pub fn split_address_fields(fields: &mut BTreeMap<String, FieldValue>) {
    let splits: Vec<(String, String, String)> = fields
        .iter()
        .filter_map(|(name, value)| {
            let (host, port) = split_host_port(value.as_str()?)?;
            Some((name.clone(), host.to_owned(), port.to_owned()))
        })
        .collect();

    for (name, host, port) in splits {
        fields.remove(&name);
        fields.insert(format!("{name}{IP_SUFFIX}"), FieldValue::Str(host));
        fields.insert(format!("{name}{PORT_SUFFIX}"), FieldValue::Str(port));
    }
}
