//! 프로바이더 정의 -- `providers.yml`에서 캡처 대상 프로바이더를 로드합니다.
//!
//! ```yaml
//! providers:
//!   tcpip:
//!     name: Microsoft-Windows-TCPIP
//!     events: [1033, 1037]
//!     fields: [LocalSockAddr, RemoteSockAddr]
//!     logFile: tcpip.log
//! ```

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;
use tracing::info;

use netwarden_core::event::RawEvent;

use crate::config::check_log_file_name;
use crate::error::DetectionError;
use crate::extractor::{FieldExtractor, FieldSelection};

/// 프로바이더 파일 최대 크기
const MAX_PROVIDER_FILE_SIZE: u64 = 1024 * 1024; // 1MB

/// `providers.yml`의 프로바이더 하나에 대한 설정
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    /// 프로바이더 이름 또는 GUID
    pub name: String,
    /// 기록할 이벤트 ID
    pub events: Vec<u16>,
    /// 기록할 필드 (`"*"`는 전체)
    pub fields: Vec<String>,
    /// 로그 파일 이름 (로그 디렉토리 기준)
    #[serde(rename = "logFile")]
    pub log_file: String,
}

#[derive(Debug, Deserialize)]
struct ProvidersDocument {
    #[serde(default)]
    providers: serde_yaml::Mapping,
}

/// 캡처 대상 프로바이더
#[derive(Debug, Clone)]
pub struct Provider {
    /// 설정 파일의 키
    pub key: String,
    /// 이벤트 매칭과 레코드에 쓰이는 식별자 (이름 또는 GUID)
    pub id: String,
    /// 기록할 이벤트 ID
    pub events: HashSet<u16>,
    /// 필드 추출기
    pub extractor: FieldExtractor,
    /// 로그 파일 이름
    pub log_file: String,
}

impl Provider {
    /// 키와 설정으로 프로바이더를 생성합니다.
    pub fn new(key: impl Into<String>, settings: ProviderSettings) -> Self {
        Self {
            key: key.into(),
            id: settings.name,
            events: settings.events.into_iter().collect(),
            extractor: FieldExtractor::new(FieldSelection::from_fields(settings.fields.as_slice())),
            log_file: settings.log_file,
        }
    }

    /// 이벤트 ID를 기록 대상으로 추적하는지 확인합니다.
    pub fn tracks(&self, event_id: u16) -> bool {
        self.events.contains(&event_id)
    }

    fn validate(&self) -> Result<(), DetectionError> {
        let invalid = |reason: String| DetectionError::ProviderValidation {
            provider: self.key.clone(),
            reason,
        };

        if self.id.trim().is_empty() {
            return Err(invalid("name must not be empty".to_owned()));
        }
        if self.events.is_empty() {
            return Err(invalid("at least one event id is required".to_owned()));
        }
        check_log_file_name(&self.log_file).map_err(invalid)?;
        Ok(())
    }
}

/// 프로바이더 집합 (파일에 정의된 순서 유지)
#[derive(Debug, Clone, Default)]
pub struct ProviderSet {
    providers: Vec<Provider>,
}

impl ProviderSet {
    /// 프로바이더 목록으로 집합을 생성하고 검증합니다.
    pub fn new(providers: Vec<Provider>) -> Result<Self, DetectionError> {
        if providers.is_empty() {
            return Err(DetectionError::ProviderValidation {
                provider: "(none)".to_owned(),
                reason: "at least one provider is required".to_owned(),
            });
        }

        let mut log_files = HashSet::new();
        for provider in &providers {
            provider.validate()?;
            if !log_files.insert(provider.log_file.as_str()) {
                return Err(DetectionError::ProviderValidation {
                    provider: provider.key.clone(),
                    reason: format!("log file '{}' is shared with another provider", provider.log_file),
                });
            }
        }

        Ok(Self { providers })
    }

    /// 이벤트를 생성한 프로바이더를 찾습니다. 이름 또는 GUID로 매칭합니다.
    pub fn resolve(&self, event: &RawEvent) -> Option<&Provider> {
        self.providers.iter().find(|p| event.is_from(&p.id))
    }

    /// 모든 프로바이더를 정의 순서대로 순회합니다.
    pub fn iter(&self) -> impl Iterator<Item = &Provider> {
        self.providers.iter()
    }

    /// 프로바이더 수
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// 프로바이더가 없는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

/// 프로바이더 파일 로더
pub struct ProviderLoader;

impl ProviderLoader {
    /// YAML 파일에서 프로바이더 집합을 로드합니다.
    pub async fn load_file(path: impl AsRef<Path>) -> Result<ProviderSet, DetectionError> {
        let path = path.as_ref();
        let load_error = |reason: String| DetectionError::ProviderLoad {
            path: path.display().to_string(),
            reason,
        };

        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| load_error(format!("failed to read file metadata: {e}")))?;
        if metadata.len() > MAX_PROVIDER_FILE_SIZE {
            return Err(load_error(format!(
                "file too large: {} bytes (max: {MAX_PROVIDER_FILE_SIZE})",
                metadata.len()
            )));
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| load_error(format!("failed to read file: {e}")))?;

        let providers = Self::parse_yaml(&content, &path.display().to_string())?;

        info!(
            path = %path.display(),
            count = providers.len(),
            "loaded capture providers"
        );

        Ok(providers)
    }

    /// YAML 문자열을 파싱하여 프로바이더 집합을 생성합니다.
    pub fn parse_yaml(yaml_str: &str, source: &str) -> Result<ProviderSet, DetectionError> {
        let load_error = |reason: String| DetectionError::ProviderLoad {
            path: source.to_owned(),
            reason,
        };

        let document: ProvidersDocument = serde_yaml::from_str(yaml_str)
            .map_err(|e| load_error(format!("YAML parse error: {e}")))?;

        let mut providers = Vec::with_capacity(document.providers.len());
        for (key, value) in document.providers {
            let Some(key) = key.as_str().map(str::to_owned) else {
                return Err(load_error(format!("provider key must be a string, got {key:?}")));
            };
            let settings: ProviderSettings = serde_yaml::from_value(value)
                .map_err(|e| load_error(format!("provider '{key}': {e}")))?;
            providers.push(Provider::new(key, settings));
        }

        ProviderSet::new(providers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROVIDERS: &str = r#"
providers:
  tcpip:
    name: Microsoft-Windows-TCPIP
    events: [1033, 1037]
    fields: [LocalSockAddr, RemoteSockAddr]
    logFile: tcpip.log
  rdp:
    name: "{1139C61B-B549-4251-8ED3-27250A1EDEC8}"
    events: [131, 103]
    fields: ["*"]
    logFile: rdp.log
"#;

    fn event(name: &str, guid: &str) -> RawEvent {
        let mut event = RawEvent::default();
        event.system.provider.name = name.to_owned();
        event.system.provider.guid = guid.to_owned();
        event
    }

    #[test]
    fn parse_keeps_order_and_settings() {
        let set = ProviderLoader::parse_yaml(PROVIDERS, "providers.yml").unwrap();
        let keys: Vec<_> = set.iter().map(|p| p.key.as_str()).collect();
        assert_eq!(keys, vec!["tcpip", "rdp"]);

        let tcpip = set.iter().next().unwrap();
        assert!(tcpip.tracks(1033));
        assert!(!tcpip.tracks(1034));
        assert_eq!(tcpip.log_file, "tcpip.log");
        assert!(tcpip.extractor.selection().wants("RemoteSockAddr"));
        assert!(!tcpip.extractor.selection().wants("Computer"));
    }

    #[test]
    fn wildcard_selects_all_fields() {
        let set = ProviderLoader::parse_yaml(PROVIDERS, "providers.yml").unwrap();
        let rdp = set.iter().nth(1).unwrap();
        assert_eq!(*rdp.extractor.selection(), FieldSelection::All);
    }

    #[test]
    fn resolve_by_name_or_guid() {
        let set = ProviderLoader::parse_yaml(PROVIDERS, "providers.yml").unwrap();

        let by_name = set.resolve(&event("Microsoft-Windows-TCPIP", "")).unwrap();
        assert_eq!(by_name.key, "tcpip");

        let by_guid = set
            .resolve(&event(
                "Microsoft-Windows-RemoteDesktopServices-RdpCoreTS",
                "{1139c61b-b549-4251-8ed3-27250a1edec8}",
            ))
            .unwrap();
        assert_eq!(by_guid.key, "rdp");

        assert!(set.resolve(&event("Microsoft-Windows-DNS-Client", "")).is_none());
    }

    #[test]
    fn empty_document_is_rejected() {
        assert!(matches!(
            ProviderLoader::parse_yaml("providers: {}\n", "providers.yml"),
            Err(DetectionError::ProviderValidation { .. })
        ));
    }

    #[test]
    fn missing_events_are_rejected() {
        let yaml = "providers:\n  tcpip:\n    name: TCPIP\n    logFile: tcpip.log\n";
        let err = ProviderLoader::parse_yaml(yaml, "providers.yml").unwrap_err();
        assert!(err.to_string().contains("event id"));
    }

    #[test]
    fn shared_log_file_is_rejected() {
        let yaml = "providers:\n  a:\n    name: A\n    events: [1]\n    logFile: x.log\n  b:\n    name: B\n    events: [2]\n    logFile: x.log\n";
        let err = ProviderLoader::parse_yaml(yaml, "providers.yml").unwrap_err();
        assert!(err.to_string().contains("x.log"));
    }

    #[test]
    fn absolute_log_file_is_rejected() {
        let yaml = "providers:\n  a:\n    name: A\n    events: [1]\n    logFile: /tmp/a.log\n";
        assert!(ProviderLoader::parse_yaml(yaml, "providers.yml").is_err());
    }

    #[tokio::test]
    async fn load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("providers.yml");
        tokio::fs::write(&path, PROVIDERS).await.unwrap();
        let set = ProviderLoader::load_file(&path).await.unwrap();
        assert_eq!(set.len(), 2);
    }

    #[tokio::test]
    async fn load_nonexistent_file_returns_error() {
        let result = ProviderLoader::load_file("/nonexistent/providers.yml").await;
        assert!(matches!(result, Err(DetectionError::ProviderLoad { .. })));
    }
}
