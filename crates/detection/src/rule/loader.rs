//! 규칙 파일 로더 -- `rules.yml`을 디스크에서 로드합니다.
//!
//! 규칙은 파일에 정의된 순서를 유지하며, 이 순서가 평가 순서가 됩니다.
//! 로딩/검증 실패는 시작 시점에 치명적입니다.

use std::path::Path;

use serde::Deserialize;
use tracing::{info, warn};

use crate::error::DetectionError;

use super::types::{Rule, RuleKind, RuleSet, RuleSettings};

/// 규칙 파일 최대 크기
const MAX_RULE_FILE_SIZE: u64 = 1024 * 1024; // 1MB

/// `rules.yml` 최상위 구조
#[derive(Debug, Deserialize)]
struct RulesDocument {
    #[serde(default)]
    rules: serde_yaml::Mapping,
}

/// 규칙 파일 로더
pub struct RuleLoader;

impl RuleLoader {
    /// YAML 파일에서 규칙 집합을 로드합니다.
    pub async fn load_file(path: impl AsRef<Path>) -> Result<RuleSet, DetectionError> {
        let path = path.as_ref();

        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| DetectionError::RuleLoad {
                path: path.display().to_string(),
                reason: format!("failed to read file metadata: {e}"),
            })?;

        if metadata.len() > MAX_RULE_FILE_SIZE {
            return Err(DetectionError::RuleLoad {
                path: path.display().to_string(),
                reason: format!(
                    "file too large: {} bytes (max: {MAX_RULE_FILE_SIZE})",
                    metadata.len()
                ),
            });
        }

        let content =
            tokio::fs::read_to_string(path)
                .await
                .map_err(|e| DetectionError::RuleLoad {
                    path: path.display().to_string(),
                    reason: format!("failed to read file: {e}"),
                })?;

        let rules = Self::parse_yaml(&content, &path.display().to_string())?;

        info!(
            path = %path.display(),
            count = rules.len(),
            enabled = rules.enabled().count(),
            "loaded detection rules"
        );

        Ok(rules)
    }

    /// YAML 문자열을 파싱하여 규칙 집합을 생성합니다.
    pub fn parse_yaml(yaml_str: &str, source: &str) -> Result<RuleSet, DetectionError> {
        let document: RulesDocument =
            serde_yaml::from_str(yaml_str).map_err(|e| DetectionError::RuleLoad {
                path: source.to_owned(),
                reason: format!("YAML parse error: {e}"),
            })?;

        let mut rules = Vec::with_capacity(document.rules.len());

        for (key, value) in document.rules {
            let Some(name) = key.as_str().map(str::to_owned) else {
                return Err(DetectionError::RuleLoad {
                    path: source.to_owned(),
                    reason: format!("rule name must be a string, got {key:?}"),
                });
            };

            let settings: RuleSettings =
                serde_yaml::from_value(value).map_err(|e| DetectionError::RuleLoad {
                    path: source.to_owned(),
                    reason: format!("rule '{name}': {e}"),
                })?;

            let rule = Rule::new(name, settings);
            rule.validate()?;

            if rule.kind == RuleKind::Unknown {
                warn!(
                    rule = %rule.name,
                    "rule does not have a matching detection algorithm and will never alert"
                );
            }

            rules.push(rule);
        }

        Ok(RuleSet::new(rules))
    }
}
