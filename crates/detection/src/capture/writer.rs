//! 프로바이더별 로그 파일 기록기
//!
//! 프로바이더마다 `<log_dir>/<logFile>`을 하나씩 열고(생성 + 비우기),
//! 레코드 한 줄을 쓸 때마다 즉시 flush 합니다. 파일을 열 수 없는
//! 프로바이더는 표준 출력으로 기록합니다.

use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use netwarden_core::types::NormalizedRecord;

use crate::codec::encode;
use crate::error::DetectionError;

use super::provider::ProviderSet;

/// 기록 대상
enum Destination {
    File { path: PathBuf, file: std::fs::File },
    Stdout,
}

impl Destination {
    fn write_line(&mut self, line: &str) -> io::Result<()> {
        match self {
            Self::File { file, .. } => {
                file.write_all(line.as_bytes())?;
                file.flush()
            }
            Self::Stdout => {
                let mut out = io::stdout().lock();
                out.write_all(line.as_bytes())?;
                out.flush()
            }
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::File { path, .. } => path.display().to_string(),
            Self::Stdout => "<stdout>".to_owned(),
        }
    }
}

/// 프로바이더별 로그 기록기
///
/// 파일은 기록기가 drop 될 때 닫힙니다.
pub struct ProviderLogWriter {
    destinations: HashMap<String, Destination>,
}

impl ProviderLogWriter {
    /// 로그 디렉토리를 만들고 프로바이더마다 로그 파일을 엽니다.
    pub fn open(log_dir: impl AsRef<Path>, providers: &ProviderSet) -> Result<Self, DetectionError> {
        let log_dir = log_dir.as_ref();
        std::fs::create_dir_all(log_dir).map_err(|e| DetectionError::LogFile {
            path: log_dir.display().to_string(),
            reason: format!("failed to create log directory: {e}"),
        })?;

        let mut destinations = HashMap::with_capacity(providers.len());
        for provider in providers.iter() {
            let path = log_dir.join(&provider.log_file);
            let destination = match OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&path)
            {
                Ok(file) => Destination::File { path, file },
                Err(e) => {
                    warn!(
                        provider = %provider.key,
                        file = %path.display(),
                        error = %e,
                        "could not open log file, writing to stdout"
                    );
                    Destination::Stdout
                }
            };

            info!(
                provider = %provider.key,
                destination = %destination.describe(),
                "provider log opened"
            );
            destinations.insert(provider.key.clone(), destination);
        }

        Ok(Self { destinations })
    }

    /// 레코드를 인코딩하여 프로바이더의 로그에 한 줄로 기록합니다.
    pub fn write_record(
        &mut self,
        provider_key: &str,
        record: &NormalizedRecord,
    ) -> Result<(), DetectionError> {
        let Some(destination) = self.destinations.get_mut(provider_key) else {
            return Err(DetectionError::LogFile {
                path: provider_key.to_owned(),
                reason: "no log file opened for provider".to_owned(),
            });
        };

        let mut line = encode(record);
        line.push('\n');

        destination
            .write_line(&line)
            .map_err(|e| DetectionError::LogFile {
                path: destination.describe(),
                reason: format!("failed to write record: {e}"),
            })
    }

    /// 프로바이더가 파일 대신 표준 출력으로 기록하는지 확인합니다.
    pub fn is_stdout(&self, provider_key: &str) -> bool {
        matches!(self.destinations.get(provider_key), Some(Destination::Stdout))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    use crate::capture::provider::ProviderLoader;
    use crate::codec::LogLineDecoder;

    const PROVIDERS: &str = "providers:\n  tcpip:\n    name: Microsoft-Windows-TCPIP\n    events: [1033]\n    fields: ['*']\n    logFile: tcpip.log\n";

    fn record() -> NormalizedRecord {
        let ts = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();
        NormalizedRecord::new("Microsoft-Windows-TCPIP", 1033, ts)
            .with_field("RemoteSockAddr_IP", "10.0.0.5")
    }

    #[test]
    fn writes_decodable_lines() {
        let dir = tempfile::tempdir().unwrap();
        let providers = ProviderLoader::parse_yaml(PROVIDERS, "providers.yml").unwrap();
        let mut writer = ProviderLogWriter::open(dir.path(), &providers).unwrap();

        writer.write_record("tcpip", &record()).unwrap();
        writer.write_record("tcpip", &record()).unwrap();

        let content = std::fs::read_to_string(dir.path().join("tcpip.log")).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 2);

        let entry = LogLineDecoder::new().unwrap().decode(lines[0]).unwrap();
        assert_eq!(entry.event_id, 1033);
        assert_eq!(entry.field("RemoteSockAddr_IP"), Some("10.0.0.5"));
    }

    #[test]
    fn open_truncates_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("tcpip.log"), "stale\n").unwrap();
        let providers = ProviderLoader::parse_yaml(PROVIDERS, "providers.yml").unwrap();

        let writer = ProviderLogWriter::open(dir.path(), &providers).unwrap();
        assert!(!writer.is_stdout("tcpip"));
        drop(writer);

        let content = std::fs::read_to_string(dir.path().join("tcpip.log")).unwrap();
        assert!(content.is_empty());
    }

    #[test]
    fn creates_missing_log_dir() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let providers = ProviderLoader::parse_yaml(PROVIDERS, "providers.yml").unwrap();
        ProviderLogWriter::open(&nested, &providers).unwrap();
        assert!(nested.join("tcpip.log").exists());
    }

    #[test]
    fn unknown_provider_key_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let providers = ProviderLoader::parse_yaml(PROVIDERS, "providers.yml").unwrap();
        let mut writer = ProviderLogWriter::open(dir.path(), &providers).unwrap();
        assert!(writer.write_record("rdp", &record()).is_err());
    }
}
