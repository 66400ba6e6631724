//! 디렉티브 파일 로더 -- YAML 디렉티브 파일을 디스크에서 로드합니다.

use std::path::Path;

use crate::error::IngestError;

use super::types::DirectiveDefinition;

/// 디렉티브 파일 최대 크기
const MAX_DIRECTIVE_FILE_SIZE: u64 = 1024 * 1024; // 1MB

/// 디렉티브 파일 로더
pub struct DirectiveLoader;

impl DirectiveLoader {
    /// 단일 YAML 파일에서 디렉티브를 로드하고 검증합니다.
    pub async fn load_file(path: impl AsRef<Path>) -> Result<DirectiveDefinition, IngestError> {
        let path = path.as_ref();

        // 파일 크기 검증
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| IngestError::DirectiveLoad {
                path: path.display().to_string(),
                reason: format!("failed to read file metadata: {e}"),
            })?;

        if metadata.len() > MAX_DIRECTIVE_FILE_SIZE {
            return Err(IngestError::DirectiveLoad {
                path: path.display().to_string(),
                reason: format!(
                    "file too large: {} bytes (max: {MAX_DIRECTIVE_FILE_SIZE})",
                    metadata.len()
                ),
            });
        }

        let content =
            tokio::fs::read_to_string(path)
                .await
                .map_err(|e| IngestError::DirectiveLoad {
                    path: path.display().to_string(),
                    reason: format!("failed to read file: {e}"),
                })?;

        Self::parse_yaml(&content, &path.display().to_string())
    }

    /// YAML 문자열을 파싱하여 디렉티브를 생성합니다.
    pub fn parse_yaml(yaml_str: &str, source: &str) -> Result<DirectiveDefinition, IngestError> {
        let definition: DirectiveDefinition =
            serde_yaml::from_str(yaml_str).map_err(|e| IngestError::DirectiveLoad {
                path: source.to_owned(),
                reason: format!("YAML parse error: {e}"),
            })?;

        definition.validate()?;

        Ok(definition)
    }
}
