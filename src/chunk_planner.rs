use crate::config::SplitConfig;
use crate::error::PlanError;
use crate::types::ChunkDescriptor;
use serde::{Deserialize, Serialize};

/// 分割サービスへのリクエスト
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SplitRequest<'a> {
    audio_locator: &'a str,
    chunk_duration_seconds: f64,
    meeting_id: &'a str,
}

/// 分割サービスの応答
///
/// `chunks` の欠落は致命的な契約違反として扱う (楽観的なフィールド参照はしない)。
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SplitResponse {
    chunks: Option<Vec<SplitChunk>>,
    #[serde(default)]
    total_duration: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SplitChunk {
    chunk_index: usize,
    #[serde(default)]
    gcs_uri: Option<String>,
    start_time: f64,
    duration: f64,
}

/// チャンク計画を生成するクライアント
///
/// 実際のメディア分割は外部の分割サービスに委譲し、このクライアントは
/// リクエスト/レスポンスの契約と結果形状の検証のみを所有する。
/// 計画の失敗はジョブ全体を中断させる (チャンクがなければマージ対象が
/// 存在しないため、この層ではリトライしない)。
pub struct ChunkPlanner {
    config: SplitConfig,
    client: reqwest::Client,
}

impl ChunkPlanner {
    pub fn new(config: SplitConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self { config, client })
    }

    /// 音声オブジェクトのチャンク計画を取得
    ///
    /// # Arguments
    ///
    /// * `audio_locator` - 録音全体のストレージロケーター
    /// * `meeting_id` - 対象ミーティングID
    /// * `target_chunk_duration_seconds` - チャンクの目標長 (秒、0 より大)
    ///
    /// # Errors
    ///
    /// 目標チャンク長が正の有限値でない場合は `PlanError::InvalidChunkDuration`、
    /// 分割サービスが非成功ステータスを返した場合は `PlanError::ServiceStatus`、
    /// 応答にチャンクリストがない・インデックスが 0 から連続でない・
    /// ロケーターが欠けている場合は `PlanError::MalformedResponse` を返す。
    pub async fn plan(
        &self,
        audio_locator: &str,
        meeting_id: &str,
        target_chunk_duration_seconds: f64,
    ) -> Result<Vec<ChunkDescriptor>, PlanError> {
        if !target_chunk_duration_seconds.is_finite() || target_chunk_duration_seconds <= 0.0 {
            return Err(PlanError::InvalidChunkDuration(
                target_chunk_duration_seconds,
            ));
        }

        let request = SplitRequest {
            audio_locator,
            chunk_duration_seconds: target_chunk_duration_seconds,
            meeting_id,
        };

        let response = self
            .client
            .post(&self.config.endpoint)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(PlanError::ServiceStatus { status, body });
        }

        let split: SplitResponse = response
            .json()
            .await
            .map_err(|e| PlanError::MalformedResponse(format!("応答のパースに失敗: {}", e)))?;

        if let Some(total) = split.total_duration {
            log::debug!("分割サービス報告の総録音時間: {:.1} 秒", total);
        }

        validate_chunks(split)
    }
}

/// 応答形状の検証
///
/// チャンクリストの存在、0 から連続したインデックス、ロケーターの存在を確認する。
fn validate_chunks(response: SplitResponse) -> Result<Vec<ChunkDescriptor>, PlanError> {
    let mut chunks = response
        .chunks
        .ok_or_else(|| PlanError::MalformedResponse("チャンクリストがありません".to_string()))?;

    chunks.sort_by_key(|c| c.chunk_index);

    let mut descriptors = Vec::with_capacity(chunks.len());
    for (position, chunk) in chunks.into_iter().enumerate() {
        if chunk.chunk_index != position {
            return Err(PlanError::MalformedResponse(format!(
                "チャンクインデックスが連続していません: 期待 {} 実際 {}",
                position, chunk.chunk_index
            )));
        }

        let locator = match chunk.gcs_uri {
            Some(uri) if !uri.is_empty() => uri,
            _ => {
                return Err(PlanError::MalformedResponse(format!(
                    "チャンク {} のロケーターがありません",
                    chunk.chunk_index
                )))
            }
        };

        descriptors.push(ChunkDescriptor {
            chunk_index: chunk.chunk_index,
            locator,
            start_offset_seconds: chunk.start_time,
            duration_seconds: chunk.duration,
        });
    }

    Ok(descriptors)
}
