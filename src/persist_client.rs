use crate::config::PersistConfig;
use crate::error::PersistError;
use crate::persist_backend::TranscriptPersist;
use crate::types::MergedTranscript;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;

/// 永続化サービスへの書き込みペイロード
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PersistPayload<'a> {
    duration: f64,
    transcript: &'a str,
    audio_locator: &'a str,
    speech_logs: Vec<SpeechLogEntry<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SpeechLogEntry<'a> {
    speaker_index: i32,
    text: &'a str,
    start_time: f64,
    end_time: f64,
}

/// マージ済みトランスクリプトを永続化サービスに書き込むクライアント
///
/// チャンク単位の認識失敗と違い、永続化の失敗はジョブの失敗として
/// 呼び出し側に露出する。組み立て済みの成果物は破棄されない
/// (ジョブストア経由で永続化のみ再試行できる)。
pub struct PersistClient {
    config: PersistConfig,
    client: reqwest::Client,
}

impl PersistClient {
    pub fn new(config: PersistConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_seconds))
            .build()
            .context("永続化HTTPクライアント作成失敗")?;

        Ok(Self { config, client })
    }
}

#[async_trait]
impl TranscriptPersist for PersistClient {
    /// 1ミーティング分のトランスクリプトを書き込む
    ///
    /// # Errors
    ///
    /// 通信失敗は `PersistError::Transport`、非成功ステータスは
    /// `PersistError::ServiceStatus` を返す。
    async fn save(
        &self,
        meeting_id: &str,
        transcript: &MergedTranscript,
        audio_locator: &str,
    ) -> Result<(), PersistError> {
        let payload = build_payload(transcript, audio_locator);
        let url = format!(
            "{}/meetings/{}/transcript",
            self.config.endpoint.trim_end_matches('/'),
            meeting_id
        );

        let response = self.client.post(&url).json(&payload).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(PersistError::ServiceStatus { status, body });
        }

        log::info!(
            "ミーティング {}: トランスクリプトを永続化しました ({} 発話ログ)",
            meeting_id,
            transcript.speech_logs.len()
        );

        Ok(())
    }
}

fn build_payload<'a>(
    transcript: &'a MergedTranscript,
    audio_locator: &'a str,
) -> PersistPayload<'a> {
    PersistPayload {
        duration: transcript.duration_seconds,
        transcript: &transcript.full_text,
        audio_locator,
        speech_logs: transcript
            .speech_logs
            .iter()
            .map(|segment| SpeechLogEntry {
                speaker_index: segment.speaker_tag,
                text: &segment.text,
                start_time: segment.start_time_seconds,
                end_time: segment.end_time_seconds,
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Segment;

    #[tokio::test]
    async fn test_persist_client_creation() {
        let result = PersistClient::new(PersistConfig::default());
        assert!(result.is_ok());
    }

    #[test]
    fn test_payload_serialization() {
        let transcript = MergedTranscript {
            full_text: "[speaker 1] (00:00:00-00:00:05) こんにちは".to_string(),
            speech_logs: vec![Segment {
                speaker_tag: 1,
                text: "こんにちは".to_string(),
                start_time_seconds: 0.0,
                end_time_seconds: 5.0,
            }],
            duration_seconds: 5.0,
            completed_at: "2025-01-02T14:30:15+00:00".to_string(),
        };

        let payload = build_payload(&transcript, "gs://bucket/meeting.wav");
        let json = serde_json::to_value(&payload).unwrap();

        assert_eq!(json["duration"], 5.0);
        assert_eq!(json["audioLocator"], "gs://bucket/meeting.wav");
        assert_eq!(json["speechLogs"][0]["speakerIndex"], 1);
        assert_eq!(json["speechLogs"][0]["text"], "こんにちは");
        assert_eq!(json["speechLogs"][0]["startTime"], 0.0);
        assert_eq!(json["speechLogs"][0]["endTime"], 5.0);
    }
}
