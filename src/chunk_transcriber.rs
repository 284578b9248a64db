use crate::config::RecognizeConfig;
use crate::recognize_backend::ChunkTranscribe;
use crate::segment_builder::DiarizedSegmentBuilder;
use crate::types::{format_hms, ChunkDescriptor, ChunkResult, Segment, WordToken};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// 音声認識サービスへのリクエスト
///
/// 認識設定は固定: 自動句読点、単語単位のタイムオフセット、
/// ダイアライゼーション話者数境界。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RecognizeRequest<'a> {
    audio_locator: &'a str,
    encoding: &'a str,
    sample_rate_hertz: u32,
    language_code: &'a str,
    enable_automatic_punctuation: bool,
    enable_word_time_offsets: bool,
    diarization_speaker_count_min: u32,
    diarization_speaker_count_max: u32,
    audio_channel_count: u16,
}

/// 音声認識サービスの応答
#[derive(Debug, Deserialize)]
struct RecognizeResponse {
    #[serde(default)]
    results: Vec<RecognizeResult>,
}

#[derive(Debug, Deserialize)]
struct RecognizeResult {
    #[serde(default)]
    alternatives: Vec<RecognizeAlternative>,
}

#[derive(Debug, Deserialize)]
struct RecognizeAlternative {
    #[serde(default)]
    words: Vec<WireWord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireWord {
    word: String,
    #[serde(default)]
    speaker_tag: i32,
    start_time: WireTime,
    end_time: WireTime,
}

/// 認識サービスの時刻表現 (秒 + ナノ秒)
#[derive(Debug, Default, Deserialize)]
struct WireTime {
    #[serde(default)]
    seconds: i64,
    #[serde(default)]
    nanos: i32,
}

impl WireTime {
    fn as_seconds(&self) -> f64 {
        self.seconds as f64 + self.nanos as f64 / 1_000_000_000.0
    }
}

/// 1チャンクを音声認識サービスで文字起こしするクライアント
///
/// 単語単位の生出力をセグメントビルダーに渡し、チャンクの開始オフセットで
/// 絶対時刻に補正したセグメント列と描画済みテキストを組み立てる。
pub struct ChunkTranscriber {
    config: RecognizeConfig,
    client: reqwest::Client,
    builder: DiarizedSegmentBuilder,
}

impl ChunkTranscriber {
    pub fn new(config: RecognizeConfig, silence_threshold_seconds: f64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_seconds))
            .build()
            .context("音声認識HTTPクライアント作成失敗")?;

        Ok(Self {
            config,
            client,
            builder: DiarizedSegmentBuilder::new(silence_threshold_seconds),
        })
    }

    /// 認識サービスを呼び出して単語列を取得
    async fn recognize(&self, audio_locator: &str) -> Result<Vec<WordToken>> {
        let request = RecognizeRequest {
            audio_locator,
            encoding: &self.config.encoding,
            sample_rate_hertz: self.config.sample_rate,
            language_code: &self.config.language_code,
            enable_automatic_punctuation: true,
            enable_word_time_offsets: true,
            diarization_speaker_count_min: self.config.diarization_speaker_count_min,
            diarization_speaker_count_max: self.config.diarization_speaker_count_max,
            audio_channel_count: self.config.channel_count,
        };

        let response = self
            .client
            .post(&self.config.endpoint)
            .json(&request)
            .send()
            .await
            .context("音声認識リクエスト失敗")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("音声認識サービスエラー: {} - {}", status, body);
        }

        let recognized: RecognizeResponse = response
            .json()
            .await
            .context("音声認識レスポンスのパース失敗")?;

        Ok(parse_words(recognized))
    }
}

#[async_trait]
impl ChunkTranscribe for ChunkTranscriber {
    async fn transcribe(&self, chunk: &ChunkDescriptor) -> Result<ChunkResult> {
        let words = self.recognize(&chunk.locator).await?;

        log::debug!(
            "チャンク {}: 単語 {} 件を認識",
            chunk.chunk_index,
            words.len()
        );

        let segments = self.builder.build(&words, chunk.start_offset_seconds);
        let transcript_text = render_transcript(&segments);

        Ok(ChunkResult {
            chunk_index: chunk.chunk_index,
            transcript_text,
            segments,
        })
    }
}

/// 応答から単語列を取り出す
///
/// 各結果の第一候補のみを採用する。
fn parse_words(response: RecognizeResponse) -> Vec<WordToken> {
    let mut words = Vec::new();

    for result in response.results {
        if let Some(alternative) = result.alternatives.into_iter().next() {
            for wire in alternative.words {
                words.push(WordToken {
                    text: wire.word,
                    speaker_tag: wire.speaker_tag,
                    start_time_seconds: wire.start_time.as_seconds(),
                    end_time_seconds: wire.end_time.as_seconds(),
                });
            }
        }
    }

    words
}

/// セグメント列を表示用テキストに描画
///
/// 1セグメントを `[speaker {tag}] (開始-終了) テキスト` の1行として
/// 改行で連結する。時刻は HH:MM:SS。
pub fn render_transcript(segments: &[Segment]) -> String {
    segments
        .iter()
        .map(|segment| {
            format!(
                "[speaker {}] ({}-{}) {}",
                segment.speaker_tag,
                format_hms(segment.start_time_seconds),
                format_hms(segment.end_time_seconds),
                segment.text
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
