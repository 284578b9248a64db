use crate::chunk_planner::ChunkPlanner;
use crate::chunk_transcriber::ChunkTranscriber;
use crate::config::Config;
use crate::dispatcher::dispatch_all;
use crate::error::PipelineError;
use crate::job_store::JobStore;
use crate::merger::merge;
use crate::persist_backend::TranscriptPersist;
use crate::persist_client::PersistClient;
use crate::recognize_backend::ChunkTranscribe;
use crate::types::{AudioObjectRef, ChunkDescriptor, MergedTranscript, RecordingMethod};
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;

/// 文字起こしジョブ全体のオーケストレーター
///
/// ジョブの状態遷移: PLANNING → DISPATCHING → MERGING → DONE | ABORTED。
/// ABORTED に到達するのは PLANNING からのみで、ディスパッチが始まった後は
/// チャンク単位の失敗が劣化として処理されるため、ジョブは必ず DONE に
/// 到達する (永続化の失敗は DONE 後のジョブ失敗として露出する)。
pub struct TranscriptionPipeline {
    config: Config,
    planner: ChunkPlanner,
    transcriber: Arc<dyn ChunkTranscribe>,
    persist: Arc<dyn TranscriptPersist>,
    job_store: JobStore,
}

impl TranscriptionPipeline {
    pub fn new(config: Config) -> Result<Self> {
        let planner =
            ChunkPlanner::new(config.split.clone()).context("チャンクプランナー作成失敗")?;
        let transcriber = Arc::new(
            ChunkTranscriber::new(
                config.recognize.clone(),
                config.pipeline.silence_threshold_seconds,
            )
            .context("チャンクトランスクライバー作成失敗")?,
        );
        let persist = Arc::new(
            PersistClient::new(config.persist.clone()).context("永続化クライアント作成失敗")?,
        );

        Ok(Self {
            config,
            planner,
            transcriber,
            persist,
            job_store: JobStore::new(),
        })
    }

    /// 文字起こしジョブを実行する
    ///
    /// チャンク計画 → 並行ディスパッチ → マージ → 永続化。
    /// 一部のチャンクが失敗しても、トランスクリプトは欠落を含んだまま
    /// ジョブとしては成功する。
    ///
    /// # Arguments
    ///
    /// * `audio` - 録音全体の音声オブジェクト
    /// * `meeting_id` - 対象ミーティングID
    /// * `recording_method` - 録音方式 (一次的な録音時間ソースの選択に使う)
    /// * `duration_hint_seconds` - 計測済みの音声長 (ファイルアップロード時)。不明なら 0
    /// * `concurrency_limit` - 同時認識リクエスト数の上限
    ///
    /// # Errors
    ///
    /// チャンク計画の失敗は `PipelineError::PlanningFailed` としてジョブを
    /// 中断する。永続化の失敗は `PipelineError::PersistenceFailed` を返すが、
    /// 組み立て済みのトランスクリプトはジョブストアに残るため
    /// `retry_persist` で永続化のみ再試行できる。
    pub async fn run_job(
        &self,
        audio: &AudioObjectRef,
        meeting_id: &str,
        recording_method: RecordingMethod,
        duration_hint_seconds: f64,
        concurrency_limit: usize,
    ) -> Result<MergedTranscript, PipelineError> {
        log::info!(
            "ミーティング {}: 文字起こしジョブを開始 ({}, {} バイト)",
            meeting_id,
            audio.content_type,
            audio.byte_size
        );

        // PLANNING: 失敗はジョブ全体の中断 (マージ対象が存在しない)
        let chunks = self
            .planner
            .plan(
                &audio.locator,
                meeting_id,
                self.config.pipeline.chunk_duration_seconds,
            )
            .await?;
        log::info!(
            "ミーティング {}: {} チャンクを計画 (目標 {:.0} 秒/チャンク)",
            meeting_id,
            chunks.len(),
            self.config.pipeline.chunk_duration_seconds
        );

        // DISPATCHING → MERGING: ここから先はジョブは必ず完走する
        let deadline = self
            .config
            .pipeline
            .dispatch_timeout_seconds
            .map(Duration::from_secs);
        let merged = transcribe_and_merge(
            Arc::clone(&self.transcriber),
            &chunks,
            concurrency_limit,
            deadline,
            recording_method,
            duration_hint_seconds,
        )
        .await;

        log::info!(
            "ミーティング {}: マージ完了 (発話ログ {} 件, 録音時間 {:.1} 秒)",
            meeting_id,
            merged.speech_logs.len(),
            merged.duration_seconds
        );

        self.persist_and_release(meeting_id, &merged, &audio.locator)
            .await?;

        Ok(merged)
    }

    /// 成果物を保持してから永続化し、成功時に解放する
    ///
    /// 永続化に失敗しても成果物はジョブストアに残り、`retry_persist` が
    /// 文字起こしをやり直さずに書き込みだけ再試行できる。
    async fn persist_and_release(
        &self,
        meeting_id: &str,
        merged: &MergedTranscript,
        audio_locator: &str,
    ) -> Result<(), PipelineError> {
        self.job_store.retain(meeting_id, merged.clone()).await;
        self.persist.save(meeting_id, merged, audio_locator).await?;
        self.job_store.discard(meeting_id).await;
        Ok(())
    }

    /// 永続化のみを再試行する (文字起こしはやり直さない)
    ///
    /// # Returns
    ///
    /// 保持中の成果物がなければ `Ok(None)`。永続化に成功すると成果物を
    /// ストアから破棄して返す。
    pub async fn retry_persist(
        &self,
        meeting_id: &str,
        audio_locator: &str,
    ) -> Result<Option<MergedTranscript>, PipelineError> {
        let Some(merged) = self.job_store.get(meeting_id).await else {
            log::warn!("ミーティング {}: 再試行対象の成果物がありません", meeting_id);
            return Ok(None);
        };

        self.persist.save(meeting_id, &merged, audio_locator).await?;
        self.job_store.discard(meeting_id).await;

        Ok(Some(merged))
    }

    /// 永続化待ちの成果物を保持しているかどうか
    pub async fn has_pending_transcript(&self, meeting_id: &str) -> bool {
        self.job_store.get(meeting_id).await.is_some()
    }
}

/// ディスパッチとマージの合成段
///
/// チャンク単位の失敗は空セントネルに写像済みで到着するため、
/// この段が失敗を返すことはない。
pub async fn transcribe_and_merge(
    transcriber: Arc<dyn ChunkTranscribe>,
    chunks: &[ChunkDescriptor],
    concurrency_limit: usize,
    deadline: Option<Duration>,
    recording_method: RecordingMethod,
    duration_hint_seconds: f64,
) -> MergedTranscript {
    let results = dispatch_all(transcriber, chunks, concurrency_limit, deadline).await;

    let failed = results.iter().filter(|r| r.is_empty()).count();
    if failed > 0 {
        log::warn!(
            "{} / {} チャンクが失敗しました (トランスクリプトに欠落として残ります)",
            failed,
            results.len()
        );
    }

    merge(results, recording_method, duration_hint_seconds)
}
