use crate::error::PersistError;
use crate::types::MergedTranscript;
use async_trait::async_trait;

/// トランスクリプト永続化の共通トレイト
///
/// パイプラインはこのトレイト越しに成果物を書き込む。
/// 失敗契約: エラーを返しても組み立て済みの成果物は破棄されず、
/// ジョブストアに保持されたまま永続化のみ再試行できる。
#[async_trait]
pub trait TranscriptPersist: Send + Sync {
    /// 1ミーティング分のトランスクリプトを書き込む
    async fn save(
        &self,
        meeting_id: &str,
        transcript: &MergedTranscript,
        audio_locator: &str,
    ) -> Result<(), PersistError>;
}
