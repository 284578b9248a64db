use crate::types::{ChunkDescriptor, ChunkResult};
use anyhow::Result;
use async_trait::async_trait;

/// チャンク単位の文字起こしの共通トレイト
///
/// ディスパッチャはこのトレイト越しにチャンクを処理する。
/// 失敗契約: エラーはそのまま返してよい。ディスパッチャが無条件に
/// 空セントネルへ写像するため、チャンク単位の失敗がジョブを
/// 中断させることはない。
#[async_trait]
pub trait ChunkTranscribe: Send + Sync {
    /// 1チャンクを文字起こしする
    ///
    /// # Returns
    /// セグメント列と描画済みテキストを持つ `ChunkResult`
    async fn transcribe(&self, chunk: &ChunkDescriptor) -> Result<ChunkResult>;
}
