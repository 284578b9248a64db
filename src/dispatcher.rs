use crate::recognize_backend::ChunkTranscribe;
use crate::types::{ChunkDescriptor, ChunkResult};
use futures_util::stream::{FuturesUnordered, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{timeout, Instant};

/// 全チャンクを同時実行数の上限付きで文字起こしする
///
/// チャンク列を `concurrency_limit` 件ずつのバッチに区切り、バッチ内は
/// 並行に処理し、バッチ全体 (失敗分も含む) の完了を待ってから次の
/// バッチへ進む。セマフォではなくバッチ処理で上限を実現しているため、
/// バッチ内で最も遅いチャンクが次バッチの開始を律速する。
///
/// 失敗契約: 1チャンクの失敗は同バッチの他チャンクをキャンセルも遅延も
/// させず、そのチャンクだけが空セントネルに置き換わる。ディスパッチが
/// 始まった後にジョブ全体が失敗することはない。
///
/// 各タスクは完了した結果を自分のスロットにのみ書き込む。締め切りを
/// 超過した場合に空セントネルになるのは未完了のチャンクだけで、
/// 同一バッチ内で既に完了していた結果は保持される。
///
/// # Arguments
///
/// * `transcriber` - チャンク単位の文字起こし実装
/// * `chunks` - チャンク計画 (インデックス順)
/// * `concurrency_limit` - 同時実行中の認識リクエスト数の上限
/// * `deadline` - ディスパッチ全体の締め切り。超過した場合、未完了の
///   チャンクはすべて空セントネルとして扱われる (盲目的なリトライはしない)
///
/// # Returns
///
/// 入力チャンク1件につき1件の `ChunkResult`。順序づけは後段のマージが
/// `chunk_index` で行うため、完了順には依存しない。
pub async fn dispatch_all(
    transcriber: Arc<dyn ChunkTranscribe>,
    chunks: &[ChunkDescriptor],
    concurrency_limit: usize,
    deadline: Option<Duration>,
) -> Vec<ChunkResult> {
    let limit = concurrency_limit.max(1);
    let started = Instant::now();

    let mut results: Vec<ChunkResult> = Vec::with_capacity(chunks.len());
    let mut expired = false;

    for batch in chunks.chunks(limit) {
        if expired {
            for chunk in batch {
                results.push(ChunkResult::empty(chunk.chunk_index));
            }
            continue;
        }

        // 各タスクの書き込み先スロット。完了した結果は締め切り超過後も残る
        let mut slots: Vec<Option<ChunkResult>> = vec![None; batch.len()];

        let mut in_flight: FuturesUnordered<_> = batch
            .iter()
            .enumerate()
            .map(|(slot_index, chunk)| {
                let transcriber = Arc::clone(&transcriber);
                async move {
                    let result = match transcriber.transcribe(chunk).await {
                        Ok(result) => result,
                        Err(e) => {
                            // チャンク単位の失敗は劣化であって中断ではない
                            log::warn!(
                                "チャンク {} の文字起こしに失敗、空結果で継続: {:#}",
                                chunk.chunk_index,
                                e
                            );
                            ChunkResult::empty(chunk.chunk_index)
                        }
                    };
                    (slot_index, result)
                }
            })
            .collect();

        while !in_flight.is_empty() {
            let completed = match deadline {
                Some(budget) => {
                    let remaining = budget
                        .checked_sub(started.elapsed())
                        .unwrap_or(Duration::ZERO);
                    match timeout(remaining, in_flight.next()).await {
                        Ok(next) => next,
                        Err(_) => {
                            log::warn!(
                                "ディスパッチ締め切り超過: 未完了のチャンクを失敗として扱います"
                            );
                            expired = true;
                            break;
                        }
                    }
                }
                None => in_flight.next().await,
            };

            match completed {
                Some((slot_index, result)) => slots[slot_index] = Some(result),
                None => break,
            }
        }

        // 未完了のタスクはここでキャンセルされる
        drop(in_flight);

        for (slot_index, slot) in slots.into_iter().enumerate() {
            results.push(
                slot.unwrap_or_else(|| ChunkResult::empty(batch[slot_index].chunk_index)),
            );
        }
    }

    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use async_trait::async_trait;
    use std::collections::{HashMap, HashSet};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// 同時実行数を観測するモック
    struct MockTranscriber {
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        fail_indices: HashSet<usize>,
        delay: Duration,
        delay_overrides: HashMap<usize, Duration>,
    }

    impl MockTranscriber {
        fn new(fail_indices: HashSet<usize>, delay: Duration) -> Self {
            Self {
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
                fail_indices,
                delay,
                delay_overrides: HashMap::new(),
            }
        }

        fn with_delays(delay: Duration, delay_overrides: HashMap<usize, Duration>) -> Self {
            Self {
                delay_overrides,
                ..Self::new(HashSet::new(), delay)
            }
        }
    }

    #[async_trait]
    impl ChunkTranscribe for MockTranscriber {
        async fn transcribe(&self, chunk: &ChunkDescriptor) -> Result<ChunkResult> {
            let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(current, Ordering::SeqCst);

            let delay = self
                .delay_overrides
                .get(&chunk.chunk_index)
                .copied()
                .unwrap_or(self.delay);
            tokio::time::sleep(delay).await;

            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.fail_indices.contains(&chunk.chunk_index) {
                anyhow::bail!("模擬サービスエラー");
            }

            Ok(ChunkResult {
                chunk_index: chunk.chunk_index,
                transcript_text: format!("chunk-{}", chunk.chunk_index),
                segments: Vec::new(),
            })
        }
    }

    fn make_chunks(count: usize) -> Vec<ChunkDescriptor> {
        (0..count)
            .map(|i| ChunkDescriptor {
                chunk_index: i,
                locator: format!("gs://b/chunk-{}.flac", i),
                start_offset_seconds: i as f64 * 300.0,
                duration_seconds: 300.0,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_concurrency_bound() {
        let transcriber = Arc::new(MockTranscriber::new(
            HashSet::new(),
            Duration::from_millis(20),
        ));
        let chunks = make_chunks(12);

        let results = dispatch_all(transcriber.clone(), &chunks, 5, None).await;

        assert_eq!(results.len(), 12);
        // 同時実行中の呼び出しが上限を超えないこと
        assert!(transcriber.max_in_flight.load(Ordering::SeqCst) <= 5);
        // バッチ内は実際に並行であること
        assert!(transcriber.max_in_flight.load(Ordering::SeqCst) > 1);
    }

    #[tokio::test]
    async fn test_failure_maps_to_empty_sentinel() {
        let mut fail = HashSet::new();
        fail.insert(1);
        let transcriber = Arc::new(MockTranscriber::new(fail, Duration::from_millis(1)));
        let chunks = make_chunks(3);

        let results = dispatch_all(transcriber, &chunks, 5, None).await;

        assert_eq!(results.len(), 3);
        // 失敗チャンクだけが空セントネルになる (兄弟は巻き添えにならない)
        assert!(!results[0].is_empty());
        assert!(results[1].is_empty());
        assert_eq!(results[1].chunk_index, 1);
        assert!(!results[2].is_empty());
    }

    #[tokio::test]
    async fn test_every_chunk_yields_one_result() {
        let transcriber = Arc::new(MockTranscriber::new(
            HashSet::new(),
            Duration::from_millis(1),
        ));
        let chunks = make_chunks(7);

        let results = dispatch_all(transcriber, &chunks, 3, None).await;

        let mut indices: Vec<usize> = results.iter().map(|r| r.chunk_index).collect();
        indices.sort_unstable();
        assert_eq!(indices, vec![0, 1, 2, 3, 4, 5, 6]);
    }

    #[tokio::test]
    async fn test_deadline_marks_remaining_as_failed() {
        let transcriber = Arc::new(MockTranscriber::new(
            HashSet::new(),
            Duration::from_millis(100),
        ));
        let chunks = make_chunks(4);

        let results =
            dispatch_all(transcriber, &chunks, 2, Some(Duration::from_millis(10))).await;

        // 締め切り超過後も全チャンク分の結果が揃う
        assert_eq!(results.len(), 4);
        assert!(results.iter().all(|r| r.is_empty()));
    }

    #[tokio::test]
    async fn test_deadline_preserves_completed_siblings() {
        // 同一バッチ内で先に完了していたチャンクの結果は、締め切り超過で
        // 空セントネルになるのは未完了のチャンクだけなので、失われない
        let mut overrides = HashMap::new();
        overrides.insert(1usize, Duration::from_millis(300));
        let transcriber = Arc::new(MockTranscriber::with_delays(
            Duration::from_millis(5),
            overrides,
        ));
        let chunks = make_chunks(2);

        let results =
            dispatch_all(transcriber, &chunks, 5, Some(Duration::from_millis(100))).await;

        assert_eq!(results.len(), 2);
        // 5ms で完了していたチャンク0は残る
        assert!(!results[0].is_empty());
        assert_eq!(results[0].transcript_text, "chunk-0");
        // 300ms かかるチャンク1だけが空セントネルになる
        assert!(results[1].is_empty());
        assert_eq!(results[1].chunk_index, 1);
    }

    #[tokio::test]
    async fn test_generous_deadline_completes_normally() {
        let transcriber = Arc::new(MockTranscriber::new(
            HashSet::new(),
            Duration::from_millis(1),
        ));
        let chunks = make_chunks(4);

        let results =
            dispatch_all(transcriber, &chunks, 2, Some(Duration::from_secs(10))).await;

        assert_eq!(results.len(), 4);
        assert!(results.iter().all(|r| !r.is_empty()));
    }

    #[tokio::test]
    async fn test_zero_concurrency_is_clamped() {
        let transcriber = Arc::new(MockTranscriber::new(
            HashSet::new(),
            Duration::from_millis(1),
        ));
        let chunks = make_chunks(2);

        let results = dispatch_all(transcriber, &chunks, 0, None).await;
        assert_eq!(results.len(), 2);
    }
}
