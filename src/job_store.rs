use crate::types::MergedTranscript;
use std::collections::HashMap;
use tokio::sync::Mutex;

/// 永続化リトライに備えてジョブの成果物を保持するストア
///
/// 永続化サービスへの書き込みが失敗しても、組み立て済みの
/// トランスクリプトを破棄せずミーティングIDをキーに保持する。
/// 呼び出し側は文字起こしをやり直すことなく永続化だけを再試行できる。
/// 成果物が永続化された時点で破棄され、ストアはジョブの寿命を超えて
/// データを抱え込まない。
pub struct JobStore {
    jobs: Mutex<HashMap<String, MergedTranscript>>,
}

impl JobStore {
    pub fn new() -> Self {
        Self {
            jobs: Mutex::new(HashMap::new()),
        }
    }

    /// 成果物を保持する (同じミーティングIDの古い成果物は置き換える)
    pub async fn retain(&self, meeting_id: &str, transcript: MergedTranscript) {
        let mut jobs = self.jobs.lock().await;
        jobs.insert(meeting_id.to_string(), transcript);
    }

    /// 保持中の成果物を取得する (保持は継続する)
    pub async fn get(&self, meeting_id: &str) -> Option<MergedTranscript> {
        let jobs = self.jobs.lock().await;
        jobs.get(meeting_id).cloned()
    }

    /// 成果物を破棄する
    pub async fn discard(&self, meeting_id: &str) {
        let mut jobs = self.jobs.lock().await;
        jobs.remove(meeting_id);
    }

    /// 保持中のジョブ数
    pub async fn len(&self) -> usize {
        self.jobs.lock().await.len()
    }

    /// ストアが空かどうか
    pub async fn is_empty(&self) -> bool {
        self.jobs.lock().await.is_empty()
    }
}

impl Default for JobStore {
    fn default() -> Self {
        Self::new()
    }
}
