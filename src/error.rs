use thiserror::Error;

/// チャンク計画段階のエラー
///
/// 計画が失敗するとマージ対象が存在しないため、ジョブ全体が中断される。
/// この層ではリトライを行わない。
#[derive(Debug, Error)]
pub enum PlanError {
    /// 分割サービスへの通信に失敗
    #[error("分割サービスへのリクエストに失敗: {0}")]
    Transport(#[from] reqwest::Error),

    /// 分割サービスが非成功ステータスを返した
    #[error("分割サービスがエラーを返しました: {status} - {body}")]
    ServiceStatus { status: u16, body: String },

    /// 応答がチャンクリスト欠落や不変条件違反で不正
    #[error("分割サービスの応答が不正です: {0}")]
    MalformedResponse(String),

    /// 目標チャンク長が正の有限値でない
    #[error("チャンク長が不正です: {0} (正の有限値が必要)")]
    InvalidChunkDuration(f64),
}

/// 永続化段階のエラー
///
/// トランスクリプトの組み立て完了後に発生する致命的エラー。
/// 組み立て済みの成果物は破棄されず、ジョブストアに保持される。
#[derive(Debug, Error)]
pub enum PersistError {
    /// 永続化サービスへの通信に失敗
    #[error("永続化サービスへのリクエストに失敗: {0}")]
    Transport(#[from] reqwest::Error),

    /// 永続化サービスが非成功ステータスを返した
    #[error("永続化サービスがエラーを返しました: {status} - {body}")]
    ServiceStatus { status: u16, body: String },
}

/// 文字起こしジョブの呼び出し側に露出するエラー
///
/// チャンク単位の認識失敗はここには現れない
/// (空セントネルに置換され、ログにのみ記録される)。
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("チャンク計画に失敗しました: {0}")]
    PlanningFailed(#[from] PlanError),

    #[error("トランスクリプトの永続化に失敗しました: {0}")]
    PersistenceFailed(#[from] PersistError),
}
