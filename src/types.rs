use serde::{Deserialize, Serialize};

/// ストレージ上の音声オブジェクトへの参照
///
/// オブジェクトストレージが所有する録音データの不透明なロケーター。
/// 作成後は不変。
#[derive(Clone, Debug)]
pub struct AudioObjectRef {
    /// ストレージロケーター (URI)
    pub locator: String,

    /// コンテンツタイプ (例: "audio/wav")
    pub content_type: String,

    /// バイトサイズ
    pub byte_size: u64,
}

/// 音声チャンクの記述子
///
/// 分割サービスが生成した、録音全体のうちの有界区間1つを表す。
/// `chunk_index` は 0 から連続しており、タイムライン上の全順序を定める。
///
/// # Examples
///
/// ```
/// # use mtg_transcribe::types::ChunkDescriptor;
/// let chunk = ChunkDescriptor {
///     chunk_index: 0,
///     locator: "gs://bucket/meeting-1/chunk-0.flac".to_string(),
///     start_offset_seconds: 0.0,
///     duration_seconds: 300.0,
/// };
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct ChunkDescriptor {
    /// チャンク番号 (0 から連続)
    pub chunk_index: usize,

    /// チャンク音声のストレージロケーター
    pub locator: String,

    /// 録音全体における開始オフセット (秒、0 以上)
    pub start_offset_seconds: f64,

    /// チャンクの長さ (秒、0 より大)
    pub duration_seconds: f64,
}

/// 音声認識サービスからの単語単位の生出力
///
/// 時刻はチャンク相対。話者タグは認識サービスのダイアライゼーションが付与する。
#[derive(Clone, Debug, PartialEq)]
pub struct WordToken {
    /// 単語テキスト
    pub text: String,

    /// 話者タグ
    pub speaker_tag: i32,

    /// 開始時刻 (秒、チャンク相対)
    pub start_time_seconds: f64,

    /// 終了時刻 (秒、チャンク相対)
    pub end_time_seconds: f64,
}

/// 話者が一様な発話セグメント
///
/// 時刻は録音絶対時刻 (チャンクオフセット補正後)。
/// 1チャンク内のセグメント列は開始時刻順で互いに重ならない。
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Segment {
    /// 話者タグ
    pub speaker_tag: i32,

    /// セグメントのテキスト
    pub text: String,

    /// 開始時刻 (秒、録音絶対)
    pub start_time_seconds: f64,

    /// 終了時刻 (秒、録音絶対)
    pub end_time_seconds: f64,
}

/// 1チャンク分の文字起こし結果
///
/// チャンクが失敗した場合は空セントネル (空テキスト・空セグメント) になるが、
/// `chunk_index` は常に設定されるため、部分失敗後も順序が保たれる。
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChunkResult {
    /// チャンク番号
    pub chunk_index: usize,

    /// 描画済みの文字起こしテキスト (失敗時は空)
    pub transcript_text: String,

    /// 絶対時刻順のセグメント列 (失敗時は空)
    pub segments: Vec<Segment>,
}

impl ChunkResult {
    /// 失敗したチャンクの代わりに使う空セントネルを作成
    pub fn empty(chunk_index: usize) -> Self {
        Self {
            chunk_index,
            transcript_text: String::new(),
            segments: Vec::new(),
        }
    }

    /// 空セントネルかどうか
    pub fn is_empty(&self) -> bool {
        self.transcript_text.is_empty() && self.segments.is_empty()
    }
}

/// 録音方式
///
/// マージ段階で一次的な録音時間のソースを選択するために使う。
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RecordingMethod {
    /// 連続録音 (時間 = 最後のセグメントの終了時刻)
    Continuous,

    /// ファイルアップロード (時間 = 計測済みの音声長)
    FileUpload,
}

/// ジョブの最終成果物であるマージ済みトランスクリプト
///
/// 1回の文字起こしジョブにつき1度だけ作成され、永続化サービスに
/// 1度だけ書き込まれる。マージ完了後に変更されることはない
/// (新しいジョブは新しいインスタンスを作る)。
///
/// # JSON出力例
///
/// ```json
/// {
///   "full_text": "[speaker 1] (00:00:00-00:00:12) お疲れ様です",
///   "speech_logs": [...],
///   "duration_seconds": 754.0,
///   "completed_at": "2025-01-02T14:30:15+00:00"
/// }
/// ```
#[derive(Clone, Debug, Serialize)]
pub struct MergedTranscript {
    /// チャンク順に連結した全文テキスト
    pub full_text: String,

    /// 開始時刻昇順の発話ログ
    pub speech_logs: Vec<Segment>,

    /// 録音時間 (秒)。0 は「不明」を意味する
    pub duration_seconds: f64,

    /// マージ完了時刻 (ISO 8601)
    pub completed_at: String,
}

/// 秒数を HH:MM:SS 形式に変換
///
/// # Examples
///
/// ```
/// # use mtg_transcribe::types::format_hms;
/// assert_eq!(format_hms(754.0), "00:12:34");
/// ```
pub fn format_hms(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    let h = total / 3600;
    let m = (total % 3600) / 60;
    let s = total % 60;
    format!("{:02}:{:02}:{:02}", h, m, s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_sentinel() {
        let result = ChunkResult::empty(3);
        assert_eq!(result.chunk_index, 3);
        assert!(result.is_empty());

        let non_empty = ChunkResult {
            chunk_index: 0,
            transcript_text: "テスト".to_string(),
            segments: Vec::new(),
        };
        assert!(!non_empty.is_empty());
    }

    #[test]
    fn test_format_hms() {
        assert_eq!(format_hms(0.0), "00:00:00");
        assert_eq!(format_hms(59.9), "00:00:59");
        assert_eq!(format_hms(754.0), "00:12:34");
        assert_eq!(format_hms(3661.0), "01:01:01");
        // 負値は 0 に丸める
        assert_eq!(format_hms(-5.0), "00:00:00");
    }

    #[test]
    fn test_recording_method_serialization() {
        let method = RecordingMethod::FileUpload;
        let json = serde_json::to_string(&method).unwrap();
        assert_eq!(json, r#""file_upload""#);

        let deserialized: RecordingMethod = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, RecordingMethod::FileUpload);
    }

    #[test]
    fn test_merged_transcript_json_serialization() {
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

        let json = serde_json::to_string(&transcript).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed["duration_seconds"], 5.0);
        assert_eq!(parsed["speech_logs"][0]["speaker_tag"], 1);
        assert_eq!(parsed["speech_logs"][0]["text"], "こんにちは");
    }
}
