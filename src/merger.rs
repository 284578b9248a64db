use crate::types::{ChunkResult, MergedTranscript, RecordingMethod, Segment};
use regex_lite::Regex;

/// チャンク単位の結果を1本のトランスクリプトにマージする
///
/// 1. `chunk_index` 昇順に整列 (完了順には依存しない)
/// 2. 空でない `transcript_text` を改行で連結。失敗チャンクは黙って
///    欠落となり、エラーマーカーは残さない
/// 3. 全チャンクのセグメントをチャンク境界に関係なく絶対開始時刻で
///    整列して発話ログにする
/// 4. 録音時間を確定する。一次ソース (連続録音: 最後のセグメントの
///    終了時刻、ファイルアップロード: 計測済みの音声長) が 0 の場合のみ
///    `reconcile_duration` にフォールバックする
///
/// マージ済みトランスクリプトはジョブの最終成果物であり、以後変更されない。
pub fn merge(
    results: Vec<ChunkResult>,
    recording_method: RecordingMethod,
    duration_hint_seconds: f64,
) -> MergedTranscript {
    let mut results = results;
    results.sort_by_key(|r| r.chunk_index);

    let full_text = results
        .iter()
        .filter(|r| !r.transcript_text.is_empty())
        .map(|r| r.transcript_text.as_str())
        .collect::<Vec<_>>()
        .join("\n");

    let mut speech_logs: Vec<Segment> = results.into_iter().flat_map(|r| r.segments).collect();
    speech_logs.sort_by(|a, b| a.start_time_seconds.total_cmp(&b.start_time_seconds));

    let primary_duration = match recording_method {
        RecordingMethod::Continuous => speech_logs
            .last()
            .map(|s| s.end_time_seconds)
            .unwrap_or(0.0),
        RecordingMethod::FileUpload => duration_hint_seconds,
    };

    let duration_seconds = if primary_duration > 0.0 {
        primary_duration
    } else {
        log::debug!("一次の録音時間ソースが 0 のためトランスクリプトから推定します");
        reconcile_duration(&full_text)
    };

    MergedTranscript {
        full_text,
        speech_logs,
        duration_seconds,
        completed_at: chrono::Utc::now().to_rfc3339(),
    }
}

/// トランスクリプトのテキストから録音時間を推定するフォールバック
///
/// 描画済みテキスト中の括弧付き時刻注釈から、最後の well-formed な
/// HH:MM:SS 終端境界を取り出して秒に変換する。パース可能な注釈が
/// 1つもなければ 0 を返す (呼び出し側は 0 を「不明」として扱うこと)。
pub fn reconcile_duration(full_text: &str) -> f64 {
    // 注釈の終端境界 = 閉じ括弧直前の HH:MM:SS
    let re = match Regex::new(r"([0-9]{2}):([0-9]{2}):([0-9]{2})\)") {
        Ok(re) => re,
        Err(_) => return 0.0,
    };

    let mut last_seconds = 0.0;
    for caps in re.captures_iter(full_text) {
        let hours: f64 = caps[1].parse().unwrap_or(0.0);
        let minutes: f64 = caps[2].parse().unwrap_or(0.0);
        let seconds: f64 = caps[3].parse().unwrap_or(0.0);
        last_seconds = hours * 3600.0 + minutes * 60.0 + seconds;
    }

    last_seconds
}
