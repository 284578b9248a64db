use crate::types::{Segment, WordToken};
use std::collections::HashSet;

/// 単語単位のダイアライゼーション出力を話者一様なセグメントに畳み込むビルダー
///
/// 認識サービスが返す単語列 (チャンク相対時刻) を、話者交代または
/// 無音ギャップを境界としてセグメントにまとめる。句読点や意味による
/// 分割は一切行わない。時刻はチャンクオフセットを加算して録音絶対時刻に
/// 補正される。
pub struct DiarizedSegmentBuilder {
    /// セグメント分割の無音閾値 (秒)
    silence_threshold_seconds: f64,
}

impl DiarizedSegmentBuilder {
    pub fn new(silence_threshold_seconds: f64) -> Self {
        Self {
            silence_threshold_seconds,
        }
    }

    /// 単語列をセグメント列に畳み込む
    ///
    /// # Arguments
    ///
    /// * `words` - チャンク相対時刻順の単語列
    /// * `chunk_offset_seconds` - このチャンクの録音全体における開始オフセット
    ///
    /// # Returns
    ///
    /// 録音絶対時刻で時系列順・非重複のセグメント列。
    /// 同一入力に対して常に同一の出力を返す (内部状態を持たない)。
    pub fn build(&self, words: &[WordToken], chunk_offset_seconds: f64) -> Vec<Segment> {
        let mut segments: Vec<Segment> = Vec::new();

        let mut current_speaker: Option<i32> = None;
        let mut current_text = String::new();
        let mut current_start: Option<f64> = None;
        let mut last_word_end: Option<f64> = None;

        for word in words {
            let abs_start = word.start_time_seconds + chunk_offset_seconds;
            let abs_end = word.end_time_seconds + chunk_offset_seconds;

            // 直前の単語がない間はギャップ 0 として扱う
            let silence_gap = match last_word_end {
                Some(end) => abs_start - end,
                None => 0.0,
            };

            let speaker_changed = current_speaker != Some(word.speaker_tag);
            let should_break =
                current_speaker.is_none() || speaker_changed || silence_gap >= self.silence_threshold_seconds;

            if should_break {
                // 進行中のセグメントがあれば、終了時刻 = 直前の単語の終了時刻で確定
                if let (Some(speaker), Some(start)) = (current_speaker, current_start) {
                    if !current_text.is_empty() {
                        segments.push(Segment {
                            speaker_tag: speaker,
                            text: current_text.clone(),
                            start_time_seconds: start,
                            end_time_seconds: last_word_end.unwrap_or(start),
                        });
                    }
                }
                current_speaker = Some(word.speaker_tag);
                current_text = word.text.clone();
                current_start = Some(abs_start);
            } else {
                current_text.push(' ');
                current_text.push_str(&word.text);
            }

            last_word_end = Some(abs_end);
        }

        // 末尾の未確定セグメントをフラッシュ
        if let (Some(speaker), Some(start)) = (current_speaker, current_start) {
            if !current_text.is_empty() {
                segments.push(Segment {
                    speaker_tag: speaker,
                    text: current_text,
                    start_time_seconds: start,
                    end_time_seconds: last_word_end.unwrap_or(start),
                });
            }
        }

        Self::postprocess(segments)
    }

    /// 後処理: サブトークン痕跡の除去と重複セグメントの排除
    ///
    /// 上流の単語結果リトライで同一セグメントが二重に現れることがあるため、
    /// (テキスト, 開始時刻) が一致するセグメントは1つに絞る。
    fn postprocess(segments: Vec<Segment>) -> Vec<Segment> {
        let mut seen: HashSet<(String, u64)> = HashSet::new();
        let mut result = Vec::with_capacity(segments.len());

        for mut segment in segments {
            segment.text = collapse_subtokens(&segment.text);

            let key = (segment.text.clone(), segment.start_time_seconds.to_bits());
            if seen.insert(key) {
                result.push(segment);
            }
        }

        result
    }
}

/// トークナイザ内部のサブトークンマーカーを通常の空白に置き換える
fn collapse_subtokens(text: &str) -> String {
    let mut result = text.replace('\u{2581}', " ");

    // 連続する空白を1つにまとめる
    while result.contains("  ") {
        result = result.replace("  ", " ");
    }

    result.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(text: &str, speaker: i32, start: f64, end: f64) -> WordToken {
        WordToken {
            text: text.to_string(),
            speaker_tag: speaker,
            start_time_seconds: start,
            end_time_seconds: end,
        }
    }

    #[test]
    fn test_empty_input() {
        let builder = DiarizedSegmentBuilder::new(5.0);
        assert!(builder.build(&[], 0.0).is_empty());
    }

    #[test]
    fn test_single_speaker_one_segment() {
        let builder = DiarizedSegmentBuilder::new(5.0);
        let words = vec![
            word("お疲れ様", 1, 0.0, 1.0),
            word("です", 1, 1.2, 2.0),
        ];

        let segments = builder.build(&words, 0.0);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].speaker_tag, 1);
        assert_eq!(segments[0].text, "お疲れ様 です");
        assert_eq!(segments[0].start_time_seconds, 0.0);
        assert_eq!(segments[0].end_time_seconds, 2.0);
    }

    #[test]
    fn test_silence_gap_boundary() {
        let builder = DiarizedSegmentBuilder::new(5.0);

        // ギャップちょうど 5.0 秒: 分割される
        let words = vec![
            word("まず", 1, 0.0, 1.0),
            word("次に", 1, 6.0, 7.0),
        ];
        let segments = builder.build(&words, 0.0);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].text, "まず");
        assert_eq!(segments[0].end_time_seconds, 1.0);
        assert_eq!(segments[1].text, "次に");
        assert_eq!(segments[1].start_time_seconds, 6.0);

        // ギャップ 4.999 秒: 分割されない
        let words = vec![
            word("まず", 1, 0.0, 1.0),
            word("次に", 1, 5.999, 7.0),
        ];
        let segments = builder.build(&words, 0.0);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].text, "まず 次に");
    }

    #[test]
    fn test_speaker_change_breaks_with_zero_gap() {
        let builder = DiarizedSegmentBuilder::new(5.0);
        let words = vec![
            word("こんにちは", 1, 0.0, 1.0),
            word("どうも", 2, 1.0, 2.0),
        ];

        let segments = builder.build(&words, 0.0);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].speaker_tag, 1);
        assert_eq!(segments[1].speaker_tag, 2);
        // 先行セグメントの終了時刻は直前の単語の終了時刻
        assert_eq!(segments[0].end_time_seconds, 1.0);
    }

    #[test]
    fn test_chunk_offset_correction() {
        let builder = DiarizedSegmentBuilder::new(5.0);
        let words = vec![word("はい", 1, 2.0, 3.0)];

        // チャンク2 (オフセット600秒) の単語は絶対時刻に補正される
        let segments = builder.build(&words, 600.0);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].start_time_seconds, 602.0);
        assert_eq!(segments[0].end_time_seconds, 603.0);
    }

    #[test]
    fn test_build_is_idempotent() {
        let builder = DiarizedSegmentBuilder::new(5.0);
        let words = vec![
            word("あの", 1, 0.0, 0.5),
            word("資料", 1, 0.6, 1.2),
            word("はい", 2, 1.3, 1.8),
            word("では", 1, 10.0, 10.5),
        ];

        let first = builder.build(&words, 0.0);
        let second = builder.build(&words, 0.0);
        assert_eq!(first, second);
    }

    #[test]
    fn test_duplicate_segments_removed() {
        let builder = DiarizedSegmentBuilder::new(5.0);

        // 上流のリトライで同じ単語列が二度現れたケース:
        // (テキスト, 開始時刻) が一致するセグメントは1つになる
        let words = vec![
            word("決まり", 1, 0.0, 1.0),
            word("はい", 2, 1.0, 2.0),
            word("決まり", 1, 0.0, 1.0),
        ];

        let segments = builder.build(&words, 0.0);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].text, "決まり");
        assert_eq!(segments[1].text, "はい");
    }

    #[test]
    fn test_subtoken_markers_collapsed() {
        let builder = DiarizedSegmentBuilder::new(5.0);
        let words = vec![
            word("meeting\u{2581}notes", 1, 0.0, 1.0),
            word("\u{2581}done", 1, 1.1, 2.0),
        ];

        let segments = builder.build(&words, 0.0);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].text, "meeting notes done");
    }

    #[test]
    fn test_segments_ordered_and_non_overlapping() {
        let builder = DiarizedSegmentBuilder::new(5.0);
        let words = vec![
            word("a", 1, 0.0, 1.0),
            word("b", 2, 1.5, 2.0),
            word("c", 1, 8.0, 9.0),
            word("d", 1, 15.0, 16.0),
        ];

        let segments = builder.build(&words, 0.0);
        for pair in segments.windows(2) {
            assert!(pair[0].start_time_seconds <= pair[1].start_time_seconds);
            assert!(pair[0].end_time_seconds <= pair[1].start_time_seconds);
        }
    }
}
