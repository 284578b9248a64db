use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub split: SplitConfig,
    #[serde(default)]
    pub recognize: RecognizeConfig,
    #[serde(default)]
    pub persist: PersistConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// 分割サービス設定
///
/// 音声オブジェクトをチャンクに分割する外部サービスに関する設定。
///
/// # デフォルト値
///
/// - `endpoint`: "http://localhost:8081/split"
/// - `timeout_seconds`: 30 秒
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SplitConfig {
    #[serde(default = "default_split_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

/// 音声認識サービス設定
///
/// チャンク単位の音声認識リクエストに関する設定。
/// ダイアライゼーションの話者数境界は 1〜5 で固定運用している
/// (会議の参加者数レンジに合わせた観測値)。
///
/// # デフォルト値
///
/// - `endpoint`: "http://localhost:8082/recognize"
/// - `language_code`: "ja-JP" (日本語)
/// - `encoding`: "FLAC"
/// - `sample_rate`: 16000 Hz
/// - `channel_count`: 1
/// - `diarization_speaker_count_min`: 1
/// - `diarization_speaker_count_max`: 5
/// - `timeout_seconds`: 30 秒
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RecognizeConfig {
    #[serde(default = "default_recognize_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_language_code")]
    pub language_code: String,
    #[serde(default = "default_encoding")]
    pub encoding: String,
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    #[serde(default = "default_channel_count")]
    pub channel_count: u16,
    #[serde(default = "default_speaker_count_min")]
    pub diarization_speaker_count_min: u32,
    #[serde(default = "default_speaker_count_max")]
    pub diarization_speaker_count_max: u32,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

/// 永続化サービス設定
///
/// マージ済みトランスクリプトの書き込み先に関する設定。
///
/// # デフォルト値
///
/// - `endpoint`: "http://localhost:8083/api"
/// - `timeout_seconds`: 30 秒
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PersistConfig {
    #[serde(default = "default_persist_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

/// パイプライン設定
///
/// チャンク計画と並行ディスパッチに関する設定。
///
/// # デフォルト値
///
/// - `chunk_duration_seconds`: 300 秒 (5分)
/// - `concurrency_limit`: 5 (同時認識リクエスト数の上限)
/// - `silence_threshold_seconds`: 5.0 秒 (セグメント分割の無音閾値)
/// - `dispatch_timeout_seconds`: なし (ディスパッチ全体の締め切り。省略時は無制限)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PipelineConfig {
    #[serde(default = "default_chunk_duration_seconds")]
    pub chunk_duration_seconds: f64,
    #[serde(default = "default_concurrency_limit")]
    pub concurrency_limit: usize,
    #[serde(default = "default_silence_threshold_seconds")]
    pub silence_threshold_seconds: f64,
    pub dispatch_timeout_seconds: Option<u64>,
}

/// 出力設定
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// Default functions
fn default_split_endpoint() -> String {
    "http://localhost:8081/split".to_string()
}

fn default_recognize_endpoint() -> String {
    "http://localhost:8082/recognize".to_string()
}

fn default_persist_endpoint() -> String {
    "http://localhost:8083/api".to_string()
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_language_code() -> String {
    "ja-JP".to_string()
}

fn default_encoding() -> String {
    "FLAC".to_string()
}

fn default_sample_rate() -> u32 {
    16000
}

fn default_channel_count() -> u16 {
    1
}

fn default_speaker_count_min() -> u32 {
    1
}

fn default_speaker_count_max() -> u32 {
    5
}

fn default_chunk_duration_seconds() -> f64 {
    300.0 // 5分ごとに分割 (運用上の観測値)
}

fn default_concurrency_limit() -> usize {
    5
}

fn default_silence_threshold_seconds() -> f64 {
    5.0
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            split: SplitConfig::default(),
            recognize: RecognizeConfig::default(),
            persist: PersistConfig::default(),
            pipeline: PipelineConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            endpoint: default_split_endpoint(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

impl Default for RecognizeConfig {
    fn default() -> Self {
        Self {
            endpoint: default_recognize_endpoint(),
            language_code: default_language_code(),
            encoding: default_encoding(),
            sample_rate: default_sample_rate(),
            channel_count: default_channel_count(),
            diarization_speaker_count_min: default_speaker_count_min(),
            diarization_speaker_count_max: default_speaker_count_max(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

impl Default for PersistConfig {
    fn default() -> Self {
        Self {
            endpoint: default_persist_endpoint(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            chunk_duration_seconds: default_chunk_duration_seconds(),
            concurrency_limit: default_concurrency_limit(),
            silence_threshold_seconds: default_silence_threshold_seconds(),
            dispatch_timeout_seconds: None,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl Config {
    /// 設定ファイルから読み込み
    ///
    /// TOML形式の設定ファイルをパースしてConfig構造体を生成する。
    ///
    /// # Arguments
    ///
    /// * `path` - 設定ファイルのパス
    ///
    /// # Errors
    ///
    /// ファイルの読み込みまたはパースに失敗した場合にエラーを返す。
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("設定ファイルの読み込みに失敗: {:?}", path.as_ref()))?;
        let config: Config =
            toml::from_str(&content).with_context(|| "設定ファイルのパースに失敗")?;
        Ok(config)
    }

    /// デフォルト設定をファイルに書き出し
    ///
    /// デフォルト値を持つ設定ファイルを生成する。
    /// 既存のファイルは上書きされる。
    pub fn write_default<P: AsRef<Path>>(path: P) -> Result<()> {
        let config = Config::default();
        let content =
            toml::to_string_pretty(&config).with_context(|| "設定のシリアライズに失敗")?;
        fs::write(path.as_ref(), content)
            .with_context(|| format!("設定ファイルの書き込みに失敗: {:?}", path.as_ref()))?;
        Ok(())
    }

    /// 設定ファイルがあれば読み込み、なければデフォルトを使用
    ///
    /// # Errors
    ///
    /// ファイルが存在するがパースに失敗した場合にエラーを返す。
    /// ファイルが存在しない場合はエラーにならず、デフォルト設定を返す。
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::from_file(path)
        } else {
            log::warn!(
                "設定ファイルが見つかりません。デフォルト設定を使用します: {:?}",
                path.as_ref()
            );
            Ok(Config::default())
        }
    }
}
