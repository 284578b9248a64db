//! mtg-transcribe - 長時間ミーティング音声の文字起こしパイプライン
//!
//! このクレートは、ストレージに保存された録音・アップロード音声を
//! 有界長のチャンクに分割し、外部の音声認識サービスで並行に文字起こしして、
//! 話者属性付き・時系列順のトランスクリプトを再構成するパイプラインを提供します。
//!
//! # 主な機能
//!
//! - **チャンク計画**: 外部分割サービス経由で録音を一定長 (既定 300 秒) のチャンクに分割
//! - **並行ディスパッチ**: 同時認識リクエスト数を上限 (既定 5) 付きでバッチ処理
//! - **ダイアライゼーション**: 単語単位の話者タグを無音境界・話者交代で
//!   セグメントに畳み込み
//! - **マージ**: チャンク結果をインデックス順・絶対時刻順に統合し、重複を排除
//! - **部分失敗の劣化処理**: チャンク単位の失敗はジョブを中断させず欠落として残る
//! - **永続化リトライ**: 書き込み失敗時も成果物を保持し、文字起こしを
//!   やり直さず再試行できる
//!
//! # アーキテクチャ
//!
//! ```text
//! [Audio Object] → [ChunkPlanner] → [ConcurrentDispatcher]
//!                                          ↓ ×concurrency_limit
//!                                   [ChunkTranscriber]
//!                                          ↓
//!                                [DiarizedSegmentBuilder]
//!                                          ↓
//!                                  [TranscriptMerger]
//!                                          ↓
//!                                     [Persistence]
//! ```
//!
//! # 使用例
//!
//! ```no_run
//! use mtg_transcribe::config::Config;
//!
//! // 設定ファイルを読み込み
//! let config = Config::load_or_default("config.toml").unwrap();
//!
//! // またはデフォルト設定を生成
//! Config::write_default("config.toml").unwrap();
//! ```

pub mod chunk_planner;
pub mod chunk_transcriber;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod job_store;
pub mod merger;
pub mod persist_backend;
pub mod persist_client;
pub mod pipeline;
pub mod recognize_backend;
pub mod segment_builder;
pub mod types;
