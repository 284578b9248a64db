use anyhow::{Context, Result};
use env_logger::Env;
use mtg_transcribe::config::Config;
use mtg_transcribe::pipeline::TranscriptionPipeline;
use mtg_transcribe::types::{AudioObjectRef, RecordingMethod};

fn print_usage() {
    eprintln!("使い方: mtg-transcribe <audio_locator> <meeting_id> [オプション]");
    eprintln!("        mtg-transcribe --generate-config [パス]");
    eprintln!();
    eprintln!("オプション:");
    eprintln!("  --upload            ファイルアップロード録音として扱う (既定: 連続録音)");
    eprintln!("  --duration <秒>     計測済みの音声長 (ファイルアップロード時)");
    eprintln!("  --config <パス>     設定ファイル (既定: config.toml)");
}

#[tokio::main]
async fn main() -> Result<()> {
    // コマンドライン引数をパース
    let args: Vec<String> = std::env::args().collect();

    // 設定ファイル生成モード
    if args.len() > 1 && args[1] == "--generate-config" {
        let config_path = if args.len() > 2 {
            &args[2]
        } else {
            "config.toml"
        };
        Config::write_default(config_path)?;
        println!("設定ファイルを生成しました: {}", config_path);
        return Ok(());
    }

    let mut audio_locator: Option<String> = None;
    let mut meeting_id: Option<String> = None;
    let mut upload = false;
    let mut duration_hint: f64 = 0.0;
    let mut config_path = "config.toml".to_string();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--upload" => upload = true,
            "--duration" => {
                i += 1;
                duration_hint = args
                    .get(i)
                    .context("--duration には秒数が必要です")?
                    .parse()
                    .context("--duration のパースに失敗")?;
            }
            "--config" => {
                i += 1;
                config_path = args
                    .get(i)
                    .context("--config にはパスが必要です")?
                    .clone();
            }
            other if !other.starts_with("--") => {
                if audio_locator.is_none() {
                    audio_locator = Some(other.to_string());
                } else if meeting_id.is_none() {
                    meeting_id = Some(other.to_string());
                } else {
                    anyhow::bail!("余分な引数です: {}", other);
                }
            }
            other => anyhow::bail!("不明なオプション: {}", other),
        }
        i += 1;
    }

    let (audio_locator, meeting_id) = match (audio_locator, meeting_id) {
        (Some(locator), Some(id)) => (locator, id),
        _ => {
            print_usage();
            std::process::exit(2);
        }
    };

    // 設定を読み込み。ロガー初期化前なので欠落は標準エラーに直接知らせる
    if !std::path::Path::new(&config_path).exists() {
        eprintln!(
            "設定ファイル {} が見つかりません。デフォルト設定で続行します",
            config_path
        );
    }
    let config = Config::load_or_default(&config_path)?;

    // ロガーを初期化
    env_logger::Builder::from_env(
        Env::default().default_filter_or(config.output.log_level.clone()),
    )
    .format_timestamp(None)
    .init();

    log::info!("mtg-transcribe を起動します");
    log::info!("設定: {:?}", config);

    let recording_method = if upload {
        RecordingMethod::FileUpload
    } else {
        RecordingMethod::Continuous
    };

    let audio = AudioObjectRef {
        locator: audio_locator,
        content_type: "audio/wav".to_string(),
        byte_size: 0, // CLI からはサイズ不明
    };

    let pipeline = TranscriptionPipeline::new(config.clone())?;

    let merged = pipeline
        .run_job(
            &audio,
            &meeting_id,
            recording_method,
            duration_hint,
            config.pipeline.concurrency_limit,
        )
        .await?;

    // 成果物をJSON形式で出力
    println!("{}", serde_json::to_string_pretty(&merged)?);

    log::info!("mtg-transcribe を終了しました");

    Ok(())
}
