//! 차트 패턴 분석 CLI.
//!
//! # 사용 예시
//!
//! ```bash
//! # 일봉 캔들 파일 분석
//! chartist analyze --input data/btcusdt_1d.json --symbol BTCUSDT --timeframe 1d --pretty
//!
//! # 허용 오차/스윙 깊이 조정과 디버그 추적
//! chartist analyze -i candles.json --tolerance 0.03 --swing-depth 2 --debug
//!
//! # 설정 파일 사용 (CHARTIST__ANALYSIS__TOLERANCE_PCT 등 환경 변수로도 덮어쓰기 가능)
//! chartist analyze -i candles.json --config config/chartist.toml
//!
//! # 지원 패턴 목록
//! chartist patterns --format table
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use chartist_core::logging::{init_logging, LogConfig, LogFormat};
use chartist_core::AppConfig;
use clap::{Parser, Subcommand};
use tracing::{error, info};

mod commands;

use commands::analyze::{analyze_file, render, AnalyzeConfig};
use commands::patterns::{pattern_entries, render_patterns, OutputFormat};

#[derive(Parser)]
#[command(name = "chartist")]
#[command(about = "Chart pattern detection and historical backtest CLI", long_about = None)]
#[command(version)]
struct Cli {
    /// 설정 파일 (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// JSON 캔들 파일을 분석해 보고서를 표준 출력으로 출력
    Analyze {
        /// 입력 파일 (캔들 배열 또는 {symbol, timeframe, candles} 객체)
        #[arg(short, long)]
        input: PathBuf,

        /// 심볼 (예: BTCUSDT)
        #[arg(short, long)]
        symbol: Option<String>,

        /// 타임프레임 (1m, 5m, 15m, 30m, 1h, 4h, 12h, 1d, 1w)
        #[arg(short, long)]
        timeframe: Option<String>,

        /// 가격 레벨 허용 오차 (0 ~ 0.1)
        #[arg(long)]
        tolerance: Option<f64>,

        /// 스윙 확정에 필요한 좌우 캔들 수
        #[arg(long)]
        swing_depth: Option<usize>,

        /// 미확정 마지막 캔들 포함
        #[arg(long, default_value = "false")]
        allow_partial: bool,

        /// 스윙 피봇과 탈락 후보 포함
        #[arg(long, default_value = "false")]
        debug: bool,

        /// 보기 좋은 JSON 출력
        #[arg(long, default_value = "false")]
        pretty: bool,
    },

    /// 지원하는 패턴 목록 보기
    Patterns {
        /// 출력 형식 (table, json)
        #[arg(short, long, default_value = "table")]
        format: String,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let app = AppConfig::load(cli.config.as_deref())
        .map_err(|e| anyhow::anyhow!("[{}] {}", e.code(), e))
        .context("설정 로드 실패")?;

    let mut log_config = LogConfig::from(&app.logging);
    if let Some(format) = std::env::var("LOG_FORMAT").ok().and_then(|f| f.parse::<LogFormat>().ok()) {
        log_config = log_config.with_format(format);
    }
    init_logging(log_config).map_err(|e| anyhow::anyhow!("로깅 초기화 실패: {}", e))?;

    match cli.command {
        Commands::Analyze {
            input,
            symbol,
            timeframe,
            tolerance,
            swing_depth,
            allow_partial,
            debug,
            pretty,
        } => {
            let config = AnalyzeConfig {
                input,
                symbol,
                timeframe,
                tolerance,
                swing_depth,
                allow_partial,
                debug,
                pretty,
            };
            info!("Analyzing {}", config.input.display());

            match analyze_file(&config, app) {
                Ok(report) => println!("{}", render(&report, config.pretty)?),
                Err(e) => {
                    error!("Analysis failed: {:#}", e);
                    return Err(e);
                }
            }
        }

        Commands::Patterns { format } => {
            let format = OutputFormat::parse(&format)?;
            let entries = pattern_entries(&app.thresholds)?;
            print!("{}", render_patterns(&entries, format)?);
            if format == OutputFormat::Json {
                println!();
            }
        }
    }

    Ok(())
}
