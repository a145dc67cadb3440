use clap::{Arg, ArgAction, Command, value_parser};
use tracing::{error, info};

use dpsense::logging::{LogConfig, LogOutput, init_logging, level_from_verbosity, parse_log_level};
use dpsense::scenario::ExperimentConfig;
use dpsense::simulation::{ExperimentEngine, ExperimentReport};

fn main() {
    let matches = Command::new("dpsense")
        .version("0.1.0")
        .about("センサーネットワーク位置推定シミュレーション (Geo-indistinguishability)")
        .long_about("円盤・円環内に配置した不確実なセンサー群でイベントを検知し、\n\
                     集計報告による位置推定の成功率をモンテカルロ試行で評価します。")
        .arg(
            Arg::new("scenario")
                .short('s')
                .long("scenario")
                .value_name("FILE")
                .help("実験ファイル(.yaml)のパスを指定")
                .long_help("実行する実験ファイル(.yaml)のパスを指定します。\n\
                           指定しない場合、組み込みのデフォルト実験を実行します。")
        )
        .arg(
            Arg::new("info")
                .short('i')
                .long("info")
                .action(ArgAction::SetTrue)
                .help("実験の情報のみ表示して終了")
        )
        .arg(
            Arg::new("seed")
                .long("seed")
                .value_name("N")
                .value_parser(value_parser!(u64))
                .help("乱数シードを上書き")
        )
        .arg(
            Arg::new("trials")
                .long("trials")
                .value_name("N")
                .value_parser(value_parser!(u32))
                .help("試行回数を上書き")
        )
        .arg(
            Arg::new("parallel")
                .long("parallel")
                .action(ArgAction::SetTrue)
                .help("試行を並列実行")
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::Count)
                .help("詳細出力レベル (-v: DEBUG, -vv: TRACE)")
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .value_name("LEVEL")
                .conflicts_with("verbose")
                .help("ログレベル (trace, debug, info, warn, error)")
        )
        .arg(
            Arg::new("log-output")
                .long("log-output")
                .value_name("TARGET")
                .default_value("console")
                .value_parser(|s: &str| s.parse::<LogOutput>())
                .help("ログ出力先 (console, file, both)")
        )
        .get_matches();

    let level = match matches.get_one::<String>("log-level") {
        Some(level) => parse_log_level(level),
        None => level_from_verbosity(matches.get_count("verbose")),
    };
    let log_config = LogConfig {
        level,
        output: *matches.get_one::<LogOutput>("log-output").unwrap_or(&LogOutput::Console),
        ..LogConfig::default()
    };
    let _guard = match init_logging(&log_config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("ログ初期化エラー: {}", e);
            std::process::exit(1);
        }
    };

    let mut config = match matches.get_one::<String>("scenario") {
        Some(path) => match ExperimentConfig::from_file(path) {
            Ok(config) => {
                info!("実験ファイル読み込み完了: {}", path);
                config
            }
            Err(e) => {
                error!("{}", e);
                std::process::exit(1);
            }
        },
        None => {
            info!("実験ファイル未指定: デフォルト実験を実行します");
            ExperimentConfig::default()
        }
    };

    if let Some(seed) = matches.get_one::<u64>("seed") {
        config.sim.seed = Some(*seed);
    }
    if let Some(trials) = matches.get_one::<u32>("trials") {
        config.sim.trials = *trials;
    }
    if matches.get_flag("parallel") {
        config.sim.parallel = true;
    }

    if let Err(e) = config.validate() {
        error!("{}", e);
        std::process::exit(1);
    }

    config.log_summary();
    if matches.get_flag("info") {
        return;
    }

    if let Err(e) = run_experiment(config) {
        error!("エラー: {}", e);
        std::process::exit(1);
    }
}

/// 実験の実行と結果の出力
fn run_experiment(config: ExperimentConfig) -> Result<(), Box<dyn std::error::Error>> {
    let engine = ExperimentEngine::new(config);
    let report = engine.run()?;
    report_results(&report);
    Ok(())
}

fn report_results(report: &ExperimentReport) {
    info!("シード値: {} (再現には --seed {} を指定)", report.seed, report.seed);
    info!("センサー数: {}", report.sensors);

    for trial in &report.trials {
        info!(
            trial = trial.index,
            triggered = trial.triggered,
            witnessed = trial.witnessed,
            origin = ?trial.origin_rate,
            closest = ?trial.closest_rate,
            origin_private = ?trial.origin_rate_private,
            closest_private = ?trial.closest_rate_private,
            "試行結果"
        );
    }

    let show = |label: &str, rate: Option<f64>| match rate {
        Some(rate) => info!("{}: {:.4}", label, rate),
        None => info!("{}: (評価範囲内のセンサーなし)", label),
    };
    show("平均成功率 (原点基準)", report.mean_origin_rate);
    show("平均成功率 (最近傍センサー基準)", report.mean_closest_rate);
    if report.trials.iter().any(|t| t.origin_rate_private.is_some() || t.closest_rate_private.is_some()) {
        show("平均成功率 (原点基準・ノイズ付き)", report.mean_origin_rate_private);
        show("平均成功率 (最近傍基準・ノイズ付き)", report.mean_closest_rate_private);
    }
}
