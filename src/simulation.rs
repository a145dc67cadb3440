//! # Simulation モジュール
//!
//! センサーネットワーク実験のモンテカルロ試行を管理する実験エンジンを提供します。
//!
//! センサー配置は一度だけ生成し、各試行で次の処理を繰り返します。
//!
//! 1. **イベント発生**: 感知半径内のセンサーを曝露し、見逃し確率に従って報告成否を決定
//! 2. **集計**: 原点基準・最近傍センサー基準の成功率（εが設定されていればノイズ付きも）
//! 3. **リセット**: 試行状態を初期化（配置は再利用）
//!
//! ## 乱数ストリーム
//!
//! `ChaCha8Rng` の同一シードから、配置生成にストリーム0、試行 i にストリーム i+1 を割り当てます。
//! 各試行が独立した乱数列を持つため、逐次実行と並列実行の結果はビット単位で一致します。
//!
//! ## 使用例
//!
//! ```rust,no_run
//! use dpsense::scenario::ExperimentConfig;
//! use dpsense::simulation::ExperimentEngine;
//!
//! let config = ExperimentConfig::from_file("experiments/disk.yaml")?;
//! let report = ExperimentEngine::new(config).run()?;
//! println!("{:?}", report.mean_origin_rate);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use tracing::{debug, info, trace, warn};

use crate::error::{SimError, SimResult};
use crate::models::{ReferencePolicy, SensorNetwork, accuracy::evaluate};
use crate::scenario::{ExperimentConfig, LayoutConfig};

/// 配置生成に使う乱数ストリーム番号
const LAYOUT_STREAM: u64 = 0;

/// 1試行分の結果
///
/// 各成功率は評価範囲内に曝露センサーがいなかった場合 `None`。
#[derive(Debug, Clone, PartialEq)]
pub struct TrialReport {
    pub index: u32,
    pub triggered: usize,
    pub witnessed: usize,
    pub origin_rate: Option<f64>,
    pub closest_rate: Option<f64>,
    pub origin_rate_private: Option<f64>,
    pub closest_rate_private: Option<f64>,
}

/// 実験全体の結果
#[derive(Debug, Clone, PartialEq)]
pub struct ExperimentReport {
    pub seed: u64,
    pub sensors: usize,
    pub trials: Vec<TrialReport>,
    pub mean_origin_rate: Option<f64>,
    pub mean_closest_rate: Option<f64>,
    pub mean_origin_rate_private: Option<f64>,
    pub mean_closest_rate_private: Option<f64>,
}

impl ExperimentReport {
    fn from_trials(seed: u64, sensors: usize, trials: Vec<TrialReport>) -> Self {
        Self {
            seed,
            sensors,
            mean_origin_rate: mean_of(&trials, |t| t.origin_rate),
            mean_closest_rate: mean_of(&trials, |t| t.closest_rate),
            mean_origin_rate_private: mean_of(&trials, |t| t.origin_rate_private),
            mean_closest_rate_private: mean_of(&trials, |t| t.closest_rate_private),
            trials,
        }
    }
}

/// 定義された試行のみの平均
fn mean_of<F>(trials: &[TrialReport], rate: F) -> Option<f64>
where
    F: Fn(&TrialReport) -> Option<f64>,
{
    let (sum, count) = trials
        .iter()
        .filter_map(rate)
        .fold((0.0, 0usize), |(sum, count), r| (sum + r, count + 1));
    (count > 0).then(|| sum / count as f64)
}

/// `NoSensorsInRange` だけは試行結果の欠損として扱い、その他のエラーは伝播
fn defined(result: SimResult<f64>) -> SimResult<Option<f64>> {
    match result {
        Ok(rate) => Ok(Some(rate)),
        Err(SimError::NoSensorsInRange { .. }) => Ok(None),
        Err(e) => Err(e),
    }
}

pub struct ExperimentEngine {
    pub config: ExperimentConfig,
    pub seed: u64,
}

impl ExperimentEngine {
    pub fn new(config: ExperimentConfig) -> Self {
        let seed = config.sim.seed.unwrap_or_else(rand::random::<u64>);
        Self { config, seed }
    }

    fn stream(&self, stream: u64) -> ChaCha8Rng {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        rng.set_stream(stream);
        rng
    }

    /// 設定に従ってセンサー配置を生成
    pub fn generate_network(&self) -> SimResult<SensorNetwork> {
        let mut rng = self.stream(LAYOUT_STREAM);
        let network = &self.config.network;
        match network.layout {
            LayoutConfig::Disk { radius } => SensorNetwork::generate_in_disk(
                &mut rng,
                network.count,
                radius,
                network.miss_probability,
            ),
            LayoutConfig::Annulus {
                outer_radius,
                inner_radius,
            } => SensorNetwork::generate_in_annulus(
                &mut rng,
                network.count,
                outer_radius,
                inner_radius,
                network.miss_probability,
            ),
        }
    }

    /// 全試行を実行
    pub fn run(&self) -> SimResult<ExperimentReport> {
        info!(seed = self.seed, "=== 実験開始 ===");

        let mut network = self.generate_network()?;
        info!("センサー配置生成完了: {}基", network.len());

        let trials = if self.config.sim.parallel {
            self.run_parallel(&network)?
        } else {
            self.run_sequential(&mut network)?
        };

        let report = ExperimentReport::from_trials(self.seed, network.len(), trials);
        info!("=== 実験完了 ===");
        Ok(report)
    }

    fn run_sequential(&self, network: &mut SensorNetwork) -> SimResult<Vec<TrialReport>> {
        let mut reports = Vec::with_capacity(self.config.sim.trials as usize);
        for index in 0..self.config.sim.trials {
            let report = self.run_trial(network, index)?;
            network.reset();
            reports.push(report);

            if index % 100 == 0 && index > 0 {
                let progress = f64::from(index) / f64::from(self.config.sim.trials) * 100.0;
                info!("進行状況: {:.1}% ({}/{})", progress, index, self.config.sim.trials);
            }
        }
        Ok(reports)
    }

    fn run_parallel(&self, network: &SensorNetwork) -> SimResult<Vec<TrialReport>> {
        debug!(threads = rayon::current_num_threads(), "parallel trials");
        (0..self.config.sim.trials)
            .into_par_iter()
            .map(|index| {
                let mut worker = network.fork();
                debug_assert!(worker.shares_layout_with(network));
                self.run_trial(&mut worker, index)
            })
            .collect()
    }

    /// 1試行: イベント発生と成功率の集計
    fn run_trial(&self, network: &mut SensorNetwork, index: u32) -> SimResult<TrialReport> {
        let mut rng = self.stream(u64::from(index) + 1);
        let event = &self.config.event;
        let evaluation = &self.config.evaluation;

        network.trigger_event(&mut rng, event.center, event.trigger_radius)?;

        let rate = |rng: &mut ChaCha8Rng, policy: ReferencePolicy, epsilon: Option<f64>| {
            defined(evaluate(
                rng,
                network,
                policy,
                evaluation.radius,
                evaluation.origin,
                epsilon,
            ))
        };

        let origin_rate = rate(&mut rng, ReferencePolicy::Origin, None)?;
        let closest_rate = rate(&mut rng, ReferencePolicy::ClosestSensor, None)?;
        let (origin_rate_private, closest_rate_private) = match evaluation.epsilon {
            Some(epsilon) => (
                rate(&mut rng, ReferencePolicy::Origin, Some(epsilon))?,
                rate(&mut rng, ReferencePolicy::ClosestSensor, Some(epsilon))?,
            ),
            None => (None, None),
        };

        if origin_rate.is_none() {
            warn!(
                trial = index,
                x = evaluation.origin.x,
                y = evaluation.origin.y,
                "評価範囲内に曝露センサーがありません"
            );
        }

        let report = TrialReport {
            index,
            triggered: network.triggered_count(),
            witnessed: network.witnessed_count(),
            origin_rate,
            closest_rate,
            origin_rate_private,
            closest_rate_private,
        };
        trace!(?report, "trial finished");
        Ok(report)
    }
}
