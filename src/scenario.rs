use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::error::{SimError, ensure_probability, ensure_radius};
use crate::models::{Annulus, Disk, Placement, Point};

/// 実験メタデータ
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ExperimentMeta {
    pub version: String,
    pub name: String,
    pub description: String,
}

impl Default for ExperimentMeta {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            name: "default".to_string(),
            description: "Disk of sensors, single trial, origin-centred event".to_string(),
        }
    }
}

/// 試行設定
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TrialConfig {
    /// 乱数シード（省略時はエントロピーから生成）
    pub seed: Option<u64>,
    /// モンテカルロ試行回数
    pub trials: u32,
    /// 試行を並列実行するか
    pub parallel: bool,
}

impl Default for TrialConfig {
    fn default() -> Self {
        Self {
            seed: None,
            trials: 1,
            parallel: false,
        }
    }
}

/// センサー配置領域
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LayoutConfig {
    Disk { radius: f64 },
    Annulus { outer_radius: f64, inner_radius: f64 },
}

impl LayoutConfig {
    pub fn validate(&self) -> Result<(), SimError> {
        match *self {
            LayoutConfig::Disk { radius } => Disk { radius }.validate(),
            LayoutConfig::Annulus {
                outer_radius,
                inner_radius,
            } => Annulus {
                outer_radius,
                inner_radius,
            }
            .validate(),
        }
    }

    /// 配置領域の面積
    pub fn area(&self) -> f64 {
        match *self {
            LayoutConfig::Disk { radius } => Disk { radius }.area(),
            LayoutConfig::Annulus {
                outer_radius,
                inner_radius,
            } => Annulus {
                outer_radius,
                inner_radius,
            }
            .area(),
        }
    }

    /// 単位面積あたりのセンサー数（面積 0 のときは `None`）
    pub fn density(&self, count: usize) -> Option<f64> {
        let area = self.area();
        (area > 0.0).then(|| count as f64 / area)
    }
}

/// センサーネットワーク設定
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub layout: LayoutConfig,
    pub count: usize,
    pub miss_probability: f64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            layout: LayoutConfig::Disk { radius: 5.0 },
            count: 10_000,
            miss_probability: 0.05,
        }
    }
}

/// イベント設定
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EventConfig {
    pub center: Point,
    pub trigger_radius: f64,
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            center: Point::origin(),
            trigger_radius: 5.0,
        }
    }
}

/// 評価設定
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EvaluationConfig {
    /// 評価半径
    pub radius: f64,
    /// 真のイベント位置（原点基準の評価点）
    pub origin: Point,
    /// Geo-indistinguishability のプライバシーパラメータ（省略時はノイズなし評価のみ）
    pub epsilon: Option<f64>,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            radius: 2.5,
            origin: Point::origin(),
            epsilon: None,
        }
    }
}

/// 完全な実験設定
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ExperimentConfig {
    pub meta: ExperimentMeta,
    pub sim: TrialConfig,
    pub network: NetworkConfig,
    pub event: EventConfig,
    pub evaluation: EvaluationConfig,
}

impl ExperimentConfig {
    /// YAMLファイルから実験設定を読み込み
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.to_path_buf()));
        }

        let contents =
            fs::read_to_string(path).map_err(|e| ScenarioError::Io(path.to_path_buf(), e))?;

        let config: ExperimentConfig = serde_yaml::from_str(&contents)
            .map_err(|e| ScenarioError::Parse(path.to_path_buf(), e))?;

        config.validate()?;

        Ok(config)
    }

    /// 設定の検証
    pub fn validate(&self) -> Result<(), ScenarioError> {
        if self.sim.trials == 0 {
            return Err(ScenarioError::Validation("trials must be positive".to_string()));
        }

        self.network.layout.validate()?;
        ensure_probability("miss_probability", self.network.miss_probability)?;

        self.event.center.ensure_finite("event.center")?;
        ensure_radius("event.trigger_radius", self.event.trigger_radius)?;
        self.evaluation.origin.ensure_finite("evaluation.origin")?;
        ensure_radius("evaluation.radius", self.evaluation.radius)?;

        if let Some(epsilon) = self.evaluation.epsilon {
            if !epsilon.is_finite() || epsilon <= 0.0 {
                return Err(ScenarioError::Validation(format!(
                    "epsilon must be finite and > 0, got {epsilon}"
                )));
            }
        }

        Ok(())
    }

    /// 実験の概要をログ出力
    pub fn log_summary(&self) {
        info!("=== 実験情報 ===");
        info!("名前: {}", self.meta.name);
        info!("説明: {}", self.meta.description);
        info!("バージョン: {}", self.meta.version);

        info!("=== 試行設定 ===");
        match self.sim.seed {
            Some(seed) => info!("シード値: {}", seed),
            None => info!("シード値: (エントロピー)"),
        }
        info!("試行回数: {} ({})", self.sim.trials, if self.sim.parallel { "並列" } else { "逐次" });

        info!("=== センサーネットワーク ===");
        match self.network.layout {
            LayoutConfig::Disk { radius } => info!("配置: 円盤 (半径 {})", radius),
            LayoutConfig::Annulus {
                outer_radius,
                inner_radius,
            } => info!("配置: 円環 (外径 {}, 内径 {})", outer_radius, inner_radius),
        }
        info!("センサー数: {}", self.network.count);
        match self.network.layout.density(self.network.count) {
            Some(density) => info!("センサー密度: {:.3} 基/単位面積", density),
            None => info!("センサー密度: (配置面積 0)"),
        }
        info!("見逃し確率: {}", self.network.miss_probability);

        info!("=== イベント・評価 ===");
        info!(
            "イベント中心: ({}, {}) 感知半径: {}",
            self.event.center.x, self.event.center.y, self.event.trigger_radius
        );
        info!("評価半径: {}", self.evaluation.radius);
        if let Some(epsilon) = self.evaluation.epsilon {
            info!("プライバシーパラメータ ε: {}", epsilon);
        }
    }
}

/// 実験設定読み込みエラー
#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("実験ファイルが見つかりません: {}", .0.display())]
    FileNotFound(PathBuf),
    #[error("ファイル読み込みエラー {}: {}", .0.display(), .1)]
    Io(PathBuf, #[source] std::io::Error),
    #[error("YAML解析エラー {}: {}", .0.display(), .1)]
    Parse(PathBuf, #[source] serde_yaml::Error),
    #[error("設定検証エラー: {0}")]
    Validation(String),
    #[error("設定検証エラー: {0}")]
    Parameter(#[from] SimError),
}
