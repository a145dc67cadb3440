use std::sync::Arc;

use rand::Rng;
use tracing::debug;

use crate::error::{SimResult, ensure_probability, ensure_radius};
use crate::models::{
    common::Point,
    sampling::{Annulus, Disk},
    traits::Placement,
};

/// センサー（配置情報）
///
/// 生成時に位置と見逃し確率が固定され、以後変更されません。
/// 試行ごとの検知状態は [`TrialState`] として [`SensorNetwork`] が別に保持します。
#[derive(Debug, Clone, PartialEq)]
pub struct Sensor {
    /// ネットワーク内のインデックス（生成順）
    pub id: usize,
    /// センサー位置
    pub position: Point,
    /// 曝露されたイベントを報告し損ねる確率（偽陰性率）
    pub miss_probability: f64,
}

impl Sensor {
    pub fn new(id: usize, position: Point, miss_probability: f64) -> Self {
        Self {
            id,
            position,
            miss_probability,
        }
    }

    pub fn distance_to(&self, point: &Point) -> f64 {
        self.position.distance_to(point)
    }

    /// 指定範囲内かどうかの判定
    pub fn is_within(&self, center: &Point, radius: f64) -> bool {
        self.distance_to(center) <= radius
    }
}

/// 1試行分のセンサー状態
///
/// `witnessed` は `triggered` が真のときだけ真になりうる。
/// フィールドを非公開にしてこの関係を型で保証しています。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TrialState {
    triggered: bool,
    witnessed: bool,
}

impl TrialState {
    /// イベントに曝露された状態
    pub fn exposed(witnessed: bool) -> Self {
        Self {
            triggered: true,
            witnessed,
        }
    }

    pub fn triggered(&self) -> bool {
        self.triggered
    }

    pub fn witnessed(&self) -> bool {
        self.witnessed
    }
}

/// 可視化・レポート用のセンサー状態スナップショット
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorSnapshot {
    pub position: Point,
    pub triggered: bool,
    pub witnessed: bool,
}

/// スナップショットの分類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorClass {
    /// 範囲内で曝露され、報告に成功
    Hit,
    /// 範囲内で曝露されたが見逃し
    MissedDetection,
    /// 範囲外、または未曝露
    OutOfRange,
}

impl SensorSnapshot {
    /// `center` から `radius` 以内の曝露センサーを成功／見逃しに、それ以外を範囲外に分類
    pub fn classify(&self, center: &Point, radius: f64) -> SensorClass {
        if self.position.distance_to(center) <= radius && self.triggered {
            if self.witnessed {
                SensorClass::Hit
            } else {
                SensorClass::MissedDetection
            }
        } else {
            SensorClass::OutOfRange
        }
    }
}

/// センサーネットワーク
///
/// 不変の配置（`layout`）と試行ごとの可変状態（`states`）を分離して保持します。
/// 配置は `Arc` で共有されるため、[`SensorNetwork::fork`] で同じ配置に対する
/// 独立した試行状態を持つネットワークを安価に作成できます。
#[derive(Debug, Clone)]
pub struct SensorNetwork {
    layout: Arc<[Sensor]>,
    states: Vec<TrialState>,
}

impl SensorNetwork {
    /// 既存のセンサー列からネットワークを作成（全センサー未曝露）
    pub fn from_sensors(sensors: Vec<Sensor>) -> Self {
        let states = vec![TrialState::default(); sensors.len()];
        Self {
            layout: sensors.into(),
            states,
        }
    }

    /// 配置領域から `count` 個のセンサーを生成
    ///
    /// パラメータの検証はサンプリング開始前に行われます。
    pub fn generate<R, P>(
        rng: &mut R,
        count: usize,
        placement: &P,
        miss_probability: f64,
    ) -> SimResult<Self>
    where
        R: Rng + ?Sized,
        P: Placement,
    {
        placement.validate()?;
        ensure_probability("miss_probability", miss_probability)?;

        let sensors = (0..count)
            .map(|id| -> SimResult<Sensor> {
                Ok(Sensor::new(id, placement.sample(rng)?, miss_probability))
            })
            .collect::<SimResult<Vec<_>>>()?;

        debug!(count, miss_probability, "sensor network generated");
        Ok(Self::from_sensors(sensors))
    }

    /// 原点中心・半径 `radius` の円盤内にセンサーを一様配置
    pub fn generate_in_disk<R: Rng + ?Sized>(
        rng: &mut R,
        count: usize,
        radius: f64,
        miss_probability: f64,
    ) -> SimResult<Self> {
        Self::generate(rng, count, &Disk { radius }, miss_probability)
    }

    /// 原点中心の円環（`inner_radius` < r <= `outer_radius`）内にセンサーを一様配置
    pub fn generate_in_annulus<R: Rng + ?Sized>(
        rng: &mut R,
        count: usize,
        outer_radius: f64,
        inner_radius: f64,
        miss_probability: f64,
    ) -> SimResult<Self> {
        let ring = Annulus {
            outer_radius,
            inner_radius,
        };
        Self::generate(rng, count, &ring, miss_probability)
    }

    /// 同じ配置を共有し、試行状態だけを新規に持つネットワークを作成
    pub fn fork(&self) -> Self {
        Self {
            layout: Arc::clone(&self.layout),
            states: vec![TrialState::default(); self.layout.len()],
        }
    }

    /// イベント発生処理
    ///
    /// `event_center` から `trigger_radius` 以内のセンサーを曝露状態にし、
    /// センサーごとに一様乱数 u ∈ [0, 1) を1回引いて `u > miss_probability` なら報告成功とします。
    /// 範囲外のセンサーは未曝露状態に戻るため、前回試行の結果は影響しません。
    pub fn trigger_event<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        event_center: Point,
        trigger_radius: f64,
    ) -> SimResult<()> {
        event_center.ensure_finite("event_center")?;
        ensure_radius("trigger_radius", trigger_radius)?;

        for (sensor, state) in self.layout.iter().zip(self.states.iter_mut()) {
            *state = if sensor.is_within(&event_center, trigger_radius) {
                let draw: f64 = rng.gen_range(0.0..1.0);
                TrialState::exposed(draw > sensor.miss_probability)
            } else {
                TrialState::default()
            };
        }

        debug!(
            triggered = self.triggered_count(),
            witnessed = self.witnessed_count(),
            "event triggered"
        );
        Ok(())
    }

    /// 全センサーの試行状態をリセット（配置は保持）
    pub fn reset(&mut self) {
        self.states.fill(TrialState::default());
    }

    pub fn len(&self) -> usize {
        self.layout.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layout.is_empty()
    }

    pub fn sensors(&self) -> &[Sensor] {
        &self.layout
    }

    pub fn state(&self, index: usize) -> Option<TrialState> {
        self.states.get(index).copied()
    }

    /// センサーとその試行状態の組を生成順に列挙
    pub fn iter(&self) -> impl Iterator<Item = (&Sensor, TrialState)> + '_ {
        self.layout.iter().zip(self.states.iter().copied())
    }

    pub fn triggered_count(&self) -> usize {
        self.states.iter().filter(|s| s.triggered()).count()
    }

    pub fn witnessed_count(&self) -> usize {
        self.states.iter().filter(|s| s.witnessed()).count()
    }

    /// 可視化・レポート用の読み取り専用スナップショット
    pub fn snapshot(&self) -> Vec<SensorSnapshot> {
        self.iter()
            .map(|(sensor, state)| SensorSnapshot {
                position: sensor.position,
                triggered: state.triggered(),
                witnessed: state.witnessed(),
            })
            .collect()
    }

    /// 2つのネットワークが同じ配置を共有しているか
    pub fn shares_layout_with(&self, other: &SensorNetwork) -> bool {
        Arc::ptr_eq(&self.layout, &other.layout)
    }
}
