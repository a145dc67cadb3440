//! # Accuracy モジュール
//!
//! センサー報告の集計によるイベント位置推定精度（成功率）を計算します。
//!
//! 成功率は「基準点から評価半径以内にあり、かつ曝露されたセンサー」のうち
//! 報告に成功したセンサーの割合です。基準点の選び方として次の方針を提供します。
//!
//! - **原点基準**: 真のイベント位置（グラウンドトゥルース）
//! - **最近傍センサー基準**: 原点に最も近いセンサー（真の位置が未知の場合の代理）
//! - 上記それぞれに Geo-indistinguishability ノイズを加えたプライバシー保護版

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult, ensure_radius};
use crate::models::{
    common::Point,
    sampling::sample_geo_indistinguishable_offset,
    sensor::{Sensor, SensorNetwork},
};

/// 1回の集計結果（キャッシュせず毎回計算）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrialOutcome {
    /// 評価範囲内で曝露されたセンサー数
    pub in_range: usize,
    /// そのうち報告に成功したセンサー数
    pub witnessed: usize,
    pub reference: Point,
    pub evaluation_radius: f64,
}

impl TrialOutcome {
    /// 成功率。分母が0の場合は `NoSensorsInRange`
    pub fn rate(&self) -> SimResult<f64> {
        if self.in_range == 0 {
            return Err(SimError::NoSensorsInRange {
                radius: self.evaluation_radius,
                x: self.reference.x,
                y: self.reference.y,
            });
        }
        Ok(self.witnessed as f64 / self.in_range as f64)
    }
}

/// 基準点の選択方針
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferencePolicy {
    /// 真の原点
    Origin,
    /// 原点に最も近いセンサー
    ClosestSensor,
}

/// 評価範囲内の曝露センサー数と報告成功数を集計
pub fn tally(
    network: &SensorNetwork,
    evaluation_radius: f64,
    reference: Point,
) -> SimResult<TrialOutcome> {
    ensure_radius("evaluation_radius", evaluation_radius)?;
    reference.ensure_finite("reference")?;

    let mut in_range = 0;
    let mut witnessed = 0;
    for (sensor, state) in network.iter() {
        if state.triggered() && sensor.is_within(&reference, evaluation_radius) {
            in_range += 1;
            if state.witnessed() {
                witnessed += 1;
            }
        }
    }

    Ok(TrialOutcome {
        in_range,
        witnessed,
        reference,
        evaluation_radius,
    })
}

/// `reference` から `evaluation_radius` 以内の曝露センサーのうち報告に成功した割合
pub fn success_rate(
    network: &SensorNetwork,
    evaluation_radius: f64,
    reference: Point,
) -> SimResult<f64> {
    tally(network, evaluation_radius, reference)?.rate()
}

/// `reference` に最も近いセンサー（同距離なら生成順で先のもの）
pub fn find_closest_sensor(network: &SensorNetwork, reference: Point) -> SimResult<&Sensor> {
    reference.ensure_finite("reference")?;

    let mut closest: Option<(&Sensor, f64)> = None;
    for sensor in network.sensors() {
        let dist = sensor.distance_to(&reference);
        match closest {
            Some((_, best)) if dist >= best => {}
            _ => closest = Some((sensor, dist)),
        }
    }
    closest.map(|(sensor, _)| sensor).ok_or(SimError::EmptyNetwork)
}

pub fn success_rate_origin_centered(
    network: &SensorNetwork,
    evaluation_radius: f64,
    origin: Point,
) -> SimResult<f64> {
    success_rate(network, evaluation_radius, origin)
}

/// 原点に最も近いセンサーの位置を基準にした成功率
pub fn success_rate_closest_centered(
    network: &SensorNetwork,
    evaluation_radius: f64,
    origin: Point,
) -> SimResult<f64> {
    let closest = find_closest_sensor(network, origin)?;
    success_rate(network, evaluation_radius, closest.position)
}

/// 原点基準（Geo-indistinguishability ノイズ付き）
///
/// 呼び出しごとに新しいオフセットを1回サンプリングして基準点に加えます。
pub fn success_rate_origin_centered_private<R: Rng + ?Sized>(
    rng: &mut R,
    network: &SensorNetwork,
    evaluation_radius: f64,
    origin: Point,
    epsilon: f64,
) -> SimResult<f64> {
    ensure_radius("evaluation_radius", evaluation_radius)?;
    let offset = sample_geo_indistinguishable_offset(rng, epsilon)?;
    success_rate(network, evaluation_radius, origin.offset_by(offset))
}

/// 最近傍センサー基準（Geo-indistinguishability ノイズ付き）
pub fn success_rate_closest_centered_private<R: Rng + ?Sized>(
    rng: &mut R,
    network: &SensorNetwork,
    evaluation_radius: f64,
    origin: Point,
    epsilon: f64,
) -> SimResult<f64> {
    ensure_radius("evaluation_radius", evaluation_radius)?;
    let closest = find_closest_sensor(network, origin)?;
    let offset = sample_geo_indistinguishable_offset(rng, epsilon)?;
    success_rate(network, evaluation_radius, closest.position.offset_by(offset))
}

/// 方針とプライバシーパラメータに応じて成功率を計算
///
/// `epsilon` が `None` の場合はノイズなし。
pub fn evaluate<R: Rng + ?Sized>(
    rng: &mut R,
    network: &SensorNetwork,
    policy: ReferencePolicy,
    evaluation_radius: f64,
    origin: Point,
    epsilon: Option<f64>,
) -> SimResult<f64> {
    match (policy, epsilon) {
        (ReferencePolicy::Origin, None) => {
            success_rate_origin_centered(network, evaluation_radius, origin)
        }
        (ReferencePolicy::ClosestSensor, None) => {
            success_rate_closest_centered(network, evaluation_radius, origin)
        }
        (ReferencePolicy::Origin, Some(eps)) => {
            success_rate_origin_centered_private(rng, network, evaluation_radius, origin, eps)
        }
        (ReferencePolicy::ClosestSensor, Some(eps)) => {
            success_rate_closest_centered_private(rng, network, evaluation_radius, origin, eps)
        }
    }
}
