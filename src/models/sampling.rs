//! # Sampling モジュール
//!
//! センサー配置とロケーションプライバシーのための乱数サンプラーを提供します。
//!
//! - **円盤内一様分布**: 逆CDF法 `r = R·√u` による面積一様サンプリング
//! - **円環内一様分布**: 円盤サンプリング＋棄却法
//! - **Geo-indistinguishability ノイズ**: 角度一様、半径 Gamma(2, 1/ε) の極座標ラプラスノイズ
//!   （ε = 1 に正規化した逆CDFを解いて ε で割る）
//!
//! 乱数源はすべて呼び出し側から注入され、同一シードで同一結果を再現します。

use std::f64::consts::TAU;

use rand::Rng;
use rand::distributions::Open01;
use statrs::distribution::{ContinuousCDF, Gamma};

use crate::error::{SimError, SimResult, ensure_radius};
use crate::models::{common::Point, traits::Placement};

/// 円環サンプリングの棄却ループ上限
pub const MAX_ANNULUS_ATTEMPTS: u32 = 10_000;

/// 正規化半径の逆CDF反復の上限
const MAX_QUANTILE_ITERATIONS: usize = 100;

/// 正規化半径の逆CDF反復の収束判定（相対ステップ幅）
const QUANTILE_TOLERANCE: f64 = 1e-14;

/// 原点中心・半径 `radius` の円盤内に一様分布する点をサンプリング
///
/// 半径を `radius * sqrt(u)` で変換しないと中心付近に偏るため、
/// 平方根変換は必須です。
pub fn sample_uniform_disk<R: Rng + ?Sized>(rng: &mut R, radius: f64) -> SimResult<Point> {
    ensure_radius("radius", radius)?;
    let theta = rng.gen_range(0.0..TAU);
    let u: f64 = rng.gen_range(0.0..1.0);
    Ok(Point::from_polar(radius * u.sqrt(), theta))
}

/// 半径 `inner_radius` より外側、`outer_radius` 以内の円環に一様分布する点をサンプリング
///
/// 受理確率は `1 - (inner/outer)^2` で正なので、有効な入力に対して
/// `SamplingExhausted` が返ることは事実上ありません。
pub fn sample_uniform_annulus<R: Rng + ?Sized>(
    rng: &mut R,
    outer_radius: f64,
    inner_radius: f64,
) -> SimResult<Point> {
    ensure_annulus(outer_radius, inner_radius)?;

    for _ in 0..MAX_ANNULUS_ATTEMPTS {
        let u: f64 = rng.gen_range(0.0..1.0);
        let radius = outer_radius * u.sqrt();
        if radius > inner_radius {
            let theta = rng.gen_range(0.0..TAU);
            return Ok(Point::from_polar(radius, theta));
        }
    }

    Err(SimError::SamplingExhausted {
        attempts: MAX_ANNULUS_ATTEMPTS,
    })
}

/// Geo-indistinguishability を満たす極座標ノイズ（加算オフセット）をサンプリング
///
/// 角度は [0, 2π) の一様分布、半径は CDF `C(r) = 1 - (1 + εr)e^{-εr}`
/// （形状 2、尺度 1/ε のガンマ分布）の逆関数に開区間 (0, 1) の一様乱数を与えて求めます。
pub fn sample_geo_indistinguishable_offset<R: Rng + ?Sized>(
    rng: &mut R,
    epsilon: f64,
) -> SimResult<Point> {
    ensure_epsilon(epsilon)?;
    let theta = rng.gen_range(0.0..TAU);
    let z: f64 = rng.sample(Open01);
    let radius = inverse_radius_cdf(z, epsilon)?;
    Ok(Point::from_polar(radius, theta))
}

/// Geo-indistinguishability ノイズ半径の CDF（閉形式）
pub fn geo_indistinguishable_cdf(radius: f64, epsilon: f64) -> f64 {
    if radius <= 0.0 {
        return 0.0;
    }
    unit_radius_cdf(epsilon * radius)
}

fn ensure_epsilon(epsilon: f64) -> SimResult<()> {
    if !epsilon.is_finite() || epsilon <= 0.0 {
        return Err(SimError::invalid(
            "epsilon",
            format!("must be finite and > 0, got {epsilon}"),
        ));
    }
    Ok(())
}

/// `1 - (1 + s)e^{-s}`。s が小さいときの桁落ちを避けるため `exp_m1` で評価
fn unit_radius_cdf(s: f64) -> f64 {
    if s.is_infinite() {
        return 1.0;
    }
    -(-s).exp_m1() - s * (-s).exp()
}

/// 半径は ε に対して尺度不変なので、ε = 1 の解 s から `r = s / ε` を得る
fn inverse_radius_cdf(z: f64, epsilon: f64) -> SimResult<f64> {
    ensure_epsilon(epsilon)?;
    Ok(unit_radius_quantile(z)? / epsilon)
}

/// Gamma(2, 1) の逆CDF
///
/// `ln(1 + s) - s = ln(1 - z)` を、二分法で囲い込んだニュートン法で解きます。
/// 右辺を対数で扱うので z が 1 に近くても桁落ちしません。
/// statrs の `inverse_cdf`（固定回数の二分探索）は初期値にだけ使います。
fn unit_radius_quantile(z: f64) -> SimResult<f64> {
    if z.is_nan() || z <= 0.0 || z >= 1.0 {
        return Err(SimError::invalid("z", format!("must lie in (0, 1), got {z}")));
    }
    let log_survival = (-z).ln_1p();
    // s > 0 で単調減少、excess(0) = -ln(1 - z) > 0
    let excess = |s: f64| s.ln_1p() - s - log_survival;

    let mut lo = 0.0;
    let mut hi = 1.0;
    while excess(hi) > 0.0 {
        lo = hi;
        hi *= 2.0;
    }

    let law = Gamma::new(2.0, 1.0).map_err(|e| SimError::invalid("epsilon", e.to_string()))?;
    let mut s = law.inverse_cdf(z);
    if s.is_nan() || s <= lo || s >= hi {
        s = 0.5 * (lo + hi);
    }

    for _ in 0..MAX_QUANTILE_ITERATIONS {
        let value = excess(s);
        if value > 0.0 {
            lo = s;
        } else if value < 0.0 {
            hi = s;
        } else {
            return Ok(s);
        }

        let slope = -s / (1.0 + s);
        let mut next = s - value / slope;
        if next.is_nan() || next <= lo || next >= hi {
            next = 0.5 * (lo + hi);
        }
        if (next - s).abs() <= QUANTILE_TOLERANCE * next {
            return Ok(next);
        }
        s = next;
    }
    Ok(s)
}

fn ensure_annulus(outer_radius: f64, inner_radius: f64) -> SimResult<()> {
    ensure_radius("outer_radius", outer_radius)?;
    ensure_radius("inner_radius", inner_radius)?;
    if inner_radius >= outer_radius {
        return Err(SimError::invalid(
            "inner_radius",
            format!("must be < outer_radius ({outer_radius}), got {inner_radius}"),
        ));
    }
    Ok(())
}

/// 原点中心の円盤領域
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Disk {
    pub radius: f64,
}

impl Placement for Disk {
    fn validate(&self) -> SimResult<()> {
        ensure_radius("radius", self.radius)
    }

    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> SimResult<Point> {
        sample_uniform_disk(rng, self.radius)
    }

    fn area(&self) -> f64 {
        std::f64::consts::PI * self.radius.powi(2)
    }
}

/// 原点中心の円環領域
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Annulus {
    pub outer_radius: f64,
    pub inner_radius: f64,
}

impl Placement for Annulus {
    fn validate(&self) -> SimResult<()> {
        ensure_annulus(self.outer_radius, self.inner_radius)
    }

    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> SimResult<Point> {
        sample_uniform_annulus(rng, self.outer_radius, self.inner_radius)
    }

    fn area(&self) -> f64 {
        std::f64::consts::PI * (self.outer_radius.powi(2) - self.inner_radius.powi(2))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    const TOLERANCE: f64 = 1e-9;

    #[test]
    fn test_disk_containment() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for radius in [0.5, 1.0, 5.0, 250.0] {
            for _ in 0..2_000 {
                let p = sample_uniform_disk(&mut rng, radius).unwrap();
                assert!(p.norm() <= radius + TOLERANCE);
            }
        }
    }

    #[test]
    fn test_disk_equal_area_uniformity() {
        // 等面積の同心円環10個に振り分けてカイ二乗適合度を確認
        const BINS: usize = 10;
        const SAMPLES: usize = 20_000;
        let radius = 5.0;
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let mut counts = [0usize; BINS];
        for _ in 0..SAMPLES {
            let p = sample_uniform_disk(&mut rng, radius).unwrap();
            let fraction = (p.norm() / radius).powi(2);
            let bin = ((fraction * BINS as f64) as usize).min(BINS - 1);
            counts[bin] += 1;
        }
        let expected = SAMPLES as f64 / BINS as f64;
        let chi_square: f64 = counts
            .iter()
            .map(|&c| (c as f64 - expected).powi(2) / expected)
            .sum();
        // 自由度9、有意水準0.001の臨界値
        assert!(chi_square < 27.88, "chi-square {chi_square} counts {counts:?}");
    }

    #[test]
    fn test_disk_zero_radius_and_invalid() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert_eq!(sample_uniform_disk(&mut rng, 0.0).unwrap().norm(), 0.0);
        assert!(matches!(
            sample_uniform_disk(&mut rng, -1.0),
            Err(SimError::InvalidParameter { name: "radius", .. })
        ));
    }

    #[test]
    fn test_annulus_exclusion() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        for (outer, inner) in [(5.0, 0.0), (5.0, 2.5), (10.0, 9.0), (1.0, 0.999)] {
            for _ in 0..2_000 {
                let r = sample_uniform_annulus(&mut rng, outer, inner).unwrap().norm();
                assert!(r > inner - TOLERANCE && r <= outer + TOLERANCE, "r={r} outer={outer} inner={inner}");
            }
        }
    }

    #[test]
    fn test_annulus_rejects_bad_bounds() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        assert!(sample_uniform_annulus(&mut rng, 2.0, 2.0).is_err());
        assert!(sample_uniform_annulus(&mut rng, 2.0, 3.0).is_err());
        assert!(sample_uniform_annulus(&mut rng, 2.0, -1.0).is_err());
    }

    #[test]
    fn test_geo_offset_mean_radius() {
        // Gamma(2, 1/ε) の平均は 2/ε
        let mut rng = ChaCha8Rng::seed_from_u64(2024);
        for epsilon in [1.0, 0.5] {
            let draws = 10_000;
            let mean: f64 = (0..draws)
                .map(|_| sample_geo_indistinguishable_offset(&mut rng, epsilon).unwrap().norm())
                .sum::<f64>()
                / draws as f64;
            let expected = 2.0 / epsilon;
            assert!((mean - expected).abs() < 0.05 * expected, "epsilon={epsilon} mean={mean}");
        }
    }

    #[test]
    fn test_geo_offset_inverts_cdf() {
        for z in [0.01, 0.25, 0.5, 0.9, 0.999] {
            let r = inverse_radius_cdf(z, 1.5).unwrap();
            assert_relative_eq!(geo_indistinguishable_cdf(r, 1.5), z, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_inverse_radius_relative_accuracy() {
        // 極端な ε と裾の z でも相対精度を保つ
        for epsilon in [1e-6, 1.0, 1e4, 1e6] {
            for z in [1e-9, 0.5] {
                let r = inverse_radius_cdf(z, epsilon).unwrap();
                assert!(r > 0.0);
                assert_relative_eq!(
                    geo_indistinguishable_cdf(r, epsilon),
                    z,
                    max_relative = 1e-8
                );
            }

            // z ≈ 1 は生存関数 (1 + εr)e^{-εr} = 1 - z で比較
            let z = 1.0 - 1e-9;
            let s = epsilon * inverse_radius_cdf(z, epsilon).unwrap();
            assert_relative_eq!((1.0 + s) * (-s).exp(), 1.0 - z, max_relative = 1e-8);
        }
    }

    #[test]
    fn test_small_radius_cdf_keeps_precision() {
        // C(s) ≈ s²/2 - s³/3
        let s = 1e-5;
        assert_relative_eq!(unit_radius_cdf(s), s * s / 2.0 - s.powi(3) / 3.0, max_relative = 1e-8);
        assert_eq!(unit_radius_cdf(f64::INFINITY), 1.0);
    }

    #[test]
    fn test_geo_offset_mean_radius_large_epsilon() {
        let mut rng = ChaCha8Rng::seed_from_u64(99);
        let epsilon = 1e6;
        let draws = 10_000;
        let mean: f64 = (0..draws)
            .map(|_| sample_geo_indistinguishable_offset(&mut rng, epsilon).unwrap().norm())
            .sum::<f64>()
            / draws as f64;
        let expected = 2.0 / epsilon;
        assert!((mean - expected).abs() < 0.05 * expected, "mean={mean}");
    }

    #[test]
    fn test_quantile_rejects_closed_endpoints() {
        assert!(unit_radius_quantile(0.0).is_err());
        assert!(unit_radius_quantile(1.0).is_err());
        assert!(unit_radius_quantile(f64::NAN).is_err());
    }

    #[test]
    fn test_geo_offset_rejects_non_positive_epsilon() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        for epsilon in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                sample_geo_indistinguishable_offset(&mut rng, epsilon),
                Err(SimError::InvalidParameter { name: "epsilon", .. })
            ));
        }
    }

    #[test]
    fn test_cdf_shape() {
        assert_eq!(geo_indistinguishable_cdf(0.0, 1.0), 0.0);
        assert_eq!(geo_indistinguishable_cdf(-2.0, 1.0), 0.0);
        assert_relative_eq!(
            geo_indistinguishable_cdf(1.0, 1.0),
            1.0 - 2.0 * (-1.0f64).exp(),
            epsilon = 1e-15
        );
        assert!(geo_indistinguishable_cdf(50.0, 1.0) > 0.999_999);
    }

    #[test]
    fn test_placement_area() {
        assert_relative_eq!(Disk { radius: 2.0 }.area(), 4.0 * std::f64::consts::PI);
        let ring = Annulus { outer_radius: 2.0, inner_radius: 1.0 };
        assert_relative_eq!(ring.area(), 3.0 * std::f64::consts::PI);
        assert!(Annulus { outer_radius: 1.0, inner_radius: 1.0 }.validate().is_err());
    }
}
