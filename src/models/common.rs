use std::ops::{Add, Sub};

use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};

/// 2次元の位置（経度 x / 緯度 y、同一単位系）
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64, // longitude
    pub y: f64, // latitude
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// 座標を検証して点を生成（NaN・無限大は拒否）
    pub fn try_new(x: f64, y: f64) -> SimResult<Self> {
        let point = Self { x, y };
        point.ensure_finite("point")?;
        Ok(point)
    }

    pub fn origin() -> Self {
        Self { x: 0.0, y: 0.0 }
    }

    /// 極座標 (r, θ) から点を生成
    pub fn from_polar(radius: f64, theta: f64) -> Self {
        Self {
            x: radius * theta.cos(),
            y: radius * theta.sin(),
        }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    pub(crate) fn ensure_finite(&self, name: &'static str) -> SimResult<()> {
        if self.is_finite() {
            Ok(())
        } else {
            Err(SimError::invalid(
                name,
                format!("coordinates must be finite, got ({}, {})", self.x, self.y),
            ))
        }
    }

    /// 2点間のユークリッド距離
    pub fn distance_to(&self, other: &Point) -> f64 {
        (*self - *other).norm()
    }

    /// 原点からの距離
    pub fn norm(&self) -> f64 {
        (self.x.powi(2) + self.y.powi(2)).sqrt()
    }

    /// オフセット（ノイズサンプル等）を加算した点を返す
    pub fn offset_by(&self, offset: Point) -> Point {
        *self + offset
    }
}

/// 2点間のユークリッド距離（`Point::distance_to` の関数版）
pub fn distance(a: Point, b: Point) -> f64 {
    a.distance_to(&b)
}

impl Add for Point {
    type Output = Self;

    fn add(self, other: Self) -> Self::Output {
        Self::new(self.x + other.x, self.y + other.y)
    }
}

impl Sub for Point {
    type Output = Self;

    fn sub(self, other: Self) -> Self::Output {
        Self::new(self.x - other.x, self.y - other.y)
    }
}
