use rand::Rng;

use crate::error::SimResult;
use crate::models::common::Point;

/// センサー配置領域のインターフェース
///
/// 原点を中心とする領域内に一様分布する位置を生成します。
pub trait Placement {
    /// 領域パラメータの検証（サンプリング前に呼ばれる）
    fn validate(&self) -> SimResult<()>;

    /// 領域内の位置を1点サンプリング
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> SimResult<Point>;

    /// 領域の面積
    fn area(&self) -> f64;
}
