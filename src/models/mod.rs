// 基本的なデータ型（位置・距離）
pub mod common;

// 配置領域の基本インターフェース（trait）定義
pub mod traits;

// 乱数サンプラー（配置・プライバシーノイズ）
pub mod sampling;

// センサーとセンサーネットワーク
pub mod sensor;

// 成功率の集計
pub mod accuracy;

// 便利な re-export
pub use common::{Point, distance};
pub use traits::Placement;
pub use sampling::{
    Annulus, Disk, MAX_ANNULUS_ATTEMPTS, geo_indistinguishable_cdf, sample_geo_indistinguishable_offset,
    sample_uniform_annulus, sample_uniform_disk,
};
pub use sensor::{Sensor, SensorClass, SensorNetwork, SensorSnapshot, TrialState};
pub use accuracy::{
    ReferencePolicy, TrialOutcome, evaluate, find_closest_sensor, success_rate,
    success_rate_closest_centered, success_rate_closest_centered_private,
    success_rate_origin_centered, success_rate_origin_centered_private, tally,
};
