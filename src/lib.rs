//! センサーネットワークによるイベント位置推定と Geo-indistinguishability ノイズの影響を評価する
//! 統計シミュレーション。
//!
//! 処理の流れは「配置生成 → イベント発生 → 成功率集計 → リセット」です。
//! 中核は [`models`]、実験設定は [`scenario`]、試行の管理は [`simulation`] にあります。

pub mod error;
pub mod logging;
pub mod models;
pub mod scenario;
pub mod simulation;

pub use error::{SimError, SimResult};
