use thiserror::Error;

pub type SimResult<T> = Result<T, SimError>;

/// サンプリング・イベントシミュレーション・精度集計で発生するエラー
///
/// 各操作はセンサー状態を変更する前に引数を検証するため、
/// エラー時にネットワークが中途半端な状態になることはありません。
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },
    #[error("sensor network is empty")]
    EmptyNetwork,
    #[error("no triggered sensor within {radius} of ({x}, {y})")]
    NoSensorsInRange { radius: f64, x: f64, y: f64 },
    #[error("rejection sampling gave up after {attempts} attempts")]
    SamplingExhausted { attempts: u32 },
}

impl SimError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        SimError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

/// 半径系の値が有限かつ非負であることを検証
pub(crate) fn ensure_radius(name: &'static str, value: f64) -> SimResult<()> {
    if !value.is_finite() {
        return Err(SimError::invalid(name, format!("must be finite, got {value}")));
    }
    if value < 0.0 {
        return Err(SimError::invalid(name, format!("must be >= 0, got {value}")));
    }
    Ok(())
}

/// 確率値が [0, 1] に収まることを検証
pub(crate) fn ensure_probability(name: &'static str, value: f64) -> SimResult<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(SimError::invalid(name, format!("must be within [0, 1], got {value}")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_radius() {
        assert!(ensure_radius("radius", 0.0).is_ok());
        assert!(ensure_radius("radius", 3.5).is_ok());
        assert!(ensure_radius("radius", -0.1).is_err());
        assert!(ensure_radius("radius", f64::INFINITY).is_err());
        assert!(ensure_radius("radius", f64::NAN).is_err());
    }

    #[test]
    fn test_ensure_probability() {
        assert!(ensure_probability("p", 0.0).is_ok());
        assert!(ensure_probability("p", 1.0).is_ok());
        assert!(ensure_probability("p", 1.01).is_err());
        assert!(ensure_probability("p", f64::NAN).is_err());
    }

    #[test]
    fn test_error_message_names_parameter() {
        let err = SimError::invalid("epsilon", "must be > 0");
        assert_eq!(err.to_string(), "invalid parameter `epsilon`: must be > 0");
    }
}
