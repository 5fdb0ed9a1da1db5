//! Shared scalar helpers for the pedals.

/// Floor used before taking logarithms of levels.
pub const DB_EPS: f32 = 1e-9;

#[inline]
pub fn db_to_lin(db: f32) -> f32 {
    10.0f32.powf(db / 20.0)
}

#[inline]
pub fn lin_to_db(lin: f32) -> f32 {
    20.0 * lin.max(DB_EPS).log10()
}

/// One-pole smoothing coefficient for a time constant in milliseconds.
/// Zero or negative times give 0.0, i.e. the follower jumps immediately.
#[inline]
pub fn time_constant_coeff(time_ms: f32, sample_rate: f32) -> f32 {
    if time_ms <= 0.0 || sample_rate <= 0.0 {
        return 0.0;
    }
    (-1.0 / (time_ms * 0.001 * sample_rate)).exp()
}

/// Attack/release follower step on a squared envelope.
#[inline]
pub fn update_env_sq(env_sq: f32, input_sq: f32, attack: f32, release: f32) -> f32 {
    let coeff = if input_sq > env_sq { attack } else { release };
    coeff * env_sq + (1.0 - coeff) * input_sq
}

/// Same step on a linear peak envelope.
#[inline]
pub fn update_env(env: f32, input: f32, attack: f32, release: f32) -> f32 {
    let coeff = if input > env { attack } else { release };
    coeff * env + (1.0 - coeff) * input
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_conversions_are_inverse() {
        for db in [-60.0f32, -23.0, -6.0, 0.0, 3.0] {
            assert!((lin_to_db(db_to_lin(db)) - db).abs() < 1e-4);
        }
        assert!((db_to_lin(-6.0206) - 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_zero_time_constant_is_instant() {
        assert_eq!(time_constant_coeff(0.0, 44_100.0), 0.0);
        assert_eq!(update_env(0.0, 0.8, 0.0, 0.0), 0.8);
    }

    #[test]
    fn test_coeff_reaches_63_percent_after_one_time_constant() {
        let sr = 1000.0;
        let c = time_constant_coeff(10.0, sr);
        let mut env = 0.0;
        for _ in 0..10 {
            env = update_env(env, 1.0, c, c);
        }
        assert!((env - 0.632).abs() < 0.01, "env was {env}");
    }
}
