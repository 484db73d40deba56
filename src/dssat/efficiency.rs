//! Goodness-of-fit statistics between observed and simulated series.

use crate::dssat::daily::DailyRecord;
use crate::dssat::observed::ObservedData;
use crate::utils::error::{DssatError, Result};

fn check_pairs(observed: &[f64], simulated: &[f64]) -> Result<()> {
    if observed.is_empty() {
        return Err(DssatError::MetricError {
            message: "no observations to compare".to_string(),
        });
    }
    if observed.len() != simulated.len() {
        return Err(DssatError::MetricError {
            message: format!(
                "{} observed values but {} simulated values",
                observed.len(),
                simulated.len()
            ),
        });
    }
    Ok(())
}

fn squared_error(observed: &[f64], simulated: &[f64]) -> f64 {
    observed
        .iter()
        .zip(simulated)
        .map(|(o, s)| (o - s).powi(2))
        .sum()
}

/// Root mean squared error.
pub fn rmse(observed: &[f64], simulated: &[f64]) -> Result<f64> {
    check_pairs(observed, simulated)?;
    Ok((squared_error(observed, simulated) / observed.len() as f64).sqrt())
}

/// Nash-Sutcliffe efficiency: `1 - Σ(o - s)² / Σ(o - ō)²`.
pub fn nse(observed: &[f64], simulated: &[f64]) -> Result<f64> {
    check_pairs(observed, simulated)?;
    let mean = observed.iter().sum::<f64>() / observed.len() as f64;
    let variance: f64 = observed.iter().map(|o| (o - mean).powi(2)).sum();
    if variance == 0.0 {
        return Err(DssatError::MetricError {
            message: "observed values have zero variance".to_string(),
        });
    }
    Ok(1.0 - squared_error(observed, simulated) / variance)
}

/// Coefficient of determination of the simulated values as predictors of the
/// observed ones. Numerically the same quantity as [`nse`].
pub fn r2(observed: &[f64], simulated: &[f64]) -> Result<f64> {
    nse(observed, simulated)
}

/// Pairs observations of `param` with the simulated value on the same
/// treatment and date. Dates present on only one side are dropped.
pub fn pair_series(
    observed: &ObservedData,
    simulated: &[DailyRecord],
    param: &str,
) -> (Vec<f64>, Vec<f64>) {
    let mut obs = Vec::new();
    let mut sim = Vec::new();
    for record in simulated {
        let Some(o) = observed.get(record.trno, record.date, param) else {
            continue;
        };
        let Some(s) = record.get(param) else {
            continue;
        };
        obs.push(o);
        sim.push(s);
    }
    (obs, sim)
}
