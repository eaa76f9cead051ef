use crate::shear::params::{QualityMeasure, ShearCoeffs, ShearParams, ShearPattern};

impl QualityMeasure {
    /// Score a coefficient set; lower is better, always non-negative.
    pub fn score(self, main: &ShearCoeffs, bar: Option<&ShearCoeffs>) -> f64 {
        match self {
            QualityMeasure::Cox => {
                let mut result = main
                    .values()
                    .iter()
                    .fold(0.0f64, |acc, v| acc.max(v.abs()));
                if let Some(bar) = bar {
                    result = bar
                        .values()
                        .iter()
                        .fold(result, |acc, v| acc.max(v.abs()));
                }
                result
            }
            QualityMeasure::SumAbs => {
                let mut result: f64 = main.values().iter().map(|v| v.abs()).sum();
                if let Some(bar) = bar {
                    result += bar.values().iter().map(|v| v.abs()).sum::<f64>();
                }
                result
            }
            QualityMeasure::SumSqr => {
                let mut result: f64 = main.values().iter().map(|v| v * v).sum();
                if let Some(bar) = bar {
                    result += bar.values().iter().map(|v| v * v).sum::<f64>();
                }
                result
            }
            QualityMeasure::UnitCell => match bar {
                Some(bar) => {
                    (main.a + main.g + bar.a + bar.g).abs()
                        + (main.b + main.h + bar.b + bar.h).abs()
                        + (main.c + bar.e).abs()
                        + (main.d + bar.f).abs()
                        + (main.e + bar.c).abs()
                        + (main.f + bar.d).abs()
                }
                None => {
                    (main.a + main.g).abs()
                        + (main.b + main.h).abs()
                        + main.c.abs()
                        + main.d.abs()
                        + main.e.abs()
                        + main.f.abs()
                }
            },
        }
    }
}

/// Build a scored `ShearParams` from raw coefficient sets.
pub fn scored(
    pattern: ShearPattern,
    main: ShearCoeffs,
    bar: Option<ShearCoeffs>,
    measure: QualityMeasure,
) -> ShearParams {
    let quality = measure.score(&main, bar.as_ref());
    ShearParams {
        pattern,
        main,
        bar,
        quality,
        measure,
    }
}
