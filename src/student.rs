use statrs::distribution::{ContinuousCDF, StudentsT};
use std::cmp::Ordering;

/// Why a two-sample test has no p-value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Degenerate {
    /// A sample holds fewer than two observations.
    TooFewObservations(usize),
    /// Both samples are constant.
    ZeroVariance,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TTest {
    pub statistic: f64,
    pub df: f64,
    pub pvalue: f64,
}

fn mean(x: &[f64]) -> f64 {
    x.iter().sum::<f64>() / x.len() as f64
}

/// Unbiased sample variance.
fn variance(x: &[f64], mean: f64) -> f64 {
    x.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (x.len() - 1) as f64
}

/// Two-sided Student t-test for independent samples with pooled variance.
pub fn ttest_ind(a: &[f64], b: &[f64]) -> Result<TTest, Degenerate> {
    let short = a.len().min(b.len());
    if short < 2 {
        return Err(Degenerate::TooFewObservations(short));
    }

    let (n1, n2) = (a.len() as f64, b.len() as f64);
    let (m1, m2) = (mean(a), mean(b));
    let df = n1 + n2 - 2.0;
    let pooled = ((n1 - 1.0) * variance(a, m1) + (n2 - 1.0) * variance(b, m2)) / df;
    if !(pooled > 0.0) || !pooled.is_finite() {
        return Err(Degenerate::ZeroVariance);
    }

    let statistic = (m1 - m2) / (pooled * (1.0 / n1 + 1.0 / n2)).sqrt();
    let distribution = StudentsT::new(0.0, 1.0, df).map_err(|_| Degenerate::ZeroVariance)?;
    let pvalue = (2.0 * distribution.cdf(-statistic.abs())).min(1.0);

    Ok(TTest {
        statistic,
        df,
        pvalue,
    })
}

/// Holm's step-down adjustment of a family of p-values.
///
/// Returned values are in the order of the input.
pub fn holm(pvalues: &[f64]) -> Vec<f64> {
    let m = pvalues.len();
    let mut order: Vec<usize> = (0..m).collect();
    order.sort_by(|a, b| {
        pvalues[*a]
            .partial_cmp(&pvalues[*b])
            .unwrap_or(Ordering::Equal)
    });

    let mut adjusted = vec![f64::NAN; m];
    let mut running: f64 = 0.0;
    for (rank, i) in order.into_iter().enumerate() {
        running = running.max(((m - rank) as f64 * pvalues[i]).min(1.0));
        adjusted[i] = running;
    }
    adjusted
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_ttest_matches_reference_value() {
        let a = [1.0, 2.0, 3.0, 4.0, 5.0];
        let b = [6.0, 7.0, 8.0, 9.0, 10.0];
        let test = ttest_ind(&a, &b).unwrap();
        assert!((test.statistic + 5.0).abs() < 1e-12);
        assert_eq!(test.df, 8.0);
        assert!((test.pvalue - 0.001_052_825_793_4).abs() < 1e-7);
    }

    #[test]
    fn test_ttest_is_symmetric() {
        let a = [20.1, 19.5, 22.3, 21.0];
        let b = [18.2, 18.9, 19.4];
        let ab = ttest_ind(&a, &b).unwrap();
        let ba = ttest_ind(&b, &a).unwrap();
        assert_eq!(ab.pvalue, ba.pvalue);
        assert_eq!(ab.statistic, -ba.statistic);
    }

    #[test]
    fn test_ttest_degenerate_inputs() {
        assert_eq!(
            ttest_ind(&[1.0], &[2.0, 3.0]),
            Err(Degenerate::TooFewObservations(1))
        );
        assert_eq!(
            ttest_ind(&[1.0, 1.0], &[2.0, 2.0, 2.0]),
            Err(Degenerate::ZeroVariance)
        );
    }

    #[test]
    fn test_holm_adjustment() {
        let adjusted = holm(&[0.01, 0.04, 0.03]);
        let expected = [0.03, 0.06, 0.06];
        for (x, y) in adjusted.iter().zip(expected.iter()) {
            assert!((x - y).abs() < 1e-12);
        }
        assert_eq!(holm(&[0.5, 0.6]), vec![1.0, 1.0]);
        assert!(holm(&[]).is_empty());
    }

    proptest! {
        #[test]
        fn test_holm_never_lowers_pvalues(pvalues in prop::collection::vec(0.0f64..=1.0, 1..12)) {
            let adjusted = holm(&pvalues);
            for (raw, adj) in pvalues.iter().zip(adjusted.iter()) {
                prop_assert!(adj >= raw);
                prop_assert!(*adj <= 1.0);
            }
        }
    }
}
