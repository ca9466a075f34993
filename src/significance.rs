use crate::error::Result;
use crate::groups::{Group, Registry};
use crate::prelude::*;
use crate::progress::Progress;
use crate::student::{self, Degenerate};
use ndarray;
use std::collections::BTreeMap;
use std::fmt;
use tracing::warn;

/// Zone subsets compared against each other: the control group is sampled
/// in `control`, every other group in `target`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComparisonScheme {
    pub control: ZoneSet,
    pub target: ZoneSet,
}

impl ComparisonScheme {
    pub fn new(control: ZoneSet, target: ZoneSet) -> Self {
        Self { control, target }
    }

    /// e.g. `"CDE vs CD"`
    pub fn label(&self) -> String {
        format!("{} vs {}", self.control, self.target)
    }

    /// `ABCDE vs ABCD`, `AB vs AB` and `CDE vs CD`.
    pub fn defaults() -> Vec<Self> {
        let set = |zones: &[Zone]| ZoneSet::new(zones);
        vec![
            Self::new(ZoneSet::all(), set(&[Zone::A, Zone::B, Zone::C, Zone::D])),
            Self::new(set(&[Zone::A, Zone::B]), set(&[Zone::A, Zone::B])),
            Self::new(set(&[Zone::C, Zone::D, Zone::E]), set(&[Zone::C, Zone::D])),
        ]
    }
}

/// Symmetric matrix of adjusted p-values between groups. The diagonal is NaN.
#[derive(Debug, Clone)]
pub struct PValueMatrix {
    groups: Vec<String>,
    values: ndarray::Array2<f64>,
}

impl PValueMatrix {
    fn undefined(groups: Vec<String>) -> Self {
        let n = groups.len();
        Self {
            groups,
            values: ndarray::Array2::from_elem((n, n), f64::NAN),
        }
    }

    pub fn groups(&self) -> &[String] {
        &self.groups
    }

    pub fn values(&self) -> ndarray::ArrayView2<'_, f64> {
        self.values.view()
    }

    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.groups.iter().position(|g| g == a)?;
        let j = self.groups.iter().position(|g| g == b)?;
        Some(self.values[[i, j]])
    }

    /// True when every off-diagonal cell is NaN.
    pub fn is_undefined(&self) -> bool {
        self.values.iter().all(|p| p.is_nan())
    }

    pub fn is_significant(&self, a: &str, b: &str, alpha: f64) -> bool {
        self.get(a, b).map_or(false, |p| p < alpha)
    }

    /// Pairs below `alpha`, each listed once.
    pub fn significant_pairs(&self, alpha: f64) -> Vec<(&str, &str, f64)> {
        let n = self.groups.len();
        let mut pairs = vec![];
        for i in 0..n {
            for j in (i + 1)..n {
                let p = self.values[[i, j]];
                if p < alpha {
                    pairs.push((self.groups[i].as_str(), self.groups[j].as_str(), p));
                }
            }
        }
        pairs
    }
}

/// Why a day of a scheme got an undefined matrix.
#[derive(Debug, Clone, PartialEq)]
pub enum Reason {
    TooFewGroups(usize),
    TooFewObservations { group: String, count: usize },
    ZeroVariance { first: String, second: String },
}

/// A day of a comparison scheme for which no test could be run.
#[derive(Debug, Clone, PartialEq)]
pub struct DegenerateTest {
    pub scheme: String,
    pub day: Day,
    pub reason: Reason,
}

impl fmt::Display for DegenerateTest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, day {}: ", self.scheme, self.day)?;
        match &self.reason {
            Reason::TooFewGroups(n) => write!(f, "{} group(s) with data", n),
            Reason::TooFewObservations { group, count } => {
                write!(f, "{} has {} observation(s)", group, count)
            }
            Reason::ZeroVariance { first, second } => {
                write!(f, "{} and {} have no variance", first, second)
            }
        }
    }
}

/// P-value matrices keyed by scheme label then day.
#[derive(Debug, Clone, Default)]
pub struct SignificanceReport {
    pub matrices: BTreeMap<String, BTreeMap<Day, PValueMatrix>>,
    pub degenerate: Vec<DegenerateTest>,
}

impl SignificanceReport {
    pub fn matrix(&self, scheme: &str, day: Day) -> Option<&PValueMatrix> {
        self.matrices.get(scheme)?.get(&day)
    }
}

pub trait Significance {
    /// Runs Holm-adjusted pairwise Student t-tests between the control group
    /// and the other selected groups, per comparison scheme and per day.
    ///
    /// Ticks `progress` once per scheme.
    fn significance(
        &self,
        registry: &Registry,
        control: usize,
        property: &str,
        comparisons: &[ComparisonScheme],
        progress: &mut dyn Progress,
    ) -> Result<SignificanceReport>;
}

impl Significance for Dataset {
    fn significance(
        &self,
        registry: &Registry,
        control: usize,
        property: &str,
        comparisons: &[ComparisonScheme],
        progress: &mut dyn Progress,
    ) -> Result<SignificanceReport> {
        let (control_group, others) = registry.participants(control)?;
        let values = self.property(property)?;
        let mut report = SignificanceReport::default();

        for (k, scheme) in comparisons.iter().enumerate() {
            let label = scheme.label();
            let groups: Vec<(&Group, ZoneSet)> = std::iter::once((control_group, scheme.control))
                .chain(others.iter().map(|g| (*g, scheme.target)))
                .collect();

            let mut by_day = BTreeMap::new();
            for day in self.days() {
                let samples: Vec<(&str, Vec<f64>)> = groups
                    .iter()
                    .map(|(group, zones)| {
                        let sample = self
                            .rows_in(day, group.members(), *zones)
                            .map(|r| values[[r, day]])
                            .filter(|x| !x.is_nan())
                            .collect();
                        (group.name(), sample)
                    })
                    .collect();

                let names = groups.iter().map(|(g, _)| g.name().to_owned()).collect();
                let matrix = match pairwise(&samples) {
                    Ok(adjusted) => adjusted,
                    Err(reason) => {
                        let degenerate = DegenerateTest {
                            scheme: label.clone(),
                            day,
                            reason,
                        };
                        warn!("{}", degenerate);
                        report.degenerate.push(degenerate);
                        by_day.insert(day, PValueMatrix::undefined(names));
                        continue;
                    }
                };
                by_day.insert(day, PValueMatrix { groups: names, values: matrix });
            }

            report.matrices.insert(label, by_day);
            progress.tick(k + 1, comparisons.len());
        }

        Ok(report)
    }
}

/// Holm-adjusted p-values of every pair of samples.
fn pairwise(samples: &[(&str, Vec<f64>)]) -> std::result::Result<ndarray::Array2<f64>, Reason> {
    let with_data = samples.iter().filter(|(_, s)| !s.is_empty()).count();
    if samples.len() < 2 || with_data < 2 {
        return Err(Reason::TooFewGroups(with_data));
    }
    if let Some((group, sample)) = samples.iter().find(|(_, s)| s.len() < 2) {
        return Err(Reason::TooFewObservations {
            group: group.to_string(),
            count: sample.len(),
        });
    }

    let n = samples.len();
    let mut pairs = vec![];
    let mut raw = vec![];
    for i in 0..n {
        for j in (i + 1)..n {
            let test = student::ttest_ind(&samples[i].1, &samples[j].1).map_err(|e| match e {
                Degenerate::TooFewObservations(count) => Reason::TooFewObservations {
                    group: samples[i].0.to_string(),
                    count,
                },
                Degenerate::ZeroVariance => Reason::ZeroVariance {
                    first: samples[i].0.to_string(),
                    second: samples[j].0.to_string(),
                },
            })?;
            pairs.push((i, j));
            raw.push(test.pvalue);
        }
    }

    let mut matrix = ndarray::Array2::from_elem((n, n), f64::NAN);
    for ((i, j), p) in pairs.into_iter().zip(student::holm(&raw)) {
        matrix[[i, j]] = p;
        matrix[[j, i]] = p;
    }
    Ok(matrix)
}
