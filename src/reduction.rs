use crate::error::Result;
use crate::groups::{Group, Registry};
use crate::prelude::*;
use ndarray;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Zone schemes used to reduce the control group and the other groups.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneSchemes {
    pub control: ZoneScheme,
    pub target: ZoneScheme,
    /// Rows of other selected groups in this zone are pooled into every
    /// control subset that contains it.
    pub fold: Option<Zone>,
}

impl Default for ZoneSchemes {
    fn default() -> Self {
        let set = |zones: &[Zone]| ZoneSet::new(zones);
        Self {
            control: vec![
                ZoneSet::all(),
                set(&[Zone::A, Zone::B]),
                set(&[Zone::C, Zone::D, Zone::E]),
            ],
            target: vec![
                set(&[Zone::A, Zone::B, Zone::C, Zone::D]),
                set(&[Zone::A, Zone::B]),
                set(&[Zone::C, Zone::D]),
            ],
            fold: Some(Zone::E),
        }
    }
}

/// Per-day averages of one group, one column per zone subset.
#[derive(Debug, Clone)]
pub struct ReducedSeries {
    columns: Vec<String>,
    values: ndarray::Array2<f64>,
}

impl ReducedSeries {
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// days x columns
    pub fn values(&self) -> ndarray::ArrayView2<'_, f64> {
        self.values.view()
    }

    pub fn n_days(&self) -> usize {
        self.values.shape()[0]
    }

    pub fn column(&self, name: &str) -> Option<ndarray::ArrayView1<'_, f64>> {
        let c = self.columns.iter().position(|column| column == name)?;
        Some(self.values.column(c))
    }

    pub fn get(&self, day: Day, name: &str) -> Option<f64> {
        self.column(name).and_then(|column| column.get(day).copied())
    }
}

/// Reduced series keyed by group name.
pub type Reductions = BTreeMap<String, ReducedSeries>;

pub trait ZoneReduction {
    /// Averages `property` per day for the control group and every other
    /// selected group, one column per subset of their zone scheme.
    fn reduce(
        &self,
        registry: &Registry,
        control: usize,
        property: &str,
        schemes: &ZoneSchemes,
    ) -> Result<Reductions>;
}

impl ZoneReduction for Dataset {
    fn reduce(
        &self,
        registry: &Registry,
        control: usize,
        property: &str,
        schemes: &ZoneSchemes,
    ) -> Result<Reductions> {
        let (control_group, others) = registry.participants(control)?;
        let values = self.property(property)?;
        let mut reductions = Reductions::new();

        let baseline = self.series(control_group, &values, &schemes.control, |day, zones| {
            let mut rows: BTreeSet<usize> =
                self.rows_in(day, control_group.members(), zones).collect();
            if let Some(fold) = schemes.fold.filter(|zone| zones.contains(*zone)) {
                for group in &others {
                    rows.extend(self.rows_in(day, group.members(), ZoneSet::only(fold)));
                }
            }
            rows
        });
        reductions.insert(control_group.name().to_owned(), baseline);

        for group in &others {
            let series = self.series(group, &values, &schemes.target, |day, zones| {
                self.rows_in(day, group.members(), zones).collect()
            });
            reductions.insert(group.name().to_owned(), series);
        }

        Ok(reductions)
    }
}

impl Dataset {
    fn series<F>(
        &self,
        group: &Group,
        values: &ndarray::ArrayView2<'_, f64>,
        scheme: &[ZoneSet],
        rows: F,
    ) -> ReducedSeries
    where
        F: Fn(Day, ZoneSet) -> BTreeSet<usize>,
    {
        let mut reduced = ndarray::Array2::from_elem((self.n_days(), scheme.len()), f64::NAN);
        for (c, zones) in scheme.iter().enumerate() {
            for day in self.days() {
                let mean = nan_mean(rows(day, *zones).into_iter().map(|r| values[[r, day]]));
                if mean.is_nan() {
                    debug!(group = group.name(), day, zones = %zones, "no value to average");
                }
                reduced[[day, c]] = mean;
            }
        }
        ReducedSeries {
            columns: scheme.iter().map(|zones| zones.name()).collect(),
            values: reduced,
        }
    }
}
