#![crate_name = "mousetrack"]
use ndarray;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::ops::Range;
use tracing::debug;

pub mod prelude;

pub mod error;
pub mod groups;
pub mod observable;
pub mod progress;
pub mod reduction;
pub mod significance;
pub mod statistics;
pub mod student;

use crate::error::{Error, Result};

pub type SpecimenId = u32;
pub type Site = u32;
pub type Day = usize;
pub type Members = BTreeSet<SpecimenId>;

/// A row of a `Dataset`: one measured site of one specimen.
pub type RowKey = (SpecimenId, Site);

/// Body region a site is assigned to on a given day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Zone {
    A,
    B,
    C,
    D,
    E,
}

impl Zone {
    pub const ALL: [Zone; 5] = [Zone::A, Zone::B, Zone::C, Zone::D, Zone::E];

    pub fn letter(self) -> char {
        match self {
            Zone::A => 'A',
            Zone::B => 'B',
            Zone::C => 'C',
            Zone::D => 'D',
            Zone::E => 'E',
        }
    }

    pub fn from_letter(letter: char) -> Option<Self> {
        Zone::ALL
            .iter()
            .copied()
            .find(|zone| zone.letter() == letter.to_ascii_uppercase())
    }

    fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

/// A subset of the zone alphabet.
///
/// The name of a set is its letters concatenated in alphabet order, so
/// `{C, A, B}` is always `"ABC"`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ZoneSet(u8);

impl ZoneSet {
    pub fn new(zones: &[Zone]) -> Self {
        Self(zones.iter().fold(0, |bits, zone| bits | zone.bit()))
    }

    pub fn all() -> Self {
        Self::new(&Zone::ALL)
    }

    pub fn only(zone: Zone) -> Self {
        Self(zone.bit())
    }

    /// Parses a set from its letters, e.g. `"CDE"`.
    pub fn parse(letters: &str) -> Option<Self> {
        letters
            .chars()
            .map(Zone::from_letter)
            .collect::<Option<Vec<_>>>()
            .map(|zones| Self::new(&zones))
    }

    pub fn contains(self, zone: Zone) -> bool {
        self.0 & zone.bit() != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn zones(self) -> impl Iterator<Item = Zone> {
        Zone::ALL.iter().copied().filter(move |zone| self.contains(*zone))
    }

    pub fn name(self) -> String {
        self.zones().map(Zone::letter).collect()
    }
}

impl fmt::Display for ZoneSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

impl fmt::Debug for ZoneSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ZoneSet({})", self.name())
    }
}

/// Ordered zone subsets, one reduced column per subset.
pub type ZoneScheme = Vec<ZoneSet>;

/// Nan-skipping mean. Returns NaN when no value is present.
pub fn nan_mean<I>(values: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    let (sum, count) = values
        .into_iter()
        .filter(|x| !x.is_nan())
        .fold((0.0, 0usize), |(sum, count), x| (sum + x, count + 1));
    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}

/// An observation of a specimen site
pub enum Observation {
    /// The zone a site belongs to on a day
    /// Specimen, site, day, zone
    Zone(SpecimenId, Site, Day, Zone),

    /// A measured property value
    /// Specimen, site, day, property name, value (NaN when missing)
    Value(SpecimenId, Site, Day, String, f64),
}

#[derive(Default)]
struct PartialRow {
    zones: BTreeMap<Day, Zone>,
    values: BTreeMap<(Day, String), f64>,
}

/// Accumulates observations into a `Dataset`.
///
/// The builder can be filled up iteratively by calling `observe()` and is
/// turned into an immutable `Dataset` by `build()`.
#[derive(Default)]
pub struct DatasetBuilder {
    rows: BTreeMap<RowKey, PartialRow>,
    properties: BTreeSet<String>,
    days: BTreeSet<Day>,
}

impl DatasetBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a single `Observation`.
    pub fn observe_one(&mut self, observation: Observation) -> Result<()> {
        match observation {
            Observation::Zone(specimen, site, day, zone) => {
                check_specimen(specimen)?;
                self.days.insert(day);
                self.rows
                    .entry((specimen, site))
                    .or_default()
                    .zones
                    .insert(day, zone);
            }
            Observation::Value(specimen, site, day, property, value) => {
                check_specimen(specimen)?;
                self.days.insert(day);
                self.properties.insert(property.clone());
                self.rows
                    .entry((specimen, site))
                    .or_default()
                    .values
                    .insert((day, property), value);
            }
        }
        Ok(())
    }

    /// Observe all the data in the argument.
    pub fn observe<I>(&mut self, observable: I) -> Result<()>
    where
        I: Iterator<Item = Result<Observation>>,
    {
        for observation in observable {
            self.observe_one(observation?)?;
        }
        Ok(())
    }

    /// Checks the accumulated observations and lays them out by row and day.
    ///
    /// Days must run from 0 without gaps. Every property is given a column
    /// on every day; cells nobody observed are NaN.
    pub fn build(self) -> Result<Dataset> {
        let n_days = self.days.iter().next_back().map_or(0, |last| last + 1);
        if self.days.len() != n_days {
            let missing = (0..n_days).find(|day| !self.days.contains(day)).unwrap_or(0);
            return Err(Error::Inconsistent(format!("day {} has no observation", missing)));
        }

        let n_rows = self.rows.len();
        let mut zones = ndarray::Array2::from_elem((n_rows, n_days), None);
        let mut values: BTreeMap<String, ndarray::Array2<f64>> = self
            .properties
            .iter()
            .map(|p| (p.clone(), ndarray::Array2::from_elem((n_rows, n_days), f64::NAN)))
            .collect();
        let mut rows = Vec::with_capacity(n_rows);

        for (r, (key, partial)) in self.rows.into_iter().enumerate() {
            rows.push(key);
            for (day, zone) in partial.zones {
                zones[[r, day]] = Some(zone);
            }
            for ((day, property), value) in partial.values {
                if let Some(column) = values.get_mut(&property) {
                    column[[r, day]] = value;
                }
            }
        }

        debug!(rows = n_rows, days = n_days, properties = values.len(), "dataset built");
        Ok(Dataset {
            rows,
            zones,
            values,
        })
    }
}

fn check_specimen(specimen: SpecimenId) -> Result<()> {
    if specimen == 0 {
        return Err(Error::Inconsistent("specimen ids must be positive".into()));
    }
    Ok(())
}

/// Immutable, normalized monitoring data.
///
/// One row per `(specimen, site)`; for every day a zone label and one value
/// per tracked property.
#[derive(Debug, Clone)]
pub struct Dataset {
    rows: Vec<RowKey>,
    zones: ndarray::Array2<Option<Zone>>,
    values: BTreeMap<String, ndarray::Array2<f64>>,
}

/// Values of one property for a set of rows, by day.
#[derive(Debug, Clone)]
pub struct PropertyTable {
    pub rows: Vec<RowKey>,
    pub values: ndarray::Array2<f64>,
}

impl Dataset {
    pub fn n_days(&self) -> usize {
        self.zones.shape()[1]
    }

    pub fn days(&self) -> Range<Day> {
        0..self.n_days()
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn row(&self, row: usize) -> Option<RowKey> {
        self.rows.get(row).copied()
    }

    /// Distinct specimen ids in ascending order.
    pub fn specimens(&self) -> Vec<SpecimenId> {
        let mut specimens: Vec<SpecimenId> = self.rows.iter().map(|(id, _)| *id).collect();
        specimens.dedup();
        specimens
    }

    pub fn properties(&self) -> Vec<&String> {
        self.values.keys().collect()
    }

    pub fn has_property(&self, property: &str) -> bool {
        self.values.contains_key(property)
    }

    /// Zone of a row on a day. `None` for an unlabeled cell or an index out
    /// of range.
    pub fn zone(&self, row: usize, day: Day) -> Option<Zone> {
        self.zones.get([row, day]).copied().flatten()
    }

    /// The rows x days matrix of a property.
    pub fn property(&self, property: &str) -> Result<ndarray::ArrayView2<'_, f64>> {
        self.values
            .get(property)
            .map(|values| values.view())
            .ok_or_else(|| Error::UnknownProperty(property.into()))
    }

    /// Rows of `members` whose zone on `day` is in `zones`.
    ///
    /// A `day` outside `days()` matches no row.
    pub fn rows_in<'a>(
        &'a self,
        day: Day,
        members: &'a Members,
        zones: ZoneSet,
    ) -> impl Iterator<Item = usize> + 'a {
        self.rows
            .iter()
            .enumerate()
            .filter(move |(r, (specimen, _))| {
                members.contains(specimen)
                    && self.zone(*r, day).map_or(false, |zone| zones.contains(zone))
            })
            .map(|(r, _)| r)
    }

    /// Raw values of `property` for every row of `members`, for inspection.
    pub fn property_table(&self, members: &Members, property: &str) -> Result<PropertyTable> {
        let values = self.property(property)?;
        let selected: Vec<usize> = (0..self.n_rows())
            .filter(|r| members.contains(&self.rows[*r].0))
            .collect();
        let mut table = ndarray::Array2::from_elem((selected.len(), self.n_days()), f64::NAN);
        for (i, r) in selected.iter().enumerate() {
            table.row_mut(i).assign(&values.row(*r));
        }
        Ok(PropertyTable {
            rows: selected.iter().map(|r| self.rows[*r]).collect(),
            values: table,
        })
    }
}
