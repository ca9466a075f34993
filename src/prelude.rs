pub use crate::{
    nan_mean, Dataset, DatasetBuilder, Day, Members, Observation, PropertyTable, RowKey, Site,
    SpecimenId, Zone, ZoneScheme, ZoneSet,
};

pub use crate::error::Error;
pub use crate::groups::{Group, GroupField, GroupQuery, GroupRecord, Registry};
pub use crate::observable::{Csv, CsvBuilder};
pub use crate::progress::{Progress, Silent};
pub use crate::reduction::{ReducedSeries, Reductions, ZoneReduction, ZoneSchemes};
pub use crate::significance::{
    ComparisonScheme, DegenerateTest, PValueMatrix, Reason, Significance, SignificanceReport,
};
pub use crate::statistics::{Analysis, AnalysisBuilder, Statistics};
