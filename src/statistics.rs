use crate::error::Result;
use crate::groups::Registry;
use crate::prelude::*;
use crate::progress::Progress;
use crate::reduction::{Reductions, ZoneReduction, ZoneSchemes};
use crate::significance::{ComparisonScheme, Significance, SignificanceReport};
use std::sync::Arc;
use tracing::info;

/// Averages and p-values computed for one property.
#[derive(Debug, Clone)]
pub struct Statistics {
    pub property: String,
    pub averages: Reductions,
    pub significance: SignificanceReport,
}

/// A dataset, the groups defined on it and the last computed statistics.
///
/// The registry must not be edited while `compute_statistics` runs; holding
/// `&mut self` for the duration of the call enforces this.
pub struct Analysis {
    dataset: Arc<Dataset>,
    registry: Registry,
    schemes: ZoneSchemes,
    comparisons: Vec<ComparisonScheme>,
    alpha: f64,
    statistics: Option<Statistics>,
}

impl Analysis {
    pub fn new(dataset: Arc<Dataset>) -> Self {
        AnalysisBuilder::new().build(dataset)
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    /// Cutoff below which a p-value counts as significant.
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn statistics(&self) -> Option<&Statistics> {
        self.statistics.as_ref()
    }

    /// Computes averages then significance for `property`, replacing any
    /// earlier statistics.
    ///
    /// On error the earlier statistics are kept as they were.
    pub fn compute_statistics(
        &mut self,
        property: &str,
        progress: &mut dyn Progress,
    ) -> Result<&Statistics> {
        let control = self.registry.validate()?;
        info!(property, control, groups = self.registry.len(), "computing statistics");

        let averages = self
            .dataset
            .reduce(&self.registry, control, property, &self.schemes)?;
        let significance = self.dataset.significance(
            &self.registry,
            control,
            property,
            &self.comparisons,
            progress,
        )?;

        info!(
            property,
            degenerate = significance.degenerate.len(),
            "statistics computed"
        );
        Ok(self.statistics.insert(Statistics {
            property: property.to_owned(),
            averages,
            significance,
        }))
    }

    pub fn clear_statistics(&mut self) {
        self.statistics = None;
    }
}

pub struct AnalysisBuilder {
    schemes: ZoneSchemes,
    comparisons: Vec<ComparisonScheme>,
    alpha: f64,
}

impl Default for AnalysisBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalysisBuilder {
    pub fn new() -> Self {
        Self {
            schemes: ZoneSchemes::default(),
            comparisons: ComparisonScheme::defaults(),
            alpha: 0.05,
        }
    }

    pub fn control_scheme(&mut self, scheme: ZoneScheme) -> &mut Self {
        self.schemes.control = scheme;
        self
    }

    pub fn target_scheme(&mut self, scheme: ZoneScheme) -> &mut Self {
        self.schemes.target = scheme;
        self
    }

    /// Zone of other groups pooled into the control; `None` disables it.
    pub fn fold_zone(&mut self, zone: Option<Zone>) -> &mut Self {
        self.schemes.fold = zone;
        self
    }

    pub fn comparisons(&mut self, comparisons: Vec<ComparisonScheme>) -> &mut Self {
        self.comparisons = comparisons;
        self
    }

    pub fn alpha(&mut self, alpha: f64) -> &mut Self {
        self.alpha = alpha;
        self
    }

    pub fn build(&self, dataset: Arc<Dataset>) -> Analysis {
        Analysis {
            dataset,
            registry: Registry::new(),
            schemes: self.schemes.clone(),
            comparisons: self.comparisons.clone(),
            alpha: self.alpha,
            statistics: None,
        }
    }
}
