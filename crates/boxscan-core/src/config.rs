//! Engine configuration (spec §6 "Configuration (enumerated)").

use boxscan_types::ColumnName;

use crate::error::{BoxscanError, Result};

/// Configuration for a single search run.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Bins per numeric column on conversion. Must be >= 2.
    pub num_bins: usize,
    /// If set, overrides `num_bins <- floor(N / num_points_per_bin)`.
    pub num_points_per_bin: Option<usize>,
    /// Minimum score to be accepted.
    pub threshold: f64,
    /// Minimum score for conditional acceptance in the finaliser; also
    /// triggers early stop when observed in the frontier.
    pub conditional_threshold: Option<f64>,
    /// Hard iteration cap on the main loop.
    pub maxiters: Option<usize>,
    /// Restrict the search to this column subset. Empty means "all
    /// admissible columns".
    pub columns: Vec<ColumnName>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            num_bins: 15,
            num_points_per_bin: None,
            threshold: 0.0,
            conditional_threshold: None,
            maxiters: None,
            columns: Vec::new(),
        }
    }
}

impl EngineConfig {
    /// Resolves the effective bin count for a table of `row_count` rows,
    /// validating that `num_points_per_bin` (if set) doesn't collapse to
    /// zero bins (spec §7 `IncoherentConfig`).
    pub fn resolved_num_bins(&self, row_count: usize) -> Result<usize> {
        let bins = match self.num_points_per_bin {
            Some(points) if points > 0 => row_count / points,
            Some(_) => 0,
            None => self.num_bins,
        };
        if bins < 2 {
            return Err(BoxscanError::IncoherentConfig(format!(
                "num_points_per_bin/num_bins resolved to {bins} bins, need >= 2"
            )));
        }
        Ok(bins)
    }

    pub fn validate(&self, row_count: usize) -> Result<()> {
        self.resolved_num_bins(row_count).map(|_| ())
    }
}
