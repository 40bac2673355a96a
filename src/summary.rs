use anyhow::{Context, Result, ensure};
use chrono::Local;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Percent of cells flagged as depressions, relative to the reference
/// grid's total cell count. The depression rasters are null wherever no
/// depression was detected, so the flagged count is total minus null.
pub fn depression_percent(reference_cells: u64, null_cells: u64) -> Result<f64> {
    ensure!(
        reference_cells > 0,
        "reference grid reports zero cells; cannot compute a depression percentage"
    );
    ensure!(
        null_cells <= reference_cells,
        "depression raster has {} null cells but the reference grid only has {}",
        null_cells,
        reference_cells
    );
    let depression_cells = (reference_cells - null_cells) as f64;
    Ok(depression_cells / reference_cells as f64 * 100.0)
}

// One row of the run summary. The reference terrain contributes a
// depression percentage but no flow distance.
#[derive(Debug, Clone, Serialize)]
pub struct SummaryRecord {
    pub label: String,
    pub depression_percent: f64,
    pub flow_distance_sum: Option<f64>,
    pub flow_distance_mean: Option<f64>,
}

// Accumulated statistics for one run: a depression-percentage series with
// the reference first, and a flow-distance series with one entry per
// experiment. Built empty, appended to once per index, consumed by the
// summary CSV and the bar charts.
#[derive(Debug, Default)]
pub struct SummarySeries {
    records: Vec<SummaryRecord>,
}

impl SummarySeries {
    pub fn new() -> Self {
        SummarySeries::default()
    }

    pub fn push_reference(&mut self, percent: f64) {
        self.records.push(SummaryRecord {
            label: "reference".to_string(),
            depression_percent: percent,
            flow_distance_sum: None,
            flow_distance_mean: None,
        });
    }

    pub fn push_experiment(&mut self, index: u32, percent: f64, sum: f64, mean: f64) {
        self.records.push(SummaryRecord {
            label: format!("experiment {}", index),
            depression_percent: percent,
            flow_distance_sum: Some(sum),
            flow_distance_mean: Some(mean),
        });
    }

    pub fn cell_percents(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.depression_percent).collect()
    }

    pub fn distance_sums(&self) -> Vec<f64> {
        self.records
            .iter()
            .filter_map(|r| r.flow_distance_sum)
            .collect()
    }

    /// The cells series carries the reference plus one entry per
    /// experiment; the distance series one entry per experiment.
    pub fn ensure_complete(&self, experiments: u32) -> Result<()> {
        ensure!(
            self.cell_percents().len() == experiments as usize + 1,
            "expected {} depression entries, found {}",
            experiments + 1,
            self.cell_percents().len()
        );
        ensure!(
            self.distance_sums().len() == experiments as usize,
            "expected {} flow distance entries, found {}",
            experiments,
            self.distance_sums().len()
        );
        Ok(())
    }

    /// Write the run summary as a timestamped CSV in the series directory.
    pub fn write_csv(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(format!("summary_{}.csv", Local::now().format("%Y%m%d%H%M")));
        let mut wtr = csv::Writer::from_path(&path)
            .with_context(|| format!("Failed to create summary file: {:?}", path))?;
        for record in &self.records {
            wtr.serialize(record)?;
        }
        wtr.flush().context("Failed to flush summary writer")?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_percentage_from_counts() {
        // 1000 cells, 40 of them depressions.
        assert_eq!(depression_percent(1000, 960).unwrap(), 4.0);
    }

    #[test]
    fn experiment_percentage_lands_after_the_reference() {
        let mut series = SummarySeries::new();
        series.push_reference(depression_percent(1000, 960).unwrap());
        // 1000 cells total, 950 null, so 50 depression cells.
        series.push_experiment(1, depression_percent(1000, 950).unwrap(), 120.0, 4.0);
        let cells = series.cell_percents();
        assert_eq!(cells[1], 5.0);
        assert_eq!(cells.len(), 2);
    }

    #[test]
    fn two_experiments_fill_both_series() {
        let mut series = SummarySeries::new();
        series.push_reference(4.0);
        series.push_experiment(1, 5.0, 120.0, 4.0);
        series.push_experiment(2, 6.5, 90.0, 3.0);
        series.ensure_complete(2).unwrap();
        assert_eq!(series.cell_percents().len(), 3);
        assert_eq!(series.distance_sums(), vec![120.0, 90.0]);
    }

    #[test]
    fn incomplete_series_is_rejected() {
        let mut series = SummarySeries::new();
        series.push_reference(4.0);
        series.push_experiment(1, 5.0, 120.0, 4.0);
        assert!(series.ensure_complete(2).is_err());
    }

    #[test]
    fn zero_reference_cells_is_fatal() {
        assert!(depression_percent(0, 0).is_err());
    }

    #[test]
    fn more_nulls_than_cells_is_fatal() {
        assert!(depression_percent(100, 101).is_err());
    }
}
