use std::path::{Path, PathBuf};

// Experiment configuration shared by every driver. All of the tunable
// constants from the study protocol live here so the drivers stay free of
// magic numbers and process-wide state.
#[derive(Debug, Clone)]
pub struct Config {
    // region
    pub resolution: u32,

    // terrain products
    pub relief_altitude: u32,
    pub relief_azimuth: u32,
    pub relief_zscale: f64,
    pub contour_interval: u32,
    pub slope_window: u32,

    // overland flow simulation
    pub rain_intensity: u32,
    pub walkers: u32,
    pub iterations: u32,

    // depressions and concentrated flow
    pub depression_threshold: f64,
    pub flow_threshold: f64,
    pub flow_sampling_percent: u32,

    // rendering
    pub brighten: u32,
    pub legend_fontsize: u32,
    pub legend_at: [u32; 4],

    // spline reinterpolation
    pub spline_tension: u32,
    pub spline_smooth: u32,
    pub spline_npmin: u32,
    pub spline_dmin: f64,
    pub sample_points: u32,

    // experiment series
    pub experiments: u32,
    // reduction outputs must not be rediscovered as trial rasters on reruns
    pub series_exclude: String,

    // reference maps scanned trials are compared against
    pub reference_dem: String,
    pub reference_relief: String,
    pub reference_contour: String,
    pub reference_depth: String,
    pub reference_diff: String,
    pub reference_depressions: String,
    pub reference_points: String,

    // output directories
    pub reference_dir: PathBuf,
    pub analysis_dir: PathBuf,
    pub series_dir: PathBuf,
    pub render_3d_dir: PathBuf,
}

impl Config {
    pub fn new(gisdbase: &Path, location: &str, experiments: u32) -> Self {
        let results = gisdbase.join("tangible_water_flow_results");
        Config {
            resolution: 3,
            relief_altitude: 60,
            relief_azimuth: 45,
            relief_zscale: 1.0,
            contour_interval: 5,
            slope_window: 9,
            rain_intensity: 300,
            walkers: 5000,
            iterations: 4,
            depression_threshold: 0.0,
            flow_threshold: 0.05,
            flow_sampling_percent: 100,
            brighten: 75,
            legend_fontsize: 10,
            legend_at: [10, 90, 1, 4],
            spline_tension: 25,
            spline_smooth: 5,
            spline_npmin: 300,
            spline_dmin: 0.5,
            sample_points: 10000,
            experiments,
            series_exclude: "mean_*,max_*,sum_*".to_string(),
            reference_dem: "dem@PERMANENT".to_string(),
            reference_relief: "relief@PERMANENT".to_string(),
            reference_contour: "contour@PERMANENT".to_string(),
            reference_depth: "depth@PERMANENT".to_string(),
            reference_diff: "diff@PERMANENT".to_string(),
            reference_depressions: "depressions@PERMANENT".to_string(),
            reference_points: "points@PERMANENT".to_string(),
            reference_dir: results.join("reference"),
            analysis_dir: results.join("analysis"),
            series_dir: results.join("statistical_analysis"),
            render_3d_dir: gisdbase.join(location).join("render_3d"),
        }
    }

    /// Labels for the depression-cells summary: the reference terrain
    /// followed by one entry per experiment.
    pub fn cell_labels(&self) -> Vec<String> {
        let mut labels = vec!["reference".to_string()];
        labels.extend((1..=self.experiments).map(|i| format!("experiment {}", i)));
        labels
    }

    /// Labels for the flow-distance summary, one per experiment.
    pub fn distance_labels(&self) -> Vec<String> {
        (1..=self.experiments)
            .map(|i| format!("experiment {}", i))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_sets_match_experiment_count() {
        let config = Config::new(Path::new("/data/grassdata"), "sandbox", 2);
        assert_eq!(config.cell_labels().len(), 3);
        assert_eq!(config.cell_labels()[0], "reference");
        assert_eq!(
            config.distance_labels(),
            vec!["experiment 1", "experiment 2"]
        );
    }

    #[test]
    fn output_directories_live_under_the_database() {
        let config = Config::new(Path::new("/data/grassdata"), "sandbox", 2);
        assert!(config.series_dir.starts_with("/data/grassdata"));
        assert!(config.render_3d_dir.ends_with("sandbox/render_3d"));
    }
}
