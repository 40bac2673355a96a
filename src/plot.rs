use anyhow::{Result, ensure};
use plotters::prelude::*;
use std::path::{Path, PathBuf};

const CELLS_CHART: &str = "depression_cells.png";
const DISTANCE_CHART: &str = "flow_distance.png";
const CHART_SIZE: (u32, u32) = (800, 600);

/// Bar chart of depression-cell percentages, reference first.
pub fn depression_chart(dir: &Path, labels: &[String], values: &[f64]) -> Result<PathBuf> {
    let path = dir.join(CELLS_CHART);
    bar_chart(
        &path,
        "Cells with depressions",
        "% of cells",
        labels,
        values,
        &BLUE,
    )?;
    Ok(path)
}

/// Bar chart of cumulative nearest-flow distances, one bar per experiment.
pub fn distance_chart(dir: &Path, labels: &[String], values: &[f64]) -> Result<PathBuf> {
    let path = dir.join(DISTANCE_CHART);
    bar_chart(
        &path,
        "Distance from concentrated flow",
        "cumulative distance (m)",
        labels,
        values,
        &RED,
    )?;
    Ok(path)
}

fn bar_chart(
    path: &Path,
    caption: &str,
    y_desc: &str,
    labels: &[String],
    values: &[f64],
    color: &RGBColor,
) -> Result<()> {
    validate_series(labels, values)?;
    let y_max = y_ceiling(values);

    let root = BitMapBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(caption, ("sans-serif", 24))
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d((0usize..labels.len()).into_segmented(), 0f64..y_max)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .y_desc(y_desc)
        .x_label_formatter(&|x| match x {
            SegmentValue::CenterOf(i) => labels.get(*i).cloned().unwrap_or_default(),
            _ => String::new(),
        })
        .draw()?;

    chart.draw_series(values.iter().enumerate().map(|(i, v)| {
        let mut bar = Rectangle::new(
            [
                (SegmentValue::Exact(i), 0.0),
                (SegmentValue::Exact(i + 1), *v),
            ],
            color.mix(0.6).filled(),
        );
        bar.set_margin(0, 0, 10, 10);
        bar
    }))?;

    root.present()?;
    Ok(())
}

fn validate_series(labels: &[String], values: &[f64]) -> Result<()> {
    ensure!(!values.is_empty(), "nothing to plot");
    ensure!(
        labels.len() == values.len(),
        "{} labels for {} values",
        labels.len(),
        values.len()
    );
    Ok(())
}

fn y_ceiling(values: &[f64]) -> f64 {
    let max = values.iter().copied().fold(0.0f64, f64::max);
    if max <= 0.0 { 1.0 } else { max * 1.1 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn axis_ceiling_clears_the_tallest_bar() {
        assert_eq!(y_ceiling(&[4.0, 5.0, 6.5]), 6.5 * 1.1);
        assert_eq!(y_ceiling(&[0.0]), 1.0);
    }

    #[test]
    fn mismatched_labels_are_rejected() {
        let labels = vec!["reference".to_string()];
        assert!(validate_series(&labels, &[1.0, 2.0]).is_err());
        assert!(validate_series(&labels, &[]).is_err());
        assert!(validate_series(&labels, &[1.0]).is_ok());
    }
}
