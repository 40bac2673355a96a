use anyhow::{Context, Result, bail};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;

use crate::colors;
use crate::config::Config;
use crate::grass::monitor::Monitor;
use crate::grass::session::Session;
use crate::grass::stats::{ColumnStats, RasterInfo, UnivarStats};
use crate::naming::ModelNames;
use crate::plot;
use crate::summary::{SummarySeries, depression_percent};

// Spatial analysis for the tangible water flow experiment. Two passes:
// first every scanned DEM gets its full product chain (relief, contours,
// simulated flow depth, depressions, difference from the reference run),
// then each experiment series is reduced cell-by-cell and summarized into
// depression and concentrated-flow statistics.
pub fn run(session: &Session, config: &Config) -> Result<()> {
    fs::create_dir_all(&config.analysis_dir)
        .with_context(|| format!("Failed to create {:?}", config.analysis_dir))?;
    fs::create_dir_all(&config.series_dir)
        .with_context(|| format!("Failed to create {:?}", config.series_dir))?;

    let _region = session.temp_region()?;

    // per-model pass
    let dems = session.list("raster", "*dem*", &config.series_exclude)?;
    println!("Processing {} scanned DEMs", dems.len());

    let pb = ProgressBar::new(dems.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} models ({eta})")?
            .progress_chars("#>-"),
    );
    for dem in &dems {
        process_model(session, config, dem).with_context(|| format!("Failed to process {}", dem))?;
        pb.inc(1);
    }
    pb.finish();

    // series pass; the denominator is captured once and reused for every
    // experiment index
    let reference = UnivarStats::query(session, &config.reference_depressions)?;
    let reference_cells = reference.total_cells();

    let mut series = SummarySeries::new();
    series.push_reference(depression_percent(reference_cells, reference.null_cells)?);

    for i in 1..=config.experiments {
        println!("Aggregating experiment {}", i);
        aggregate_experiment(session, config, i, reference_cells, &mut series)
            .with_context(|| format!("Failed to aggregate experiment {}", i))?;
    }

    series.ensure_complete(config.experiments)?;
    let csv_path = series.write_csv(&config.series_dir)?;
    println!("Summary table saved to {:?}", csv_path);

    plot::depression_chart(
        &config.series_dir,
        &config.cell_labels(),
        &series.cell_percents(),
    )?;
    plot::distance_chart(
        &config.series_dir,
        &config.distance_labels(),
        &series.distance_sums(),
    )?;
    println!("Summary charts saved to {:?}", config.series_dir);

    Ok(())
}

// One scanned DEM: shaded relief, contours, rainfall-runoff depth,
// depressions, and the difference from the reference flow depth, each
// rendered over the model's own relief.
fn process_model(session: &Session, config: &Config, dem: &str) -> Result<()> {
    let names = ModelNames::derive(dem)?;

    session.set_region(&config.reference_dem, config.resolution)?;
    let info = RasterInfo::query(session, dem)?;
    let (width, height) = Monitor::size_for(&info);

    session
        .command("r.relief")
        .arg("input", dem)
        .arg("output", &names.relief)
        .arg("altitude", config.relief_altitude)
        .arg("azimuth", config.relief_azimuth)
        .arg("zscale", config.relief_zscale)
        .arg("units", "intl")
        .overwrite()
        .run()?;

    session
        .command("r.contour")
        .arg("input", dem)
        .arg("output", &names.contour)
        .arg("step", config.contour_interval)
        .overwrite()
        .run()?;

    // simulate water flow
    {
        let output = config.analysis_dir.join(format!("{}.png", names.depth));
        let monitor = Monitor::start(session, width, height, &output)?;
        session
            .command("r.slope.aspect")
            .arg("elevation", dem)
            .arg("dx", "dx")
            .arg("dy", "dy")
            .overwrite()
            .run()?;
        session
            .command("r.sim.water")
            .arg("elevation", dem)
            .arg("dx", "dx")
            .arg("dy", "dy")
            .arg("rain_value", config.rain_intensity)
            .arg("depth", &names.depth)
            .arg("nwalkers", config.walkers)
            .arg("niterations", config.iterations)
            .overwrite()
            .run()?;
        session.remove("raster", &["dx", "dy"])?;
        monitor.shade(&names.relief, &names.depth, config.brighten)?;
        monitor.vector(&names.contour)?;
        monitor.legend(&names.depth, config)?;
    }

    // identify depressions
    session
        .command("r.fill.dir")
        .arg("input", dem)
        .arg("output", "depressionless_dem")
        .arg("direction", "flow_dir")
        .overwrite()
        .run()?;
    session
        .command("r.mapcalc")
        .arg(
            "expression",
            depressions_expression(
                &names.depressions,
                "depressionless_dem",
                dem,
                config.depression_threshold,
            ),
        )
        .overwrite()
        .run()?;
    session
        .command("r.colors")
        .arg("map", &names.depressions)
        .rules(colors::DEPRESSIONS_RULES)
        .run()?;
    session.remove("raster", &["depressionless_dem", "flow_dir"])?;
    {
        let output = config
            .analysis_dir
            .join(format!("{}.png", names.depressions));
        let monitor = Monitor::start(session, width, height, &output)?;
        monitor.shade(&names.relief, &names.depressions, config.brighten)?;
        monitor.vector(&names.contour)?;
        monitor.legend(&names.depressions, config)?;
    }

    // difference between the reference and modeled flow depth
    session
        .command("r.mapcalc")
        .arg(
            "expression",
            difference_expression(&names.difference, &config.reference_depth, &names.depth),
        )
        .overwrite()
        .run()?;
    session
        .command("r.colors")
        .arg("map", &names.difference)
        .arg("color", colors::DIFFERENCES_TABLE)
        .run()?;
    {
        let output = config
            .analysis_dir
            .join(format!("{}.png", names.difference));
        let monitor = Monitor::start(session, width, height, &output)?;
        monitor.shade(&names.relief, &names.difference, config.brighten)?;
        monitor.vector(&names.contour)?;
        monitor.legend(&names.difference, config)?;
    }

    Ok(())
}

// One experiment series: cell-by-cell reductions over the trial rasters,
// the concentrated-flow mask and its distance statistics, and the
// depression percentage against the invariant reference denominator.
fn aggregate_experiment(
    session: &Session,
    config: &Config,
    index: u32,
    reference_cells: u64,
    series: &mut SummarySeries,
) -> Result<()> {
    let dem_list = list_required(session, config, &format!("*dem_{}", index))?;
    let depth_list = list_required(session, config, &format!("*depth_{}", index))?;
    let diff_list = list_required(session, config, &format!("*diff_{}", index))?;
    let depressions_list = list_required(session, config, &format!("*depressions_{}", index))?;

    session.set_region(&config.reference_dem, config.resolution)?;
    let info = RasterInfo::query(session, &config.reference_dem)?;
    let (width, height) = Monitor::size_for(&info);

    // mean elevation is only draped in the 3-D renders, never shown flat
    let mean_dem = format!("mean_dem_{}", index);
    session
        .command("r.series")
        .arg("input", dem_list.join(","))
        .arg("output", &mean_dem)
        .arg("method", "average")
        .overwrite()
        .run()?;
    session
        .command("r.colors")
        .arg("map", &mean_dem)
        .arg("color", colors::ELEVATION_TABLE)
        .run()?;

    let reductions: [(&[String], &str, String, ColorSpec); 8] = [
        (
            &depth_list,
            "average",
            format!("mean_depth_{}", index),
            ColorSpec::Rules(colors::DEPTH_RULES),
        ),
        (
            &depth_list,
            "maximum",
            format!("max_depth_{}", index),
            ColorSpec::Rules(colors::DEPTH_RULES),
        ),
        (
            &depth_list,
            "sum",
            format!("sum_depth_{}", index),
            ColorSpec::Rules(colors::DEPTH_RULES),
        ),
        (
            &diff_list,
            "average",
            format!("mean_diff_{}", index),
            ColorSpec::Table(colors::DIFFERENCES_TABLE),
        ),
        (
            &diff_list,
            "maximum",
            format!("max_diff_{}", index),
            ColorSpec::Table(colors::DIFFERENCES_TABLE),
        ),
        (
            &depressions_list,
            "average",
            format!("mean_depressions_{}", index),
            ColorSpec::Rules(colors::DEPRESSIONS_RULES),
        ),
        (
            &depressions_list,
            "maximum",
            format!("max_depressions_{}", index),
            ColorSpec::Rules(colors::DEPRESSIONS_RULES),
        ),
        (
            &depressions_list,
            "sum",
            format!("sum_depressions_{}", index),
            ColorSpec::Rules(colors::DEPRESSIONS_RULES),
        ),
    ];

    for (inputs, method, output, color) in &reductions {
        reduce_series(session, config, inputs, method, output, color, width, height)
            .with_context(|| format!("Failed to reduce {}", output))?;
    }

    // concentrated flow: cells where the mean simulated depth reaches the
    // channelized-flow threshold, sampled to points
    let mean_depth = format!("mean_depth_{}", index);
    let concentrated_flow = format!("concentrated_flow_{}", index);
    let concentrated_points = format!("concentrated_points_{}", index);
    let flow_points = format!("flow_points_{}", index);
    let flow_distance = format!("flow_distance_{}", index);

    session
        .command("r.mapcalc")
        .arg(
            "expression",
            concentrated_flow_expression(&concentrated_flow, &mean_depth, config.flow_threshold),
        )
        .overwrite()
        .run()?;
    session
        .command("r.random")
        .flag('b')
        .arg("input", &concentrated_flow)
        .arg("npoints", format!("{}%", config.flow_sampling_percent))
        .arg("vector", &concentrated_points)
        .overwrite()
        .run()?;

    // distance from each reference flow point to the nearest concentrated
    // flow point, kept both as an attribute and as connecting lines
    session
        .command("g.copy")
        .arg(
            "vector",
            format!("{},{}", config.reference_points, flow_points),
        )
        .overwrite()
        .run()?;
    session
        .command("v.db.addcolumn")
        .arg("map", &flow_points)
        .arg("columns", "distance double precision")
        .run()?;
    session
        .command("v.distance")
        .arg("from", &flow_points)
        .arg("to", &concentrated_points)
        .arg("upload", "dist")
        .arg("column", "distance")
        .arg("output", &flow_distance)
        .overwrite()
        .run()?;
    let distance = ColumnStats::query(session, &flow_points, "distance")?;

    // share of cells flagged as depressions in any trial of this series
    let sum_depressions = format!("sum_depressions_{}", index);
    let univar = UnivarStats::query(session, &sum_depressions)?;
    let percent = depression_percent(reference_cells, univar.null_cells)?;
    println!(
        "  {:.1}% of cells with depressions, cumulative flow distance {:.1}",
        percent, distance.sum
    );

    series.push_experiment(index, percent, distance.sum, distance.mean);
    Ok(())
}

enum ColorSpec {
    Table(&'static str),
    Rules(&'static str),
}

#[allow(clippy::too_many_arguments)]
fn reduce_series(
    session: &Session,
    config: &Config,
    inputs: &[String],
    method: &str,
    output: &str,
    color: &ColorSpec,
    width: u32,
    height: u32,
) -> Result<()> {
    session
        .command("r.series")
        .arg("input", inputs.join(","))
        .arg("output", output)
        .arg("method", method)
        .overwrite()
        .run()?;
    match color {
        ColorSpec::Table(table) => session
            .command("r.colors")
            .arg("map", output)
            .arg("color", *table)
            .run()?,
        ColorSpec::Rules(rules) => session
            .command("r.colors")
            .arg("map", output)
            .rules(rules)
            .run()?,
    }

    let png = config.series_dir.join(format!("{}.png", output));
    let monitor = Monitor::start(session, width, height, &png)?;
    monitor.shade(&config.reference_relief, output, config.brighten)?;
    monitor.vector(&config.reference_contour)?;
    monitor.legend(output, config)?;
    Ok(())
}

fn list_required(session: &Session, config: &Config, pattern: &str) -> Result<Vec<String>> {
    let maps = session.list("raster", pattern, &config.series_exclude)?;
    if maps.is_empty() {
        bail!("no rasters match '{}'", pattern);
    }
    Ok(maps)
}

/// Filled-minus-original elevation where it exceeds the threshold, null
/// elsewhere.
pub fn depressions_expression(output: &str, filled: &str, dem: &str, threshold: f64) -> String {
    format!(
        "{output} = if({filled} - {dem} > {threshold}, {filled} - {dem}, null())",
        output = output,
        filled = filled,
        dem = dem,
        threshold = threshold
    )
}

/// Mean depth where it reaches the channelized-flow threshold, null
/// elsewhere.
pub fn concentrated_flow_expression(output: &str, depth: &str, threshold: f64) -> String {
    format!(
        "{output} = if({depth} >= {threshold}, {depth}, null())",
        output = output,
        depth = depth,
        threshold = threshold
    )
}

fn difference_expression(output: &str, reference: &str, modeled: &str) -> String {
    format!("{} = {} - {}", output, reference, modeled)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depressions_keep_positive_fill_differences() {
        assert_eq!(
            depressions_expression("depressions_1", "depressionless_dem", "dem_1", 0.0),
            "depressions_1 = if(depressionless_dem - dem_1 > 0, depressionless_dem - dem_1, null())"
        );
    }

    #[test]
    fn concentrated_flow_keeps_depths_at_or_above_threshold() {
        assert_eq!(
            concentrated_flow_expression("concentrated_flow_1", "mean_depth_1", 0.05),
            "concentrated_flow_1 = if(mean_depth_1 >= 0.05, mean_depth_1, null())"
        );
    }

    #[test]
    fn difference_subtracts_the_model_from_the_reference() {
        assert_eq!(
            difference_expression("fort_diff_1", "depth@PERMANENT", "fort_depth_1"),
            "fort_diff_1 = depth@PERMANENT - fort_depth_1"
        );
    }
}
