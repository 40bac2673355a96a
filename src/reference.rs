use anyhow::{Context, Result};
use std::fs;

use crate::colors;
use crate::config::Config;
use crate::grass::monitor::Monitor;
use crate::grass::session::Session;
use crate::grass::stats::RasterInfo;
use crate::naming::substitute;

// Derive and render the reference terrain products the scanned trials are
// compared against: elevation, shaded relief, contours, slope, simulated
// flow depth, and depressions. Run inside the mapset that holds the
// reference DEM so later drivers can read the products across mapsets.
pub fn run(session: &Session, config: &Config) -> Result<()> {
    fs::create_dir_all(&config.reference_dir)
        .with_context(|| format!("Failed to create {:?}", config.reference_dir))?;

    let _region = session.temp_region()?;

    let dem = "dem";
    let relief = substitute(dem, "dem", "relief")?;
    let contour = substitute(dem, "dem", "contour")?;
    let slope = substitute(dem, "dem", "slope")?;
    let depth = substitute(dem, "dem", "depth")?;
    let depressions = substitute(dem, "dem", "depressions")?;

    session.set_region(dem, config.resolution)?;
    let info = RasterInfo::query(session, dem)?;
    let (width, height) = Monitor::size_for(&info);

    // elevation with shaded relief and contours
    session
        .command("r.colors")
        .arg("map", dem)
        .arg("color", colors::ELEVATION_TABLE)
        .run()?;
    session
        .command("r.relief")
        .arg("input", dem)
        .arg("output", &relief)
        .arg("altitude", config.relief_altitude)
        .arg("azimuth", config.relief_azimuth)
        .arg("zscale", config.relief_zscale)
        .arg("units", "intl")
        .overwrite()
        .run()?;
    session
        .command("r.contour")
        .arg("input", dem)
        .arg("output", &contour)
        .arg("step", config.contour_interval)
        .overwrite()
        .run()?;
    render(session, config, width, height, &relief, &contour, dem, dem)?;

    // slope
    session
        .command("r.param.scale")
        .arg("input", dem)
        .arg("output", &slope)
        .arg("size", config.slope_window)
        .arg("method", "slope")
        .overwrite()
        .run()?;
    session
        .command("r.colors")
        .arg("map", &slope)
        .arg("color", colors::SLOPE_TABLE)
        .run()?;
    render(session, config, width, height, &relief, &contour, &slope, &slope)?;

    // simulated flow depth
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
        .arg("depth", &depth)
        .arg("nwalkers", config.walkers)
        .arg("niterations", config.iterations)
        .overwrite()
        .run()?;
    session.remove("raster", &["dx", "dy"])?;
    session
        .command("r.colors")
        .arg("map", &depth)
        .rules(colors::DEPTH_RULES)
        .run()?;
    render(session, config, width, height, &relief, &contour, &depth, &depth)?;

    // depressions, the baseline for the series statistics
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
            crate::analysis::depressions_expression(
                &depressions,
                "depressionless_dem",
                dem,
                config.depression_threshold,
            ),
        )
        .overwrite()
        .run()?;
    session
        .command("r.colors")
        .arg("map", &depressions)
        .rules(colors::DEPRESSIONS_RULES)
        .run()?;
    session.remove("raster", &["depressionless_dem", "flow_dir"])?;
    render(
        session,
        config,
        width,
        height,
        &relief,
        &contour,
        &depressions,
        &depressions,
    )?;

    println!("Reference products saved to {:?}", config.reference_dir);
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn render(
    session: &Session,
    config: &Config,
    width: u32,
    height: u32,
    relief: &str,
    contour: &str,
    color: &str,
    name: &str,
) -> Result<()> {
    let output = config.reference_dir.join(format!("{}.png", name));
    let monitor = Monitor::start(session, width, height, &output)?;
    monitor.shade(relief, color, config.brighten)?;
    monitor.vector(contour)?;
    monitor.legend(color, config)?;
    Ok(())
}
