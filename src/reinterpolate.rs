use anyhow::{Context, Result};

use crate::colors;
use crate::config::Config;
use crate::grass::session::Session;
use crate::naming::substitute;

// Scanned sandbox surfaces come in misaligned and noisy. Each DEM is
// re-gridded against the reference extent by sampling random cells and
// fitting a regularized spline with tension through them.
pub fn run(session: &Session, config: &Config) -> Result<()> {
    let _region = session.temp_region()?;

    for i in 1..=config.experiments {
        let dems = session.list("raster", &format!("*dem_{}", i), &config.series_exclude)?;
        println!(
            "Reinterpolating {} scanned DEMs for experiment {}",
            dems.len(),
            i
        );

        for dem in &dems {
            reinterpolate_dem(session, config, dem)
                .with_context(|| format!("Failed to reinterpolate {}", dem))?;
        }
    }

    Ok(())
}

fn reinterpolate_dem(session: &Session, config: &Config, dem: &str) -> Result<()> {
    let points = substitute(dem, "dem", "points")?;

    // align the scan to the reference grid
    session
        .command("r.region")
        .arg("map", dem)
        .arg("raster", &config.reference_dem)
        .run()?;
    session.set_region(&config.reference_dem, config.resolution)?;

    session
        .command("r.random")
        .flag('b')
        .flag('d')
        .arg("input", dem)
        .arg("npoints", config.sample_points)
        .arg("vector", &points)
        .overwrite()
        .run()?;

    session
        .command("v.surf.rst")
        .arg("input", &points)
        .arg("elevation", dem)
        .arg("tension", config.spline_tension)
        .arg("smooth", config.spline_smooth)
        .arg("npmin", config.spline_npmin)
        .arg("dmin", config.spline_dmin)
        .overwrite()
        .run()?;

    session
        .command("r.colors")
        .arg("map", dem)
        .arg("color", colors::ELEVATION_TABLE)
        .run()?;

    session.remove("vector", &[&points])?;
    Ok(())
}
