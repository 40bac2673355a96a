use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use crate::colors;
use crate::config::Config;
use crate::grass::session::Session;

// Fixed camera, light and fringe settings for the perspective renders.
const RES_3D: u32 = 1;
const HEIGHT_3D: u32 = 2000;
const PERSPECTIVE: u32 = 25;
const LIGHT_POSITION: &str = "0.68,-0.68,0.95";
const FRINGE: &str = "ne";
const FRINGE_COLOR: &str = "192:192:192";
const FRINGE_ELEVATION: u32 = 250;
const FORMAT_3D: &str = "tif";
const SIZE_3D: &str = "1000,1000";
const VPOINT_SIZE: u32 = 4;
const VPOINT_MARKER: &str = "x";
const VPOINT_COLOR: &str = "red";
const VLINE_WIDTH: u32 = 2;
const VLINE_COLOR: &str = "black";

// Perspective renders of the reference terrain and of each experiment's
// mean products, draped over the matching elevation surface.
pub fn run(session: &Session, config: &Config) -> Result<()> {
    fs::create_dir_all(&config.render_3d_dir)
        .with_context(|| format!("Failed to create {:?}", config.render_3d_dir))?;

    let _region = session.temp_region()?;

    // reference products over the reference elevation
    session.set_region(&config.reference_dem, config.resolution)?;
    drape(
        session,
        config,
        &config.reference_dem,
        &config.reference_dem,
        colors::DEM_RULES_3D,
        "dem",
    )?;
    drape(
        session,
        config,
        &config.reference_dem,
        &config.reference_depth,
        colors::DEPTH_RULES_3D,
        "depth",
    )?;
    drape(
        session,
        config,
        &config.reference_dem,
        &config.reference_depressions,
        colors::DEPRESSIONS_RULES_3D,
        "depressions",
    )?;
    drape(
        session,
        config,
        &config.reference_dem,
        &config.reference_diff,
        colors::GREY_RULES_3D,
        "diff",
    )?;

    // mean products over each experiment's mean elevation
    for i in 1..=config.experiments {
        let mean_dem = format!("mean_dem_{}", i);
        let mean_depth = format!("mean_depth_{}", i);
        let mean_depressions = format!("mean_depressions_{}", i);
        let mean_diff = format!("mean_diff_{}", i);
        let concentrated_points = format!("concentrated_points_{}", i);
        let flow_distance = format!("flow_distance_{}", i);

        session.set_region(&mean_dem, config.resolution)?;
        drape(
            session,
            config,
            &mean_dem,
            &mean_dem,
            colors::DEM_RULES_3D,
            &mean_dem,
        )?;
        drape(
            session,
            config,
            &mean_dem,
            &mean_depth,
            colors::DEPTH_RULES_3D,
            &mean_depth,
        )?;
        drape(
            session,
            config,
            &mean_dem,
            &mean_depressions,
            colors::DEPRESSIONS_RULES_3D,
            &mean_depressions,
        )?;
        drape(
            session,
            config,
            &mean_dem,
            &mean_diff,
            colors::FLOW_DIFFERENCE_RULES_3D,
            &mean_diff,
        )?;

        // flow distance composite: concentrated flow points plus the
        // connecting lines back to the reference flow path
        nviz(session, &mean_dem, &mean_diff, &config.render_3d_dir, &flow_distance)
            .arg("vpoint", &concentrated_points)
            .arg("vpoint_size", VPOINT_SIZE)
            .arg("vpoint_marker", VPOINT_MARKER)
            .arg("vpoint_color", VPOINT_COLOR)
            .arg("vline", &flow_distance)
            .arg("vline_width", VLINE_WIDTH)
            .arg("vline_color", VLINE_COLOR)
            .run()?;
    }

    println!("3D renders saved to {:?}", config.render_3d_dir);
    Ok(())
}

fn drape(
    session: &Session,
    config: &Config,
    elevation: &str,
    color_map: &str,
    rules: &str,
    name: &str,
) -> Result<()> {
    session
        .command("r.colors")
        .arg("map", color_map)
        .rules(rules)
        .run()?;
    nviz(session, elevation, color_map, &config.render_3d_dir, name).run()
}

fn nviz<'a>(
    session: &'a Session,
    elevation: &str,
    color_map: &str,
    dir: &Path,
    name: &str,
) -> crate::grass::session::ModuleCommand<'a> {
    session
        .command("m.nviz.image")
        .arg("elevation_map", elevation)
        .arg("color_map", color_map)
        .arg("resolution_fine", RES_3D)
        .arg("height", HEIGHT_3D)
        .arg("perspective", PERSPECTIVE)
        .arg("light_position", LIGHT_POSITION)
        .arg("fringe", FRINGE)
        .arg("fringe_color", FRINGE_COLOR)
        .arg("fringe_elevation", FRINGE_ELEVATION)
        .arg("output", dir.join(name).display())
        .arg("format", FORMAT_3D)
        .arg("size", SIZE_3D)
}
