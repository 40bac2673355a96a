use anyhow::{Context, Result};
use std::path::Path;

use super::session::Session;
use super::stats::RasterInfo;
use crate::config::Config;

const DRIVER: &str = "cairo";

// Scoped render driver. Starting the monitor opens the output image;
// dropping the guard stops the driver so the image is flushed to disk.
// A failed stop is logged, never swallowed, and must not abort the run.
pub struct Monitor<'a> {
    session: &'a Session,
}

impl<'a> Monitor<'a> {
    pub fn start(session: &'a Session, width: u32, height: u32, output: &Path) -> Result<Self> {
        session
            .command("d.mon")
            .arg("start", DRIVER)
            .arg("width", width)
            .arg("height", height)
            .arg("output", output.display())
            .overwrite()
            .run()
            .with_context(|| format!("Failed to start the {} monitor", DRIVER))?;
        Ok(Monitor { session })
    }

    /// Monitor dimensions for a raster: half again as wide as the grid to
    /// leave room for the legend, exactly as tall.
    pub fn size_for(info: &RasterInfo) -> (u32, u32) {
        (info.cols + info.cols / 2, info.rows)
    }

    /// Drape a color raster over shaded relief.
    pub fn shade(&self, relief: &str, color: &str, brighten: u32) -> Result<()> {
        self.session
            .command("d.shade")
            .arg("shade", relief)
            .arg("color", color)
            .arg("brighten", brighten)
            .run()
    }

    pub fn vector(&self, map: &str) -> Result<()> {
        self.session
            .command("d.vect")
            .arg("map", map)
            .arg("display", "shape")
            .run()
    }

    pub fn legend(&self, raster: &str, config: &Config) -> Result<()> {
        let at = config.legend_at.map(|v| v.to_string()).join(",");
        self.session
            .command("d.legend")
            .arg("raster", raster)
            .arg("fontsize", config.legend_fontsize)
            .arg("at", at)
            .run()
    }
}

impl Drop for Monitor<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.session.command("d.mon").arg("stop", DRIVER).run() {
            eprintln!("warning: failed to stop the {} monitor: {:#}", DRIVER, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn monitor_is_half_again_as_wide_as_the_grid() {
        let info = RasterInfo {
            rows: 266,
            cols: 467,
        };
        assert_eq!(Monitor::size_for(&info), (700, 266));
    }
}
