use anyhow::{Result, bail};

// Derived artifact names for one scanned DEM. Every product of the
// per-model pass is addressed by substituting the "dem" token, so a scan
// called "fort_dem_1" yields "fort_relief_1", "fort_depth_1" and so on.
#[derive(Debug, Clone)]
pub struct ModelNames {
    pub relief: String,
    pub contour: String,
    pub depth: String,
    pub difference: String,
    pub depressions: String,
}

impl ModelNames {
    pub fn derive(dem: &str) -> Result<Self> {
        Ok(ModelNames {
            relief: substitute(dem, "dem", "relief")?,
            contour: substitute(dem, "dem", "contour")?,
            depth: substitute(dem, "dem", "depth")?,
            difference: substitute(dem, "dem", "diff")?,
            depressions: substitute(dem, "dem", "depressions")?,
        })
    }
}

/// Replace every occurrence of `from` in `base`.
///
/// A base name that does not contain the source token would silently
/// mis-name every downstream artifact, so that case is an error.
pub fn substitute(base: &str, from: &str, to: &str) -> Result<String> {
    if !base.contains(from) {
        bail!("map name '{}' does not contain the token '{}'", base, from);
    }
    Ok(base.replace(from, to))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitution_round_trips() {
        let name = "fort_dem_1";
        let renamed = substitute(name, "dem", "depth").unwrap();
        assert_eq!(renamed, "fort_depth_1");
        assert_eq!(substitute(&renamed, "depth", "dem").unwrap(), name);
    }

    #[test]
    fn missing_token_is_an_error() {
        assert!(substitute("fort_relief_1", "dem", "depth").is_err());
    }

    #[test]
    fn replaces_every_occurrence() {
        assert_eq!(
            substitute("dem_scan_dem_2", "dem", "diff").unwrap(),
            "diff_scan_diff_2"
        );
    }

    #[test]
    fn model_names_share_the_suffix() {
        let names = ModelNames::derive("sandbox_dem_2").unwrap();
        assert_eq!(names.relief, "sandbox_relief_2");
        assert_eq!(names.contour, "sandbox_contour_2");
        assert_eq!(names.depth, "sandbox_depth_2");
        assert_eq!(names.difference, "sandbox_diff_2");
        assert_eq!(names.depressions, "sandbox_depressions_2");
    }
}
