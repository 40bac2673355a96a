use anyhow::{Context, Result};
use std::collections::HashMap;
use std::str::FromStr;

use super::session::Session;

// Typed views over the engine's `key=value` descriptive output.

/// Grid geometry from `r.info -g`.
#[derive(Debug, Clone, Copy)]
pub struct RasterInfo {
    pub rows: u32,
    pub cols: u32,
}

impl RasterInfo {
    pub fn query(session: &Session, map: &str) -> Result<Self> {
        let kv = session
            .command("r.info")
            .flag('g')
            .arg("map", map)
            .parse()
            .with_context(|| format!("Failed to read metadata for {}", map))?;
        Ok(RasterInfo {
            rows: field(&kv, "rows")?,
            cols: field(&kv, "cols")?,
        })
    }
}

/// Cell statistics from `r.univar -g`.
#[derive(Debug, Clone, Copy)]
pub struct UnivarStats {
    pub n: u64,
    pub null_cells: u64,
    pub mean: f64,
    pub max: f64,
    pub sum: f64,
}

impl UnivarStats {
    pub fn query(session: &Session, map: &str) -> Result<Self> {
        let kv = session
            .command("r.univar")
            .flag('g')
            .arg("map", map)
            .parse()
            .with_context(|| format!("Failed to read cell statistics for {}", map))?;
        Ok(UnivarStats {
            n: field(&kv, "n")?,
            null_cells: field(&kv, "null_cells")?,
            mean: field(&kv, "mean")?,
            max: field(&kv, "max")?,
            sum: field(&kv, "sum")?,
        })
    }

    pub fn total_cells(&self) -> u64 {
        self.n + self.null_cells
    }
}

/// Attribute-column statistics from `v.db.univar -g`.
#[derive(Debug, Clone, Copy)]
pub struct ColumnStats {
    pub n: u64,
    pub mean: f64,
    pub sum: f64,
}

impl ColumnStats {
    pub fn query(session: &Session, map: &str, column: &str) -> Result<Self> {
        let kv = session
            .command("v.db.univar")
            .flag('g')
            .arg("map", map)
            .arg("column", column)
            .parse()
            .with_context(|| format!("Failed to read column {} of {}", column, map))?;
        Ok(ColumnStats {
            n: field(&kv, "n")?,
            mean: field(&kv, "mean")?,
            sum: field(&kv, "sum")?,
        })
    }
}

fn field<T: FromStr>(kv: &HashMap<String, String>, key: &str) -> Result<T> {
    let raw = kv
        .get(key)
        .with_context(|| format!("missing '{}' in module output", key))?;
    raw.parse::<T>()
        .ok()
        .with_context(|| format!("'{}={}' is not numeric", key, raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grass::session::parse_key_values;

    #[test]
    fn univar_fields_parse() {
        let kv = parse_key_values(
            "n=40\nnull_cells=960\ncells=1000\nmin=0.01\nmax=2.5\nmean=0.4\nsum=16.0\n",
        );
        let n: u64 = field(&kv, "n").unwrap();
        let nulls: u64 = field(&kv, "null_cells").unwrap();
        let sum: f64 = field(&kv, "sum").unwrap();
        assert_eq!(n, 40);
        assert_eq!(nulls, 960);
        assert_eq!(sum, 16.0);
    }

    #[test]
    fn missing_field_is_an_error() {
        let kv = parse_key_values("rows=266\n");
        assert!(field::<u32>(&kv, "cols").is_err());
    }

    #[test]
    fn non_numeric_field_is_an_error() {
        let kv = parse_key_values("sum=lots\n");
        assert!(field::<f64>(&kv, "sum").is_err());
    }

    #[test]
    fn total_cells_adds_nulls_back() {
        let stats = UnivarStats {
            n: 40,
            null_cells: 960,
            mean: 0.4,
            max: 2.5,
            sum: 16.0,
        };
        assert_eq!(stats.total_cells(), 1000);
    }
}
