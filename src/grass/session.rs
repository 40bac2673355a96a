use anyhow::{Context, Result, bail};
use std::collections::HashMap;
use std::fmt::Display;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicUsize, Ordering};

// Handle on one GRASS mapset. Every module invocation runs as
// `grass <mapset> --exec <module> ...` and blocks until the module exits;
// a non-zero exit is fatal to the run.
#[derive(Debug)]
pub struct Session {
    mapset_path: PathBuf,
}

impl Session {
    pub fn new(gisdbase: &Path, location: &str, mapset: &str) -> Self {
        Session {
            mapset_path: gisdbase.join(location).join(mapset),
        }
    }

    pub fn mapset_path(&self) -> &Path {
        &self.mapset_path
    }

    pub fn command(&self, module: &str) -> ModuleCommand<'_> {
        ModuleCommand {
            session: self,
            module: module.to_string(),
            args: Vec::new(),
            flags: String::new(),
            overwrite: false,
            stdin: None,
        }
    }

    /// Stored maps of one kind matching a glob-style pattern, sorted.
    /// Only the session's own mapset is searched, so reference maps in
    /// PERMANENT never show up as trials. `exclude` filters out maps whose
    /// names would otherwise collide with the pattern (reduction outputs on
    /// a rerun).
    pub fn list(&self, kind: &str, pattern: &str, exclude: &str) -> Result<Vec<String>> {
        let mut cmd = self
            .command("g.list")
            .arg("type", kind)
            .arg("mapset", ".")
            .arg("pattern", pattern);
        if !exclude.is_empty() {
            cmd = cmd.arg("exclude", exclude);
        }
        let out = cmd.output()?;
        let mut names: Vec<String> = out
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect();
        names.sort();
        Ok(names)
    }

    /// Force-remove scratch maps left behind by a processing step.
    pub fn remove(&self, kind: &str, names: &[&str]) -> Result<()> {
        self.command("g.remove")
            .flag('f')
            .arg("type", kind)
            .arg("name", names.join(","))
            .run()
    }

    /// Pin the active region to a raster's extent at the given resolution.
    pub fn set_region(&self, raster: &str, resolution: u32) -> Result<()> {
        self.command("g.region")
            .arg("raster", raster)
            .arg("res", resolution)
            .run()
    }

    /// Save the current region under a scratch name and restore it when the
    /// guard drops.
    pub fn temp_region(&self) -> Result<TempRegion<'_>> {
        let name = next_region_name();
        self.command("g.region").arg("save", &name).run()?;
        Ok(TempRegion {
            session: self,
            name,
        })
    }
}

fn next_region_name() -> String {
    static COUNTER: AtomicUsize = AtomicUsize::new(0);
    format!(
        "tmp_region_{}_{}",
        std::process::id(),
        COUNTER.fetch_add(1, Ordering::Relaxed)
    )
}

// One module invocation under construction.
pub struct ModuleCommand<'a> {
    session: &'a Session,
    module: String,
    args: Vec<String>,
    flags: String,
    overwrite: bool,
    stdin: Option<String>,
}

impl<'a> ModuleCommand<'a> {
    pub fn arg(mut self, key: &str, value: impl Display) -> Self {
        self.args.push(format!("{}={}", key, value));
        self
    }

    pub fn flag(mut self, flag: char) -> Self {
        self.flags.push(flag);
        self
    }

    pub fn overwrite(mut self) -> Self {
        self.overwrite = true;
        self
    }

    /// Feed rule text to the module on stdin (r.colors rules='-').
    pub fn rules(mut self, text: &str) -> Self {
        self.args.push("rules=-".to_string());
        self.stdin = Some(text.to_string());
        self
    }

    fn command_line(&self) -> Vec<String> {
        let mut line = vec![
            self.session.mapset_path.display().to_string(),
            "--exec".to_string(),
            self.module.clone(),
        ];
        if !self.flags.is_empty() {
            line.push(format!("-{}", self.flags));
        }
        line.extend(self.args.iter().cloned());
        if self.overwrite {
            line.push("--overwrite".to_string());
        }
        line
    }

    /// Run the module, discarding its stdout.
    pub fn run(self) -> Result<()> {
        self.output().map(|_| ())
    }

    /// Run the module and capture its stdout.
    pub fn output(self) -> Result<String> {
        let module = self.module.clone();
        let mut cmd = Command::new("grass");
        cmd.args(self.command_line());
        cmd.stdout(Stdio::piped()).stderr(Stdio::piped());

        let output = if let Some(text) = &self.stdin {
            cmd.stdin(Stdio::piped());
            let mut child = cmd
                .spawn()
                .with_context(|| format!("Failed to spawn {}", module))?;
            child
                .stdin
                .take()
                .context("stdin pipe missing")?
                .write_all(text.as_bytes())
                .with_context(|| format!("Failed to write rules to {}", module))?;
            child
                .wait_with_output()
                .with_context(|| format!("Failed to run {}", module))?
        } else {
            cmd.output()
                .with_context(|| format!("Failed to run {}", module))?
        };

        if !output.status.success() {
            bail!(
                "{} exited with {}: {}",
                module,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Run the module and parse its `key=value` stdout lines.
    pub fn parse(self) -> Result<HashMap<String, String>> {
        let module = self.module.clone();
        let out = self.output()?;
        let map = parse_key_values(&out);
        if map.is_empty() {
            bail!("{} produced no key=value output", module);
        }
        Ok(map)
    }
}

pub fn parse_key_values(text: &str) -> HashMap<String, String> {
    text.lines()
        .filter_map(|line| {
            let (key, value) = line.split_once('=')?;
            Some((key.trim().to_string(), value.trim().to_string()))
        })
        .collect()
}

// Scoped region override. The engine persists the active region in the
// mapset between invocations, so the guard restores the saved region and
// deletes it when the enclosing driver finishes.
pub struct TempRegion<'a> {
    session: &'a Session,
    name: String,
}

impl Drop for TempRegion<'_> {
    fn drop(&mut self) {
        if let Err(e) = self
            .session
            .command("g.region")
            .arg("region", &self.name)
            .run()
        {
            eprintln!("warning: failed to restore region {}: {:#}", self.name, e);
            return;
        }
        if let Err(e) = self.session.remove("region", &[&self.name]) {
            eprintln!("warning: failed to remove region {}: {:#}", self.name, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session::new(Path::new("/data/grassdata"), "sandbox", "analysis")
    }

    #[test]
    fn command_line_orders_flags_args_and_overwrite() {
        let line = session()
            .command("r.relief")
            .arg("input", "dem_1")
            .arg("output", "relief_1")
            .arg("altitude", 60)
            .overwrite()
            .command_line();
        assert_eq!(
            line,
            vec![
                "/data/grassdata/sandbox/analysis",
                "--exec",
                "r.relief",
                "input=dem_1",
                "output=relief_1",
                "altitude=60",
                "--overwrite",
            ]
        );
    }

    #[test]
    fn flags_collapse_into_one_token() {
        let line = session()
            .command("r.univar")
            .flag('g')
            .arg("map", "depressions")
            .command_line();
        assert_eq!(line[3], "-g");
        assert_eq!(line[4], "map=depressions");
    }

    #[test]
    fn rules_add_the_stdin_marker() {
        let cmd = session()
            .command("r.colors")
            .arg("map", "depth_1")
            .rules("0% aqua\n100% blue");
        assert!(cmd.command_line().contains(&"rules=-".to_string()));
        assert_eq!(cmd.stdin.as_deref(), Some("0% aqua\n100% blue"));
    }

    #[test]
    fn key_value_output_parses() {
        let kv = parse_key_values("rows=266\ncols=467\nnorth=120.5\n\nnonsense line\n");
        assert_eq!(kv.get("rows").map(String::as_str), Some("266"));
        assert_eq!(kv.get("cols").map(String::as_str), Some("467"));
        assert_eq!(kv.len(), 3);
    }

    #[test]
    fn scratch_region_names_are_unique() {
        assert_ne!(next_region_name(), next_region_name());
    }
}
