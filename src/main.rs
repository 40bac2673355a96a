use anyhow::{Result, ensure};

mod analysis;
mod cli;
mod colors;
mod config;
mod grass;
mod naming;
mod plot;
mod reference;
mod reinterpolate;
mod render3d;
mod summary;

use cli::{Driver, get_args};
use config::Config;
use grass::session::Session;

fn main() -> Result<()> {
    let args = get_args();
    ensure!(
        args.gisdbase.is_dir(),
        "GRASS database not found: {:?}",
        args.gisdbase
    );
    ensure!(args.experiments >= 1, "at least one experiment is required");

    let config = Config::new(&args.gisdbase, &args.location, args.experiments);
    let session = Session::new(&args.gisdbase, &args.location, &args.mapset);
    ensure!(
        session.mapset_path().is_dir(),
        "mapset not found: {:?}",
        session.mapset_path()
    );

    match args.driver {
        Driver::Reinterpolate => reinterpolate::run(&session, &config)?,
        Driver::Reference => reference::run(&session, &config)?,
        Driver::Analysis => analysis::run(&session, &config)?,
        Driver::Render3d => render3d::run(&session, &config)?,
    }

    Ok(())
}
