use clap::Parser;
use lucide_svg_rs::{logging, run_cli, Cli};
use anyhow::Result;

fn main() -> Result<()>{
    let cli = Cli::parse();
    logging::init(cli.verbose);
    println!("{}", run_cli(cli)?);
    Ok(())
}
