use chart_check::{run, Args};
use clap::Parser;

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();
    if !run(&args)? {
        std::process::exit(1);
    }
    Ok(())
}
