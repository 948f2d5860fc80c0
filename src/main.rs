use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cfg = pointwave::config::Config::parse();
    if cfg.list_devices {
        pointwave::audio::list_input_devices()?;
        return Ok(());
    }

    pointwave::app::run(cfg)
}
