mod app;
mod cli;
mod logging;
mod messages;
mod terminal;
mod trials;

pub use app::App;
use clap::Parser;

fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();
    let app = App::new(cli);
    app.run()?;

    Ok(())
}
