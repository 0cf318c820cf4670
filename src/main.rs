#[cfg(feature = "dhat-heap")]
#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

use anyhow::Result;
use clap::Parser;

use quire::cli::CliArgs;
use quire::EditorConfig;

fn main() -> Result<()> {
    #[cfg(feature = "dhat-heap")]
    let _profiler = dhat::Profiler::new_heap();

    quire::tracing::init();

    let args = CliArgs::parse();
    let config = match &args.config {
        Some(path) => EditorConfig::load_from(path),
        None => EditorConfig::load(),
    };

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    args.command.run(&config, &mut out)
}
