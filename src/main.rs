use anyhow::Context;
use clap::Parser;
use emudbg::debugger::Project;
use emudbg::ui::config::Config;
use emudbg::ui::console::print::style;
use emudbg::ui::console::AppBuilder;
use log::LevelFilter;
use std::io::IsTerminal;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Emulator executable, path or a name searched in PATH
    #[arg(long, env = "EMUDBG_EMULATOR")]
    emulator: Option<String>,

    /// Project directory, current directory by default
    #[arg(long, env = "EMUDBG_PROJECT")]
    project: Option<PathBuf>,

    /// Config file, `~/.config/emudbg/config.toml` by default
    #[arg(long)]
    config: Option<PathBuf>,

    /// File where breakpoints are kept between sessions
    #[arg(long)]
    breakpoints: Option<PathBuf>,

    /// Extension of the program image passed to emulator
    #[arg(long)]
    image_extension: Option<String>,

    /// Log level, `RUST_LOG` takes precedence
    #[arg(long, default_value_t = LevelFilter::Warn)]
    log_level: LevelFilter,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    emudbg::log::init(args.log_level).context("init logger")?;
    if !std::io::stdout().is_terminal() {
        style::set_colored(false);
    }

    let mut config = Config::load(args.config.as_deref())?;
    if let Some(emulator) = args.emulator {
        config.emulator = Some(emulator);
    }
    if let Some(ext) = args.image_extension {
        config.image_extension = ext;
    }
    if let Some(breakpoints) = args.breakpoints {
        config.breakpoints = Some(breakpoints);
    }

    let project_dir = match args.project {
        Some(dir) => dir,
        None => std::env::current_dir().context("get current directory")?,
    };
    let resolver = Project::from_dir(project_dir);

    let app = AppBuilder::new(config).build(&resolver)?;
    app.run()
}
