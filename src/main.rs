use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use partial_stage::{PartialStager, SelectionSummary};
use std::io;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "partial-stage", version)]
#[command(about = "Select individual diff lines by index and stage them")]
struct Cli {
    /// Repository to operate on
    #[arg(long, global = true, default_value = ".")]
    repo: PathBuf,

    /// Lines of context around each change
    #[arg(short = 'U', long = "unified", global = true, default_value_t = 3)]
    context: u32,

    /// Log debug output (otherwise RUST_LOG applies)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a file's diff with the global index of every line
    Show {
        /// File to diff
        file: String,
        /// Show the changes of this commit instead of the working tree
        #[arg(long)]
        commit: Option<String>,
        /// Selection to mark lines with
        #[arg(long, value_enum, default_value_t = DefaultSelection::All)]
        default: DefaultSelection,
    },
    /// Stage lines by index (e.g. "4", "2..9", "5:on", "3..4:off", comma separated)
    Stage {
        /// File to stage from
        file: String,
        /// Selection expression over the indices printed by `show`
        selectors: String,
        /// Selection the expression starts from
        #[arg(long, value_enum, default_value_t = DefaultSelection::None)]
        default: DefaultSelection,
        /// Print the patch instead of applying it
        #[arg(long)]
        dry_run: bool,
    },
    /// Generate shell completions
    Completions {
        shell: clap_complete::Shell,
    },
    /// Print the man page
    Man,
}

#[derive(Clone, Copy, ValueEnum)]
enum DefaultSelection {
    All,
    None,
}

impl From<DefaultSelection> for SelectionSummary {
    fn from(value: DefaultSelection) -> Self {
        match value {
            DefaultSelection::All => SelectionSummary::All,
            DefaultSelection::None => SelectionSummary::None,
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut logger =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if cli.verbose {
        logger.filter_level(log::LevelFilter::Debug);
    }
    logger.init();

    let stager = PartialStager::new(&cli.repo).with_context_lines(cli.context);

    match cli.command {
        Commands::Show {
            file,
            commit,
            default,
        } => {
            print!("{}", stager.show(&file, commit, default.into())?);
        }
        Commands::Stage {
            file,
            selectors,
            default,
            dry_run,
        } => {
            let outcome = stager.stage(&file, &selectors, default.into(), !dry_run)?;
            if dry_run {
                print!("{}", outcome.patch);
            } else {
                eprintln!("Staged {} ({:?} selected)", file, outcome.summary);
            }
        }
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "partial-stage", &mut io::stdout());
        }
        Commands::Man => {
            clap_mangen::Man::new(Cli::command()).render(&mut io::stdout())?;
        }
    }

    Ok(())
}
