use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "changegen")]
#[command(about = "Incremental, style-customized changelog generation from commit history")]
#[command(version)]
pub struct Cli {
    #[clap(flatten)]
    pub common: CommonArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Clone, Debug)]
pub struct CommonArgs {
    #[arg(long, global = true, help = "Path to the changelog document [default: CHANGELOG.md]")]
    pub changelog: Option<PathBuf>,

    #[arg(long, global = true, help = "Directory for the rewrite cache [default: .changegen next to the changelog]")]
    pub cache: Option<PathBuf>,

    #[arg(long, global = true, help = "Do not read or write the rewrite cache")]
    pub no_cache: bool,

    #[arg(short, long, global = true, help = "Log debug diagnostics")]
    pub verbose: bool,
}

#[derive(Args, Clone, Debug)]
pub struct GenerateArgs {
    #[arg(help = "GitHub repository: https://github.com/owner/repo, github.com/owner/repo or owner/repo")]
    pub source: Option<String>,

    #[arg(long, value_name = "PATH", conflicts_with = "source", help = "Read a local git repository instead of GitHub")]
    pub local: Option<PathBuf>,

    #[arg(short, long, help = "Branch to read (falls back to main, master, then the default branch)")]
    pub branch: Option<String>,

    #[arg(short = 'n', long, default_value = "100", help = "Number of recent commits to process, or \"all\"")]
    pub num_commits: String,

    #[arg(long, default_value = "day", help = "Group entries by day, week or month")]
    pub group_by: String,

    #[arg(long, default_value = "regular", help = "Writing style: playful, regular or corporate")]
    pub style: String,

    #[arg(long, default_value = "anthropic", help = "Rewrite provider: anthropic, openai or offline")]
    pub provider: String,

    #[arg(long, help = "Model name override for the provider")]
    pub model: Option<String>,

    #[arg(long, value_name = "YYYY-MM-DD", help = "Only include commits after this date")]
    pub after_date: Option<String>,

    #[arg(long, help = "Print the merged changelog instead of writing it")]
    pub dry_run: bool,

    #[arg(long, help = "Skip regenerating the summary section")]
    pub no_summary: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Collect new commits and prepend them to the changelog
    Generate(GenerateArgs),
    /// List the available writing styles
    Styles,
    /// Show the last date already recorded in the changelog
    Cutoff,
    /// Render commit records from a JSON file without any network access
    Preview {
        #[arg(long, help = "JSON array of {date, raw_first_line, rendered_entry} records")]
        input: PathBuf,

        #[arg(long, default_value = "day", help = "Group entries by day, week or month")]
        group_by: String,
    },
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    pub fn execute(self) -> Result<()> {
        match self.command {
            Commands::Generate(args) => crate::pipeline::exec(self.common, args),
            Commands::Styles => {
                crate::output::styles();
                Ok(())
            }
            Commands::Cutoff => crate::pipeline::exec_cutoff(self.common),
            Commands::Preview { input, group_by } => crate::pipeline::exec_preview(input, group_by),
        }
    }
}
