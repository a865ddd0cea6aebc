use std::io::Read;
use std::path::{Path, PathBuf};

use clap::Parser;
use miette::{Context, IntoDiagnostic, Result};
use tracing_subscriber::EnvFilter;

use prcov_core::{OutputFormat, PrcovConfig};
use prcov_coverage::clover::CoverageDocument;
use prcov_coverage::{correlate, CoverageResult};
use prcov_difflens::filter::PathFilter;
use prcov_difflens::index::AddedLineSet;
use prcov_difflens::model::DiffDocument;
use prcov_stash::StashClient;

const DEFAULT_CONFIG: &str = ".prcov.toml";

#[derive(Parser)]
#[command(
    name = "prcov",
    version,
    about = "Code coverage of the lines a pull request adds",
    long_about = "Code coverage of the lines a pull request adds.\n\n\
                   Fetches the pull-request diff from Bitbucket Server, matches every added line\n\
                   against a Clover coverage report, and prints the share of added statements\n\
                   that ran during the tests, per file and overall.\n\n\
                   Examples:\n  \
                     prcov -x build/clover.xml -p SHOP -n web -i 42 -b /build/web/ \\\n  \
                           -s https://stash.example.com/rest/api/1.0 -u ci-bot -w \"$PASSWORD\"\n  \
                     git diff main | prcov -x build/clover.xml -b \"$PWD/\" --diff-file -"
)]
struct Cli {
    /// Clover XML coverage report
    #[arg(short = 'x', long)]
    clover_xml: PathBuf,

    /// Stash project key
    #[arg(short = 'p', long, required_unless_present = "diff_file")]
    stash_project: Option<String>,

    /// Stash repository name
    #[arg(short = 'n', long, required_unless_present = "diff_file")]
    repo_name: Option<String>,

    /// Pull request id
    #[arg(short = 'i', long, required_unless_present = "diff_file")]
    pr_id: Option<u64>,

    /// Prefix that turns diff paths into coverage report paths
    #[arg(
        short = 'b',
        long,
        long_help = "Prefix that turns diff paths into coverage report paths.\n\n\
                       Concatenated verbatim with each repository-relative diff path, so it\n\
                       usually needs a trailing slash (e.g. /build/web/)."
    )]
    base_repo_path: String,

    /// Stash REST API base URL
    #[arg(short = 's', long, required_unless_present = "diff_file")]
    stash_api: Option<String>,

    /// Stash API user
    #[arg(short = 'u', long, required_unless_present = "diff_file")]
    stash_user: Option<String>,

    /// Stash API password
    #[arg(
        short = 'w',
        long,
        env = "PRCOV_STASH_PASSWORD",
        hide_env_values = true,
        required_unless_present = "diff_file"
    )]
    stash_password: Option<String>,

    /// Read a unified diff from a file ('-' for stdin) instead of calling Stash
    #[arg(
        long,
        conflicts_with_all = ["stash_project", "repo_name", "pr_id", "stash_api", "stash_user"]
    )]
    diff_file: Option<PathBuf>,

    /// Path to configuration file (default: .prcov.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        default_value = "text",
        long_help = "Output format for the report.\n\n\
                       Formats:\n  \
                         text      Plain text summary (default)\n  \
                         json      Machine-readable JSON with camelCase keys\n  \
                         markdown  GitHub/Bitbucket-flavored Markdown table"
    )]
    format: OutputFormat,

    /// Exit with a non-zero code if total coverage is below this percentage
    #[arg(long)]
    fail_under: Option<f64>,

    /// Enable verbose output
    #[arg(long, short)]
    verbose: bool,
}

enum DiffSource<'a> {
    File(&'a Path),
    Stash {
        api: &'a str,
        user: &'a str,
        password: &'a str,
        project: &'a str,
        repo: &'a str,
        pr_id: u64,
    },
}

impl<'a> DiffSource<'a> {
    fn from_cli(cli: &'a Cli) -> Result<Self> {
        if let Some(path) = &cli.diff_file {
            return Ok(DiffSource::File(path));
        }
        match (
            &cli.stash_api,
            &cli.stash_user,
            &cli.stash_password,
            &cli.stash_project,
            &cli.repo_name,
            cli.pr_id,
        ) {
            (Some(api), Some(user), Some(password), Some(project), Some(repo), Some(pr_id)) => {
                Ok(DiffSource::Stash {
                    api,
                    user,
                    password,
                    project,
                    repo,
                    pr_id,
                })
            }
            _ => Err(miette::miette!(
                help = "pass all Stash flags, or --diff-file for a local diff",
                "missing pull request source"
            )),
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "prcov=debug,warn" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<PrcovConfig> {
    let config = match path {
        Some(path) => PrcovConfig::from_file(path)?,
        None => {
            let default_path = Path::new(DEFAULT_CONFIG);
            if default_path.exists() {
                PrcovConfig::from_file(default_path)?
            } else {
                PrcovConfig::default()
            }
        }
    };
    Ok(config)
}

fn read_diff_file(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut input = String::new();
        std::io::stdin()
            .read_to_string(&mut input)
            .into_diagnostic()
            .wrap_err("reading stdin")?;
        return Ok(input);
    }
    std::fs::read_to_string(path)
        .into_diagnostic()
        .wrap_err(format!("reading {}", path.display()))
}

async fn load_diff(source: &DiffSource<'_>, config: &PrcovConfig) -> Result<DiffDocument> {
    match *source {
        DiffSource::File(path) => {
            let input = read_diff_file(path)?;
            Ok(prcov_difflens::parser::parse_unified_diff(&input)?)
        }
        DiffSource::Stash {
            api,
            user,
            password,
            project,
            repo,
            pr_id,
        } => {
            let client = StashClient::new(api, user, password, &config.stash)?;
            Ok(client.fetch_diff(project, repo, pr_id).await?)
        }
    }
}

fn print_report(result: &CoverageResult, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&result.summary()).into_diagnostic()?
            );
        }
        OutputFormat::Markdown => {
            print!("{}", result.to_markdown());
        }
        OutputFormat::Text => {
            println!("{result}");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .build(),
        )
    }))
    .expect("miette handler");
    human_panic::setup_panic!();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = load_config(cli.config.as_deref())?;
    let filter = PathFilter::from_config(&config.report)?;
    let source = DiffSource::from_cli(&cli)?;

    let report = CoverageDocument::from_file(&cli.clover_xml, &config.coverage)?;
    tracing::info!(
        files = report.file_count(),
        lines = report.line_count(),
        "loaded coverage report"
    );

    let diff = load_diff(&source, &config).await?;

    let mut added = AddedLineSet::from_diff(&diff);
    let excluded = filter.apply(&mut added);
    if cli.verbose {
        eprintln!(
            "{} files in diff ({} excluded), {} added lines",
            added.len() + excluded,
            excluded,
            added.total_lines()
        );
    }

    let result = CoverageResult::new(correlate(&added, &report, &cli.base_repo_path));
    print_report(&result, cli.format)?;

    if let Some(threshold) = cli.fail_under.or(config.report.fail_under) {
        if !result.meets_threshold(threshold) {
            eprintln!(
                "coverage of added statements {:.2}% is below the required {threshold}%",
                result.total_coverage_percent()
            );
            std::process::exit(1);
        }
    }

    Ok(())
}
