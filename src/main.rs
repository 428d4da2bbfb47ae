use clap::{Args, Parser, Subcommand, ValueEnum};
use std::fmt;
use std::fs::File;
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use judge_tally::admin::{self, AdminToken};
use judge_tally::aggregate::{self, SummaryFilter};
use judge_tally::evaluations::{self, EvaluationInput};
use judge_tally::output;
use judge_tally::scoring::{ScoreModel, ScoreModelError, ScoreSet};
use judge_tally::store::{get_data_path, JsonStore, Store};
use judge_tally::teams::{import_teams, read_team_rows, TeamInput, TeamRegistry};

// Exit codes
const EXIT_SUCCESS: i32 = 0;
const EXIT_ADMIN: i32 = 1;
const EXIT_STORE: i32 = 2;
const EXIT_REJECTED: i32 = 3;
const EXIT_CONFIG: i32 = 4;

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a config file interactively
    Init,
    /// List and manage teams
    #[command(subcommand)]
    Teams(TeamsCommand),
    /// Record one judge's evaluation of a team
    Submit {
        /// Judge name
        #[arg(long)]
        judge: String,
        /// Team id (see `teams list`)
        #[arg(long)]
        team: u64,
        /// Score as FIELD=VALUE; VALUE may be a number or a label
        #[arg(long = "score", value_name = "FIELD=VALUE", required = true)]
        scores: Vec<String>,
        #[arg(long)]
        comments: Option<String>,
    },
    /// List and manage raw evaluations
    #[command(subcommand)]
    Evaluations(EvaluationsCommand),
    /// Teams ranked by average total score
    Leaderboard {
        #[command(flatten)]
        filter: FilterArgs,
        /// Split the leaderboard per location
        #[arg(long, conflicts_with = "by_tier")]
        by_location: bool,
        /// Group teams by proficiency tier
        #[arg(long)]
        by_tier: bool,
        #[arg(long, value_enum, default_value_t = Format::Table)]
        format: Format,
    },
    /// Per-criterion detail for one team
    Summary {
        team_id: u64,
    },
    /// Print the active score model and tier thresholds
    Model,
}

#[derive(Subcommand, Debug)]
enum TeamsCommand {
    /// List teams judges can pick from
    List {
        /// Include inactive teams
        #[arg(long)]
        all: bool,
    },
    /// Register a team (admin)
    Add {
        #[command(flatten)]
        attrs: TeamArgs,
        /// Register the team as inactive
        #[arg(long)]
        inactive: bool,
    },
    /// Change a team's attributes; unspecified ones are kept (admin)
    Edit {
        id: u64,
        #[command(flatten)]
        attrs: TeamArgs,
        #[arg(long)]
        active: Option<bool>,
    },
    /// Delete a team without evaluations (admin)
    Delete { id: u64 },
    /// Register teams from a CSV file with number,name,location columns (admin)
    Import { file: PathBuf },
}

#[derive(Subcommand, Debug)]
enum EvaluationsCommand {
    /// List raw evaluations
    List {
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Replace the scores of an evaluation (admin)
    Edit {
        id: u64,
        #[arg(long = "score", value_name = "FIELD=VALUE", required = true)]
        scores: Vec<String>,
    },
    /// Delete one evaluation (admin)
    Delete { id: u64 },
    /// Delete all evaluations, or those of one team (admin)
    Purge {
        #[arg(long)]
        team: Option<u64>,
        /// Confirm the bulk delete
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Args, Debug)]
struct TeamArgs {
    #[arg(long)]
    number: Option<i64>,
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    location: Option<String>,
}

#[derive(Args, Debug)]
struct FilterArgs {
    /// Only this team id
    #[arg(long)]
    team: Option<u64>,
    /// Only teams at this location
    #[arg(long)]
    location: Option<String>,
    /// Only judges whose name contains this (case-insensitive)
    #[arg(long)]
    judge: Option<String>,
}

impl From<FilterArgs> for SummaryFilter {
    fn from(args: FilterArgs) -> Self {
        SummaryFilter {
            team_id: args.team,
            location: args.location,
            participant: args.judge,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Format {
    Table,
    Tsv,
    Csv,
}

#[derive(Parser, Debug)]
#[command(name = "judge-tally")]
#[command(about = "Presentation judging: collect scores, rank teams", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to config file (defaults to ~/.config/judge-tally/config.yaml)
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Path to the data file (overrides data_path from the config)
    #[arg(long, global = true)]
    data: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Why a subcommand failed; decides the exit code.
enum CommandError {
    Admin(anyhow::Error),
    Domain(judge_tally::Error),
    Usage(String),
    Store(anyhow::Error),
}

impl CommandError {
    fn exit_code(&self) -> i32 {
        match self {
            CommandError::Admin(_) => EXIT_ADMIN,
            CommandError::Domain(judge_tally::Error::Store(_)) | CommandError::Store(_) => {
                EXIT_STORE
            }
            CommandError::Domain(_) | CommandError::Usage(_) => EXIT_REJECTED,
        }
    }
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandError::Admin(e) => write!(f, "Admin error: {:#}", e),
            CommandError::Domain(e) => write!(f, "{}", e),
            CommandError::Usage(msg) => write!(f, "{}", msg),
            CommandError::Store(e) => write!(f, "Store error: {:#}", e),
        }
    }
}

impl From<judge_tally::Error> for CommandError {
    fn from(e: judge_tally::Error) -> Self {
        CommandError::Domain(e)
    }
}

impl From<anyhow::Error> for CommandError {
    fn from(e: anyhow::Error) -> Self {
        CommandError::Store(e)
    }
}

type CommandResult = Result<(), CommandError>;

/// Everything a subcommand needs once startup has succeeded.
struct App {
    model: ScoreModel,
    locations: Vec<String>,
    store: JsonStore,
    use_colors: bool,
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    // stderr keeps stdout clean for TSV/CSV output
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    if let Err(err) = tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .try_init()
    {
        eprintln!("tracing init failed: {err}");
    }
}

fn require_admin() -> Result<AdminToken, CommandError> {
    admin::authorize().map_err(CommandError::Admin)
}

/// Parse `FIELD=VALUE` pairs. Values may be labels of the field.
fn parse_scores(model: &ScoreModel, raw: &[String]) -> Result<ScoreSet, CommandError> {
    let mut scores = ScoreSet::new();
    for pair in raw {
        let (field, value) = pair
            .split_once('=')
            .ok_or_else(|| CommandError::Usage(format!("Expected FIELD=VALUE, got '{}'", pair)))?;
        let field = field.trim();
        let value = match model.value_for_label(field, value) {
            Ok(v) => v,
            // Undeclared fields go through so validation reports them
            Err(ScoreModelError::UnknownField(_)) => value.trim().parse::<i64>().map_err(|_| {
                CommandError::Usage(format!("Unknown score field '{}'", field))
            })?,
            Err(e) => return Err(CommandError::Usage(e.to_string())),
        };
        if scores.insert(field.to_string(), value).is_some() {
            return Err(CommandError::Usage(format!(
                "Score for '{}' given more than once",
                field
            )));
        }
    }
    Ok(scores)
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let config_path = cli.config.map(PathBuf::from);

    if let Commands::Init = cli.command {
        if let Err(e) = judge_tally::config::init::run_init_wizard(config_path) {
            eprintln!("Init failed: {:#}", e);
            std::process::exit(EXIT_CONFIG);
        }
        std::process::exit(EXIT_SUCCESS);
    }

    // Load config
    let config = match judge_tally::config::load_config(config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {:#}", e);
            std::process::exit(EXIT_CONFIG);
        }
    };

    if let Err(errors) = judge_tally::config::validate_config(&config) {
        eprintln!("Config errors:");
        for error in errors {
            eprintln!("  - {}", error);
        }
        std::process::exit(EXIT_CONFIG);
    }

    // Resolve the score model once; everything downstream uses it
    let model = match ScoreModel::from_config(&config.scoring) {
        Ok(m) => m,
        Err(errors) => {
            eprintln!("Scoring config errors:");
            for error in errors {
                eprintln!("  - {}", error);
            }
            std::process::exit(EXIT_CONFIG);
        }
    };
    debug!(
        model = model.name(),
        fields = model.fields().len(),
        total_max = model.total_max(),
        "Score model ready"
    );

    let data_path = cli
        .data
        .or(config.data_path)
        .unwrap_or_else(get_data_path);
    let store = match JsonStore::open(&data_path, model.name()) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Store error: {:#}", e);
            std::process::exit(EXIT_STORE);
        }
    };

    let mut app = App {
        model,
        locations: config.locations,
        store,
        use_colors: output::should_use_colors(),
    };

    let result = match cli.command {
        Commands::Init => Ok(()),
        Commands::Teams(cmd) => run_teams(&mut app, cmd),
        Commands::Submit {
            judge,
            team,
            scores,
            comments,
        } => run_submit(&mut app, judge, team, &scores, comments),
        Commands::Evaluations(cmd) => run_evaluations(&mut app, cmd),
        Commands::Leaderboard {
            filter,
            by_location,
            by_tier,
            format,
        } => run_leaderboard(&app, filter.into(), by_location, by_tier, format),
        Commands::Summary { team_id } => run_summary(&mut app, team_id),
        Commands::Model => {
            println!("{}", output::format_model(&app.model));
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{}", e);
        std::process::exit(e.exit_code());
    }

    std::process::exit(EXIT_SUCCESS);
}

fn run_teams(app: &mut App, cmd: TeamsCommand) -> CommandResult {
    let mut registry = TeamRegistry::new(&mut app.store, &app.locations);

    match cmd {
        TeamsCommand::List { all } => {
            let teams = if all {
                registry.list_all()?
            } else {
                registry.list_active()?
            };
            println!("{}", output::format_team_list(&teams, app.use_colors));
        }
        TeamsCommand::Add { attrs, inactive } => {
            let token = require_admin()?;
            let input = TeamInput {
                number: attrs.number,
                name: attrs.name,
                location: attrs.location,
                active: Some(!inactive),
            };
            let team = registry.create(&token, &input)?;
            println!("Created team {}: {}", team.id, team.display_name());
        }
        TeamsCommand::Edit { id, attrs, active } => {
            let token = require_admin()?;
            let mut input = TeamInput::from(&registry.resolve(id)?);
            if let Some(number) = attrs.number {
                input.number = Some(number);
            }
            if attrs.name.is_some() {
                input.name = attrs.name;
            }
            if attrs.location.is_some() {
                input.location = attrs.location;
            }
            if active.is_some() {
                input.active = active;
            }
            let team = registry.update(&token, id, &input)?;
            println!("Updated team {}: {}", team.id, team.display_name());
        }
        TeamsCommand::Delete { id } => {
            let token = require_admin()?;
            registry.delete(&token, id)?;
            println!("Deleted team {}", id);
        }
        TeamsCommand::Import { file } => {
            let token = require_admin()?;
            let reader = File::open(&file).map_err(|e| {
                CommandError::Usage(format!("Cannot open {}: {}", file.display(), e))
            })?;
            let rows = read_team_rows(reader).map_err(|e| CommandError::Usage(format!("{:#}", e)))?;
            let report = import_teams(&mut registry, &token, rows);
            println!("{}", output::format_import_report(&report));
        }
    }
    Ok(())
}

fn run_submit(
    app: &mut App,
    judge: String,
    team: u64,
    raw_scores: &[String],
    comments: Option<String>,
) -> CommandResult {
    let scores = parse_scores(&app.model, raw_scores)?;
    let input = EvaluationInput {
        participant_name: judge,
        team_id: team,
        scores,
        comments,
    };
    let id = evaluations::submit_evaluation(&mut app.store, &app.model, &input)?;
    println!(
        "Recorded evaluation {} (total {})",
        id,
        output::format_total(app.model.total_score(&input.scores) as f64, app.model.total_max())
    );
    Ok(())
}

fn run_evaluations(app: &mut App, cmd: EvaluationsCommand) -> CommandResult {
    match cmd {
        EvaluationsCommand::List { filter } => {
            let all = app.store.evaluations()?;
            let teams = app.store.teams()?;
            let matching = aggregate::filter_evaluations(&all, &teams, &filter.into());
            println!(
                "{}",
                output::format_evaluation_list(&matching, &teams, &app.model, app.use_colors)
            );
        }
        EvaluationsCommand::Edit { id, scores } => {
            let token = require_admin()?;
            let scores = parse_scores(&app.model, &scores)?;
            let edited = evaluations::edit_scores(&mut app.store, &app.model, &token, id, scores)?;
            println!(
                "Updated evaluation {} (total {})",
                edited.id,
                output::format_total(
                    app.model.total_score(&edited.scores) as f64,
                    app.model.total_max()
                )
            );
        }
        EvaluationsCommand::Delete { id } => {
            let token = require_admin()?;
            evaluations::delete_evaluation(&mut app.store, &token, id)?;
            println!("Deleted evaluation {}", id);
        }
        EvaluationsCommand::Purge { team, yes } => {
            let token = require_admin()?;
            if !yes {
                let pending = app
                    .store
                    .evaluations()?
                    .iter()
                    .filter(|e| team.map_or(true, |t| e.team_id == t))
                    .count();
                return Err(CommandError::Usage(format!(
                    "This would delete {} evaluation(s). Re-run with --yes to confirm.",
                    pending
                )));
            }
            let removed = evaluations::purge_evaluations(&mut app.store, &token, team)?;
            println!("Deleted {} evaluation(s)", removed);
        }
    }
    Ok(())
}

/// Grouped views only exist as tables; CSV and TSV rows carry no group.
fn check_grouping(format: Format, by_location: bool, by_tier: bool) -> CommandResult {
    if format != Format::Table && (by_location || by_tier) {
        let flag = if by_location { "--by-location" } else { "--by-tier" };
        return Err(CommandError::Usage(format!(
            "{} only applies to the table format",
            flag
        )));
    }
    Ok(())
}

fn run_leaderboard(
    app: &App,
    filter: SummaryFilter,
    by_location: bool,
    by_tier: bool,
    format: Format,
) -> CommandResult {
    check_grouping(format, by_location, by_tier)?;
    let all = app.store.evaluations()?;
    let teams = app.store.teams()?;
    let summaries = aggregate::leaderboard(&all, &teams, &app.model, &filter);

    match format {
        Format::Csv => {
            output::write_summaries_csv(std::io::stdout().lock(), &summaries, &app.model)?;
        }
        Format::Tsv => {
            let tsv = output::format_tsv(&summaries);
            if !tsv.is_empty() {
                println!("{}", tsv);
            }
        }
        Format::Table if by_location => {
            let groups = aggregate::group_by_location(&summaries, &app.locations);
            println!(
                "{}",
                output::format_location_groups(&groups, &app.model, app.use_colors)
            );
        }
        Format::Table if by_tier => {
            let groups = aggregate::group_by_tier(&summaries);
            println!(
                "{}",
                output::format_tier_groups(&groups, &app.model, app.use_colors)
            );
            println!();
            println!(
                "{}",
                output::format_tier_distribution(&aggregate::tier_distribution(&summaries))
            );
        }
        Format::Table => {
            println!(
                "{}",
                output::format_leaderboard(&summaries, &app.model, app.use_colors)
            );
        }
    }
    Ok(())
}

fn run_summary(app: &mut App, team_id: u64) -> CommandResult {
    let team = TeamRegistry::new(&mut app.store, &app.locations).resolve(team_id)?;
    let all = app.store.evaluations()?;
    let teams = app.store.teams()?;
    let filter = SummaryFilter {
        team_id: Some(team_id),
        ..Default::default()
    };

    match aggregate::summarize(&all, &teams, &app.model, &filter).first() {
        Some(summary) => println!(
            "{}",
            output::format_team_detail(summary, &app.model, app.use_colors)
        ),
        None => println!("{}: no evaluations yet.", team.display_name()),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaderboard_args(args: &[&str]) -> (bool, bool, Format) {
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Commands::Leaderboard {
                by_location,
                by_tier,
                format,
                ..
            } => (by_location, by_tier, format),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_grouping_with_flat_format_rejected() {
        let (by_location, by_tier, format) =
            leaderboard_args(&["judge-tally", "leaderboard", "--by-location", "--format", "csv"]);
        match check_grouping(format, by_location, by_tier) {
            Err(err @ CommandError::Usage(_)) => {
                assert_eq!(err.exit_code(), EXIT_REJECTED);
                assert!(err.to_string().contains("--by-location"));
            }
            _ => panic!("expected a usage error"),
        }

        let (by_location, by_tier, format) =
            leaderboard_args(&["judge-tally", "leaderboard", "--by-tier", "--format", "tsv"]);
        assert!(check_grouping(format, by_location, by_tier).is_err());
    }

    #[test]
    fn test_grouping_with_table_accepted() {
        let (by_location, by_tier, format) =
            leaderboard_args(&["judge-tally", "leaderboard", "--by-tier"]);
        assert!(check_grouping(format, by_location, by_tier).is_ok());

        let (by_location, by_tier, format) =
            leaderboard_args(&["judge-tally", "leaderboard", "--format", "csv"]);
        assert!(check_grouping(format, by_location, by_tier).is_ok());
    }
}
