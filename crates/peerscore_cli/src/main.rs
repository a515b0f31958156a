//! Command-line front end for peerscore.
//!
//! # Responsibility
//! - Wire configuration, logging and the SQLite connection together.
//! - Expose account, group, rating and results use-cases as subcommands.
//!
//! # Invariants
//! - One connection per process run, opened after configuration is loaded.
//! - Passwords are accepted as arguments but never echoed.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use log::info;
use peerscore_core::db::open_db;
use peerscore_core::service::seed::seed_defaults;
use peerscore_core::service::transfer::{export_bundle, import_bundle, read_bundle, write_bundle};
use peerscore_core::{
    core_version, init_logging, load_config, AccountError, AccountService, AppConfig,
    RatingScales, RatingService, RegistrationRequest, ResultsService, RoleSet, ScoreReport,
    SqliteGroupRepository, SqliteIndividualRepository, SqliteRatingRepository,
};
use rusqlite::Connection;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "peerscore", version, about = "Peer evaluation scoring")]
struct Cli {
    /// Path to a peerscore.toml file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Overrides `database.path` from the configuration.
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create the schema and seed default groups and accounts.
    Init,
    /// Manage the group registry.
    #[command(subcommand)]
    Group(GroupCommand),
    /// Manage accounts.
    #[command(subcommand)]
    User(UserCommand),
    /// Check a username/password pair.
    Login {
        username: String,
        #[arg(long)]
        password: String,
    },
    /// List who a rater may score and on which scale.
    Targets { rater: String },
    /// Submit scores as `target=score` pairs.
    Rate {
        rater: String,
        #[arg(required = true, value_parser = parse_score_pair)]
        scores: Vec<(String, f64)>,
    },
    /// Show aggregated final scores.
    Results(ResultsArgs),
    /// Show every rating one target received.
    Details { target: String },
    /// Show per-day mean scores per target.
    Trend,
    /// Write all groups, users and scores to a JSON bundle.
    Export { file: PathBuf },
    /// Load a JSON bundle.
    Import { file: PathBuf },
    /// Print the core version.
    Version,
}

#[derive(Debug, Subcommand)]
enum GroupCommand {
    Add { name: String },
    Delete { name: String },
    List,
}

#[derive(Debug, Subcommand)]
enum UserCommand {
    Add {
        username: String,
        /// Display name.
        #[arg(long)]
        name: String,
        /// Comma-joined roles, e.g. `Student` or `Teacher,Admin`.
        #[arg(long, default_value = "Student")]
        roles: String,
        #[arg(long)]
        group: Option<String>,
        /// Defaults to `accounts.initial_password`.
        #[arg(long)]
        password: Option<String>,
    },
    List,
    /// Change a password; without `--old` this is an administrator reset.
    Passwd {
        username: String,
        #[arg(long)]
        new: String,
        /// Must repeat `--new`.
        #[arg(long)]
        confirm: String,
        #[arg(long)]
        old: Option<String>,
    },
}

#[derive(Debug, Args)]
struct ResultsArgs {
    /// Emit the full report as JSON.
    #[arg(long)]
    json: bool,
    /// Show group scores instead of individual rows.
    #[arg(long)]
    groups: bool,
}

fn main() {
    if let Err(err) = run(Cli::parse()) {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    if matches!(cli.command, Command::Version) {
        println!("peerscore_core version={}", core_version());
        return Ok(());
    }

    let mut config = load_config(cli.config.as_deref()).context("failed to load configuration")?;
    if let Some(db) = cli.db {
        config.database.path = db;
    }
    if let Some(dir) = &config.logging.dir {
        init_logging(&config.logging.level, dir).context("failed to initialize logging")?;
    }

    let conn = open_db(&config.database.path).with_context(|| {
        format!(
            "failed to open database `{}`",
            config.database.path.display()
        )
    })?;
    info!("event=cli_command module=cli status=start");

    match cli.command {
        Command::Init => run_init(&conn, &config),
        Command::Group(command) => run_group(&conn, command),
        Command::User(command) => run_user(&conn, &config, command),
        Command::Login { username, password } => {
            let individual = accounts(&conn)
                .authenticate(&username, &password)
                .context("login failed")?;
            println!(
                "welcome {} ({}) roles={} group={}",
                individual.display_name, individual.username, individual.roles, individual.group
            );
            Ok(())
        }
        Command::Targets { rater } => run_targets(&conn, &config, &rater),
        Command::Rate { rater, scores } => {
            let saved = ratings(&conn, &config)
                .submit(&rater, &scores)
                .context("rating submission rejected")?;
            println!("saved {saved} score(s) for {rater}");
            Ok(())
        }
        Command::Results(args) => run_results(&conn, &config, &args),
        Command::Details { target } => {
            let details = results(&conn, &config).rating_details(&target)?;
            if details.is_empty() {
                println!("no ratings for {target}");
            }
            for rating in details {
                println!("{:<20} {:>6.2}", rating.rater, rating.score);
            }
            Ok(())
        }
        Command::Trend => {
            for point in results(&conn, &config).daily_trend()? {
                println!(
                    "{} {:<20} mean={:.2} n={}",
                    point.day, point.target, point.mean_score, point.rating_count
                );
            }
            Ok(())
        }
        Command::Export { file } => {
            let bundle = export_bundle(&conn)?;
            write_bundle(&file, &bundle)
                .with_context(|| format!("failed to write `{}`", file.display()))?;
            println!(
                "exported {} group(s), {} user(s), {} score(s) to {}",
                bundle.groups.len(),
                bundle.users.len(),
                bundle.scores.len(),
                file.display()
            );
            Ok(())
        }
        Command::Import { file } => {
            let bundle = read_bundle(&file)
                .with_context(|| format!("failed to read `{}`", file.display()))?;
            let summary = import_bundle(&conn, &bundle, &config.accounts.initial_password)?;
            println!(
                "imported groups={} users={} (skipped {}) scores={}",
                summary.groups_created,
                summary.users_created,
                summary.users_skipped,
                summary.scores_saved
            );
            Ok(())
        }
        Command::Version => Ok(()),
    }
}

fn accounts(
    conn: &Connection,
) -> AccountService<SqliteIndividualRepository<'_>, SqliteGroupRepository<'_>> {
    AccountService::new(
        SqliteIndividualRepository::new(conn),
        SqliteGroupRepository::new(conn),
    )
}

fn ratings<'conn>(
    conn: &'conn Connection,
    config: &AppConfig,
) -> RatingService<SqliteIndividualRepository<'conn>, SqliteRatingRepository<'conn>> {
    RatingService::new(
        SqliteIndividualRepository::new(conn),
        SqliteRatingRepository::new(conn),
        RatingScales::from(&config.scoring),
    )
}

fn results<'conn>(
    conn: &'conn Connection,
    config: &AppConfig,
) -> ResultsService<SqliteIndividualRepository<'conn>, SqliteRatingRepository<'conn>> {
    ResultsService::new(
        SqliteIndividualRepository::new(conn),
        SqliteRatingRepository::new(conn),
        config.scoring.clone(),
    )
}

fn run_init(conn: &Connection, config: &AppConfig) -> Result<()> {
    let summary = seed_defaults(
        &SqliteIndividualRepository::new(conn),
        &SqliteGroupRepository::new(conn),
        &config.accounts.initial_password,
    )?;
    println!(
        "database ready at {}: created {} group(s), {} account(s)",
        config.database.path.display(),
        summary.groups_created,
        summary.individuals_created
    );
    Ok(())
}

fn run_group(conn: &Connection, command: GroupCommand) -> Result<()> {
    let service = accounts(conn);
    match command {
        GroupCommand::Add { name } => {
            let group = service.create_group(&name)?;
            println!("group {} added", group.name);
        }
        GroupCommand::Delete { name } => {
            service.delete_group(&name)?;
            println!("group {name} deleted");
        }
        GroupCommand::List => {
            for group in service.list_groups()? {
                println!("{}", group.name);
            }
        }
    }
    Ok(())
}

fn run_user(conn: &Connection, config: &AppConfig, command: UserCommand) -> Result<()> {
    let service = accounts(conn);
    match command {
        UserCommand::Add {
            username,
            name,
            roles,
            group,
            password,
        } => {
            let request = RegistrationRequest {
                username,
                display_name: name,
                roles: RoleSet::parse(&roles)?,
                group,
                password: password.unwrap_or_else(|| config.accounts.initial_password.clone()),
            };
            let individual = service.register(&request)?;
            println!(
                "user {} added to {} with roles {}",
                individual.username, individual.group, individual.roles
            );
        }
        UserCommand::List => {
            for individual in service.list_individuals()? {
                println!(
                    "{:<16} {:<24} {:<12} {}",
                    individual.username, individual.display_name, individual.group, individual.roles
                );
            }
        }
        UserCommand::Passwd {
            username,
            new,
            confirm,
            old,
        } => {
            match old {
                Some(old) => service.change_password(&username, &old, &new, &confirm)?,
                None if new != confirm => return Err(AccountError::PasswordMismatch.into()),
                None => service.reset_password(&username, &new)?,
            }
            println!("password updated for {username}");
        }
    }
    Ok(())
}

fn run_targets(conn: &Connection, config: &AppConfig, rater: &str) -> Result<()> {
    let service = ratings(conn, config);
    let rater_record = accounts(conn)
        .get_individual(rater)?
        .with_context(|| format!("unknown rater `{rater}`"))?;
    let max = service.scale_max_for(&rater_record)?;
    println!("{rater} rates on a 1..={max} scale:");
    for target in service.eligible_targets(rater)? {
        println!("  {:<16} {:<24} {}", target.username, target.display_name, target.group);
    }
    Ok(())
}

fn run_results(conn: &Connection, config: &AppConfig, args: &ResultsArgs) -> Result<()> {
    let report = results(conn, config).compute()?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }
    if args.groups {
        for group in &report.groups {
            println!(
                "{:<16} members={:<3} score={:.2}",
                group.group, group.member_count, group.group_score
            );
        }
        return Ok(());
    }
    print_individual_table(&report);
    Ok(())
}

fn print_individual_table(report: &ScoreReport) {
    println!(
        "{:<16} {:<24} {:<12} {:>8} {:>8} {:>8}",
        "username", "name", "group", "personal", "group", "final"
    );
    for row in &report.individuals {
        println!(
            "{:<16} {:<24} {:<12} {:>8.2} {:>8.2} {:>8.2}",
            row.username,
            row.display_name,
            row.group,
            row.personal_score,
            row.group_score,
            row.final_score
        );
    }
}

fn parse_score_pair(value: &str) -> Result<(String, f64)> {
    let Some((target, score)) = value.split_once('=') else {
        bail!("expected `target=score`, got `{value}`");
    };
    let score: f64 = score
        .trim()
        .parse()
        .with_context(|| format!("invalid score in `{value}`"))?;
    Ok((target.trim().to_string(), score))
}
