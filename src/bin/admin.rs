//! Scriptable edits for the games board: points, schedules, daily info,
//! game status and brackets.
//!
//! ```bash
//! gamesboard-admin points add "Math/Physics" 25
//! gamesboard-admin schedule set 3 2 day2.txt
//! gamesboard-admin info set 1 -
//! gamesboard-admin bracket set mario-kart bracket.json
//! ```
//!
//! Exits 0 on success, 1 when a read or write fails, 2 on a usage error.

use anyhow::{Context, anyhow};
use clap::{Parser, Subcommand};
use env_logger::{Builder, Target};
use gamesboard_api::bracket::{self, BracketLayout, Outcome, RenderedMatch, RenderedSide, RoundBlock};
use gamesboard_api::config::FirebaseConfig;
use gamesboard_api::repository::Repository;
use gamesboard_api::schedule::{self, DAYS};
use gamesboard_api::standings::format_points;
use gamesboard_api::store::{Backend, DocumentStore};
use gamesboard_api::{Bracket, GameStatus, Team};
use log::warn;
use std::fmt::{self, Write as _};
use std::path::PathBuf;
use std::process::ExitCode;
use std::{env, fs, io};

// ============================================================================
// CLI Structure
// ============================================================================

const FORMATS: &str = "Teams are given by id or by name (case-insensitive).
Schedule files hold one event per line as `time | name | location`.
Daily info files use `title:`, `locations:` and `contact:` lines followed by
[announcements] and [tips] blocks. Pass `-` to read a file from stdin.

Uses the same GAMESBOARD_* variables as gamesboard; GAMESBOARD_LOG sets the
stderr log level (default warn).";

#[derive(Parser, Debug)]
#[command(name = "gamesboard-admin")]
#[command(version)]
#[command(about = "Edit the games board data")]
#[command(after_help = FORMATS)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Command {
    /// Print the standings table
    Teams,
    /// Change a team's points
    Points {
        #[command(subcommand)]
        action: PointsAction,
    },
    /// Show or replace a team's schedule
    Schedule {
        #[command(subcommand)]
        action: ScheduleAction,
    },
    /// Show or replace the info for one day
    Info {
        #[command(subcommand)]
        action: InfoAction,
    },
    /// List games and their status
    Games,
    /// Update a game
    Game {
        #[command(subcommand)]
        action: GameAction,
    },
    /// Show or replace a game's bracket
    Bracket {
        #[command(subcommand)]
        action: BracketAction,
    },
}

#[derive(Subcommand, Debug, PartialEq)]
enum PointsAction {
    /// Add points to a team
    Add {
        team: String,
        #[arg(value_parser = parse_amount)]
        amount: f64,
    },
    /// Remove points from a team (never below zero)
    Remove {
        team: String,
        #[arg(value_parser = parse_amount)]
        amount: f64,
    },
    /// Set a team's points
    Set {
        team: String,
        #[arg(value_parser = parse_amount)]
        value: f64,
    },
}

#[derive(Subcommand, Debug, PartialEq)]
enum ScheduleAction {
    /// Print one day, or every day when none is given
    Show {
        team: String,
        #[arg(value_parser = parse_day)]
        day: Option<u32>,
    },
    /// Replace one day of a team's schedule
    Set {
        team: String,
        #[arg(value_parser = parse_day)]
        day: u32,
        #[arg(value_parser = parse_source)]
        file: Source,
    },
}

#[derive(Subcommand, Debug, PartialEq)]
enum InfoAction {
    Show {
        #[arg(value_parser = parse_day)]
        day: u32,
    },
    Set {
        #[arg(value_parser = parse_day)]
        day: u32,
        #[arg(value_parser = parse_source)]
        file: Source,
    },
}

#[derive(Subcommand, Debug, PartialEq)]
enum GameAction {
    /// Set the status text, e.g. "In Progress"
    Status {
        id: String,
        #[arg(required = true, num_args = 1..)]
        status: Vec<String>,
    },
}

#[derive(Subcommand, Debug, PartialEq)]
enum BracketAction {
    /// Print the bracket as laid out on the board
    Show { game: String },
    /// Store a bracket from a JSON file
    Set {
        game: String,
        #[arg(value_parser = parse_source)]
        file: Source,
    },
}

#[derive(Debug, Clone, PartialEq)]
enum Source {
    Stdin,
    File(PathBuf),
}

impl Source {
    fn read(&self) -> anyhow::Result<String> {
        let read = match self {
            Source::Stdin => io::read_to_string(io::stdin()),
            Source::File(path) => fs::read_to_string(path),
        };
        read.with_context(|| format!("cannot read {self}"))
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Stdin => f.write_str("stdin"),
            Source::File(path) => write!(f, "{}", path.display()),
        }
    }
}

fn parse_source(arg: &str) -> Result<Source, String> {
    Ok(match arg {
        "-" => Source::Stdin,
        path => Source::File(PathBuf::from(path)),
    })
}

fn parse_amount(arg: &str) -> Result<f64, String> {
    arg.trim()
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .ok_or_else(|| format!("not a number: {arg}"))
}

fn parse_day(arg: &str) -> Result<u32, String> {
    arg.parse::<u32>()
        .ok()
        .filter(|day| DAYS.contains(day))
        .ok_or_else(|| format!("day must be {} to {}", DAYS.start(), DAYS.end()))
}

// ============================================================================
// Commands
// ============================================================================

async fn resolve_team<S: DocumentStore>(repo: &Repository<S>, key: &str) -> anyhow::Result<Team> {
    repo.standings()
        .await
        .lookup(key)
        .cloned()
        .ok_or_else(|| anyhow!("Team not found: {key}"))
}

/// Run one command and return what it prints on stdout.
async fn run<S: DocumentStore>(command: Command, repo: &Repository<S>) -> anyhow::Result<String> {
    let mut out = String::new();
    match command {
        Command::Teams => {
            let standings = repo.standings().await;
            let _ = writeln!(out, "{:>4}  {:<24} {:<12} {:>10}", "#", "Team", "Id", "Points");
            for (i, team) in standings.standings().iter().enumerate() {
                let _ = writeln!(
                    out,
                    "{:>4}  {:<24} {:<12} {:>10}",
                    i + 1,
                    team.name,
                    team.id.as_str(),
                    format_points(team.points)
                );
            }
        }
        Command::Points { action } => {
            let line = match action {
                PointsAction::Add { team, amount } => {
                    let team = resolve_team(repo, &team).await?;
                    let updated = repo.adjust_points(&team.id, amount).await?;
                    let total = format_points(updated.points);
                    format!("Added {} points to {} (now {total})", format_points(amount), updated.name)
                }
                PointsAction::Remove { team, amount } => {
                    let team = resolve_team(repo, &team).await?;
                    let updated = repo.adjust_points(&team.id, -amount).await?;
                    let total = format_points(updated.points);
                    format!("Removed {} points from {} (now {total})", format_points(amount), updated.name)
                }
                PointsAction::Set { team, value } => {
                    let team = resolve_team(repo, &team).await?;
                    let updated = repo.set_points(&team.id, value).await?;
                    format!("Set {} to {} points", updated.name, format_points(updated.points))
                }
            };
            let _ = writeln!(out, "{line}");
        }
        Command::Schedule { action: ScheduleAction::Show { team, day } } => {
            let team = resolve_team(repo, &team).await?;
            let days: Vec<u32> = match day {
                Some(day) => vec![day],
                None => DAYS.collect(),
            };
            let full = repo.team_schedule(&team.id).await;
            for day in days {
                let events = full.get(&day).map(Vec::as_slice).unwrap_or_default();
                let _ = writeln!(out, "# {} - Day {day}", team.name);
                if events.is_empty() {
                    out.push_str("No events scheduled for this day\n");
                } else {
                    out.push_str(&schedule::format_events(events));
                }
            }
        }
        Command::Schedule { action: ScheduleAction::Set { team, day, file } } => {
            let team = resolve_team(repo, &team).await?;
            let events = schedule::parse_events(&file.read()?);
            let stored = repo.set_schedule(&team.id, day, events).await?;
            let _ = writeln!(out, "Saved {} events for {} on day {day}", stored.len(), team.name);
        }
        Command::Info { action: InfoAction::Show { day } } => match repo.daily_info(day).await {
            Some(info) => out.push_str(&schedule::format_daily_info(&info)),
            None => out.push_str("No information available for this day.\n"),
        },
        Command::Info { action: InfoAction::Set { day, file } } => {
            let info = schedule::parse_daily_info(&file.read()?);
            if info.is_empty() {
                warn!("daily info for day {day} is empty");
            }
            repo.set_daily_info(day, &info).await?;
            let _ = writeln!(out, "Saved daily info for day {day}");
        }
        Command::Games => {
            for game in repo.games().await {
                let _ = writeln!(out, "{:<20} {:<28} {}", game.id, game.name, game.status);
            }
        }
        Command::Game { action: GameAction::Status { id, status } } => {
            let game = repo.set_game_status(&id, GameStatus::from(status.join(" ").as_str())).await?;
            let _ = writeln!(out, "{} is now {}", game.name, game.status);
        }
        Command::Bracket { action: BracketAction::Show { game } } => {
            let stored = repo.bracket(&game).await;
            if let Some(b) = stored.as_ref() {
                for issue in bracket::validate(b) {
                    warn!("{game}: {issue}");
                }
            }
            let teams = repo.teams().await;
            out.push_str(&describe_layout(&bracket::render(stored.as_ref(), teams.as_slice())));
        }
        Command::Bracket { action: BracketAction::Set { game, file } } => {
            let parsed: Bracket = serde_json::from_str(&file.read()?).context("invalid bracket JSON")?;
            for issue in bracket::validate(&parsed) {
                warn!("{game}: {issue}");
            }
            repo.set_bracket(&game, &parsed).await?;
            let _ = writeln!(out, "Saved bracket for {game} ({} rounds)", parsed.rounds.len());
        }
    }
    Ok(out)
}

fn describe_side(side: &RenderedSide) -> String {
    let mark = match side.outcome {
        Outcome::Winner => "*",
        Outcome::Loser | Outcome::Neutral => " ",
    };
    format!("{mark}{} {}", side.badge.name, side.score)
}

fn describe_match(out: &mut String, label: &str, m: &RenderedMatch) {
    let _ = write!(out, "  {label:<10} {}  vs  {}", describe_side(&m.team1), describe_side(&m.team2));
    if let Some(time) = &m.time {
        let _ = write!(out, "  ({time})");
    }
    out.push('\n');
}

fn describe_layout(layout: &BracketLayout) -> String {
    let mut out = String::new();
    let BracketLayout::Rounds(blocks) = layout else {
        out.push_str("Bracket Not Set Up Yet\n");
        return out;
    };
    for block in blocks {
        let _ = writeln!(out, "{}", block.title());
        match block {
            RoundBlock::Round { matches, .. } => {
                for m in matches {
                    describe_match(&mut out, &format!("Match {}", m.slot.index + 1), m);
                }
            }
            RoundBlock::Finals { final_match, third_place } => {
                if let Some(m) = final_match {
                    describe_match(&mut out, bracket::FINALS_LABEL, m);
                }
                if let Some(m) = third_place {
                    describe_match(&mut out, bracket::THIRD_PLACE_LABEL, m);
                }
            }
        }
    }
    out
}

fn init_logger() {
    let mut builder = Builder::new();
    builder.target(Target::Stderr);
    builder.filter_level(log::LevelFilter::Warn);
    if let Ok(level) = env::var("GAMESBOARD_LOG") {
        builder.parse_filters(&level);
    }
    builder.init();
}

#[tokio::main]
async fn main() -> ExitCode {
    // Usage errors exit with status 2 inside clap.
    let cli = Cli::parse();
    init_logger();

    let config = FirebaseConfig::load().unwrap_or_else(|e| {
        warn!("{e}; using bundled sample data");
        FirebaseConfig::default()
    });
    let store = Backend::from_config(&config);
    if !store.is_remote() {
        warn!("no Firestore project configured; changes only last for this run");
    }
    let repo = Repository::new(store);

    match run(cli.command, &repo).await {
        Ok(out) => {
            print!("{out}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
