//! Command-line argument definitions.

use std::fmt;
use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};

/// Night sleep tracker.
///
/// Records sleep intervals, groups them into nights anchored at 17:30 and
/// lets you correct a night's boundaries and wake phases after the fact.
#[derive(Debug, Parser)]
#[command(name = "ns", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
///
/// Times accept RFC 3339 (`2024-01-15T22:30:00Z`), local `YYYY-MM-DD HH:MM`,
/// `now`, or relative (`2 hours ago`). Nights are named by the local date of
/// their 17:30 anchor.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Start an ongoing sleep.
    Start {
        /// When the sleep started. Defaults to now.
        #[arg(long)]
        at: Option<String>,
    },

    /// End the ongoing sleep.
    Stop {
        /// When the sleep ended. Defaults to now.
        #[arg(long)]
        at: Option<String>,
    },

    /// Record a finished sleep.
    Add {
        #[arg(long)]
        start: String,

        #[arg(long)]
        end: String,
    },

    /// List recent nights with their wake phases.
    Nights {
        /// Output as JSON.
        #[arg(long)]
        json: bool,

        /// Number of nights to show, newest first.
        #[arg(long, default_value_t = 7)]
        limit: usize,
    },

    /// Move one edge of a night.
    Adjust {
        edge: Edge,

        #[arg(long)]
        night: NaiveDate,

        /// Wake phase number as listed by `ns nights` (wake edges only).
        #[arg(long)]
        wake: Option<usize>,

        /// New time for the edge.
        #[arg(long)]
        to: String,
    },

    /// Insert a wake phase into a sleep entry.
    Split {
        #[arg(long)]
        night: NaiveDate,

        /// Where the wake phase begins.
        #[arg(long)]
        at: String,

        #[arg(long, default_value_t = 10)]
        wake_minutes: u32,
    },

    /// Remove a wake phase by joining the entries around it.
    Merge {
        #[arg(long)]
        night: NaiveDate,

        /// Wake phase number as listed by `ns nights`.
        #[arg(long)]
        wake: usize,
    },

    /// Check a night for a missed stop and propose a corrected end.
    Fix {
        #[arg(long)]
        night: NaiveDate,

        /// Write the proposed end instead of only showing it.
        #[arg(long)]
        apply: bool,
    },

    /// Delete every entry of a night.
    DeleteNight {
        #[arg(long)]
        night: NaiveDate,
    },
}

/// An editable edge of a night.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Edge {
    NightStart,
    NightEnd,
    WakeStart,
    WakeEnd,
}

impl Edge {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NightStart => "night start",
            Self::NightEnd => "night end",
            Self::WakeStart => "wake start",
            Self::WakeEnd => "wake end",
        }
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adjust_parses_kebab_case_edge() {
        let cli = Cli::try_parse_from([
            "ns",
            "adjust",
            "wake-end",
            "--night",
            "2024-01-01",
            "--wake",
            "2",
            "--to",
            "2024-01-02 02:30",
        ])
        .unwrap();
        let Some(Commands::Adjust {
            edge, night, wake, ..
        }) = cli.command
        else {
            panic!("expected adjust");
        };
        assert_eq!(edge, Edge::WakeEnd);
        assert_eq!(night, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(wake, Some(2));
    }

    #[test]
    fn invalid_night_date_is_rejected() {
        let result = Cli::try_parse_from(["ns", "delete-night", "--night", "yesterday"]);
        assert!(result.is_err());
    }
}
