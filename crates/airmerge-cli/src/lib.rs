//! airmerge CLI
//!
//! Command-line front end for the airodump snapshot merger.
//!
//! # Usage
//!
//! ```bash
//! # Merge two captures, treat the last one as the final snapshot
//! airmerge -w survey dump-01.csv dump-02.csv -l dump-03.csv
//!
//! # Stations only, brief text to stdout, strongest first
//! airmerge -w survey -e -b --stdout dump-*.csv
//!
//! # Throttle repeat reports of the same station to once every 30 minutes
//! airmerge -w survey --quiet-minutes 30 --max-age-minutes 10080 -l live.csv
//! ```
//!
//! Every run writes `<prefix>.csv`, `<prefix>.html` and `<prefix>.txt`
//! (unless `--stdout`), plus `<prefix>.kml` when a GPS track is given, and
//! refreshes the `-appower`, `-stapower` and `-printed` side-files.

use std::path::PathBuf;

use clap::Parser;

use airmerge_core::{MergeConfig, Novelty, ReportFilter, SortKey, ThrottlePolicy, Timestamp};

pub mod render;

/// Default `--max-age-minutes` when only `--quiet-minutes` is given: one week.
pub const DEFAULT_MAX_AGE_MINUTES: i64 = 7 * 24 * 60;

/// airmerge command line
#[derive(Parser, Debug)]
#[command(name = "airmerge")]
#[command(
    author,
    version,
    about = "Merge airodump CSV snapshots into one longitudinal survey report"
)]
pub struct Cli {
    /// Output prefix for the report and side-files
    #[arg(short = 'w', long = "write", value_name = "PREFIX")]
    pub prefix: Option<PathBuf>,

    /// Snapshots to merge, in order
    #[arg(value_name = "FILE")]
    pub inputs: Vec<PathBuf>,

    /// Final snapshot; decides which devices are new or old
    #[arg(short = 'l', long = "last", value_name = "FILE")]
    pub last: Option<PathBuf>,

    /// Only report access points
    #[arg(short = 'a', long = "aps-only", conflicts_with = "stations_only")]
    pub aps_only: bool,

    /// Only report stations
    #[arg(short = 'e', long = "stations-only")]
    pub stations_only: bool,

    /// One line per device in the text report
    #[arg(short = 'b', long)]
    pub brief: bool,

    /// Print the text report to stdout instead of <PREFIX>.txt
    #[arg(long)]
    pub stdout: bool,

    /// GPS track to position devices at their peak
    #[arg(short = 'g', long = "gps", value_name = "FILE")]
    pub gps: Option<PathBuf>,

    /// Known MAC to IP address list
    #[arg(short = 'i', long = "known-ips", value_name = "FILE")]
    pub known_ips: Option<PathBuf>,

    /// Known MAC to description list
    #[arg(short = 'k', long = "known", value_name = "FILE")]
    pub known: Option<PathBuf>,

    /// OUI vendor database (defaults to the aircrack-ng install)
    #[arg(long = "oui", value_name = "FILE")]
    pub oui: Option<PathBuf>,

    /// Only report devices listed in the known-device file
    #[arg(short = 'm', long = "known-only")]
    pub known_only: bool,

    /// Only report devices whose power rose by more than DELTA
    #[arg(short = 'd', long = "delta", value_name = "DELTA", allow_hyphen_values = true)]
    pub delta: Option<i32>,

    /// Only report devices that first appeared in the final snapshot
    #[arg(short = 'n', long = "new", conflicts_with = "old")]
    pub new: bool,

    /// Only report devices seen before and again in the final snapshot
    #[arg(short = 'o', long = "old")]
    pub old: bool,

    /// Minimum power in dBm
    #[arg(
        short = 'p',
        long = "min-power",
        value_name = "DBM",
        default_value_t = -100,
        allow_hyphen_values = true
    )]
    pub min_power: i32,

    /// Maximum power in dBm
    #[arg(
        short = 'P',
        long = "max-power",
        value_name = "DBM",
        default_value_t = 0,
        allow_hyphen_values = true
    )]
    pub max_power: i32,

    /// Report order: power, mac, first-seen, last-seen
    #[arg(long, value_name = "KEY", default_value_t = SortKey::Power)]
    pub sort: SortKey,

    /// Do not report a station again within this many minutes
    #[arg(long, value_name = "MINUTES")]
    pub quiet_minutes: Option<i64>,

    /// Stop reporting a station last reported more than this many minutes ago
    #[arg(long, value_name = "MINUTES", requires = "quiet_minutes")]
    pub max_age_minutes: Option<i64>,

    /// Clock override, "YYYY-MM-DD HH:MM:SS"
    #[arg(long, value_name = "TIME", value_parser = parse_timestamp)]
    pub now: Option<Timestamp>,

    /// Also print a summary table to stdout
    #[arg(long)]
    pub table: bool,

    /// More logging (-v debug, -vv trace)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

fn parse_timestamp(s: &str) -> Result<Timestamp, String> {
    Timestamp::parse(s).map_err(|e| e.to_string())
}

impl Cli {
    /// Build the engine configuration from the parsed arguments.
    pub fn to_config(&self) -> MergeConfig {
        let novelty = if self.new {
            Novelty::NewOnly
        } else if self.old {
            Novelty::OldOnly
        } else {
            Novelty::All
        };
        let filter = ReportFilter {
            min_power: self.min_power,
            max_power: self.max_power,
            novelty,
            known_only: self.known_only,
            min_delta: self.delta,
            access_points: !self.stations_only,
            stations: !self.aps_only,
            sort: self.sort,
        };
        let throttle = self.quiet_minutes.map(|quiet| ThrottlePolicy {
            min_quiet_secs: quiet.saturating_mul(60),
            max_age_secs: self
                .max_age_minutes
                .unwrap_or(DEFAULT_MAX_AGE_MINUTES)
                .saturating_mul(60),
        });

        MergeConfig {
            inputs: self.inputs.clone(),
            final_snapshot: self.last.clone(),
            output_prefix: self.prefix.clone(),
            oui_db: self.oui.clone(),
            known_devices: self.known.clone(),
            known_ips: self.known_ips.clone(),
            gps_track: self.gps.clone(),
            filter,
            throttle,
            now: self.now,
        }
    }

    /// Default log directive for the `-v` count.
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "debug",
            _ => "trace",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("airmerge").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn minimal_invocation() {
        let cli = parse(&["-w", "out/survey", "a.csv", "b.csv", "-l", "c.csv"]);
        let cfg = cli.to_config();
        assert_eq!(cfg.inputs, vec![PathBuf::from("a.csv"), PathBuf::from("b.csv")]);
        assert_eq!(cfg.final_snapshot, Some(PathBuf::from("c.csv")));
        assert_eq!(cfg.output_prefix, Some(PathBuf::from("out/survey")));
        assert_eq!(cfg.filter, ReportFilter::default());
        assert!(cfg.throttle.is_none());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn filter_flags() {
        let cli = parse(&[
            "-w", "s", "-e", "-m", "-n", "-p", "-70", "-P", "-20", "-d", "5", "--sort", "mac",
            "a.csv",
        ]);
        let f = cli.to_config().filter;
        assert!(!f.access_points);
        assert!(f.stations);
        assert!(f.known_only);
        assert_eq!(f.novelty, Novelty::NewOnly);
        assert_eq!((f.min_power, f.max_power), (-70, -20));
        assert_eq!(f.min_delta, Some(5));
        assert_eq!(f.sort, SortKey::Mac);
    }

    #[test]
    fn throttle_minutes_become_seconds() {
        let cli = parse(&["-w", "s", "--quiet-minutes", "30", "a.csv"]);
        let t = cli.to_config().throttle.unwrap();
        assert_eq!(t.min_quiet_secs, 1800);
        assert_eq!(t.max_age_secs, DEFAULT_MAX_AGE_MINUTES * 60);

        let cli = parse(&[
            "-w", "s", "--quiet-minutes", "30", "--max-age-minutes", "60", "a.csv",
        ]);
        assert_eq!(cli.to_config().throttle.unwrap().max_age_secs, 3600);
    }

    #[test]
    fn verbosity_levels() {
        assert_eq!(parse(&["a.csv"]).log_level(), "warn");
        assert_eq!(parse(&["-v", "a.csv"]).log_level(), "debug");
        assert_eq!(parse(&["-vv", "a.csv"]).log_level(), "trace");
    }

    #[test]
    fn conflicting_groups_are_rejected() {
        let res = Cli::try_parse_from(["airmerge", "-w", "s", "-a", "-e", "a.csv"]);
        assert!(res.is_err());
        let res = Cli::try_parse_from(["airmerge", "-w", "s", "-n", "-o", "a.csv"]);
        assert!(res.is_err());
    }

    #[test]
    fn bad_now_is_a_usage_error() {
        let res = Cli::try_parse_from(["airmerge", "-w", "s", "--now", "yesterday", "a.csv"]);
        assert!(res.is_err());
    }

    #[test]
    fn missing_prefix_fails_validation() {
        let cfg = parse(&["a.csv"]).to_config();
        assert!(cfg.validate().is_err());
    }
}
