use std::{env, path::Path};

use log::LevelFilter;
use tour_route_derive::{CliOptions, CliValue, KvDisplay};

use crate::{
    Error, Result,
    geo::DEFAULT_PADDING_PX,
    optimizer::{OptimizationGoal, OptimizationPreferences, VenueSize},
    route::{AnchorRule, DEFAULT_AVERAGE_SPEED_KMH, HoldThresholds, SequenceConfig},
    status::VenueStatus,
};

/// Runtime options for planning tours.
#[derive(Clone, Debug, CliOptions, KvDisplay)]
pub struct RouteOptions {
    /// Average driving speed used for travel-time estimates (km/h).
    #[cli(long = "average-speed")]
    pub average_speed_kmh: f64,
    /// Detour ratio below which a flexible venue is recommended as hold 1.
    #[cli(long = "hold1-below")]
    pub hold1_below: f64,
    #[cli(long = "hold2-below")]
    pub hold2_below: f64,
    #[cli(long = "hold3-below")]
    pub hold3_below: f64,
    /// Which assignments are pinned in place during reordering.
    #[cli(long = "anchor-rule", parse_with = "AnchorRule::parse")]
    pub anchor_rule: AnchorRule,
    /// Explicit pinned statuses. Overrides `--anchor-rule` when set.
    #[cli(long = "anchor-statuses", parse_with = "VenueStatus::parse_list")]
    #[kv(fmt = "list")]
    pub anchor_statuses: Vec<VenueStatus>,
    /// Screen padding around a fitted map viewport.
    #[cli(long = "viewport-padding")]
    pub viewport_padding: u32,
    /// How the report presents each tour.
    #[cli(long = "view", parse_with = "ViewMode::parse")]
    pub view_mode: ViewMode,
    /// External optimizer executable. Empty means local ordering only.
    #[cli(long = "optimizer-exe")]
    pub optimizer_exe: String,
    #[cli(long = "goal", parse_with = "OptimizationGoal::parse")]
    pub goal: OptimizationGoal,
    #[cli(long = "preferred-regions", parse_with = "parse_csv")]
    #[kv(fmt = "list")]
    pub preferred_regions: Vec<String>,
    #[cli(long = "min-days-between-shows")]
    #[kv(fmt = "opt")]
    pub min_days_between_shows: Option<u32>,
    #[cli(long = "max-days-between-shows")]
    #[kv(fmt = "opt")]
    pub max_days_between_shows: Option<u32>,
    #[cli(long = "max-km-per-day")]
    #[kv(fmt = "opt")]
    pub max_travel_distance_per_day: Option<f64>,
    #[cli(long = "avoid-cities", parse_with = "parse_csv")]
    #[kv(fmt = "list")]
    pub avoid_cities: Vec<String>,
    #[cli(flag = "focus-on-fanbase")]
    pub focus_on_fanbase: bool,
    #[cli(long = "venue-size", parse_with = "VenueSize::parse")]
    pub venue_size: VenueSize,
    /// Structured logging level.
    #[cli(long = "log-level", parse_with = "LogLevel::parse")]
    pub log_level: LogLevel,
    /// Logging output format.
    #[cli(long = "log-format", parse_with = "LogFormat::parse")]
    pub log_format: LogFormat,
    /// Include timestamps in log lines.
    #[cli(flag = "log-timestamp")]
    pub log_timestamp: bool,
    /// Optional output file path for logs. Empty means stderr.
    #[cli(long = "log-output")]
    pub log_output: String,
    /// Optional input file path for tour data. Empty means stdin.
    #[cli(long = "input")]
    pub input: String,
    /// Optional output file path for the report. Empty means stdout.
    #[cli(long = "output")]
    pub output: String,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, CliValue)]
#[cli_value(option = "log-level")]
pub enum LogLevel {
    Error,
    #[cli(alias = "warning")]
    Warn,
    Info,
    Debug,
    Trace,
    Off,
}

impl LogLevel {
    pub fn to_filter(self) -> LevelFilter {
        match self {
            Self::Error => LevelFilter::Error,
            Self::Warn => LevelFilter::Warn,
            Self::Info => LevelFilter::Info,
            Self::Debug => LevelFilter::Debug,
            Self::Trace => LevelFilter::Trace,
            Self::Off => LevelFilter::Off,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, CliValue)]
#[cli_value(option = "log-format")]
pub enum LogFormat {
    Compact,
    Pretty,
}

/// Map payload or table rows. Always passed explicitly; nothing reads a
/// stored preference behind the caller's back.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, CliValue, serde::Serialize)]
#[serde(rename_all = "lowercase")]
#[cli_value(option = "view")]
pub enum ViewMode {
    #[default]
    Map,
    Table,
}

impl Default for RouteOptions {
    fn default() -> Self {
        let holds = HoldThresholds::default();
        let preferences = OptimizationPreferences::default();
        Self {
            average_speed_kmh: DEFAULT_AVERAGE_SPEED_KMH,
            hold1_below: holds.hold1_below,
            hold2_below: holds.hold2_below,
            hold3_below: holds.hold3_below,
            anchor_rule: AnchorRule::default(),
            anchor_statuses: Vec::new(),
            viewport_padding: DEFAULT_PADDING_PX,
            view_mode: ViewMode::Map,
            optimizer_exe: String::new(),
            goal: preferences.optimization_goal,
            preferred_regions: Vec::new(),
            min_days_between_shows: None,
            max_days_between_shows: None,
            max_travel_distance_per_day: None,
            avoid_cities: Vec::new(),
            focus_on_fanbase: false,
            venue_size: preferences.prioritize_venue_size,
            log_level: LogLevel::Warn,
            log_format: LogFormat::Compact,
            log_timestamp: true,
            log_output: String::new(),
            input: String::new(),
            output: String::new(),
        }
    }
}

impl RouteOptions {
    pub fn from_args() -> Result<Self> {
        Self::parse_from_iter(env::args().skip(1))
    }

    pub fn parse_from_iter<I, S>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut options = Self::default();
        let mut args = args
            .into_iter()
            .map(|arg| arg.as_ref().to_owned())
            .peekable();

        while let Some(arg) = args.next() {
            if arg == "--help" || arg == "-h" {
                return Err(Error::invalid_input(Self::usage()));
            }

            let Some(raw_name) = arg.strip_prefix("--") else {
                return Err(Error::invalid_input(format!(
                    "Unexpected argument: {arg}\n\n{}",
                    Self::usage()
                )));
            };

            if raw_name.is_empty() {
                return Err(Error::invalid_input(format!(
                    "Invalid option name: {arg}\n\n{}",
                    Self::usage()
                )));
            }

            let (name, value) = Self::split_arg(raw_name, &mut args);
            if !options.apply_cli_option(&name, value)? {
                return Err(Error::invalid_input(format!(
                    "Unknown option: --{name}\n\n{}",
                    Self::usage()
                )));
            }
        }

        options.validate()?;
        Ok(options)
    }

    fn validate(&self) -> Result<()> {
        self.sequence_config().hold_thresholds.validate()?;
        if !self.average_speed_kmh.is_finite() || self.average_speed_kmh <= 0.0 {
            return Err(Error::invalid_input(format!(
                "--average-speed must be positive, got {}",
                self.average_speed_kmh
            )));
        }
        if let (Some(min), Some(max)) = (self.min_days_between_shows, self.max_days_between_shows)
            && min > max
        {
            return Err(Error::invalid_input(format!(
                "--min-days-between-shows ({min}) exceeds --max-days-between-shows ({max})"
            )));
        }
        Ok(())
    }

    pub fn usage() -> &'static str {
        concat!(
            "Usage:\n",
            "  tour-route [options] [--input tours.json]\n",
            "  tour-route [options] < tours.json\n\n",
            "Options:\n",
            "  --average-speed <f64>\n",
            "  --hold1-below <f64>\n",
            "  --hold2-below <f64>\n",
            "  --hold3-below <f64>\n",
            "  --anchor-rule <confirmed|confirmed-booked-planning>\n",
            "  --anchor-statuses <status[,status...]>\n",
            "  --viewport-padding <u32>\n",
            "  --view <map|table>\n",
            "  --optimizer-exe <path>\n",
            "  --goal <distance|time|balance>\n",
            "  --preferred-regions <region[,region...]>\n",
            "  --min-days-between-shows <u32>\n",
            "  --max-days-between-shows <u32>\n",
            "  --max-km-per-day <f64>\n",
            "  --avoid-cities <city[,city...]>\n",
            "  --focus-on-fanbase[=<bool>]\n",
            "  --no-focus-on-fanbase\n",
            "  --venue-size <small|medium|large|any>\n",
            "  --log-level <error|warn|info|debug|trace|off>\n",
            "  --log-format <compact|pretty>\n",
            "  --log-timestamp[=<bool>]\n",
            "  --no-log-timestamp\n",
            "  --log-output <path>\n",
            "  --input <path>\n",
            "  --output <path>\n",
            "  --help\n",
            "\n",
            "Examples:\n",
            "  tour-route --input tours.json --output report.json\n",
            "  tour-route --view=table --log-level=info < tours.json\n",
            "  tour-route --optimizer-exe ./optimize --goal balance < tours.json\n",
            "  tour-route --anchor-rule=confirmed-booked-planning < tours.json\n",
            "  tour-route --anchor-statuses=confirmed,hold1 --hold1-below=1.05 < tours.json\n",
        )
    }

    pub fn sequence_config(&self) -> SequenceConfig {
        SequenceConfig {
            anchor_statuses: if self.anchor_statuses.is_empty() {
                self.anchor_rule.statuses()
            } else {
                self.anchor_statuses.clone()
            },
            hold_thresholds: HoldThresholds {
                hold1_below: self.hold1_below,
                hold2_below: self.hold2_below,
                hold3_below: self.hold3_below,
            },
            average_speed_kmh: self.average_speed_kmh,
        }
    }

    pub fn preferences(&self) -> OptimizationPreferences {
        OptimizationPreferences {
            optimization_goal: self.goal,
            preferred_regions: self.preferred_regions.clone(),
            min_days_between_shows: self.min_days_between_shows,
            max_days_between_shows: self.max_days_between_shows,
            max_travel_distance_per_day: self.max_travel_distance_per_day,
            avoid_cities: self.avoid_cities.clone(),
            focus_on_artist_fanbase: self.focus_on_fanbase,
            prioritize_venue_size: self.venue_size,
        }
    }

    pub fn optimizer_path(&self) -> Option<&Path> {
        non_empty_path(&self.optimizer_exe)
    }

    pub fn log_output_path(&self) -> Option<&Path> {
        non_empty_path(&self.log_output)
    }

    pub fn output_path(&self) -> Option<&Path> {
        non_empty_path(&self.output)
    }

    pub fn input_path(&self) -> Option<&Path> {
        non_empty_path(&self.input)
    }
}

fn non_empty_path(raw: &str) -> Option<&Path> {
    let raw = raw.trim();
    if raw.is_empty() || raw == "-" {
        None
    } else {
        Some(Path::new(raw))
    }
}

fn parse_csv(raw: &str) -> Result<Vec<String>> {
    Ok(raw
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
        .collect())
}
