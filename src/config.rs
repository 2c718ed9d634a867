//! Run parameters and the campaign file.
//!
//! Selectors arrive as strings from the driver and are parsed into enums here,
//! so that every [`ConfigError`] surfaces before the engine starts solving.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::catalog::{
    AffinityRecord, Catalog, ChannelEntry, SegmentMetrics, SegmentSelection, StandardRecord,
};
use crate::error::{ConfigError, SplitError};

/// Metric the optimizer maximizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Affinity,
    Rating,
}

impl Metric {
    /// Per-slot value of this metric for an entry.
    pub fn value(self, entry: &ChannelEntry) -> f64 {
        match self {
            Self::Affinity => entry.affinity,
            Self::Rating => entry.rating,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Affinity => "affinity",
            Self::Rating => "rating",
        }
    }
}

impl FromStr for Metric {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "affinity" | "aff" => Ok(Self::Affinity),
            "rating" | "trp" => Ok(Self::Rating),
            _ => Err(ConfigError::UnknownMetric(s.to_string())),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the catalog is cut into optimization units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizationMode {
    /// One LP per sales house with a budget proportional to its baseline spend.
    PerGroup,
    /// One LP over the whole catalog with the full budget.
    Global,
}

impl OptimizationMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PerGroup => "per_group",
            Self::Global => "global",
        }
    }
}

impl FromStr for OptimizationMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "per_group" | "per_sales_house" => Ok(Self::PerGroup),
            "global" => Ok(Self::Global),
            _ => Err(ConfigError::UnknownMode(s.to_string())),
        }
    }
}

impl fmt::Display for OptimizationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tie-break used when rounding continuous slot counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundingPolicy {
    /// Ties go to the even neighbour (2.5 -> 2, 3.5 -> 4).
    #[default]
    HalfEven,
    /// Ties go away from zero (2.5 -> 3).
    HalfUp,
}

impl RoundingPolicy {
    pub fn round(self, value: f64) -> f64 {
        match self {
            Self::HalfEven => value.round_ties_even(),
            Self::HalfUp => value.round(),
        }
    }
}

impl FromStr for RoundingPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "half_even" | "bankers" => Ok(Self::HalfEven),
            "half_up" => Ok(Self::HalfUp),
            _ => Err(ConfigError::UnknownRounding(s.to_string())),
        }
    }
}

/// How integer slot counts are obtained from the LP.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegerStrategy {
    /// Solve the continuous relaxation and round.
    #[default]
    Round,
    /// Round, then step slots to restore the budget and bounds where possible.
    RoundAndRepair,
    /// Solve for integer slots directly with branch-and-bound.
    BranchAndBound,
}

impl FromStr for IntegerStrategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "round" => Ok(Self::Round),
            "round_and_repair" | "repair" => Ok(Self::RoundAndRepair),
            "branch_and_bound" | "milp" => Ok(Self::BranchAndBound),
            _ => Err(ConfigError::UnknownIntegerStrategy(s.to_string())),
        }
    }
}

/// Limits handed to the LP backend.
#[derive(Debug, Clone, PartialEq)]
pub struct SolverSettings {
    /// Wall-clock budget per optimization unit.
    pub time_limit: Option<Duration>,
    pub max_iter: usize,
    pub tol: f64,
    /// Node budget for branch-and-bound.
    pub max_nodes: usize,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            time_limit: Some(Duration::from_secs(10)),
            max_iter: 5000,
            tol: 1e-9,
            max_nodes: 10000,
        }
    }
}

/// Everything the engine needs besides the catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct RunParams {
    pub total_budget: f64,
    pub metric: Metric,
    pub mode: OptimizationMode,
    pub segments: SegmentSelection,
    pub solver: SolverSettings,
    pub rounding: RoundingPolicy,
    pub integer_strategy: IntegerStrategy,
}

impl RunParams {
    /// Parameters with default solver settings, rounding and integer strategy.
    pub fn new(
        total_budget: f64,
        metric: Metric,
        mode: OptimizationMode,
        segments: SegmentSelection,
    ) -> Self {
        Self {
            total_budget,
            metric,
            mode,
            segments,
            solver: SolverSettings::default(),
            rounding: RoundingPolicy::default(),
            integer_strategy: IntegerStrategy::default(),
        }
    }

    /// Reject parameters the engine cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.total_budget.is_finite() && self.total_budget > 0.0) {
            return Err(ConfigError::InvalidBudget(self.total_budget));
        }
        if !(self.solver.tol.is_finite() && self.solver.tol > 0.0) {
            return Err(ConfigError::InvalidSolverSetting {
                parameter: "tol".to_string(),
                message: format!("must be a positive finite number, got {}", self.solver.tol),
            });
        }
        if self.solver.max_iter == 0 {
            return Err(ConfigError::InvalidSolverSetting {
                parameter: "max_iter".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.solver.max_nodes == 0 {
            return Err(ConfigError::InvalidSolverSetting {
                parameter: "max_nodes".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.solver.time_limit == Some(Duration::ZERO) {
            return Err(ConfigError::InvalidSolverSetting {
                parameter: "time_limit".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

/// Campaign file layout (TOML).
///
/// ```toml
/// budget = 500000
/// metric = "affinity"
/// mode = "per_group"
///
/// [segments]
/// Sirius = "All 18-60"
///
/// [[standard]]
/// channel = "ICTV"
/// sales_house = "Sirius"
/// segments = { "All 18-60" = { price = 18000, rating = 25.0 } }
///
/// [[affinity]]
/// channel = "ICTV"
/// sales_house = "Sirius"
/// affinity = 95.0
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CampaignFile {
    pub budget: f64,
    #[serde(default = "default_metric")]
    pub metric: String,
    #[serde(default = "default_mode")]
    pub mode: String,
    #[serde(default)]
    pub rounding: Option<String>,
    #[serde(default)]
    pub integer_strategy: Option<String>,
    #[serde(default)]
    pub solver: SolverSection,
    pub segments: BTreeMap<String, String>,
    pub standard: Vec<StandardRow>,
    pub affinity: Vec<AffinityRow>,
}

/// Optional `[solver]` table.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SolverSection {
    pub time_limit_ms: Option<u64>,
    pub max_iter: Option<usize>,
    pub tol: Option<f64>,
    pub max_nodes: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StandardRow {
    pub channel: String,
    pub sales_house: String,
    pub segments: BTreeMap<String, SegmentMetrics>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AffinityRow {
    pub channel: String,
    pub sales_house: String,
    pub affinity: f64,
}

fn default_metric() -> String {
    Metric::Affinity.as_str().to_string()
}

fn default_mode() -> String {
    OptimizationMode::PerGroup.as_str().to_string()
}

impl CampaignFile {
    /// Read and parse a campaign file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::parse(&text).map_err(|e| match e {
            ConfigError::Parse { message, .. } => ConfigError::Parse {
                path: path.display().to_string(),
                message,
            },
            other => other,
        })
    }

    /// Parse campaign TOML from a string.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|e| ConfigError::Parse {
            path: "<inline>".to_string(),
            message: e.to_string(),
        })
    }

    /// Turn the file into run parameters, validated.
    pub fn params(&self) -> Result<RunParams, ConfigError> {
        let defaults = SolverSettings::default();
        let params = RunParams {
            total_budget: self.budget,
            metric: self.metric.parse()?,
            mode: self.mode.parse()?,
            segments: self.segments.clone(),
            solver: SolverSettings {
                time_limit: self
                    .solver
                    .time_limit_ms
                    .map(Duration::from_millis)
                    .or(defaults.time_limit),
                max_iter: self.solver.max_iter.unwrap_or(defaults.max_iter),
                tol: self.solver.tol.unwrap_or(defaults.tol),
                max_nodes: self.solver.max_nodes.unwrap_or(defaults.max_nodes),
            },
            rounding: self
                .rounding
                .as_deref()
                .map(str::parse)
                .transpose()?
                .unwrap_or_default(),
            integer_strategy: self
                .integer_strategy
                .as_deref()
                .map(str::parse)
                .transpose()?
                .unwrap_or_default(),
        };
        params.validate()?;
        Ok(params)
    }

    /// Join the file's tables into a catalog.
    pub fn catalog(&self) -> Result<Catalog, SplitError> {
        let standard = self
            .standard
            .iter()
            .map(|row| StandardRecord {
                channel_id: row.channel.clone(),
                sales_house_id: row.sales_house.clone(),
                segments: row.segments.clone(),
            })
            .collect();
        let affinity = self
            .affinity
            .iter()
            .map(|row| AffinityRecord {
                channel_id: row.channel.clone(),
                sales_house_id: row.sales_house.clone(),
                affinity: row.affinity,
            })
            .collect();
        Ok(Catalog::join(standard, affinity)?)
    }

    /// Catalog and parameters together; parameters are checked first.
    pub fn into_run(self) -> Result<(Catalog, RunParams), SplitError> {
        let params = self.params()?;
        let catalog = self.catalog()?;
        Ok((catalog, params))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DataError;
    use std::io::Write;

    const CAMPAIGN: &str = r#"
budget = 100000
metric = "TRP"
mode = "global"
integer_strategy = "round_and_repair"

[solver]
time_limit_ms = 250

[segments]
Sirius = "All 18-60"

[[standard]]
channel = "ICTV"
sales_house = "Sirius"
segments = { "All 18-60" = { price = 18000.0, rating = 25.0 }, "W 30+" = { price = 19500.0, rating = 22.0 } }

[[standard]]
channel = "STB"
sales_house = "Sirius"
segments = { "All 18-60" = { price = 10000.0, rating = 15.0 } }

[[affinity]]
channel = "ICTV"
sales_house = "Sirius"
affinity = 95.0

[[affinity]]
channel = "STB"
sales_house = "Sirius"
affinity = 85.5
"#;

    #[test]
    fn test_selectors_parse() {
        assert_eq!("affinity".parse::<Metric>().unwrap(), Metric::Affinity);
        assert_eq!("Aff".parse::<Metric>().unwrap(), Metric::Affinity);
        assert_eq!(" rating ".parse::<Metric>().unwrap(), Metric::Rating);
        assert_eq!("TRP".parse::<Metric>().unwrap(), Metric::Rating);
        assert_eq!(
            "per-group".parse::<OptimizationMode>().unwrap(),
            OptimizationMode::PerGroup
        );
        assert_eq!("GLOBAL".parse::<OptimizationMode>().unwrap(), OptimizationMode::Global);
        assert_eq!("milp".parse::<IntegerStrategy>().unwrap(), IntegerStrategy::BranchAndBound);
    }

    #[test]
    fn test_unknown_selectors_are_config_errors() {
        assert_eq!(
            "reach".parse::<Metric>().unwrap_err(),
            ConfigError::UnknownMetric("reach".to_string())
        );
        assert_eq!(
            "weekly".parse::<OptimizationMode>().unwrap_err(),
            ConfigError::UnknownMode("weekly".to_string())
        );
        assert!("ceil".parse::<RoundingPolicy>().is_err());
    }

    #[test]
    fn test_rounding_policies_differ_on_ties() {
        assert_eq!(RoundingPolicy::HalfEven.round(2.5), 2.0);
        assert_eq!(RoundingPolicy::HalfEven.round(3.5), 4.0);
        assert_eq!(RoundingPolicy::HalfUp.round(2.5), 3.0);
        assert_eq!(RoundingPolicy::HalfEven.round(2.4999), 2.0);
        assert_eq!(RoundingPolicy::HalfUp.round(7.6), 8.0);
    }

    #[test]
    fn test_validate() {
        let params = RunParams::new(
            1000.0,
            Metric::Rating,
            OptimizationMode::Global,
            SegmentSelection::new(),
        );
        assert!(params.validate().is_ok());

        for budget in [0.0, -5.0, f64::NAN, f64::INFINITY] {
            let bad = RunParams {
                total_budget: budget,
                ..params.clone()
            };
            assert!(matches!(bad.validate(), Err(ConfigError::InvalidBudget(_))));
        }

        let mut bad = params.clone();
        bad.solver.time_limit = Some(Duration::ZERO);
        assert!(matches!(
            bad.validate(),
            Err(ConfigError::InvalidSolverSetting { .. })
        ));
    }

    #[test]
    fn test_campaign_file_round_trip_into_run() {
        let file = CampaignFile::parse(CAMPAIGN).expect("parse failed");
        let (catalog, params) = file.into_run().expect("into_run failed");
        assert_eq!(catalog.len(), 2);
        assert_eq!(params.total_budget, 100000.0);
        assert_eq!(params.metric, Metric::Rating);
        assert_eq!(params.mode, OptimizationMode::Global);
        assert_eq!(params.integer_strategy, IntegerStrategy::RoundAndRepair);
        assert_eq!(params.rounding, RoundingPolicy::HalfEven);
        assert_eq!(params.solver.time_limit, Some(Duration::from_millis(250)));
        assert_eq!(params.segments["Sirius"], "All 18-60");
    }

    #[test]
    fn test_campaign_file_bad_selector() {
        let text = CAMPAIGN.replace("metric = \"TRP\"", "metric = \"reach\"");
        let file = CampaignFile::parse(&text).expect("parse failed");
        assert_eq!(
            file.into_run().unwrap_err(),
            SplitError::Config(ConfigError::UnknownMetric("reach".to_string()))
        );
    }

    #[test]
    fn test_campaign_file_missing_affinity() {
        let orphan = concat!(
            "\n\n[[affinity]]\n",
            "channel = \"TET\"\n",
            "sales_house = \"Sirius\"\n",
            "affinity = 1.0\n",
        );
        let text = format!("{}{}", CAMPAIGN, orphan);
        let file = CampaignFile::parse(&text).expect("parse failed");
        assert!(matches!(
            file.into_run(),
            Err(SplitError::Data(DataError::MissingStandard { .. }))
        ));
    }

    #[test]
    fn test_demo_campaign_parses() {
        let file =
            CampaignFile::parse(include_str!("../demos/campaign.toml")).expect("parse failed");
        let (catalog, params) = file.into_run().expect("into_run failed");
        assert_eq!(catalog.len(), 11);
        assert_eq!(catalog.sales_houses(), vec!["Sirius", "Space"]);
        assert_eq!(params.metric, Metric::Affinity);
        assert_eq!(params.mode, OptimizationMode::PerGroup);
        assert_eq!(params.segments["Space"], "W 30+");
        assert_eq!(params.solver.time_limit, Some(Duration::from_secs(10)));
    }

    #[test]
    fn test_load_from_disk() {
        let mut tmp = tempfile::NamedTempFile::new().expect("tempfile");
        tmp.write_all(CAMPAIGN.as_bytes()).expect("write");

        let file = CampaignFile::load(tmp.path()).expect("load failed");
        assert_eq!(file.standard.len(), 2);

        let missing = CampaignFile::load(tmp.path().with_extension("absent"));
        assert!(matches!(missing, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn test_parse_error_names_file() {
        let mut tmp = tempfile::NamedTempFile::new().expect("tempfile");
        tmp.write_all(b"budget = \"lots\"").expect("write");

        match CampaignFile::load(tmp.path()) {
            Err(ConfigError::Parse { path, .. }) => {
                assert_eq!(path, tmp.path().display().to_string())
            }
            other => panic!("expected parse error, got {:?}", other),
        }
    }
}
