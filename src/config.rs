use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use thiserror::Error;

use crate::data::Rank;

/// Direction of interest ranks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RankOrder {
    /// Rank 1 is the most preferred theme.
    #[default]
    Ascending,
    /// The highest rank is the most preferred theme.
    Descending,
}

impl RankOrder {
    /// `Ordering::Less` when `a` is preferred over `b`.
    pub fn compare(self, a: Rank, b: Rank) -> Ordering {
        match self {
            RankOrder::Ascending => a.cmp(&b),
            RankOrder::Descending => b.cmp(&a),
        }
    }
}

/// Order in which the engine visits students during the primary pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProcessingOrder {
    #[default]
    StudentId,
    /// Order of the `students` list in the snapshot.
    Snapshot,
}

/// Which free adviser takes a student when a theme still has places.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AdviserSelection {
    #[default]
    LowestId,
    /// Fewest seats already taken, ties by lowest id.
    LeastLoaded,
}

/// Knobs of one distribution run.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SolverConfig {
    pub max_grade: f64,
    pub max_rank: Rank,
    pub rank_order: RankOrder,
    pub processing_order: ProcessingOrder,
    pub adviser_selection: AdviserSelection,
    pub place_overflow: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_grade: 5.0,
            max_rank: 5,
            rank_order: RankOrder::default(),
            processing_order: ProcessingOrder::default(),
            adviser_selection: AdviserSelection::default(),
            place_overflow: false,
        }
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|_| ConfigError::InvalidHost(self.host.clone()))?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Top-level configuration for the binary.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub log_level: String,
    pub solver: SolverConfig,
}

impl AppConfig {
    /// Reads `.env` if present, then the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("DISTRIBUTION_HOST").unwrap_or_else(|| "127.0.0.1".to_string());
        let port = parse_var(&lookup, "DISTRIBUTION_PORT", 8080u16)?;
        let log_level = lookup("DISTRIBUTION_LOG_LEVEL").unwrap_or_else(|| "info".to_string());

        let defaults = SolverConfig::default();
        let solver = SolverConfig {
            max_grade: parse_var(&lookup, "DISTRIBUTION_MAX_GRADE", defaults.max_grade)?,
            max_rank: parse_var(&lookup, "DISTRIBUTION_MAX_RANK", defaults.max_rank)?,
            rank_order: parse_var(&lookup, "DISTRIBUTION_RANK_ORDER", defaults.rank_order)?,
            processing_order: parse_var(
                &lookup,
                "DISTRIBUTION_PROCESSING_ORDER",
                defaults.processing_order,
            )?,
            adviser_selection: parse_var(
                &lookup,
                "DISTRIBUTION_ADVISER_SELECTION",
                defaults.adviser_selection,
            )?,
            place_overflow: parse_var(&lookup, "DISTRIBUTION_PLACE_OVERFLOW", defaults.place_overflow)?,
        };

        if !solver.max_grade.is_finite() || solver.max_grade <= 0.0 {
            return Err(ConfigError::InvalidValue {
                key: "DISTRIBUTION_MAX_GRADE",
                value: solver.max_grade.to_string(),
            });
        }
        if solver.max_rank == 0 {
            return Err(ConfigError::InvalidValue {
                key: "DISTRIBUTION_MAX_RANK",
                value: "0".to_string(),
            });
        }

        Ok(Self {
            server: ServerConfig { host, port },
            log_level,
            solver,
        })
    }
}

fn parse_var<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { key, value }),
        None => Ok(default),
    }
}

impl FromStr for RankOrder {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "ascending" | "asc" => Ok(Self::Ascending),
            "descending" | "desc" => Ok(Self::Descending),
            other => Err(ConfigError::UnknownVariant(other.to_string())),
        }
    }
}

impl FromStr for ProcessingOrder {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "student-id" | "id" => Ok(Self::StudentId),
            "snapshot" => Ok(Self::Snapshot),
            other => Err(ConfigError::UnknownVariant(other.to_string())),
        }
    }
}

impl FromStr for AdviserSelection {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "lowest-id" => Ok(Self::LowestId),
            "least-loaded" => Ok(Self::LeastLoaded),
            other => Err(ConfigError::UnknownVariant(other.to_string())),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{key} has an invalid value '{value}'")]
    InvalidValue { key: &'static str, value: String },
    #[error("'{0}' must parse to an IPv4 or IPv6 address")]
    InvalidHost(String),
    #[error("unknown setting '{0}'")]
    UnknownVariant(String),
}
