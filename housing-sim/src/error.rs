use thiserror::Error;

/// Fatal problems detected while building a simulation from its config.
/// Nothing is constructed when one of these is returned.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("requested {requested} parcels but a {rows}x{cols} grid only holds {capacity}")]
    ParcelCapacity {
        requested: usize,
        rows: usize,
        cols: usize,
        capacity: usize,
    },

    #[error("a {rows}x{cols} grid has more cells than can be addressed")]
    GridTooLarge { rows: usize, cols: usize },

    #[error("at least one parcel is required")]
    NoParcels,

    #[error("at least one neighborhood is required")]
    NoNeighborhoods,

    #[error("{neighborhoods} neighborhoods cannot be seeded on {parcels} parcels")]
    TooManyNeighborhoods { neighborhoods: usize, parcels: usize },

    #[error("neighborhood `{name}`: {reason}")]
    Neighborhood { name: String, reason: String },

    #[error("layout row {row} has {found} cells, expected {expected}")]
    RaggedLayout {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("layout cell ({row}, {col}) is malformed: `{cell}`")]
    MalformedCell { row: usize, col: usize, cell: String },

    #[error("layout cell ({row}, {col}) references unknown neighborhood {neighborhood}")]
    UnknownNeighborhood {
        row: usize,
        col: usize,
        neighborhood: i64,
    },

    #[error("layout has no residential parcels")]
    NoResidentialParcels,

    #[error("collective: {0}")]
    Collective(String),

    #[error("population: {0}")]
    Population(String),

    #[error("market: {0}")]
    Market(String),

    #[error("invalid config json: {0}")]
    Json(String),
}

/// Commands that cannot be applied. These never abort a tick: the
/// orchestrator logs them and moves on.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CommandError {
    #[error("unknown player `{0}`")]
    UnknownPlayer(String),

    #[error("unknown tenant {0}")]
    UnknownTenant(u64),

    #[error("unknown unit {0}")]
    UnknownUnit(u64),

    #[error("tenant {tenant} is already controlled by player `{player}`")]
    TenantTaken { tenant: u64, player: String },

    #[error("unit {0} has no free places")]
    UnitFull(u64),

    #[error("contribution must be positive, got {0}")]
    InvalidAmount(f64),

    #[error("simulation has terminated")]
    Terminated,

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Json(err.to_string())
    }
}
