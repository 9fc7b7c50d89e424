use wasm_bindgen::prelude::*;

pub mod agents;
pub mod collective;
pub mod commands;
pub mod config;
pub mod error;
pub mod forecast;
pub mod geography;
pub mod market;
pub mod sim;
pub mod snapshot;
pub mod stats;
pub mod tick;
pub mod types;
pub mod units;
pub mod world;

pub use agents::{Landlord, Relocation, Tenant};
pub use collective::Collective;
pub use commands::Command;
pub use config::*;
pub use error::{CommandError, ConfigError};
pub use geography::City;
pub use market::{MarketRecord, Offer, OfferStatus};
pub use sim::{CommandSource, MemorySink, QueueSource, SimPhase, Simulation, SnapshotSink};
pub use snapshot::Snapshot;
pub use stats::Stats;
pub use types::*;
pub use units::Unit;
pub use world::World;

#[cfg(feature = "instrument")]
pub use instrument;

// ============================================================================
// WASM API
// ============================================================================

#[wasm_bindgen]
pub struct WasmSimulation {
    inner: Simulation,
}

#[wasm_bindgen]
impl WasmSimulation {
    /// Build from a JSON `SimConfig`; omitted fields take their defaults
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: &str) -> Result<WasmSimulation, JsError> {
        console_error_panic_hook::set_once();
        Ok(Self {
            inner: Simulation::from_json(config_json)?,
        })
    }

    /// Default city with the given seed
    #[wasm_bindgen]
    pub fn with_seed(seed: u64) -> Result<WasmSimulation, JsError> {
        console_error_panic_hook::set_once();
        let config = SimConfig {
            seed,
            ..SimConfig::default()
        };
        Ok(Self {
            inner: Simulation::new(config)?,
        })
    }

    /// Advance one month; returns the settled offers as `MarketRecord[]`
    #[wasm_bindgen]
    pub fn step(&mut self) -> Result<JsValue, JsError> {
        let records = self.inner.step();
        Ok(serde_wasm_bindgen::to_value(records)?)
    }

    #[wasm_bindgen]
    pub fn snapshot(&self) -> Snapshot {
        self.inner.snapshot()
    }

    #[wasm_bindgen]
    pub fn stats(&self) -> Stats {
        self.inner.world().stats.clone()
    }

    /// Apply one command object. Returns false if it could not be parsed
    /// or was rejected.
    #[wasm_bindgen]
    pub fn send_command(&mut self, command: JsValue) -> bool {
        match serde_wasm_bindgen::from_value::<Command>(command) {
            Ok(command) => self.inner.apply_all([command]) == 1,
            Err(_) => false,
        }
    }

    #[wasm_bindgen]
    pub fn tick(&self) -> u64 {
        self.inner.tick()
    }

    #[wasm_bindgen]
    pub fn terminate(&mut self) {
        self.inner.terminate();
    }
}
