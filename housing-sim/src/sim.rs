//! Orchestration boundary: lifecycle, command intake and snapshot output.
//!
//! The session layer feeds commands through a [`CommandSource`] and
//! receives a [`Snapshot`] per tick through a [`SnapshotSink`]. Both are
//! plain traits so tests can drive a run from memory.

use std::collections::VecDeque;

use crate::commands::Command;
use crate::config::SimConfig;
use crate::error::{CommandError, ConfigError};
use crate::market::MarketRecord;
use crate::snapshot::Snapshot;
use crate::world::World;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimPhase {
    /// Built, not yet stepped
    Initializing,
    Running,
    Terminated,
}

pub trait CommandSource {
    /// Commands that arrived since the last poll, oldest first
    fn poll(&mut self) -> Vec<Command>;
}

pub trait SnapshotSink {
    fn publish(&mut self, snapshot: &Snapshot);
}

/// In-memory command queue
#[derive(Debug, Default)]
pub struct QueueSource {
    queue: VecDeque<Command>,
}

impl QueueSource {
    pub fn push(&mut self, command: Command) {
        self.queue.push_back(command);
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

impl CommandSource for QueueSource {
    fn poll(&mut self) -> Vec<Command> {
        self.queue.drain(..).collect()
    }
}

/// Keeps every published snapshot
#[derive(Debug, Default)]
pub struct MemorySink {
    pub snapshots: Vec<Snapshot>,
}

impl SnapshotSink for MemorySink {
    fn publish(&mut self, snapshot: &Snapshot) {
        self.snapshots.push(snapshot.clone());
    }
}

#[derive(Debug, Clone)]
pub struct Simulation {
    world: World,
    phase: SimPhase,
    last_market: Vec<MarketRecord>,
}

impl Simulation {
    pub fn new(config: SimConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            world: World::new(config)?,
            phase: SimPhase::Initializing,
            last_market: Vec::new(),
        })
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Self::new(SimConfig::from_json(json)?)
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn phase(&self) -> SimPhase {
        self.phase
    }

    pub fn tick(&self) -> u64 {
        self.world.tick
    }

    /// Settled offers from the most recent step
    pub fn last_market(&self) -> &[MarketRecord] {
        &self.last_market
    }

    /// Stop stepping. Only a `Restart` brings the simulation back.
    pub fn terminate(&mut self) {
        self.phase = SimPhase::Terminated;
    }

    /// Apply one command. `Restart` replaces the world only if the new
    /// config is valid; otherwise the current run carries on.
    pub fn apply(&mut self, command: &Command) -> Result<(), CommandError> {
        if let Command::Restart { config } = command {
            self.world = World::new(config.clone())?;
            self.phase = SimPhase::Initializing;
            self.last_market.clear();
            return Ok(());
        }
        if self.phase == SimPhase::Terminated {
            return Err(CommandError::Terminated);
        }
        self.world.apply_command(command)
    }

    /// Apply commands in order, logging and skipping any that fail.
    /// Returns the number applied.
    pub fn apply_all(&mut self, commands: impl IntoIterator<Item = Command>) -> usize {
        self.world.reset_player_moves();
        let mut applied = 0;
        for command in commands {
            match self.apply(&command) {
                Ok(()) => {
                    applied += 1;
                    #[cfg(feature = "instrument")]
                    tracing::info!(
                        target: "command",
                        tick = self.world.tick,
                        command = command.name(),
                        player = command.player().unwrap_or(""),
                        applied = true,
                    );
                }
                Err(err) => {
                    #[cfg(feature = "instrument")]
                    {
                        let error = err.to_string();
                        tracing::warn!(
                            target: "command",
                            tick = self.world.tick,
                            command = command.name(),
                            player = command.player().unwrap_or(""),
                            applied = false,
                            error = error.as_str(),
                        );
                    }
                    let _ = err;
                }
            }
        }
        applied
    }

    /// Advance one month. A terminated simulation does nothing.
    pub fn step(&mut self) -> &[MarketRecord] {
        if self.phase == SimPhase::Terminated {
            self.last_market.clear();
            return &self.last_market;
        }
        self.phase = SimPhase::Running;
        self.last_market = self.world.step();
        debug_assert!(
            self.world.check_invariants().is_empty(),
            "{:?}",
            self.world.check_invariants()
        );
        &self.last_market
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot::capture(&self.world)
    }

    /// One full turn at the boundary: drain commands, step, publish
    pub fn run_tick(
        &mut self,
        source: &mut impl CommandSource,
        sink: &mut impl SnapshotSink,
    ) -> Vec<MarketRecord> {
        self.apply_all(source.poll());
        let records = self.step().to_vec();
        if self.phase != SimPhase::Terminated {
            sink.publish(&self.snapshot());
        }
        records
    }
}
