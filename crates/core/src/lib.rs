pub use chase::chase::Chase;
pub use chase::player::ChasePlayer;
pub use chase::source::{load_chase_file, DataError};
pub use config::{ChaseDescriptor, ConfigError, ConfigManager, Settings, SUPPORTED_BAUD_RATES};
pub use dmx::frame::{Frame, UNIVERSE_SIZE};
pub use dmx::transmitter::{DmxTransmitter, TransportError, DMX_BAUD_RATE};
pub use dmx::DmxOutput;
pub use engine::ChaseEngine;
pub use osc::server::{normalize_address, OscServer, TriggerHandler, DEFAULT_OSC_PORT};

mod chase;
mod config;
mod dmx;
mod engine;
mod osc;
