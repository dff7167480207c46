use std::collections::HashMap;
use std::sync::Arc;

use rosc::OscType;

use crate::chase::chase::Chase;
use crate::chase::player::ChasePlayer;
use crate::chase::source::load_chase_file;
use crate::config::Settings;
use crate::dmx::transmitter::DmxTransmitter;
use crate::dmx::DmxOutput;
use crate::osc::server::{normalize_address, OscServer};

/// Wires the playback engine together: one transmitter shared by all chase
/// players, plus the OSC trigger server that drives them.
///
/// Startup failures stay local: a serial port that will not open or an OSC
/// port that will not bind is logged and the rest of the engine keeps
/// running, so direct triggers still work.
pub struct ChaseEngine {
    settings: Settings,
    transmitter: Arc<DmxTransmitter>,
    osc: OscServer,
    players: HashMap<String, Arc<ChasePlayer>>,
}

impl ChaseEngine {
    pub fn new(settings: Settings, osc_port: u16) -> Self {
        let transmitter = Arc::new(DmxTransmitter::new(
            settings.com_port.clone(),
            settings.baud_rate,
        ));

        ChaseEngine {
            settings,
            transmitter,
            osc: OscServer::new(osc_port),
            players: HashMap::new(),
        }
    }

    /// Open the transmitter, realize every chase descriptor into a player,
    /// bind its OSC address, and start the trigger server.
    pub async fn start(&mut self) {
        if let Err(e) = self.transmitter.open() {
            log::error!("{}", e);
        }

        for descriptor in &self.settings.chases {
            let frames = match load_chase_file(&descriptor.file) {
                Ok(frames) => frames,
                Err(e) => {
                    log::error!("cannot load chase {}: {}", descriptor.osc, e);
                    Vec::new()
                }
            };

            let address = normalize_address(&descriptor.osc);
            let chase = Chase {
                address: address.clone(),
                frames,
                loop_playback: descriptor.loop_playback,
                mute: descriptor.mute,
                framerate: self.settings.framerate,
                brightness: self.settings.brightness,
            };

            let player = Arc::new(ChasePlayer::new(
                chase,
                Arc::clone(&self.transmitter) as Arc<dyn DmxOutput>,
            ));

            let trigger = Arc::clone(&player);
            self.osc.register(
                &address,
                Arc::new(move |_addr: &str, _args: &[OscType]| trigger.play()),
            );
            self.players.insert(address, player);
        }

        // A bind failure was already logged by the server; playback via
        // direct triggers keeps working without it.
        let _ = self.osc.start().await;
    }

    /// Player bound to an OSC address, for direct/manual triggering.
    pub fn player(&self, address: &str) -> Option<&Arc<ChasePlayer>> {
        self.players.get(&normalize_address(address))
    }

    pub fn players(&self) -> impl Iterator<Item = &Arc<ChasePlayer>> {
        self.players.values()
    }

    pub fn transmitter(&self) -> &Arc<DmxTransmitter> {
        &self.transmitter
    }

    /// Orderly shutdown: stop every player (waiting for each playback task
    /// to exit), then the OSC listener, then close the serial port.
    pub async fn shutdown(&mut self) {
        log::info!("shutting down playback engine");
        for player in self.players.values() {
            player.stop().await;
        }
        self.osc.stop().await;
        self.transmitter.close();
    }
}
