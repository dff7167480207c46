use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::chase::Chase;
use crate::dmx::DmxOutput;

/// Plays one chase's frame sequence against a shared DMX output.
///
/// At most one playback task exists per player at any time. A trigger that
/// cannot be honored (muted chase, closed output, no frames, already
/// playing) is a logged no-op so a malformed or premature trigger never
/// takes down the control path.
pub struct ChasePlayer {
    chase: Arc<Chase>,
    output: Arc<dyn DmxOutput>,
    task: Mutex<Option<PlaybackTask>>,
}

struct PlaybackTask {
    cancel: watch::Sender<bool>,
    /// Taken by the `stop()` that joins the task. The entry itself stays in
    /// the slot until the join completes, so a concurrent `play()` still
    /// sees the player as occupied.
    handle: Option<JoinHandle<()>>,
}

impl PlaybackTask {
    fn is_active(&self) -> bool {
        match &self.handle {
            Some(handle) => !handle.is_finished(),
            // A stop() is currently joining the task; it counts as active
            // until the slot is cleared.
            None => true,
        }
    }
}

impl ChasePlayer {
    pub fn new(chase: Chase, output: Arc<dyn DmxOutput>) -> Self {
        ChasePlayer {
            chase: Arc::new(chase),
            output,
            task: Mutex::new(None),
        }
    }

    pub fn chase(&self) -> &Chase {
        &self.chase
    }

    /// Start playback on a background task. Must be called from within a
    /// tokio runtime.
    pub fn play(&self) {
        if !self.chase.is_playable() {
            log::warn!("chase {} has no valid frames to play", self.chase.address);
            return;
        }
        if self.chase.mute {
            log::info!("chase {} is muted, playback skipped", self.chase.address);
            return;
        }
        if !self.output.is_open() {
            log::warn!(
                "serial port is not open, cannot play chase {}",
                self.chase.address
            );
            return;
        }

        let mut slot = self.task.lock();
        if let Some(task) = slot.as_ref() {
            if task.is_active() {
                log::info!("chase {} is already playing", self.chase.address);
                return;
            }
        }

        let (cancel, cancel_rx) = watch::channel(false);
        let chase = Arc::clone(&self.chase);
        let output = Arc::clone(&self.output);
        let handle = tokio::spawn(run_playback(chase, output, cancel_rx));
        *slot = Some(PlaybackTask {
            cancel,
            handle: Some(handle),
        });
    }

    /// Signal cancellation and wait for the playback task to exit. No
    /// further `send` happens once this returns. Cancellation is
    /// cooperative and never interrupts an in-flight transmission, so the
    /// worst-case latency is one frame interval plus one send.
    pub async fn stop(&self) {
        loop {
            let handle = {
                let mut slot = self.task.lock();
                match slot.as_mut() {
                    None => return,
                    Some(task) => {
                        let _ = task.cancel.send(true);
                        task.handle.take()
                    }
                }
            };

            match handle {
                Some(handle) => {
                    if let Err(e) = handle.await {
                        log::error!(
                            "playback task for chase {} failed: {}",
                            self.chase.address,
                            e
                        );
                    }
                    *self.task.lock() = None;
                    return;
                }
                // Another stop() is joining the task; wait for it to clear
                // the slot.
                None => tokio::task::yield_now().await,
            }
        }
    }

    pub fn is_playing(&self) -> bool {
        self.task
            .lock()
            .as_ref()
            .map_or(false, |task| task.is_active())
    }
}

async fn run_playback(
    chase: Arc<Chase>,
    output: Arc<dyn DmxOutput>,
    mut cancel: watch::Receiver<bool>,
) {
    log::info!(
        "playing chase {} ({})",
        chase.address,
        if chase.loop_playback { "looping" } else { "once" }
    );
    let interval = chase.frame_interval();

    'playback: loop {
        for frame in &chase.frames {
            if *cancel.borrow() {
                break 'playback;
            }
            let scaled = frame.scaled(chase.brightness);
            output.send(scaled.channels());
            tokio::select! {
                _ = cancel.changed() => break 'playback,
                _ = tokio::time::sleep(interval) => {}
            }
        }
        if !chase.loop_playback {
            break;
        }
    }

    log::info!("finished chase {}", chase.address);
}
