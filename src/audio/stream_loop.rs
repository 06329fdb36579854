// The stream loop: the one background thread per player. Pulls frames
// from the active source under the player lock, then pushes them to the
// sink with the lock released so pause/close never wait on the transport.

use std::sync::Arc;
use tracing::{debug, error, info, trace, warn};

use super::player::{PlayerState, Shared};
use super::signal::PlaybackOutcome;
use crate::error::SinkError;

pub(crate) fn run(shared: Arc<Shared>) {
    let idle_interval = shared.settings.idle_interval();
    let send_timeout = shared.settings.send_timeout();
    debug!(?idle_interval, ?send_timeout, "Stream loop started");

    loop {
        let mut inner = shared.inner.lock();

        match inner.state {
            PlayerState::Closed => {
                inner.finish_cycle(PlaybackOutcome::Closed);
                debug!("Stream loop exiting, player closed");
                return;
            }
            PlayerState::Halted => return,
            PlayerState::Idle | PlayerState::Paused => {
                // Woken early by any state change
                shared.wake.wait_for(&mut inner, idle_interval);
                continue;
            }
            PlayerState::Playing => {}
        }

        let cycle = inner.cycle;
        let pulled = match inner.source.as_mut() {
            Some(source) => source.next_frame(),
            None => Ok(None),
        };

        let frame = match pulled {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                inner.finish_cycle(PlaybackOutcome::Finished);
                inner.state = PlayerState::Idle;
                shared.stats.record_finished();
                info!(cycle, "Playback finished");
                continue;
            }
            Err(e) => {
                error!(cycle, error = %e, "Error reading frame from source, halting");
                shared.stats.record_decode_failure();
                inner.finish_cycle(PlaybackOutcome::DecodeFailed(e.to_string()));
                inner.state = PlayerState::Halted;
                return;
            }
        };
        drop(inner);

        match shared.sink.send(frame, send_timeout) {
            Ok(()) => {
                shared.stats.record_frame();
                trace!(cycle, "Frame delivered");
            }
            Err(e) => {
                let mut inner = shared.inner.lock();
                // Close disconnects the sink, which fails a blocked send
                if inner.state == PlayerState::Closed {
                    debug!(cycle, error = %e, "Send interrupted by close");
                    return;
                }

                match &e {
                    SinkError::Timeout(_) => {
                        error!(cycle, error = %e, "Transport stalled, halting")
                    }
                    SinkError::Disconnected => {
                        warn!(cycle, "Transport disconnected mid-stream, halting")
                    }
                }
                shared.stats.record_stall();
                inner.finish_cycle(PlaybackOutcome::Stalled);
                inner.state = PlayerState::Halted;
                return;
            }
        }
    }
}
