use std::thread;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::backend::Backend;
use crate::bridge::EventBridge;
use crate::error::NotifyError;
use crate::operation::{Acquired, LoopExit, Operation};
use crate::watcher::CancelWatcher;

/// Runs device notifications over `backend` on the calling thread.
///
/// Blocks until `cancel` fires or message retrieval fails. `on_event` runs on
/// a dedicated thread once per coalesced device change; `on_error` runs on
/// the calling thread for every teardown or loop failure. Only failures that
/// keep the loop from starting are returned.
///
/// Both callbacks are finished with before this returns.
///
/// # Panics
///
/// If the backend reports a different OS thread than the one that called
/// this function while a window or registration step is running.
pub fn start_with<B, E, F>(
    backend: &B,
    cancel: &CancellationToken,
    on_event: E,
    mut on_error: F,
) -> Result<(), NotifyError>
where
    B: Backend,
    E: FnMut() + Send,
    F: FnMut(&str),
{
    let op = Operation::bind(backend);

    thread::scope(|scope| {
        let mut bridge = EventBridge::new();
        let consumer = bridge
            .spawn_consumer(scope, on_event)
            .map_err(|source| NotifyError::Spawn {
                name: "event consumer",
                source,
            })?;

        let mut acquired = Acquired::<B>::default();
        let outcome = run(&op, scope, cancel, &bridge, &mut acquired, &mut on_error);
        op.release(&mut acquired, &mut on_error);

        bridge.close();
        if let Some(consumer) = consumer {
            if consumer.join().is_err() {
                error!("Device event callback panicked");
                on_error("device event callback panicked");
            }
        }

        match &outcome {
            Ok(LoopExit::Quit) => info!("Device notifications stopped"),
            Ok(LoopExit::Error) => info!("Device notifications stopped after a loop error"),
            Err(e) => error!("Device notifications failed to start: {}", e),
        }
        outcome.map(|_| ())
    })
}

fn run<'scope, 'env, B, F>(
    op: &Operation<'_, B>,
    scope: &'scope thread::Scope<'scope, 'env>,
    cancel: &'env CancellationToken,
    bridge: &EventBridge,
    acquired: &mut Acquired<B>,
    on_error: &mut F,
) -> Result<LoopExit, NotifyError>
where
    B: Backend,
    F: FnMut(&str),
{
    let window = acquired.window.insert(op.create_window(bridge.signal())?);
    debug!("Notification window created");

    acquired.registration = Some(op.register(window)?);
    debug!("Registered for device interface notifications");

    let poster = op.backend().quit_poster(window);
    let watcher = CancelWatcher::arm(scope, cancel, poster).map_err(|source| NotifyError::Spawn {
        name: "cancellation watcher",
        source,
    })?;

    info!("Listening for device changes");
    let exit = op.pump(window, on_error);
    watcher.disarm();
    Ok(exit)
}
