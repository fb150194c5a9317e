//! Turns an external cancellation into a quit message for the loop.

use std::thread::{self, Scope, ScopedJoinHandle};

use futures::channel::oneshot;
use futures::future::{self, Either};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::backend::QuitPoster;

pub struct CancelWatcher<'scope> {
    disarm: Option<oneshot::Sender<()>>,
    handle: Option<ScopedJoinHandle<'scope, bool>>,
}

impl<'scope> CancelWatcher<'scope> {
    /// Spawns a thread that posts quit through `poster` once `cancel` fires.
    pub fn arm<'env, P>(
        scope: &'scope Scope<'scope, 'env>,
        cancel: &'env CancellationToken,
        poster: P,
    ) -> std::io::Result<Self>
    where
        P: QuitPoster + 'scope,
    {
        let (disarm, disarmed) = oneshot::channel::<()>();
        let handle = thread::Builder::new()
            .name("device-cancel".into())
            .spawn_scoped(scope, move || {
                let cancelled = cancel.cancelled();
                futures::pin_mut!(cancelled);
                match futures::executor::block_on(future::select(cancelled, disarmed)) {
                    Either::Left(((), _)) => {
                        debug!("Cancellation requested, posting quit");
                        if let Err(e) = poster.post_quit() {
                            warn!("Failed to post quit message: {}", e);
                        }
                        true
                    }
                    Either::Right(_) => false,
                }
            })?;
        Ok(Self {
            disarm: Some(disarm),
            handle: Some(handle),
        })
    }

    /// Stops waiting and joins the thread. Returns whether quit was posted.
    pub fn disarm(mut self) -> bool {
        self.shutdown()
    }

    fn shutdown(&mut self) -> bool {
        if let Some(disarm) = self.disarm.take() {
            let _ = disarm.send(());
        }
        match self.handle.take() {
            Some(handle) => handle.join().unwrap_or(false),
            None => false,
        }
    }
}

impl Drop for CancelWatcher<'_> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Duration;

    struct ChannelPoster(mpsc::Sender<()>);

    impl QuitPoster for ChannelPoster {
        fn post_quit(&self) -> Result<(), String> {
            self.0.send(()).map_err(|e| e.to_string())
        }
    }

    #[test]
    fn test_cancel_posts_quit() {
        let cancel = CancellationToken::new();
        let (tx, rx) = mpsc::channel();
        thread::scope(|scope| {
            let watcher = CancelWatcher::arm(scope, &cancel, ChannelPoster(tx)).unwrap();
            cancel.cancel();
            rx.recv_timeout(Duration::from_secs(5)).unwrap();
            assert!(watcher.disarm());
        });
    }

    #[test]
    fn test_disarm_without_cancel() {
        let cancel = CancellationToken::new();
        let (tx, rx) = mpsc::channel();
        thread::scope(|scope| {
            let watcher = CancelWatcher::arm(scope, &cancel, ChannelPoster(tx)).unwrap();
            assert!(!watcher.disarm());
        });
        assert!(rx.try_recv().is_err());
        assert!(!cancel.is_cancelled());
    }

    #[test]
    fn test_already_cancelled_posts_immediately() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let (tx, rx) = mpsc::channel();
        thread::scope(|scope| {
            let _watcher = CancelWatcher::arm(scope, &cancel, ChannelPoster(tx)).unwrap();
            rx.recv_timeout(Duration::from_secs(5)).unwrap();
        });
    }
}
