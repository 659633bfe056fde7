//! Hand-off from libmpv threads to the host's dispatch thread.
//!
//! libmpv calls its wakeup and render-update callbacks on internal threads, and
//! the host may complete a buffer swap on yet another. None of those touch the
//! instance. They push a [`Signal`] into an unbounded queue and ask the host to
//! schedule a pump; [`Instance::pump`](crate::Instance::pump) then drains the
//! queue on the one thread that owns all state.

use std::fmt;
use std::sync::Arc;

use async_channel::{Receiver, Sender, TryRecvError};

/// Work requested from outside the dispatch thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// libmpv has events queued.
    Wakeup,
    /// libmpv has a new frame to render.
    Update,
    /// A buffer swap requested by a render pass has completed.
    PresentDone,
}

/// Callback asking the host to run a pump on its dispatch thread.
pub type ScheduleFn = Arc<dyn Fn() + Send + Sync>;

/// Sending half of the dispatch queue. Cheap to clone and safe to use from any
/// thread.
#[derive(Clone)]
pub struct Scheduler {
    sender: Sender<Signal>,
    schedule: ScheduleFn,
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("queued", &self.sender.len())
            .finish_non_exhaustive()
    }
}

impl Scheduler {
    /// Queue `signal` and ask the host for a pump.
    ///
    /// Signals sent after the instance is gone are dropped.
    pub fn schedule(&self, signal: Signal) {
        if self.sender.try_send(signal).is_ok() {
            (self.schedule)();
        }
    }

    /// A callback suitable for a libmpv notification that raises `signal`.
    #[must_use]
    pub fn signal_fn(&self, signal: Signal) -> impl Fn() + Send + Sync + 'static {
        let scheduler = self.clone();
        move || scheduler.schedule(signal)
    }

    /// Completion token for one buffer swap.
    #[must_use]
    pub fn present_done(&self) -> PresentDone {
        PresentDone {
            scheduler: self.clone(),
        }
    }
}

/// Receiving half of the dispatch queue, owned by the instance.
#[derive(Debug)]
pub struct Dispatcher {
    receiver: Receiver<Signal>,
}

impl Dispatcher {
    /// Next queued signal, without blocking.
    #[must_use]
    pub fn try_next(&self) -> Option<Signal> {
        match self.receiver.try_recv() {
            Ok(signal) => Some(signal),
            Err(TryRecvError::Empty | TryRecvError::Closed) => None,
        }
    }
}

/// Create a dispatch queue whose senders call `schedule` after every push.
pub fn channel(schedule: impl Fn() + Send + Sync + 'static) -> (Scheduler, Dispatcher) {
    let (sender, receiver) = async_channel::unbounded();
    let scheduler = Scheduler {
        sender,
        schedule: Arc::new(schedule),
    };
    (scheduler, Dispatcher { receiver })
}

/// Completion for a buffer swap, handed to
/// [`Surface::swap_buffers`](crate::Surface::swap_buffers).
///
/// Consuming it with [`complete`](Self::complete) queues
/// [`Signal::PresentDone`]. Dropping it without completing leaves the
/// presentation in its rendering state, so no further frames are drawn.
#[derive(Debug)]
#[must_use = "a render pass only finishes when its PresentDone is completed"]
pub struct PresentDone {
    scheduler: Scheduler,
}

impl PresentDone {
    /// Report that the swap has finished. Callable from any thread.
    pub fn complete(self) {
        self.scheduler.schedule(Signal::PresentDone);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn schedule_queues_and_notifies() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let (scheduler, dispatcher) = channel(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        scheduler.schedule(Signal::Wakeup);
        scheduler.signal_fn(Signal::Update)();
        scheduler.present_done().complete();

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(dispatcher.receiver.len(), 3);
        assert_eq!(dispatcher.try_next(), Some(Signal::Wakeup));
        assert_eq!(dispatcher.try_next(), Some(Signal::Update));
        assert_eq!(dispatcher.try_next(), Some(Signal::PresentDone));
        assert_eq!(dispatcher.try_next(), None);
    }

    #[test]
    fn signals_cross_threads() {
        let (scheduler, dispatcher) = channel(|| {});
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let scheduler = scheduler.clone();
                std::thread::spawn(move || scheduler.schedule(Signal::Wakeup))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(dispatcher.receiver.len(), 4);
    }

    #[test]
    fn nothing_is_scheduled_after_the_dispatcher_is_gone() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let (scheduler, dispatcher) = channel(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        drop(dispatcher);
        scheduler.schedule(Signal::Update);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
