//! Reactive Context
//!
//! The tracking stack records which computation is currently running, so a
//! signal read can register the running computation as a dependent.
//!
//! # Implementation
//!
//! Each [`Runtime`] owns its own stack. Entering a computation pushes an
//! entry and returns a guard; dropping the guard pops it. Nested contexts
//! (a memo read from inside an effect) work naturally, and an untracked
//! frame (`None`) hides any outer computation from reads made inside it.

use parking_lot::Mutex;

use super::runtime::Runtime;
use super::SubscriberId;

/// The tracking stack of one runtime.
#[derive(Debug, Default)]
pub struct TrackingStack {
    frames: Mutex<Vec<Option<SubscriberId>>>,
}

impl TrackingStack {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, frame: Option<SubscriberId>) {
        self.frames.lock().push(frame);
    }

    fn pop(&self) -> Option<Option<SubscriberId>> {
        self.frames.lock().pop()
    }

    /// The subscriber reads should be attributed to, if any.
    pub fn current(&self) -> Option<SubscriberId> {
        self.frames.lock().last().copied().flatten()
    }

    /// Whether any frame (tracked or untracked) is on the stack.
    pub fn is_active(&self) -> bool {
        !self.frames.lock().is_empty()
    }

    pub fn depth(&self) -> usize {
        self.frames.lock().len()
    }
}

/// Guard that pops the tracking frame when dropped.
///
/// This keeps the stack balanced even if the computation panics.
pub struct ReactiveContext {
    runtime: Runtime,
    frame: Option<SubscriberId>,
}

impl ReactiveContext {
    /// Enter a tracked frame for `subscriber_id`.
    ///
    /// While the guard is alive, signal reads register `subscriber_id` as a
    /// dependent.
    pub fn enter(runtime: &Runtime, subscriber_id: SubscriberId) -> Self {
        Self::push(runtime, Some(subscriber_id))
    }

    /// Enter an untracked frame. Reads inside it register nothing.
    pub fn untracked(runtime: &Runtime) -> Self {
        Self::push(runtime, None)
    }

    fn push(runtime: &Runtime, frame: Option<SubscriberId>) -> Self {
        runtime.tracking().push(frame);
        Self {
            runtime: runtime.clone(),
            frame,
        }
    }
}

impl Drop for ReactiveContext {
    fn drop(&mut self) {
        let popped = self.runtime.tracking().pop();

        // Catch mismatched guards early in debug builds
        debug_assert_eq!(
            popped,
            Some(self.frame),
            "ReactiveContext mismatch: expected {:?}, got {:?}",
            self.frame,
            popped
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_tracks_subscriber() {
        let runtime = Runtime::new();
        let id = SubscriberId::new();

        assert!(!runtime.tracking().is_active());
        assert!(runtime.tracking().current().is_none());

        {
            let _ctx = ReactiveContext::enter(&runtime, id);
            assert!(runtime.tracking().is_active());
            assert_eq!(runtime.tracking().current(), Some(id));
        }

        // Context should be cleaned up after drop
        assert!(!runtime.tracking().is_active());
        assert!(runtime.tracking().current().is_none());
    }

    #[test]
    fn nested_contexts() {
        let runtime = Runtime::new();
        let id1 = SubscriberId::new();
        let id2 = SubscriberId::new();

        {
            let _ctx1 = ReactiveContext::enter(&runtime, id1);
            assert_eq!(runtime.tracking().current(), Some(id1));

            {
                let _ctx2 = ReactiveContext::enter(&runtime, id2);
                assert_eq!(runtime.tracking().current(), Some(id2));
            }

            // After inner context drops, outer should be current
            assert_eq!(runtime.tracking().current(), Some(id1));
        }

        assert!(runtime.tracking().current().is_none());
    }

    #[test]
    fn untracked_frame_hides_outer_subscriber() {
        let runtime = Runtime::new();
        let id = SubscriberId::new();

        let _outer = ReactiveContext::enter(&runtime, id);
        {
            let _inner = ReactiveContext::untracked(&runtime);
            assert!(runtime.tracking().is_active());
            assert!(runtime.tracking().current().is_none());
        }
        assert_eq!(runtime.tracking().current(), Some(id));
    }

    #[test]
    fn separate_runtimes_do_not_share_stacks() {
        let a = Runtime::new();
        let b = Runtime::new();

        let _ctx = ReactiveContext::enter(&a, SubscriberId::new());
        assert!(a.tracking().is_active());
        assert!(!b.tracking().is_active());
    }
}
