//! Post-commit callbacks for entity creation.
//!
//! Callbacks run synchronously on the request path right after the row is
//! committed, so side effects stay visible in the handler's control flow.
//! The default registration only traces; aggregate recomputation can hang
//! off these events later.

use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookEvent {
    UserCreated(Uuid),
    EvaluationCreated(Uuid),
}

type HookFn = Box<dyn Fn(&HookEvent) + Send + Sync>;

#[derive(Default)]
pub struct PostCommitHooks {
    callbacks: Vec<HookFn>,
}

impl PostCommitHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, callback: F)
    where
        F: Fn(&HookEvent) + Send + Sync + 'static,
    {
        self.callbacks.push(Box::new(callback));
    }

    pub fn dispatch(&self, event: HookEvent) {
        for callback in &self.callbacks {
            callback(&event);
        }
    }

    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn registered_callbacks_fire_in_order_for_each_event() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut hooks = PostCommitHooks::new();

        let c1 = counter.clone();
        hooks.register(move |_| {
            c1.fetch_add(1, Ordering::SeqCst);
        });
        let c2 = counter.clone();
        hooks.register(move |event| {
            if matches!(event, HookEvent::EvaluationCreated(_)) {
                c2.fetch_add(10, Ordering::SeqCst);
            }
        });

        hooks.dispatch(HookEvent::UserCreated(Uuid::new_v4()));
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        hooks.dispatch(HookEvent::EvaluationCreated(Uuid::new_v4()));
        assert_eq!(counter.load(Ordering::SeqCst), 12);
    }

    #[test]
    fn empty_hook_list_is_a_no_op() {
        let hooks = PostCommitHooks::new();
        assert!(hooks.is_empty());
        hooks.dispatch(HookEvent::UserCreated(Uuid::new_v4()));
    }
}
