//! Typed event broadcasting
//!
//! A [`Signaler`] delivers events of one type to every currently registered
//! callback. Registering returns a [`SignalToken`]; the callback stays registered for
//! as long as the token is alive, the signaler itself only keeps a weak reference.
//!
//! Delivery is synchronous and ordered:
//!
//! - every callback alive when an event starts being delivered is invoked once, in
//!   registration order, unless its token is dropped before its turn comes
//! - a callback registered while an event is being delivered is not invoked for that event
//! - an event signaled from inside a callback is queued and delivered once the current
//!   one has reached every callback
//!
//! ```
//! use std::{cell::Cell, rc::Rc};
//! use xdg_shell_v6::utils::signaling::Signaler;
//!
//! let signaler = Signaler::<u32>::new();
//! let seen = Rc::new(Cell::new(0));
//! let seen2 = seen.clone();
//! let token = signaler.register(move |value| seen2.set(seen2.get() + *value));
//!
//! signaler.signal(3);
//! assert_eq!(seen.get(), 3);
//!
//! drop(token);
//! signaler.signal(3);
//! assert_eq!(seen.get(), 3);
//! ```

use std::{
    any::Any,
    cell::{Cell, RefCell},
    collections::VecDeque,
    fmt,
    rc::{Rc, Weak},
};

type Callback<S> = RefCell<dyn FnMut(&S)>;

struct SignalInner<S> {
    callbacks: RefCell<Vec<Weak<Callback<S>>>>,
    pending_events: RefCell<VecDeque<S>>,
    emitting: Cell<bool>,
}

/// A broadcaster for events of type `S`
pub struct Signaler<S> {
    inner: Rc<SignalInner<S>>,
}

impl<S> Clone for Signaler<S> {
    fn clone(&self) -> Self {
        Signaler {
            inner: self.inner.clone(),
        }
    }
}

impl<S> Default for Signaler<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> fmt::Debug for Signaler<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signaler")
            .field("subscribers", &self.subscriber_count())
            .field("pending_events", &self.inner.pending_events.borrow().len())
            .field("emitting", &self.inner.emitting.get())
            .finish()
    }
}

impl<S> Signaler<S> {
    /// Create a new signaler without subscribers
    pub fn new() -> Self {
        Signaler {
            inner: Rc::new(SignalInner {
                callbacks: RefCell::new(Vec::new()),
                pending_events: RefCell::new(VecDeque::new()),
                emitting: Cell::new(false),
            }),
        }
    }

    /// Register a callback
    ///
    /// The callback is unregistered when the returned token is dropped.
    #[must_use = "the callback is unregistered as soon as the token is dropped"]
    pub fn register<F>(&self, f: F) -> SignalToken
    where
        F: FnMut(&S) + 'static,
        S: 'static,
    {
        let callback = Rc::new(RefCell::new(f));
        let weak: Weak<Callback<S>> = Rc::downgrade(&callback) as Weak<Callback<S>>;
        self.inner.callbacks.borrow_mut().push(weak);
        SignalToken { _callback: callback }
    }

    /// Number of callbacks whose token is still alive
    pub fn subscriber_count(&self) -> usize {
        self.inner
            .callbacks
            .borrow()
            .iter()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }

    /// Deliver an event to all registered callbacks
    ///
    /// If this signaler is already delivering an event, the new one is queued and
    /// delivered before the outermost call returns.
    pub fn signal(&self, event: S) {
        self.inner.pending_events.borrow_mut().push_back(event);
        if self.inner.emitting.replace(true) {
            return;
        }

        loop {
            let Some(event) = self.inner.pending_events.borrow_mut().pop_front() else {
                break;
            };
            // snapshot, so that registrations during delivery are not picked up
            let snapshot = {
                let mut callbacks = self.inner.callbacks.borrow_mut();
                callbacks.retain(|weak| weak.strong_count() > 0);
                callbacks.clone()
            };
            for weak in snapshot {
                // the token may have been dropped by an earlier callback
                if let Some(callback) = weak.upgrade() {
                    let mut callback = callback.borrow_mut();
                    (&mut *callback)(&event);
                }
            }
        }

        self.inner.emitting.set(false);
    }
}

/// A token associated with a callback registered to a [`Signaler`]
///
/// Dropping it unregisters the callback.
pub struct SignalToken {
    _callback: Rc<dyn Any>,
}

impl fmt::Debug for SignalToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignalToken").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delivered_in_registration_order() {
        let signaler = Signaler::<u32>::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        let log1 = log.clone();
        let _t1 = signaler.register(move |v| log1.borrow_mut().push(("first", *v)));
        let log2 = log.clone();
        let _t2 = signaler.register(move |v| log2.borrow_mut().push(("second", *v)));

        signaler.signal(1);
        signaler.signal(2);

        assert_eq!(
            *log.borrow(),
            vec![("first", 1), ("second", 1), ("first", 2), ("second", 2)]
        );
    }

    #[test]
    fn dropping_token_unsubscribes() {
        let signaler = Signaler::<()>::new();
        let count = Rc::new(Cell::new(0));

        let count2 = count.clone();
        let token = signaler.register(move |_| count2.set(count2.get() + 1));
        assert_eq!(signaler.subscriber_count(), 1);
        signaler.signal(());
        drop(token);
        assert_eq!(signaler.subscriber_count(), 0);
        signaler.signal(());

        assert_eq!(count.get(), 1);
    }

    #[test]
    fn registration_during_delivery_waits_for_next_event() {
        let signaler = Signaler::<u32>::new();
        let late_calls = Rc::new(RefCell::new(Vec::new()));
        let tokens = Rc::new(RefCell::new(Vec::new()));

        let signaler2 = signaler.clone();
        let late_calls2 = late_calls.clone();
        let tokens2 = tokens.clone();
        let _t = signaler.register(move |v| {
            if *v == 1 {
                let late_calls3 = late_calls2.clone();
                let token = signaler2.register(move |v| late_calls3.borrow_mut().push(*v));
                tokens2.borrow_mut().push(token);
            }
        });

        signaler.signal(1);
        assert!(late_calls.borrow().is_empty());
        signaler.signal(2);
        assert_eq!(*late_calls.borrow(), vec![2]);
    }

    #[test]
    fn nested_signal_is_queued() {
        let signaler = Signaler::<u32>::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        let signaler2 = signaler.clone();
        let log1 = log.clone();
        let _t1 = signaler.register(move |v| {
            log1.borrow_mut().push(("outer", *v));
            if *v == 1 {
                signaler2.signal(2);
            }
        });
        let log2 = log.clone();
        let _t2 = signaler.register(move |v| log2.borrow_mut().push(("after", *v)));

        signaler.signal(1);

        assert_eq!(
            *log.borrow(),
            vec![("outer", 1), ("after", 1), ("outer", 2), ("after", 2)]
        );
    }

    #[test]
    fn callback_dropped_mid_delivery_is_skipped() {
        let signaler = Signaler::<()>::new();
        let victim_calls = Rc::new(Cell::new(0));
        let victim: Rc<RefCell<Option<SignalToken>>> = Rc::new(RefCell::new(None));

        let victim2 = victim.clone();
        let _killer = signaler.register(move |_| {
            victim2.borrow_mut().take();
        });
        let victim_calls2 = victim_calls.clone();
        *victim.borrow_mut() = Some(signaler.register(move |_| victim_calls2.set(victim_calls2.get() + 1)));

        signaler.signal(());
        assert_eq!(victim_calls.get(), 0);
        assert_eq!(signaler.subscriber_count(), 1);
    }
}
