//! Awaitables and suspension
//!
//! An [`Awaitable`] is a lazily started asynchronous value. Reading it from a
//! component while it is unresolved suspends the render attempt; settling it
//! pings the root so the parked lanes are retried. The settled outcome is
//! cached on the awaitable, so later reads never restart the source.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_AWAITABLE_ID: AtomicU64 = AtomicU64::new(1);

/// Settlement state of an awaitable
#[derive(Debug, Clone, PartialEq)]
pub enum AwaitState<T> {
    /// The source has not been started
    Untracked,
    Pending,
    Fulfilled(T),
    Rejected(String),
}

type Source<T> = Box<dyn FnOnce(Resolver<T>)>;

struct Inner<T> {
    id: u64,
    state: RefCell<AwaitState<T>>,
    source: RefCell<Option<Source<T>>>,
    invocations: Cell<u32>,
    subscribers: RefCell<Vec<Box<dyn FnOnce()>>>,
}

impl<T> Inner<T> {
    fn settle(&self, outcome: AwaitState<T>) {
        {
            let mut state = self.state.borrow_mut();
            if matches!(*state, AwaitState::Fulfilled(_) | AwaitState::Rejected(_)) {
                return;
            }
            *state = outcome;
        }
        let subscribers = std::mem::take(&mut *self.subscribers.borrow_mut());
        for notify in subscribers {
            notify();
        }
    }
}

/// Type-erased view of an awaitable, held by the render attempt that
/// suspended on it
pub trait Wakeable {
    fn id(&self) -> u64;

    fn is_settled(&self) -> bool;

    /// Run `notify` once the awaitable settles; immediately if it already has
    fn subscribe(&self, notify: Box<dyn FnOnce()>);
}

impl<T: 'static> Wakeable for Inner<T> {
    fn id(&self) -> u64 {
        self.id
    }

    fn is_settled(&self) -> bool {
        matches!(
            *self.state.borrow(),
            AwaitState::Fulfilled(_) | AwaitState::Rejected(_)
        )
    }

    fn subscribe(&self, notify: Box<dyn FnOnce()>) {
        if self.is_settled() {
            notify();
        } else {
            self.subscribers.borrow_mut().push(notify);
        }
    }
}

/// Settles an awaitable. Calls after the first settlement are ignored.
pub struct Resolver<T> {
    inner: Rc<Inner<T>>,
}

impl<T> Clone for Resolver<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> Resolver<T> {
    pub fn resolve(&self, value: T) {
        self.inner.settle(AwaitState::Fulfilled(value));
    }

    pub fn reject(&self, reason: impl Into<String>) {
        self.inner.settle(AwaitState::Rejected(reason.into()));
    }
}

/// A lazily started asynchronous value
pub struct Awaitable<T> {
    inner: Rc<Inner<T>>,
}

impl<T> Clone for Awaitable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> fmt::Debug for Awaitable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Awaitable")
            .field("id", &self.inner.id)
            .field("invocations", &self.inner.invocations.get())
            .finish()
    }
}

impl<T: Clone + 'static> Awaitable<T> {
    /// Create an awaitable whose `source` is started on first read
    ///
    /// The source receives a [`Resolver`] and may settle it synchronously or
    /// keep it and settle later.
    pub fn new(source: impl FnOnce(Resolver<T>) + 'static) -> Self {
        Self::with_state(AwaitState::Untracked, Some(Box::new(source)))
    }

    /// An already fulfilled awaitable
    pub fn resolved(value: T) -> Self {
        Self::with_state(AwaitState::Fulfilled(value), None)
    }

    /// An already rejected awaitable
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::with_state(AwaitState::Rejected(reason.into()), None)
    }

    /// A pending awaitable plus the resolver that settles it
    pub fn pending() -> (Self, Resolver<T>) {
        let awaitable = Self::with_state(AwaitState::Pending, None);
        let resolver = awaitable.resolver();
        (awaitable, resolver)
    }

    fn with_state(state: AwaitState<T>, source: Option<Source<T>>) -> Self {
        Self {
            inner: Rc::new(Inner {
                id: NEXT_AWAITABLE_ID.fetch_add(1, Ordering::Relaxed),
                state: RefCell::new(state),
                source: RefCell::new(source),
                invocations: Cell::new(0),
                subscribers: RefCell::new(Vec::new()),
            }),
        }
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn resolver(&self) -> Resolver<T> {
        Resolver {
            inner: self.inner.clone(),
        }
    }

    pub fn state(&self) -> AwaitState<T> {
        self.inner.state.borrow().clone()
    }

    /// How many times the source has been started (0 or 1)
    pub fn invocations(&self) -> u32 {
        self.inner.invocations.get()
    }

    /// Start the source if it has not been started, then report the state
    ///
    /// Sources that settle synchronously are observed by the same call.
    pub fn track(&self) -> AwaitState<T> {
        let start = {
            let mut state = self.inner.state.borrow_mut();
            if matches!(*state, AwaitState::Untracked) {
                *state = AwaitState::Pending;
                true
            } else {
                false
            }
        };
        if start {
            let source = self.inner.source.borrow_mut().take();
            if let Some(source) = source {
                self.inner.invocations.set(self.inner.invocations.get() + 1);
                source(self.resolver());
            }
        }
        self.state()
    }

    pub fn as_wakeable(&self) -> Rc<dyn Wakeable> {
        self.inner.clone()
    }
}
