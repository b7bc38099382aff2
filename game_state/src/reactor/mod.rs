//! Condition reactors - edge-triggered watchers over the state store.
//!
//! A reactor owns a [`ConditionSet`] and a derived `fulfilled` flag. While
//! active it re-evaluates the set on every store change and fires a callback
//! only when the result flips:
//!
//! - **false -> true**: `on_fulfilled` runs and the indicator is shown
//! - **true -> false**: `on_unfulfilled` runs and the indicator is hidden
//!
//! Activation takes a baseline reading and fires nothing.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::signal::SubscriptionId;
use crate::store::{ConditionSet, StateStore};

/// Something that shows whether a reactor's conditions hold, such as a quest
/// log entry.
pub trait QuestIndicator {
    fn set_visible(&self, visible: bool);
}

/// Edge reported by [`ConditionReactor::evaluate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactorEdge {
    Fulfilled,
    Unfulfilled,
}

type Callback = Rc<dyn Fn()>;

struct ReactorInner {
    name: String,
    conditions: ConditionSet,
    fulfilled: Cell<bool>,
    on_fulfilled: RefCell<Vec<Callback>>,
    on_unfulfilled: RefCell<Vec<Callback>>,
    indicator: RefCell<Option<Rc<dyn QuestIndicator>>>,
}

impl ReactorInner {
    fn evaluate(&self, store: &StateStore) -> Option<ReactorEdge> {
        let now = store.check_conditions(&self.conditions);
        let was = self.fulfilled.replace(now);

        let edge = match (was, now) {
            (false, true) => ReactorEdge::Fulfilled,
            (true, false) => ReactorEdge::Unfulfilled,
            _ => return None,
        };

        tracing::debug!(reactor = %self.name, ?edge, "Reactor conditions changed");

        if let Some(indicator) = self.indicator.borrow().clone() {
            indicator.set_visible(now);
        }

        let callbacks: Vec<Callback> = match edge {
            ReactorEdge::Fulfilled => self.on_fulfilled.borrow().clone(),
            ReactorEdge::Unfulfilled => self.on_unfulfilled.borrow().clone(),
        };
        for callback in callbacks {
            callback();
        }

        Some(edge)
    }
}

/// Watches a condition set and reports fulfillment edges.
pub struct ConditionReactor {
    inner: Rc<ReactorInner>,
    store: Rc<StateStore>,
    subscription: Option<SubscriptionId>,
}

impl ConditionReactor {
    /// Create an inactive reactor over `conditions`.
    pub fn new(name: impl Into<String>, store: Rc<StateStore>, conditions: ConditionSet) -> Self {
        Self {
            inner: Rc::new(ReactorInner {
                name: name.into(),
                conditions,
                fulfilled: Cell::new(false),
                on_fulfilled: RefCell::new(Vec::new()),
                on_unfulfilled: RefCell::new(Vec::new()),
                indicator: RefCell::new(None),
            }),
            store,
            subscription: None,
        }
    }

    /// Register a callback for the false -> true edge.
    pub fn on_fulfilled(self, callback: impl Fn() + 'static) -> Self {
        self.inner.on_fulfilled.borrow_mut().push(Rc::new(callback));
        self
    }

    /// Register a callback for the true -> false edge.
    pub fn on_unfulfilled(self, callback: impl Fn() + 'static) -> Self {
        self.inner.on_unfulfilled.borrow_mut().push(Rc::new(callback));
        self
    }

    /// Link an indicator that mirrors the fulfilled flag.
    pub fn with_indicator(self, indicator: Rc<dyn QuestIndicator>) -> Self {
        *self.inner.indicator.borrow_mut() = Some(indicator);
        self
    }

    /// Start watching the store.
    ///
    /// The first evaluation sets the baseline without firing callbacks. A
    /// linked indicator is set to the baseline. Activating twice is a no-op.
    pub fn activate(&mut self) {
        if self.subscription.is_some() {
            return;
        }

        let baseline = self.store.check_conditions(&self.inner.conditions);
        self.inner.fulfilled.set(baseline);
        if let Some(indicator) = self.inner.indicator.borrow().clone() {
            indicator.set_visible(baseline);
        }

        let inner: Weak<ReactorInner> = Rc::downgrade(&self.inner);
        let store: Weak<StateStore> = Rc::downgrade(&self.store);
        let id = self.store.changed().subscribe(move |_| {
            if let (Some(inner), Some(store)) = (inner.upgrade(), store.upgrade()) {
                inner.evaluate(&store);
            }
        });
        self.subscription = Some(id);

        tracing::debug!(reactor = %self.inner.name, fulfilled = baseline, "Reactor activated");
    }

    /// Stop watching the store and hide the indicator.
    pub fn deactivate(&mut self) {
        if let Some(id) = self.subscription.take() {
            self.store.changed().unsubscribe(id);
            tracing::debug!(reactor = %self.inner.name, "Reactor deactivated");
        }

        if let Some(indicator) = self.inner.indicator.borrow().clone() {
            indicator.set_visible(false);
        }
    }

    /// Re-evaluate now, firing callbacks on an edge.
    ///
    /// An inactive reactor has no baseline and reports no edge.
    pub fn evaluate(&self) -> Option<ReactorEdge> {
        if !self.is_active() {
            return None;
        }
        self.inner.evaluate(&self.store)
    }

    pub fn is_active(&self) -> bool {
        self.subscription.is_some()
    }

    pub fn is_fulfilled(&self) -> bool {
        self.inner.fulfilled.get()
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn conditions(&self) -> &ConditionSet {
        &self.inner.conditions
    }
}

impl Drop for ConditionReactor {
    fn drop(&mut self) {
        if self.subscription.is_some() {
            self.deactivate();
        }
    }
}

impl std::fmt::Debug for ConditionReactor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConditionReactor")
            .field("name", &self.inner.name)
            .field("conditions", &self.inner.conditions)
            .field("fulfilled", &self.inner.fulfilled.get())
            .field("active", &self.is_active())
            .finish()
    }
}
