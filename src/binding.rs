//! Observable values for the UI boundary.
//!
//! A [`Signal`] is a list of slots invoked in connection order. A [`Property`] is
//! a shared value that emits its `value_changed` signal whenever it is set to a
//! different value. Both are cheap handles: cloning one shares the same state,
//! which is how components expose values that the UI layer binds to.
//!
//! ```rust
//! use netglue::binding::Property;
//!
//! let transferred = Property::new(0_i64);
//! let total = Property::new(0_i64);
//! let percent = Property::bound(&transferred, &total, |t, total| {
//!     if *total > 0 { 100 * t / total } else { 0 }
//! });
//!
//! total.set(200);
//! transferred.set(50);
//! assert_eq!(percent.get(), 25);
//! ```

use core::fmt;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Identifies a connected slot so it can be disconnected again.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub struct SlotId(u64);

type Slot<T> = Rc<dyn Fn(&T)>;

struct Slots<T: 'static> {
    next_id: Cell<u64>,
    connected: RefCell<Vec<(SlotId, Slot<T>)>>,
}

/// A multicast notification.
pub struct Signal<T: 'static> {
    slots: Rc<Slots<T>>,
}

impl<T: 'static> Signal<T> {
    /// A signal without slots.
    pub fn new() -> Self {
        Self {
            slots: Rc::new(Slots {
                next_id: Cell::new(0),
                connected: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Connect a slot. Slots run in connection order.
    pub fn connect<F>(&self, slot: F) -> SlotId
    where
        F: Fn(&T) + 'static,
    {
        let id = SlotId(self.slots.next_id.get());
        self.slots.next_id.set(id.0 + 1);
        self.slots.connected.borrow_mut().push((id, Rc::new(slot)));
        id
    }

    /// Returns `false` if the slot was not connected.
    pub fn disconnect(&self, id: SlotId) -> bool {
        let mut connected = self.slots.connected.borrow_mut();
        let before = connected.len();
        connected.retain(|(slot_id, _)| *slot_id != id);
        connected.len() != before
    }

    /// Disconnect every slot.
    pub fn disconnect_all(&self) {
        self.slots.connected.borrow_mut().clear();
    }

    /// Invoke every slot with `value`.
    ///
    /// Slots may connect or disconnect slots of this signal while it emits; such
    /// changes take effect from the next emission.
    pub fn emit(&self, value: &T) {
        let snapshot: Vec<Slot<T>> = self
            .slots
            .connected
            .borrow()
            .iter()
            .map(|(_, slot)| Rc::clone(slot))
            .collect();
        for slot in snapshot {
            slot(value);
        }
    }

    /// Number of connected slots.
    pub fn slot_count(&self) -> usize {
        self.slots.connected.borrow().len()
    }
}

impl<T: 'static> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            slots: Rc::clone(&self.slots),
        }
    }
}

impl<T: 'static> Default for Signal<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("slots", &self.slot_count())
            .finish()
    }
}

struct Shared<T: 'static> {
    value: RefCell<T>,
    value_changed: Signal<T>,
}

/// A shared observable value.
pub struct Property<T: 'static> {
    shared: Rc<Shared<T>>,
}

impl<T: Clone + PartialEq + 'static> Property<T> {
    /// A property holding `value`.
    pub fn new(value: T) -> Self {
        Self {
            shared: Rc::new(Shared {
                value: RefCell::new(value),
                value_changed: Signal::new(),
            }),
        }
    }

    /// A copy of the current value.
    pub fn get(&self) -> T {
        self.shared.value.borrow().clone()
    }

    /// Borrow the current value without cloning it.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.shared.value.borrow())
    }

    /// Store `value` and emit `value_changed` if it differs from the current one.
    ///
    /// Returns whether the value changed.
    pub fn set(&self, value: T) -> bool {
        {
            let mut current = self.shared.value.borrow_mut();
            if *current == value {
                return false;
            }
            *current = value.clone();
        }
        self.shared.value_changed.emit(&value);
        true
    }

    /// Emitted with the new value after every change.
    pub fn value_changed(&self) -> &Signal<T> {
        &self.shared.value_changed
    }

    /// A property recomputed from `a` and `b` whenever either of them changes.
    ///
    /// The sources do not keep each other alive; a change arriving after one of
    /// them was dropped is ignored.
    pub fn bound<A, B>(a: &Property<A>, b: &Property<B>, combine: fn(&A, &B) -> T) -> Self
    where
        A: Clone + PartialEq + 'static,
        B: Clone + PartialEq + 'static,
    {
        let initial = a.with(|a| b.with(|b| combine(a, b)));
        let derived = Property::new(initial);

        let target = derived.clone();
        let other = Rc::downgrade(&b.shared);
        a.value_changed().connect(move |a| {
            if let Some(b) = other.upgrade() {
                let value = combine(a, &b.value.borrow());
                target.set(value);
            }
        });

        let target = derived.clone();
        let other = Rc::downgrade(&a.shared);
        b.value_changed().connect(move |b| {
            if let Some(a) = other.upgrade() {
                let value = combine(&a.value.borrow(), b);
                target.set(value);
            }
        });

        derived
    }
}

impl<T: 'static> Clone for Property<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Rc::clone(&self.shared),
        }
    }
}

impl<T: Clone + PartialEq + Default + 'static> Default for Property<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: fmt::Debug + 'static> fmt::Debug for Property<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Property")
            .field(&*self.shared.value.borrow())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_runs_slots_in_order() {
        let signal = Signal::<u32>::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        for tag in ["a", "b"] {
            let seen = seen.clone();
            signal.connect(move |v| seen.borrow_mut().push(format!("{tag}{v}")));
        }
        signal.emit(&7);
        assert_eq!(*seen.borrow(), ["a7", "b7"]);
    }

    #[test]
    fn test_disconnect() {
        let signal = Signal::<()>::new();
        let hits = Rc::new(Cell::new(0));
        let h = hits.clone();
        let id = signal.connect(move |_| h.set(h.get() + 1));
        signal.emit(&());
        assert!(signal.disconnect(id));
        assert!(!signal.disconnect(id));
        signal.emit(&());
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn test_slot_may_disconnect_during_emit() {
        let signal = Signal::<()>::new();
        let hits = Rc::new(Cell::new(0));
        let (s, h) = (signal.clone(), hits.clone());
        signal.connect(move |_| {
            h.set(h.get() + 1);
            s.disconnect_all();
        });
        signal.emit(&());
        signal.emit(&());
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn test_property_emits_only_on_change() {
        let property = Property::new(String::from("idle"));
        let changes = Rc::new(RefCell::new(Vec::new()));
        let c = changes.clone();
        property
            .value_changed()
            .connect(move |v: &String| c.borrow_mut().push(v.clone()));

        assert!(property.set("busy".into()));
        assert!(!property.set("busy".into()));
        assert!(property.set("idle".into()));
        assert_eq!(*changes.borrow(), ["busy", "idle"]);
    }

    #[test]
    fn test_bound_property_follows_both_sources() {
        let a = Property::new(2);
        let b = Property::new(3);
        let sum = Property::bound(&a, &b, |a, b| a + b);
        assert_eq!(sum.get(), 5);
        a.set(10);
        assert_eq!(sum.get(), 13);
        b.set(-10);
        assert_eq!(sum.get(), 0);
    }

    #[test]
    fn test_bound_property_does_not_keep_sources_alive() {
        let a = Property::new(1);
        let b = Property::new(1);
        let product = Property::bound(&a, &b, |a, b| a * b);
        drop(b);
        a.set(5);
        assert_eq!(product.get(), 1);
        assert_eq!(Rc::strong_count(&a.shared), 1);
    }
}
