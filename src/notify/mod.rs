//! Change notification.
//!
//! Observers are registered on a node or attribute for one phase. Every
//! mutation raises a `Changing` event before the tree is touched and a
//! `Changed` event afterwards. Events propagate root-ward: first to the
//! object that reported them, then to each container above it.
//!
//! For `Add` and `Remove` the propagation starts at the container being
//! modified and the event's sender is the child. For `Name` and `Value`
//! it starts at the object itself; an attribute's events continue with its
//! element.
//!
//! A `Changing` observer may veto a change by returning an error, which
//! the mutation returns unchanged. Observers get `&mut Tree` and may
//! mutate freely; if they disturb the structure the pending mutation
//! relies on, the mutation fails with [`TreeError::ExternalMutation`].
//!
//! [`TreeError::ExternalMutation`]: crate::error::TreeError::ExternalMutation

use std::rc::Rc;

use crate::error::Result;
use crate::tree::{AttrId, NodeId, Tree};

/// What kind of change is happening.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    /// A node or attribute is being added to a container.
    Add,
    /// A node or attribute is being removed from a container.
    Remove,
    /// An element is being renamed.
    Name,
    /// A value (text, attribute value, comment, PI data) is changing.
    Value,
}

/// Whether an event is raised before or after the change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangePhase {
    /// Before the tree is modified.
    Changing,
    /// After the tree is modified.
    Changed,
}

/// A node or an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectRef {
    /// A node.
    Node(NodeId),
    /// An attribute.
    Attribute(AttrId),
}

impl From<NodeId> for ObjectRef {
    fn from(id: NodeId) -> Self {
        Self::Node(id)
    }
}

impl From<AttrId> for ObjectRef {
    fn from(id: AttrId) -> Self {
        Self::Attribute(id)
    }
}

/// A change notification delivered to observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeEvent {
    /// Before or after.
    pub phase: ChangePhase,
    /// What is changing.
    pub kind: ChangeKind,
    /// The object being added, removed, renamed or revalued.
    pub sender: ObjectRef,
}

/// A registered callback.
pub type Observer = Rc<dyn Fn(&mut Tree, &ChangeEvent) -> Result<()>>;

/// Handle returned by [`Tree::observe`], used to unregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

struct Registration {
    id: ObserverId,
    target: ObjectRef,
    phase: ChangePhase,
    callback: Observer,
}

/// The observer registry stored in a [`Tree`].
#[derive(Default)]
pub(crate) struct Observers {
    entries: Vec<Registration>,
    next_id: u64,
}

impl Observers {
    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    fn add(&mut self, target: ObjectRef, phase: ChangePhase, callback: Observer) -> ObserverId {
        let id = ObserverId(self.next_id);
        self.next_id += 1;
        self.entries.push(Registration {
            id,
            target,
            phase,
            callback,
        });
        id
    }

    fn remove(&mut self, id: ObserverId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|r| r.id != id);
        self.entries.len() != before
    }

    fn matching(&self, target: ObjectRef, phase: ChangePhase) -> impl Iterator<Item = Observer> + '_ {
        self.entries
            .iter()
            .filter(move |r| r.target == target && r.phase == phase)
            .map(|r| Rc::clone(&r.callback))
    }
}

impl Tree {
    /// Registers an observer for changes reported by or propagated to
    /// `target`.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::cell::Cell;
    /// use std::rc::Rc;
    /// use xmlgrove::notify::ChangePhase;
    /// use xmlgrove::Tree;
    ///
    /// let mut tree = Tree::new();
    /// let root = tree.new_element("root").unwrap();
    /// let seen = Rc::new(Cell::new(0));
    /// let counter = Rc::clone(&seen);
    /// tree.observe(root, ChangePhase::Changed, move |_, _| {
    ///     counter.set(counter.get() + 1);
    ///     Ok(())
    /// });
    /// tree.add(root, "text").unwrap();
    /// assert_eq!(seen.get(), 1);
    /// ```
    pub fn observe<F>(&mut self, target: impl Into<ObjectRef>, phase: ChangePhase, callback: F) -> ObserverId
    where
        F: Fn(&mut Tree, &ChangeEvent) -> Result<()> + 'static,
    {
        self.observers.add(target.into(), phase, Rc::new(callback))
    }

    /// Unregisters an observer. Returns `false` if it was not registered.
    pub fn unobserve(&mut self, id: ObserverId) -> bool {
        self.observers.remove(id)
    }

    /// Returns `true` if any observer is registered on this tree.
    #[must_use]
    pub fn has_observers(&self) -> bool {
        !self.observers.is_empty()
    }

    /// Collects the propagation chain starting at `origin`.
    fn notification_chain(&self, origin: ObjectRef) -> Vec<ObjectRef> {
        let start = match origin {
            ObjectRef::Node(n) => Some(n),
            ObjectRef::Attribute(a) => self.attr(a).parent(),
        };
        let mut chain = Vec::new();
        if let ObjectRef::Attribute(_) = origin {
            chain.push(origin);
        }
        let mut current = start;
        while let Some(n) = current {
            chain.push(ObjectRef::Node(n));
            current = self.parent(n);
        }
        chain
    }

    fn dispatch(
        &mut self,
        origin: ObjectRef,
        phase: ChangePhase,
        kind: ChangeKind,
        sender: ObjectRef,
    ) -> Result<()> {
        if self.observers.is_empty() {
            return Ok(());
        }
        let callbacks: Vec<Observer> = self
            .notification_chain(origin)
            .into_iter()
            .flat_map(|target| self.observers.matching(target, phase).collect::<Vec<_>>())
            .collect();
        if callbacks.is_empty() {
            return Ok(());
        }
        let event = ChangeEvent {
            phase,
            kind,
            sender,
        };
        tracing::trace!(?kind, ?phase, ?sender, observers = callbacks.len(), "dispatching change");
        for callback in callbacks {
            callback(self, &event)?;
        }
        Ok(())
    }

    pub(crate) fn notify_changing(
        &mut self,
        origin: ObjectRef,
        kind: ChangeKind,
        sender: ObjectRef,
    ) -> Result<()> {
        self.dispatch(origin, ChangePhase::Changing, kind, sender)
    }

    pub(crate) fn notify_changed(
        &mut self,
        origin: ObjectRef,
        kind: ChangeKind,
        sender: ObjectRef,
    ) -> Result<()> {
        self.dispatch(origin, ChangePhase::Changed, kind, sender)
    }
}
