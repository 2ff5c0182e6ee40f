use crate::core::RecordId;
use crate::entity::Entity;

/// Live children of a many-association plus the ones waiting to be
/// deleted or detached on the next save.
#[derive(Debug, Clone)]
pub struct ChildCollection<E> {
    live: Vec<E>,
    marked_for_destruction: Vec<E>,
    orphaned: Vec<E>,
}

impl<E> Default for ChildCollection<E> {
    fn default() -> Self {
        Self {
            live: Vec::new(),
            marked_for_destruction: Vec::new(),
            orphaned: Vec::new(),
        }
    }
}

impl<E: Entity> ChildCollection<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_loaded(children: Vec<E>) -> Self {
        Self {
            live: children,
            ..Self::default()
        }
    }

    pub fn as_slice(&self) -> &[E] {
        &self.live
    }

    pub fn iter(&self) -> std::slice::Iter<'_, E> {
        self.live.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, E> {
        self.live.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    pub fn first(&self) -> Option<&E> {
        self.live.first()
    }

    pub fn last(&self) -> Option<&E> {
        self.live.last()
    }

    pub fn first_mut(&mut self) -> Option<&mut E> {
        self.live.first_mut()
    }

    pub fn last_mut(&mut self) -> Option<&mut E> {
        self.live.last_mut()
    }

    pub fn get(&self, id: RecordId) -> Option<&E> {
        self.live.iter().find(|child| child.id() == Some(id))
    }

    pub fn get_mut(&mut self, id: RecordId) -> Option<&mut E> {
        self.live.iter_mut().find(|child| child.id() == Some(id))
    }

    pub(crate) fn get_index_mut(&mut self, index: usize) -> Option<&mut E> {
        self.live.get_mut(index)
    }

    pub fn push(&mut self, child: E) {
        self.live.push(child);
    }

    /// Removes the child at `index` from the live list. Persisted children
    /// are deleted on the next save; unsaved ones are simply dropped.
    pub fn mark_for_destruction(&mut self, index: usize) -> Option<RecordId> {
        if index >= self.live.len() {
            return None;
        }
        let child = self.live.remove(index);
        let id = child.id();
        if id.is_some() {
            self.marked_for_destruction.push(child);
        }
        id
    }

    /// Direct setter: the given children become the live list. Persisted
    /// children that are not kept are detached from the owner on save.
    pub fn replace(&mut self, children: Vec<E>) {
        let previous = std::mem::replace(&mut self.live, children);
        for child in previous {
            let kept = child
                .id()
                .is_some_and(|id| self.live.iter().any(|c| c.id() == Some(id)));
            if !kept && !child.is_new_record() {
                self.orphaned.push(child);
            }
        }
    }

    pub fn marked_for_destruction(&self) -> &[E] {
        &self.marked_for_destruction
    }

    pub fn orphaned(&self) -> &[E] {
        &self.orphaned
    }

    pub(crate) fn take_marked(&mut self) -> Vec<E> {
        std::mem::take(&mut self.marked_for_destruction)
    }

    pub(crate) fn take_orphaned(&mut self) -> Vec<E> {
        std::mem::take(&mut self.orphaned)
    }

    pub fn has_pending_changes(&self) -> bool {
        !self.marked_for_destruction.is_empty() || !self.orphaned.is_empty()
    }
}

/// Target of a one-association plus a replaced target awaiting detachment.
#[derive(Debug, Clone)]
pub struct HasOne<E> {
    target: Option<E>,
    replaced: Option<E>,
}

impl<E> Default for HasOne<E> {
    fn default() -> Self {
        Self {
            target: None,
            replaced: None,
        }
    }
}

impl<E: Entity> HasOne<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_loaded(target: Option<E>) -> Self {
        Self {
            target,
            replaced: None,
        }
    }

    pub fn get(&self) -> Option<&E> {
        self.target.as_ref()
    }

    pub fn get_mut(&mut self) -> Option<&mut E> {
        self.target.as_mut()
    }

    /// Returns the target, building it first when there is none.
    pub fn get_or_build(&mut self, build: impl FnOnce() -> E) -> &mut E {
        self.target.get_or_insert_with(build)
    }

    /// Direct setter. A persisted target that is swapped out is detached on save.
    pub fn replace(&mut self, target: Option<E>) {
        let same = match (&self.target, &target) {
            (Some(old), Some(new)) => old.id().is_some() && old.id() == new.id(),
            _ => false,
        };
        if let Some(old) = std::mem::replace(&mut self.target, target)
            && !same
            && !old.is_new_record()
        {
            self.replaced = Some(old);
        }
    }

    pub fn replaced(&self) -> Option<&E> {
        self.replaced.as_ref()
    }

    pub(crate) fn take_replaced(&mut self) -> Option<E> {
        self.replaced.take()
    }
}

#[derive(Debug, Clone)]
pub enum Association<E> {
    One(HasOne<E>),
    Many(ChildCollection<E>),
}

impl<E: Entity> Association<E> {
    pub fn as_many(&self) -> Option<&ChildCollection<E>> {
        match self {
            Association::Many(collection) => Some(collection),
            Association::One(_) => None,
        }
    }

    pub fn as_many_mut(&mut self) -> Option<&mut ChildCollection<E>> {
        match self {
            Association::Many(collection) => Some(collection),
            Association::One(_) => None,
        }
    }

    pub fn as_one(&self) -> Option<&HasOne<E>> {
        match self {
            Association::One(has_one) => Some(has_one),
            Association::Many(_) => None,
        }
    }

    pub fn as_one_mut(&mut self) -> Option<&mut HasOne<E>> {
        match self {
            Association::One(has_one) => Some(has_one),
            Association::Many(_) => None,
        }
    }

    /// Children in display order, freshly built ones included.
    pub fn records(&self) -> Vec<&E> {
        match self {
            Association::One(has_one) => has_one.get().into_iter().collect(),
            Association::Many(collection) => collection.iter().collect(),
        }
    }
}
