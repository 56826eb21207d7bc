use bitvec::prelude::BitVec;

use crate::comp::{ComponentRef, ComponentType};

/// A fixed-size `[Option<ComponentRef>]` indexed by component type,
/// with occupancy mirrored in a [`BitVec`] for fast scans.
pub(crate) struct Slots {
    occupied: BitVec,
    data:     Box<[Option<ComponentRef>]>,
}

impl Slots {
    /// Creates `capacity` empty slots.
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            occupied: BitVec::repeat(false, capacity),
            data:     (0..capacity).map(|_| None).collect(),
        }
    }

    /// The number of slots, equal to the number of component types.
    pub(crate) fn capacity(&self) -> usize { self.data.len() }

    /// Whether the slot of `ty` is occupied.
    ///
    /// Types out of range are never occupied.
    pub(crate) fn is_set(&self, ty: ComponentType) -> bool {
        self.occupied.get(ty.index()).map_or(false, |bit| *bit)
    }

    pub(crate) fn get(&self, ty: ComponentType) -> Option<&ComponentRef> {
        self.data.get(ty.index())?.as_ref()
    }

    /// Stores `component` in its slot, returning the previous occupant.
    pub(crate) fn insert(&mut self, component: ComponentRef) -> Option<ComponentRef> {
        let ty = component.component_type();
        let slot = self.slot_mut(ty);
        let previous = slot.replace(component);
        self.occupied.set(ty.index(), true);
        previous
    }

    /// Empties the slot of `ty`, returning the previous occupant.
    pub(crate) fn remove(&mut self, ty: ComponentType) -> Option<ComponentRef> {
        let previous = self.data.get_mut(ty.index())?.take();
        if previous.is_some() {
            self.occupied.set(ty.index(), false);
        }
        previous
    }

    /// Empties every slot, returning the previous occupants in type order.
    pub(crate) fn take_all(&mut self) -> Vec<ComponentRef> {
        let data = &mut self.data;
        let taken = self
            .occupied
            .iter_ones()
            .map(|index| data[index].take().expect("occupied bit is set for an empty slot"))
            .collect();
        self.occupied.fill(false);
        taken
    }

    /// Iterates over the occupants in type order.
    pub(crate) fn iter(&self) -> impl Iterator<Item = &ComponentRef> + '_ {
        self.occupied
            .iter_ones()
            .map(|index| self.data[index].as_ref().expect("occupied bit is set for an empty slot"))
    }

    /// Iterates over the occupied types in ascending order.
    pub(crate) fn types(&self) -> impl Iterator<Item = ComponentType> + '_ {
        self.occupied.iter_ones().map(|index| {
            ComponentType::new(u16::try_from(index).expect("slot count fits in u16"))
        })
    }

    /// The number of occupied slots.
    pub(crate) fn len(&self) -> usize { self.occupied.count_ones() }

    fn slot_mut(&mut self, ty: ComponentType) -> &mut Option<ComponentRef> {
        let capacity = self.data.len();
        match self.data.get_mut(ty.index()) {
            Some(slot) => slot,
            None => panic!(
                "Component type {ty} is out of range for a context with {capacity} component types"
            ),
        }
    }
}
