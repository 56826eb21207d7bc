use std::fmt;

use super::{ComponentRef, ComponentType, Kind};

type Constructor = Box<dyn Fn() -> ComponentRef>;

/// Maps component types to the constructors of their blank instances.
#[derive(Default)]
pub struct Registry {
    constructors: Vec<Option<Constructor>>,
}

impl Registry {
    /// Registers `C::blank` as the constructor for `C::TYPE`.
    pub fn register<C: Kind>(&mut self) { self.register_with(C::TYPE, || ComponentRef::new(C::blank())); }

    /// Registers a custom blank constructor for `ty`.
    ///
    /// Replaces any previously registered constructor for the same type.
    pub fn register_with(&mut self, ty: ComponentType, constructor: impl Fn() -> ComponentRef + 'static) {
        if self.constructors.len() <= ty.index() {
            self.constructors.resize_with(ty.index() + 1, || None);
        }
        let slot = self.constructors.get_mut(ty.index()).expect("just resized");
        *slot = Some(Box::new(constructor));
    }

    /// Whether a constructor is registered for `ty`.
    pub fn contains(&self, ty: ComponentType) -> bool {
        matches!(self.constructors.get(ty.index()), Some(Some(_)))
    }

    /// Constructs a blank instance of `ty`.
    ///
    /// Returns `None` if no constructor is registered for `ty`.
    pub fn construct(&self, ty: ComponentType) -> Option<ComponentRef> {
        let constructor = self.constructors.get(ty.index())?.as_ref()?;
        let component = constructor();
        debug_assert_eq!(
            component.component_type(),
            ty,
            "the constructor registered for {ty} produced a component of another type"
        );
        Some(component)
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set()
            .entries(
                self.constructors
                    .iter()
                    .enumerate()
                    .filter(|(_, constructor)| constructor.is_some())
                    .map(|(index, _)| index),
            )
            .finish()
    }
}
