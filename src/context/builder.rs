use super::Context;
use crate::comp::{ComponentRef, ComponentType, Kind, Registry};
use crate::entity::EntityId;

/// Parameters of a context, fixed when the context is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// The number of distinct component types.
    /// Every entity has exactly this many component slots.
    pub total_components: usize,
    /// The id assigned to the first entity.
    pub first_id:         EntityId,
    /// Whether [`Context::destroy_all_entities`] returns entities and components to the pools.
    pub recycle_on_reset: bool,
}

impl Config {
    /// The default configuration for `total_components` component types.
    pub fn new(total_components: usize) -> Self {
        Self { total_components, first_id: 0, recycle_on_reset: false }
    }
}

/// This type is used to build a context.
#[derive(Debug)]
pub struct Builder {
    config:   Config,
    registry: Registry,
}

impl Builder {
    /// Starts building a context with `total_components` component types.
    pub fn new(total_components: usize) -> Self { Self::from_config(Config::new(total_components)) }

    /// Starts building a context with an explicit configuration.
    pub fn from_config(config: Config) -> Self { Self { config, registry: Registry::default() } }

    /// Sets the id assigned to the first entity.
    pub fn first_id(mut self, id: EntityId) -> Self {
        self.config.first_id = id;
        self
    }

    /// Sets whether bulk resets recycle entities and components.
    pub fn recycle_on_reset(mut self, recycle: bool) -> Self {
        self.config.recycle_on_reset = recycle;
        self
    }

    /// Registers the blank constructor of `C` for [`Context::create_component`].
    pub fn register<C: Kind>(mut self) -> Self {
        self.registry.register::<C>();
        self
    }

    /// Registers a custom blank constructor for `ty`.
    pub fn register_with(
        mut self,
        ty: ComponentType,
        constructor: impl Fn() -> ComponentRef + 'static,
    ) -> Self {
        self.registry.register_with(ty, constructor);
        self
    }

    /// Constructs the context.
    ///
    /// # Panics
    /// Panics if the number of component types is zero
    /// or exceeds the range of [`ComponentType`].
    pub fn build(self) -> Context {
        if self.config.total_components == 0 {
            panic!("Cannot build a context without component types; set `total_components` first");
        }
        if self.config.total_components > usize::from(u16::MAX) + 1 {
            panic!(
                "Cannot build a context with {} component types; at most {} are supported",
                self.config.total_components,
                usize::from(u16::MAX) + 1,
            );
        }

        Context::from_parts(self.config, self.registry)
    }
}
