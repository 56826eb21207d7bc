//! Systems are actions performed every tick to manipulate entities and components.
//!
//! A system is initialized once with the context it operates on
//! and then executed once per tick.
//! [`Systems`] runs a list of systems sequentially in registration order.

use std::fmt;

use crate::Context;

/// An action performed every tick.
pub trait System {
    /// Prepares the system to operate on `context`,
    /// typically by requesting the groups and observers it reads every tick.
    ///
    /// Called once before the first [`execute`](System::execute).
    fn initialize(&mut self, context: &Context) { let _ = context; }

    /// Runs the system for one tick.
    fn execute(&mut self);

    /// A human-readable name of this system, used in logs.
    fn name(&self) -> &str { std::any::type_name::<Self>() }
}

/// An ordered list of systems.
#[derive(Default)]
pub struct Systems {
    systems: Vec<Box<dyn System>>,
}

impl Systems {
    /// Creates an empty list.
    pub fn new() -> Self { Self::default() }

    /// Appends a system to run after all previously added systems.
    pub fn add(&mut self, system: impl System + 'static) -> &mut Self {
        self.systems.push(Box::new(system));
        self
    }

    /// Initializes every system in registration order.
    pub fn initialize(&mut self, context: &Context) {
        for system in &mut self.systems {
            log::trace!("Initializing system {}", system.name());
            system.initialize(context);
        }
    }

    /// Executes every system once in registration order.
    pub fn execute(&mut self) {
        for system in &mut self.systems {
            log::trace!("Executing system {}", system.name());
            system.execute();
        }
    }

    /// The number of systems.
    pub fn len(&self) -> usize { self.systems.len() }

    /// Whether no systems have been added.
    pub fn is_empty(&self) -> bool { self.systems.is_empty() }
}

impl fmt::Debug for Systems {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.systems.iter().map(|system| system.name())).finish()
    }
}

#[cfg(test)]
mod tests;
