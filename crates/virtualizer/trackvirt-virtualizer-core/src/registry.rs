//! Name-keyed catalog of virtualizer constructors.
//!
//! Entries are append-only for the registry's lifetime. A name maps either to a factory
//! function or to a configured prototype that is cloned on every [`create`](VirtualizerRegistry::create).

use std::sync::{PoisonError, RwLock};

use hashbrown::HashMap;
use log::{debug, warn};
use once_cell::sync::Lazy;

use crate::error::RegistryError;
use crate::virtualizer::Virtualizer;
use crate::virtualizers::{
    ImuSimTrackingVirtualizer, NoiseTrackingVirtualizer, PerfectTrackingVirtualizer,
};

pub type VirtualizerFactory = fn() -> Box<dyn Virtualizer>;

enum Entry {
    Factory(VirtualizerFactory),
    Prototype(Box<dyn Virtualizer>),
}

impl Entry {
    fn instantiate(&self) -> Box<dyn Virtualizer> {
        match self {
            Entry::Factory(factory) => factory(),
            Entry::Prototype(prototype) => prototype.clone_box(),
        }
    }
}

#[derive(Default)]
pub struct VirtualizerRegistry {
    entries: RwLock<HashMap<String, Entry>>,
}

static GLOBAL: Lazy<VirtualizerRegistry> = Lazy::new(VirtualizerRegistry::with_builtins);

impl VirtualizerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the perfect, noise and IMU-simulation virtualizers.
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        let builtins: [(&str, VirtualizerFactory); 3] = [
            (
                PerfectTrackingVirtualizer::TYPE_NAME,
                PerfectTrackingVirtualizer::boxed,
            ),
            (
                NoiseTrackingVirtualizer::TYPE_NAME,
                NoiseTrackingVirtualizer::boxed,
            ),
            (
                ImuSimTrackingVirtualizer::TYPE_NAME,
                ImuSimTrackingVirtualizer::boxed,
            ),
        ];
        for (name, factory) in builtins {
            let registered = registry.register(name, factory);
            if let Err(err) = &registered {
                warn!("builtin virtualizer '{name}' not registered: {err}");
            }
            debug_assert!(registered.is_ok(), "builtin '{name}' clashes");
        }
        registry
    }

    /// Process-wide registry, created with the builtins on first use.
    pub fn global() -> &'static VirtualizerRegistry {
        &GLOBAL
    }

    /// Register `factory` under `name`.
    ///
    /// Registering the same factory again is a no-op; a different factory or a prototype
    /// already under that name is [`RegistryError::DuplicateType`].
    pub fn register(&self, name: &str, factory: VirtualizerFactory) -> Result<(), RegistryError> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        match entries.get(name) {
            Some(Entry::Factory(existing)) if *existing as usize == factory as usize => Ok(()),
            Some(_) => Err(RegistryError::DuplicateType {
                name: name.to_string(),
            }),
            None => {
                debug!("registry: registered virtualizer '{name}'");
                entries.insert(name.to_string(), Entry::Factory(factory));
                Ok(())
            }
        }
    }

    /// Register a configured instance; `create(name)` then returns copies of it.
    pub fn register_prototype(
        &self,
        name: &str,
        prototype: Box<dyn Virtualizer>,
    ) -> Result<(), RegistryError> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if entries.contains_key(name) {
            return Err(RegistryError::DuplicateType {
                name: name.to_string(),
            });
        }
        debug!(
            "registry: registered prototype '{name}' of type {}",
            prototype.type_name()
        );
        entries.insert(name.to_string(), Entry::Prototype(prototype));
        Ok(())
    }

    pub fn create(&self, name: &str) -> Result<Box<dyn Virtualizer>, RegistryError> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries
            .get(name)
            .map(Entry::instantiate)
            .ok_or_else(|| RegistryError::UnknownType {
                name: name.to_string(),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    /// Registered names in sorted order.
    pub fn type_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::virtualizer::NAME_PARAM;

    fn impostor() -> Box<dyn Virtualizer> {
        Box::new(NoiseTrackingVirtualizer::new())
    }

    #[test]
    fn builtins_are_listed_sorted() {
        let registry = VirtualizerRegistry::with_builtins();
        assert_eq!(
            registry.type_names(),
            vec![
                "IMUSimTrackingVirtualizer",
                "NoiseTrackingVirtualizer",
                "PerfectTrackingVirtualizer"
            ]
        );
    }

    #[test]
    fn unknown_type_is_an_error() {
        let registry = VirtualizerRegistry::new();
        let err = registry.create("Missing").unwrap_err();
        assert_eq!(
            err,
            RegistryError::UnknownType {
                name: "Missing".into()
            }
        );
    }

    #[test]
    fn same_factory_twice_is_idempotent() {
        let registry = VirtualizerRegistry::new();
        registry
            .register("Perfect", PerfectTrackingVirtualizer::boxed)
            .unwrap();
        registry
            .register("Perfect", PerfectTrackingVirtualizer::boxed)
            .unwrap();
        assert_eq!(registry.type_names().len(), 1);
        assert_eq!(
            registry.register("Perfect", impostor),
            Err(RegistryError::DuplicateType {
                name: "Perfect".into()
            })
        );
    }

    #[test]
    fn prototypes_hand_out_independent_copies() {
        let registry = VirtualizerRegistry::new();
        let mut proto = PerfectTrackingVirtualizer::boxed();
        proto.set(NAME_PARAM, "hand".to_string()).unwrap();
        registry.register_prototype("HandPerfect", proto).unwrap();

        let mut a = registry.create("HandPerfect").unwrap();
        a.set(NAME_PARAM, "changed".to_string()).unwrap();
        let b = registry.create("HandPerfect").unwrap();
        assert_eq!(b.name().unwrap(), "hand");
        assert_eq!(b.type_name(), PerfectTrackingVirtualizer::TYPE_NAME);

        assert!(registry
            .register_prototype("HandPerfect", PerfectTrackingVirtualizer::boxed())
            .is_err());
    }

    #[test]
    fn global_registry_has_builtins() {
        let global = VirtualizerRegistry::global();
        assert!(global.contains(NoiseTrackingVirtualizer::TYPE_NAME));
        assert!(global.create(PerfectTrackingVirtualizer::TYPE_NAME).is_ok());
    }
}
