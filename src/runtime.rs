//! In-process model of a transformed module's override state.
//!
//! Mirrors what the emitted code does once loaded: each target has a frozen
//! load-time capture and a mutable current value. `inject` plays the role of
//! the `injectable<K>` export and `reset_all` the role of `resetAllInjects`.
//! State is owned by one module instance; two instances never share it.

use std::fmt;

use crate::naming::GeneratedNames;
use crate::transform::InjectedBinding;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    UnknownTarget(String),
    UnknownExport(String),
    /// The capture function had no load-time value for this target.
    MissingCapture(String),
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeError::UnknownTarget(name) => write!(f, "\"{}\" is not an injected target", name),
            RuntimeError::UnknownExport(name) => write!(f, "\"{}\" is not an injectable export", name),
            RuntimeError::MissingCapture(name) => write!(f, "no load-time value for \"{}\"", name),
        }
    }
}

impl std::error::Error for RuntimeError {}

struct Slot<V> {
    names: GeneratedNames,
    default: V,
    current: V,
    injected: bool,
}

pub struct InjectableModule<V> {
    slots: Vec<Slot<V>>,
}

impl<V: Clone> InjectableModule<V> {
    /// Loads a module instance from a transform manifest. `capture` yields the
    /// value each target holds when the module body runs.
    pub fn load<F>(bindings: &[InjectedBinding], capture: F) -> Result<Self, RuntimeError>
    where
        F: FnMut(&str) -> Option<V>,
    {
        Self::from_names(bindings.iter().map(InjectedBinding::names), capture)
    }

    pub fn from_names<I, F>(names: I, mut capture: F) -> Result<Self, RuntimeError>
    where
        I: IntoIterator<Item = GeneratedNames>,
        F: FnMut(&str) -> Option<V>,
    {
        let mut slots = Vec::new();
        for names in names {
            let default = capture(&names.target)
                .ok_or_else(|| RuntimeError::MissingCapture(names.target.clone()))?;
            slots.push(Slot {
                names,
                current: default.clone(),
                default,
                injected: false,
            });
        }
        Ok(InjectableModule { slots })
    }

    /// The value every rewritten use-site of `target` observes right now.
    pub fn current(&self, target: &str) -> Option<&V> {
        self.slot(target).map(|slot| &slot.current)
    }

    pub fn default_of(&self, target: &str) -> Option<&V> {
        self.slot(target).map(|slot| &slot.default)
    }

    pub fn inject(&mut self, target: &str, value: V) -> Result<(), RuntimeError> {
        let slot = self
            .slots
            .iter_mut()
            .find(|slot| slot.names.target == target)
            .ok_or_else(|| RuntimeError::UnknownTarget(target.to_string()))?;
        slot.current = value;
        slot.injected = true;
        tracing::trace!(target_name = %target, "override installed");
        Ok(())
    }

    /// Calls an override through its exported name, e.g. `injectableFetch`.
    pub fn inject_export(&mut self, export_name: &str, value: V) -> Result<(), RuntimeError> {
        let target = self
            .slots
            .iter()
            .find(|slot| slot.names.injectable == export_name)
            .map(|slot| slot.names.target.clone())
            .ok_or_else(|| RuntimeError::UnknownExport(export_name.to_string()))?;
        self.inject(&target, value)
    }

    /// Restores every target to its load-time capture. Safe to call repeatedly.
    pub fn reset_all(&mut self) {
        for slot in &mut self.slots {
            slot.current = slot.default.clone();
            slot.injected = false;
        }
    }

    pub fn is_injected(&self, target: &str) -> bool {
        self.slot(target).is_some_and(|slot| slot.injected)
    }

    pub fn targets(&self) -> impl Iterator<Item = &str> {
        self.slots.iter().map(|slot| slot.names.target.as_str())
    }

    fn slot(&self, target: &str) -> Option<&Slot<V>> {
        self.slots.iter().find(|slot| slot.names.target == target)
    }
}
