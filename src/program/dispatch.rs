//! Dynamic dispatch confirmation.
//!
//! When a call is followed by a method entry, the translator must decide whether the entered
//! method is the dynamic target of that call. The decision is delegated to a
//! [`DispatchRule`] so that targets with other dispatch semantics can plug in their own test.

use crate::{program::Method, types::ClassHierarchy};

/// Decides whether an entered method is a dynamic target of a statically declared method.
pub trait DispatchRule: Send + Sync {
    /// Returns `true` if a call to `declared` may execute `candidate`.
    ///
    /// # Arguments
    ///
    /// * `hierarchy` - Class registry of the program
    /// * `candidate` - The method that was entered
    /// * `declared` - The statically resolved target of the call
    fn overrides(&self, hierarchy: &ClassHierarchy, candidate: &Method, declared: &Method) -> bool;
}

/// JVM virtual dispatch approximation.
///
/// A method overrides another if it is the same method, or if the declared method is not
/// final, both classes are declared in the hierarchy, name and descriptor match and the
/// candidate's class inherits from the declared method's class.
#[derive(Debug, Clone, Copy, Default)]
pub struct JvmDispatch;

impl DispatchRule for JvmDispatch {
    fn overrides(&self, hierarchy: &ClassHierarchy, candidate: &Method, declared: &Method) -> bool {
        if candidate == declared {
            return true;
        }
        if declared.is_final() {
            return false;
        }
        if !hierarchy.contains(&candidate.class) || !hierarchy.contains(&declared.class) {
            return false;
        }
        candidate.name == declared.name
            && candidate.desc == declared.desc
            && hierarchy.is_inheritor_of(&candidate.class, &declared.class)
    }
}

/// Dispatch rule accepting only exact matches.
///
/// Suitable for targets without virtual dispatch, or to disable dispatch deferral for
/// anything but direct calls.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactDispatch;

impl DispatchRule for ExactDispatch {
    fn overrides(&self, _hierarchy: &ClassHierarchy, candidate: &Method, declared: &Method) -> bool {
        candidate == declared
    }
}
