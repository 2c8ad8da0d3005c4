use std::any::{type_name, Any};
use std::fmt;
use std::sync::Arc;

use url::Url;

use crate::hooks::Hook;
use crate::Options;

/// A value stored in an [`Options`] tree.
///
/// The variant decides how a value takes part in a merge: mappings are
/// merged key by key, hook lists are concatenated, URLs resolve relative
/// references, and everything else is replaced by the overriding value.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// "Not provided". An overriding `Unset` keeps the base value, and
    /// `Unset` never ends up in a merged tree.
    Unset,
    /// Explicitly cleared. An overriding `Null` replaces the base value.
    Null,
    /// A boolean.
    Bool(bool),
    /// A signed integer.
    Integer(i64),
    /// A floating point number.
    Float(f64),
    /// A string.
    String(String),
    /// An absolute URL.
    Url(Url),
    /// A list of values. Lists are replaced, never concatenated.
    Array(Vec<Value>),
    /// A nested mapping.
    Map(Options),
    /// An ordered list of hooks for one lifecycle phase.
    Hooks(Vec<Hook>),
    /// A shared handle, copied by reference.
    Opaque(Opaque),
}

impl Value {
    /// Returns true if this is `Value::Unset`.
    pub fn is_unset(&self) -> bool {
        matches!(self, Value::Unset)
    }

    /// Returns true if this is `Value::Null`.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns the boolean, if this is one.
    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            Value::Bool(b) => Some(b),
            _ => None,
        }
    }

    /// Returns the integer, if this is one.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::Integer(n) => Some(n),
            _ => None,
        }
    }

    /// Returns the number as a float, if this is a number.
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::Integer(n) => Some(n as f64),
            Value::Float(n) => Some(n),
            _ => None,
        }
    }

    /// Returns the string, if this is one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the URL, if this is one.
    pub fn as_url(&self) -> Option<&Url> {
        match self {
            Value::Url(u) => Some(u),
            _ => None,
        }
    }

    /// Returns the list, if this is one.
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Returns the mapping, if this is one.
    pub fn as_map(&self) -> Option<&Options> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Returns the hook list, if this is one.
    pub fn as_hooks(&self) -> Option<&[Hook]> {
        match self {
            Value::Hooks(hooks) => Some(hooks),
            _ => None,
        }
    }

    /// Returns the opaque handle, if this is one.
    pub fn as_opaque(&self) -> Option<&Opaque> {
        match self {
            Value::Opaque(o) => Some(o),
            _ => None,
        }
    }

    /// A deep, unlocked copy of this value with every `Unset` mapping entry
    /// removed. Array elements keep their positions.
    ///
    /// Returns `None` for `Unset` itself.
    pub(crate) fn fresh(&self) -> Option<Value> {
        match self {
            Value::Unset => None,
            Value::Map(map) => Some(Value::Map(map.fresh())),
            Value::Array(items) => Some(Value::Array(
                items
                    .iter()
                    .map(|item| item.fresh().unwrap_or_default())
                    .collect(),
            )),
            other => Some(other.clone()),
        }
    }

    pub(crate) fn lock_in_place(&mut self) {
        match self {
            Value::Map(map) => map.lock_in_place(),
            Value::Array(items) => items.iter_mut().for_each(Value::lock_in_place),
            _ => (),
        }
    }
}

impl Default for Value {
    fn default() -> Value {
        Value::Unset
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Value {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Value {
        Value::Integer(n.into())
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Value {
        Value::Integer(n)
    }
}

impl From<u16> for Value {
    fn from(n: u16) -> Value {
        Value::Integer(n.into())
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Value {
        Value::Integer(n.into())
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Value {
        Value::Float(n)
    }
}

impl<'a> From<&'a str> for Value {
    fn from(s: &'a str) -> Value {
        Value::String(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Value {
        Value::String(s)
    }
}

impl From<Url> for Value {
    fn from(u: Url) -> Value {
        Value::Url(u)
    }
}

impl From<Options> for Value {
    fn from(map: Options) -> Value {
        Value::Map(map)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Value {
        Value::Array(items)
    }
}

impl From<Vec<Hook>> for Value {
    fn from(hooks: Vec<Hook>) -> Value {
        Value::Hooks(hooks)
    }
}

impl From<Hook> for Value {
    fn from(hook: Hook) -> Value {
        Value::Hooks(vec![hook])
    }
}

impl From<Opaque> for Value {
    fn from(o: Opaque) -> Value {
        Value::Opaque(o)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Value {
        v.map(Into::into).unwrap_or(Value::Unset)
    }
}

/// A handle to a value the options tree does not look into.
///
/// Agents, custom request functions or any other object the transport
/// understands are stored as `Opaque`. Merging and locking never copy or
/// freeze them: every tree that holds one points at the same object.
#[derive(Clone)]
pub struct Opaque {
    type_name: &'static str,
    inner: Arc<dyn Any + Send + Sync>,
}

impl Opaque {
    /// Wrap a value.
    pub fn new<T>(value: T) -> Opaque
    where
        T: Any + Send + Sync,
    {
        Opaque::from_arc(Arc::new(value))
    }

    /// Wrap an already shared value without re-allocating.
    pub fn from_arc<T>(value: Arc<T>) -> Opaque
    where
        T: Any + Send + Sync,
    {
        Opaque {
            type_name: type_name::<T>(),
            inner: value,
        }
    }

    /// Returns a reference to the inner value if it is of type `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }

    /// Returns true if both handles point at the same object.
    pub fn ptr_eq(&self, other: &Opaque) -> bool {
        Arc::as_ptr(&self.inner) as *const () == Arc::as_ptr(&other.inner) as *const ()
    }
}

impl PartialEq for Opaque {
    fn eq(&self, other: &Opaque) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for Opaque {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Opaque").field(&self.type_name).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_drops_unset_entries_only() {
        assert_eq!(Value::Unset.fresh(), None);

        let list = Value::Array(vec![Value::Unset, Value::from(1), Value::Null]);
        assert_eq!(list.fresh(), Some(list.clone()));

        let map: Options = [("a", Value::Unset), ("b", Value::from(1))].into_iter().collect();
        match Value::Map(map).fresh() {
            Some(Value::Map(copy)) => {
                assert!(!copy.contains_key("a"));
                assert_eq!(copy.get("b"), Some(&Value::from(1)));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn opaque_is_shared_by_reference() {
        struct Agent;

        let agent = Opaque::new(Agent);
        let copy = Value::from(agent.clone()).fresh().unwrap();
        assert!(copy.as_opaque().unwrap().ptr_eq(&agent));
        assert!(agent.downcast_ref::<Agent>().is_some());
        assert!(agent.downcast_ref::<String>().is_none());
        assert_ne!(agent, Opaque::new(Agent));
    }

    #[test]
    fn option_converts_to_unset() {
        assert_eq!(Value::from(None::<bool>), Value::Unset);
        assert_eq!(Value::from(Some("x")), Value::from("x"));
    }
}
