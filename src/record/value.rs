//! Record Value Module
//!
//! Polymorphic payloads carried by a [`Record`](super::Record) and the
//! registry that turns a stored type tag back into a concrete Rust type.

use std::any::Any;
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value as JsonValue;

// == Record Value Trait ==
/// A type that can be stored as a record payload.
///
/// The tag returned by [`RecordValue::type_name`] is written into the
/// `TypeName` field and looked up in a [`TypeRegistry`] on decode. The default
/// uses the compiler's type name; override it when the tag must stay stable
/// across crate renames or toolchain upgrades.
///
/// ```ignore
/// #[derive(Debug, Clone, Serialize, Deserialize)]
/// struct Person { name: String }
///
/// impl RecordValue for Person {
///     fn type_name() -> Cow<'static, str> {
///         Cow::Borrowed("sample::Person")
///     }
/// }
/// ```
pub trait RecordValue: Serialize + DeserializeOwned + Clone + fmt::Debug + Send + Sync + 'static {
    /// Tag identifying this type in the persisted envelope.
    fn type_name() -> Cow<'static, str> {
        Cow::Borrowed(std::any::type_name::<Self>())
    }
}

macro_rules! primitive_record_value {
    ($($ty:ty => $tag:literal),* $(,)?) => {
        $(
            impl RecordValue for $ty {
                fn type_name() -> Cow<'static, str> {
                    Cow::Borrowed($tag)
                }
            }
        )*
    };
}

primitive_record_value! {
    String => "String",
    bool => "bool",
    i64 => "i64",
    u64 => "u64",
    f64 => "f64",
    JsonValue => "serde_json::Value",
}

impl<T: RecordValue> RecordValue for Vec<T> {
    fn type_name() -> Cow<'static, str> {
        Cow::Owned(format!("Vec<{}>", T::type_name()))
    }
}

impl<T: RecordValue> RecordValue for Option<T> {
    fn type_name() -> Cow<'static, str> {
        Cow::Owned(format!("Option<{}>", T::type_name()))
    }
}

impl<T: RecordValue> RecordValue for HashMap<String, T> {
    fn type_name() -> Cow<'static, str> {
        Cow::Owned(format!("HashMap<String, {}>", T::type_name()))
    }
}

// == Erased Value ==
trait ErasedValue: fmt::Debug + Send + Sync {
    fn to_json(&self) -> serde_json::Result<JsonValue>;
    fn clone_boxed(&self) -> Box<dyn ErasedValue>;
    fn as_any(&self) -> &dyn Any;
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

impl<T: RecordValue> ErasedValue for T {
    fn to_json(&self) -> serde_json::Result<JsonValue> {
        super::finite::ensure_finite(self)?;
        serde_json::to_value(self)
    }

    fn clone_boxed(&self) -> Box<dyn ErasedValue> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

// == Boxed Value ==
/// Type-erased record payload.
///
/// Serializes through the concrete runtime type it was built from, and can be
/// downcast back to that type by the reader.
pub struct BoxedValue {
    inner: Box<dyn ErasedValue>,
}

impl BoxedValue {
    /// Wraps a concrete value.
    pub fn new<T: RecordValue>(value: T) -> Self {
        Self {
            inner: Box::new(value),
        }
    }

    /// Borrows the payload as `T`, or `None` if it holds another type.
    pub fn downcast_ref<T: RecordValue>(&self) -> Option<&T> {
        self.inner.as_any().downcast_ref::<T>()
    }

    /// Takes the payload as `T`, or `None` if it holds another type.
    pub fn downcast<T: RecordValue>(self) -> Option<T> {
        self.inner.into_any().downcast::<T>().ok().map(|boxed| *boxed)
    }

    /// Serializes the payload using its runtime type.
    ///
    /// Fails on NaN or infinite floats, which JSON cannot carry.
    pub fn to_json(&self) -> serde_json::Result<JsonValue> {
        self.inner.to_json()
    }
}

impl Clone for BoxedValue {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone_boxed(),
        }
    }
}

impl fmt::Debug for BoxedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.inner, f)
    }
}

// == Type Registry ==
type DecodeFn = fn(JsonValue) -> serde_json::Result<BoxedValue>;

fn decode_as<T: RecordValue>(value: JsonValue) -> serde_json::Result<BoxedValue> {
    serde_json::from_value::<T>(value).map(BoxedValue::new)
}

/// Maps type tags to decode functions.
///
/// A tag missing from the registry is not an error: the codec decodes such a
/// record with an absent value.
#[derive(Clone, Default)]
pub struct TypeRegistry {
    decoders: HashMap<String, DecodeFn>,
}

impl TypeRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry that already knows the primitive payloads and
    /// `serde_json::Value`.
    pub fn with_builtins() -> Self {
        Self::new()
            .with::<String>()
            .with::<bool>()
            .with::<i64>()
            .with::<u64>()
            .with::<f64>()
            .with::<JsonValue>()
    }

    /// Registers `T` under its tag, replacing any previous entry.
    pub fn register<T: RecordValue>(&mut self) -> &mut Self {
        self.decoders.insert(T::type_name().into_owned(), decode_as::<T>);
        self
    }

    /// Builder form of [`TypeRegistry::register`].
    pub fn with<T: RecordValue>(mut self) -> Self {
        self.register::<T>();
        self
    }

    /// Returns true if `type_name` resolves to a registered type.
    pub fn contains(&self, type_name: &str) -> bool {
        self.decoders.contains_key(type_name)
    }

    /// Decodes `value` as the type registered under `type_name`.
    ///
    /// Returns `None` when the tag is unknown.
    pub fn resolve(
        &self,
        type_name: &str,
        value: JsonValue,
    ) -> Option<serde_json::Result<BoxedValue>> {
        self.decoders.get(type_name).map(|decode| decode(value))
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut tags: Vec<&String> = self.decoders.keys().collect();
        tags.sort();
        f.debug_struct("TypeRegistry").field("types", &tags).finish()
    }
}
