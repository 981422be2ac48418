//!
//! Value Module - Exportable Runtime Values
//!
//! The dynamic value model the exporter walks: scalars, ordered arrays,
//! shared object instances, closures and opaque resource handles.
//!
//! Objects are shared through `ObjectRef` so that graphs with cycles can be
//! built. Every object gets a process-unique `ObjectId` at allocation; the
//! exporter uses it to recognise an object it has already visited.
//!

use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::atomic::{AtomicU32, Ordering};

use indexmap::IndexMap;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Array(Array),
    Object(ObjectRef),
    Closure(Closure),
    Resource(Resource),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Closure(_) => "Closure",
            Value::Resource(_) => "resource",
        }
    }

    /// Converts decoded JSON. Objects become string-keyed arrays, or
    /// `stdClass` instances with public properties when `objects` is set.
    pub fn from_json(json: serde_json::Value, objects: bool) -> Value {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => Value::Array(
                items
                    .into_iter()
                    .map(|item| Value::from_json(item, objects))
                    .collect(),
            ),
            serde_json::Value::Object(map) if objects => {
                let mut object = Object::std_class();
                for (name, item) in map {
                    object.set(name, Value::from_json(item, objects));
                }
                Value::Object(ObjectRef::new(object))
            }
            serde_json::Value::Object(map) => {
                let mut array = Array::new();
                for (key, item) in map {
                    array.insert(ArrayKey::from(key), Value::from_json(item, objects));
                }
                Value::Array(array)
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i as i64)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Array> for Value {
    fn from(a: Array) -> Self {
        Value::Array(a)
    }
}

impl From<ObjectRef> for Value {
    fn from(o: ObjectRef) -> Self {
        Value::Object(o)
    }
}

impl From<Object> for Value {
    fn from(o: Object) -> Self {
        Value::Object(ObjectRef::new(o))
    }
}

impl From<Closure> for Value {
    fn from(c: Closure) -> Self {
        Value::Closure(c)
    }
}

impl From<Resource> for Value {
    fn from(r: Resource) -> Self {
        Value::Resource(r)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map(Into::into).unwrap_or(Value::Null)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ArrayKey {
    Int(i64),
    Str(String),
}

impl fmt::Display for ArrayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArrayKey::Int(i) => write!(f, "{}", i),
            ArrayKey::Str(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for ArrayKey {
    fn from(i: i64) -> Self {
        ArrayKey::Int(i)
    }
}

impl From<i32> for ArrayKey {
    fn from(i: i32) -> Self {
        ArrayKey::Int(i as i64)
    }
}

impl From<&str> for ArrayKey {
    fn from(s: &str) -> Self {
        ArrayKey::Str(s.to_string())
    }
}

impl From<String> for ArrayKey {
    fn from(s: String) -> Self {
        ArrayKey::Str(s)
    }
}

/// Insertion-ordered array with integer or string keys.
#[derive(Debug, Clone, Default)]
pub struct Array {
    entries: IndexMap<ArrayKey, Value>,
    next_index: i64,
}

impl Array {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends with the next integer key.
    pub fn push(&mut self, value: impl Into<Value>) {
        let key = self.next_index;
        self.insert(ArrayKey::Int(key), value);
    }

    /// Sets a key. An existing key keeps its position.
    pub fn insert(&mut self, key: impl Into<ArrayKey>, value: impl Into<Value>) {
        let key = key.into();
        if let ArrayKey::Int(i) = key {
            if i >= self.next_index {
                self.next_index = i.saturating_add(1);
            }
        }
        self.entries.insert(key, value.into());
    }

    pub fn get(&self, key: &ArrayKey) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True when the keys are exactly `0..len` in order.
    pub fn is_list(&self) -> bool {
        self.entries
            .keys()
            .enumerate()
            .all(|(i, key)| *key == ArrayKey::Int(i as i64))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ArrayKey, &Value)> {
        self.entries.iter()
    }
}

impl PartialEq for Array {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl<V: Into<Value>> FromIterator<V> for Array {
    fn from_iter<I: IntoIterator<Item = V>>(iter: I) -> Self {
        let mut array = Array::new();
        for value in iter {
            array.push(value);
        }
        array
    }
}

static NEXT_OBJECT_ID: AtomicU32 = AtomicU32::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(u32);

impl ObjectId {
    fn next() -> Self {
        ObjectId(NEXT_OBJECT_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u32(self) -> u32 {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Visibility {
    Public,
    Protected,
    /// Private to the named declaring class.
    Private(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub visibility: Visibility,
    pub value: Value,
}

/// Property name as the serialization grammar spells it: protected names
/// are prefixed with `\0*\0`, private ones with `\0Class\0`.
pub fn mangled_name(name: &str, visibility: &Visibility) -> String {
    match visibility {
        Visibility::Public => name.to_string(),
        Visibility::Protected => format!("\0*\0{}", name),
        Visibility::Private(class) => format!("\0{}\0{}", class, name),
    }
}

#[derive(Debug)]
pub struct Object {
    id: ObjectId,
    pub class: String,
    pub anonymous: bool,
    properties: IndexMap<String, Property>,
}

impl Object {
    pub fn new(class: impl Into<String>) -> Self {
        Self {
            id: ObjectId::next(),
            class: class.into(),
            anonymous: false,
            properties: IndexMap::new(),
        }
    }

    pub fn std_class() -> Self {
        Self::new("stdClass")
    }

    /// An instance of an anonymous class. Such objects cannot be serialized.
    pub fn anonymous(class: impl Into<String>) -> Self {
        Self {
            anonymous: true,
            ..Self::new(class)
        }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// Sets a public property.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.set_with(name, Visibility::Public, value);
    }

    pub fn set_with(
        &mut self,
        name: impl Into<String>,
        visibility: Visibility,
        value: impl Into<Value>,
    ) {
        self.properties.insert(
            name.into(),
            Property {
                visibility,
                value: value.into(),
            },
        );
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.properties.get(name).map(|p| &p.value)
    }

    pub fn properties(&self) -> impl Iterator<Item = (&str, &Property)> {
        self.properties.iter().map(|(name, p)| (name.as_str(), p))
    }

    pub fn property_count(&self) -> usize {
        self.properties.len()
    }
}

/// Shared handle to an object. Clones point at the same instance.
#[derive(Clone)]
pub struct ObjectRef(Rc<RefCell<Object>>);

impl ObjectRef {
    pub fn new(object: Object) -> Self {
        ObjectRef(Rc::new(RefCell::new(object)))
    }

    pub fn id(&self) -> ObjectId {
        self.0.borrow().id
    }

    pub fn borrow(&self) -> Ref<'_, Object> {
        self.0.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, Object> {
        self.0.borrow_mut()
    }

    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

// Identity comparison; structural comparison would not terminate on cycles.
impl PartialEq for ObjectRef {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_borrow() {
            Ok(object) => write!(f, "{}#{}", object.class, object.id.0),
            Err(_) => write!(f, "Object(borrowed)"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClosureKind {
    /// `function (...) { ... }`
    Regular,
    /// `fn (...) => expr`
    Arrow,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClosureLocation {
    pub file: PathBuf,
    pub line: u32,
    pub column: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Closure {
    pub kind: ClosureKind,
    pub is_static: bool,
    /// Parameter list and return type, e.g. `(int $x): int`.
    pub signature: String,
    pub body: String,
    pub location: Option<ClosureLocation>,
}

impl Closure {
    pub fn regular(signature: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            kind: ClosureKind::Regular,
            is_static: false,
            signature: signature.into(),
            body: body.into(),
            location: None,
        }
    }

    pub fn arrow(signature: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            kind: ClosureKind::Arrow,
            ..Self::regular(signature, body)
        }
    }

    pub fn with_static(mut self) -> Self {
        self.is_static = true;
        self
    }

    /// Records where the closure is declared; `column` is 1-based and may
    /// point anywhere before the closure on that line.
    pub fn declared_at(mut self, file: impl Into<PathBuf>, line: u32, column: u32) -> Self {
        self.location = Some(ClosureLocation {
            file: file.into(),
            line,
            column,
        });
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    pub id: u32,
    pub kind: String,
}

impl Resource {
    pub fn new(id: u32, kind: impl Into<String>) -> Self {
        Self {
            id,
            kind: kind.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_uses_next_integer_key() {
        let mut array = Array::new();
        array.insert(5, "five");
        array.insert("name", "x");
        array.push("six");
        let keys: Vec<_> = array.iter().map(|(k, _)| k.clone()).collect();
        assert_eq!(
            keys,
            vec![ArrayKey::Int(5), ArrayKey::from("name"), ArrayKey::Int(6)]
        );
    }

    #[test]
    fn test_is_list() {
        let list: Array = vec!["a", "b"].into_iter().collect();
        assert!(list.is_list());
        assert!(Array::new().is_list());

        let mut shuffled = Array::new();
        shuffled.insert(1, "b");
        shuffled.insert(0, "a");
        assert!(!shuffled.is_list());
    }

    #[test]
    fn test_string_keys_are_not_coerced() {
        let mut array = Array::new();
        array.insert("2", "text key");
        array.insert(2, "int key");
        assert_eq!(array.len(), 2);
    }

    #[test]
    fn test_object_ids_are_unique() {
        let a = Object::std_class();
        let b = Object::std_class();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_object_ref_identity() {
        let a = ObjectRef::new(Object::std_class());
        let b = a.clone();
        let c = ObjectRef::new(Object::std_class());
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.id(), b.id());
    }

    #[test]
    fn test_cyclic_debug_terminates() {
        let a = ObjectRef::new(Object::std_class());
        let b = ObjectRef::new(Object::std_class());
        a.borrow_mut().set("object", b.clone());
        b.borrow_mut().set("object", a.clone());
        let text = format!("{:?}", Value::Object(a));
        assert!(text.starts_with("Object(stdClass#"));
    }

    #[test]
    fn test_mangled_names() {
        assert_eq!(mangled_name("a", &Visibility::Public), "a");
        assert_eq!(mangled_name("a", &Visibility::Protected), "\0*\0a");
        assert_eq!(
            mangled_name("a", &Visibility::Private("Foo".to_string())),
            "\0Foo\0a"
        );
    }

    #[test]
    fn test_from_json_preserves_order() {
        let json: serde_json::Value = serde_json::from_str(r#"{"b": 1, "a": [true, null]}"#).unwrap();
        let Value::Array(array) = Value::from_json(json.clone(), false) else {
            panic!("expected array");
        };
        let keys: Vec<_> = array.iter().map(|(k, _)| k.to_string()).collect();
        assert_eq!(keys, vec!["b", "a"]);

        let Value::Object(object) = Value::from_json(json, true) else {
            panic!("expected object");
        };
        assert_eq!(object.borrow().class, "stdClass");
        assert_eq!(object.borrow().get("b"), Some(&Value::Int(1)));
    }
}
