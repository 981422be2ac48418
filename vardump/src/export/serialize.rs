///
/// Object graph serialization.
///
/// Writes values in the legacy serialization grammar understood by the
/// host runtime's `unserialize()`:
///
///   N;  b:1;  i:42;  d:1.5;  s:5:"hello";
///   a:2:{i:0;s:1:"a";s:1:"k";i:1;}
///   O:8:"stdClass":1:{s:1:"p";N;}
///   r:1;
///
/// An object met a second time within one call is written as a
/// back-reference `r:<index>;`, so cyclic graphs serialize finitely.
/// Acyclic graphs nested deeper than `MAX_NESTING` are refused.
///

use std::collections::HashMap;

use serde::Deserialize;
use thiserror::Error;

use super::format_float;
use crate::value::{ArrayKey, ObjectId, ObjectRef, Value, mangled_name};

/// Deepest array / object nesting written before giving up.
pub(crate) const MAX_NESTING: usize = 512;

/// How back-reference indexes are numbered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GrammarTarget {
    /// Every serialized value, back-references included, takes a slot; the
    /// top-level value is slot 1. Byte-exact with the native serializer.
    #[default]
    Native,
    /// Only objects are numbered, in first-visit order.
    Ordinal,
}

#[derive(Debug, Error)]
pub(crate) enum SerializeError {
    #[error("Serialization of '{class}' is not allowed")]
    AnonymousClass { class: String },

    #[error("Serialization of 'Closure' is not allowed")]
    Closure,

    #[error("Nesting level too deep, more than {} levels", MAX_NESTING)]
    TooDeep,
}

pub(crate) fn serialize(value: &Value, grammar: GrammarTarget) -> Result<String, SerializeError> {
    let mut serializer = Serializer {
        grammar,
        references: HashMap::new(),
        slots: 0,
        objects: 0,
        nesting: 0,
        out: String::new(),
    };
    serializer.value(value)?;
    Ok(serializer.out)
}

struct Serializer {
    grammar: GrammarTarget,
    references: HashMap<ObjectId, u32>,
    slots: u32,
    objects: u32,
    nesting: usize,
    out: String,
}

impl Serializer {
    fn value(&mut self, value: &Value) -> Result<(), SerializeError> {
        self.slots += 1;
        match value {
            Value::Null => self.out.push_str("N;"),
            Value::Bool(b) => {
                self.out.push_str(if *b { "b:1;" } else { "b:0;" });
            }
            Value::Int(i) => self.int(*i),
            Value::Float(f) => {
                self.out.push_str("d:");
                self.out.push_str(&format_float(*f, false));
                self.out.push(';');
            }
            Value::String(s) => self.string(s),
            Value::Resource(_) => self.int(0),
            Value::Closure(_) => return Err(SerializeError::Closure),
            Value::Array(array) => {
                self.enter()?;
                self.out.push_str(&format!("a:{}:{{", array.len()));
                for (key, item) in array.iter() {
                    match key {
                        ArrayKey::Int(i) => self.int(*i),
                        ArrayKey::Str(s) => self.string(s),
                    }
                    self.value(item)?;
                }
                self.out.push('}');
                self.nesting -= 1;
            }
            Value::Object(object) => self.object(object)?,
        }
        Ok(())
    }

    fn enter(&mut self) -> Result<(), SerializeError> {
        if self.nesting >= MAX_NESTING {
            return Err(SerializeError::TooDeep);
        }
        self.nesting += 1;
        Ok(())
    }

    fn object(&mut self, object: &ObjectRef) -> Result<(), SerializeError> {
        let object = object.borrow();
        if let Some(index) = self.references.get(&object.id()) {
            self.out.push_str(&format!("r:{};", index));
            return Ok(());
        }
        if object.anonymous {
            return Err(SerializeError::AnonymousClass {
                class: object.class.clone(),
            });
        }

        let index = match self.grammar {
            GrammarTarget::Native => self.slots,
            GrammarTarget::Ordinal => {
                self.objects += 1;
                self.objects
            }
        };
        self.references.insert(object.id(), index);
        self.enter()?;

        self.out.push_str(&format!(
            "O:{}:\"{}\":{}:{{",
            object.class.len(),
            object.class,
            object.property_count()
        ));
        for (name, property) in object.properties() {
            self.string(&mangled_name(name, &property.visibility));
            self.value(&property.value)?;
        }
        self.out.push('}');
        self.nesting -= 1;
        Ok(())
    }

    fn int(&mut self, i: i64) {
        self.out.push_str(&format!("i:{};", i));
    }

    fn string(&mut self, s: &str) {
        self.out.push_str(&format!("s:{}:\"{}\";", s.len(), s));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{Array, Closure, Object, Resource, Visibility};

    fn native(value: &Value) -> String {
        serialize(value, GrammarTarget::Native).unwrap()
    }

    #[test]
    fn test_scalars() {
        assert_eq!(native(&Value::Null), "N;");
        assert_eq!(native(&Value::Bool(true)), "b:1;");
        assert_eq!(native(&Value::Int(-3)), "i:-3;");
        assert_eq!(native(&Value::Float(1.0)), "d:1;");
        assert_eq!(native(&Value::Float(0.5)), "d:0.5;");
        assert_eq!(native(&Value::Float(f64::NEG_INFINITY)), "d:-INF;");
        assert_eq!(native(&Value::from("🤣")), "s:4:\"🤣\";");
    }

    #[test]
    fn test_array() {
        let mut array = Array::new();
        array.push("a");
        array.insert("k", 1);
        assert_eq!(
            native(&Value::Array(array)),
            "a:2:{i:0;s:1:\"a\";s:1:\"k\";i:1;}"
        );
    }

    #[test]
    fn test_mutual_references() {
        let first = ObjectRef::new(Object::std_class());
        let second = ObjectRef::new(Object::std_class());
        first.borrow_mut().set("object", second.clone());
        second.borrow_mut().set("object", first.clone());

        assert_eq!(
            native(&Value::Object(first)),
            "O:8:\"stdClass\":1:{s:6:\"object\";O:8:\"stdClass\":1:{s:6:\"object\";r:1;}}"
        );
    }

    #[test]
    fn test_native_and_ordinal_numbering() {
        let shared = ObjectRef::new(Object::std_class());
        let mut root = Object::std_class();
        root.set("n", 1);
        root.set("a", shared.clone());
        root.set("b", shared);
        let root = Value::from(root);

        // root=1, n=2, a=3, b=r:3
        assert_eq!(
            serialize(&root, GrammarTarget::Native).unwrap(),
            "O:8:\"stdClass\":3:{s:1:\"n\";i:1;s:1:\"a\";O:8:\"stdClass\":0:{}s:1:\"b\";r:3;}"
        );
        assert_eq!(
            serialize(&root, GrammarTarget::Ordinal).unwrap(),
            "O:8:\"stdClass\":3:{s:1:\"n\";i:1;s:1:\"a\";O:8:\"stdClass\":0:{}s:1:\"b\";r:2;}"
        );
    }

    #[test]
    fn test_back_references_take_a_slot() {
        let shared = ObjectRef::new(Object::std_class());
        let mut root = Object::std_class();
        root.set("a", shared.clone());
        root.set("b", shared.clone());
        root.set("c", ObjectRef::new(Object::std_class()));
        root.set("d", shared);

        // root=1, a=2, b=3 (r:2), c=4, d=5 (r:2)
        let text = native(&Value::from(root));
        assert!(text.ends_with("s:1:\"b\";r:2;s:1:\"c\";O:8:\"stdClass\":0:{}s:1:\"d\";r:2;}"));
    }

    #[test]
    fn test_property_visibility_mangling() {
        let mut object = Object::new("Foo");
        object.set_with("a", Visibility::Protected, Value::Null);
        object.set_with("b", Visibility::Private("Foo".to_string()), Value::Null);
        assert_eq!(
            native(&Value::from(object)),
            "O:3:\"Foo\":2:{s:4:\"\0*\0a\";N;s:6:\"\0Foo\0b\";N;}"
        );
    }

    #[test]
    fn test_nested_resource_is_zero() {
        let mut object = Object::std_class();
        object.set("handle", Resource::new(3, "stream"));
        assert_eq!(
            native(&Value::from(object)),
            "O:8:\"stdClass\":1:{s:6:\"handle\";i:0;}"
        );
    }

    #[test]
    fn test_unserializable_graphs() {
        let mut object = Object::std_class();
        object.set("inner", Object::anonymous("class@anonymous"));
        assert!(matches!(
            serialize(&Value::from(object), GrammarTarget::Native),
            Err(SerializeError::AnonymousClass { .. })
        ));

        let mut object = Object::std_class();
        object.set("a", Closure::arrow("()", "1"));
        assert!(matches!(
            serialize(&Value::from(object), GrammarTarget::Native),
            Err(SerializeError::Closure)
        ));
    }

    #[test]
    fn test_nesting_limit() {
        let mut array = Array::new();
        array.push(1);
        let mut value = Value::Array(array);
        for _ in 1..MAX_NESTING {
            let mut outer = Array::new();
            outer.push(value);
            value = Value::Array(outer);
        }
        assert!(native(&value).ends_with(&"}".repeat(MAX_NESTING)));

        let mut outer = Array::new();
        outer.push(value);
        assert!(matches!(
            serialize(&Value::Array(outer), GrammarTarget::Native),
            Err(SerializeError::TooDeep)
        ));
    }
}
