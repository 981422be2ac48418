///
/// Human-readable descriptor dump.
///
/// A print_r-like rendering used for display and as the export fallback for
/// object graphs that cannot be serialized:
///
///   Foo#1
///   (
///       [bar] => 'baz'
///       [self] => Foo#1(...)
///   )
///

use std::collections::HashMap;

use super::{closure_source, export_key, export_scalar, indent};
use crate::value::{ObjectId, ObjectRef, Value, Visibility, mangled_name};

pub(crate) fn describe(value: &Value, depth: i32) -> String {
    let mut describer = Describer {
        depth,
        objects: HashMap::new(),
        out: String::new(),
    };
    describer.value(value, 0);
    describer.out
}

struct Describer {
    depth: i32,
    objects: HashMap<ObjectId, usize>,
    out: String,
}

impl Describer {
    fn exhausted(&self, level: usize) -> bool {
        self.depth <= level as i32
    }

    fn value(&mut self, value: &Value, level: usize) {
        match value {
            Value::Array(array) => {
                if self.exhausted(level) {
                    self.out.push_str("[...]");
                } else if array.is_empty() {
                    self.out.push_str("[]");
                } else {
                    self.out.push('[');
                    for (key, item) in array.iter() {
                        self.out.push('\n');
                        indent(&mut self.out, level + 1);
                        export_key(key, &mut self.out);
                        self.out.push_str(" => ");
                        self.value(item, level + 1);
                    }
                    self.out.push('\n');
                    indent(&mut self.out, level);
                    self.out.push(']');
                }
            }
            Value::Object(object) => self.object(object, level),
            Value::Closure(closure) => self.out.push_str(&closure_source(closure)),
            Value::Resource(_) => self.out.push_str("{resource}"),
            scalar => export_scalar(scalar, &mut self.out),
        }
    }

    fn object(&mut self, object: &ObjectRef, level: usize) {
        let object = object.borrow();
        if let Some(ordinal) = self.objects.get(&object.id()) {
            self.out.push_str(&format!("{}#{}(...)", object.class, ordinal));
            return;
        }
        if self.exhausted(level) {
            self.out.push_str(&format!("{}(...)", object.class));
            return;
        }

        let ordinal = self.objects.len() + 1;
        self.objects.insert(object.id(), ordinal);

        self.out.push_str(&format!("{}#{}\n", object.class, ordinal));
        indent(&mut self.out, level);
        self.out.push('(');
        for (name, property) in object.properties() {
            self.out.push('\n');
            indent(&mut self.out, level + 1);
            self.out.push_str(&format!("[{}] => ", display_name(name, &property.visibility)));
            self.value(&property.value, level + 1);
        }
        self.out.push('\n');
        indent(&mut self.out, level);
        self.out.push(')');
    }
}

/// Property name with the mangling separators shown as `:`.
fn display_name(name: &str, visibility: &Visibility) -> String {
    mangled_name(name, visibility)
        .trim_matches(|c: char| c == '\0' || c.is_ascii_whitespace() || c == '\x0B')
        .replace('\0', ":")
}
