//! Tree descriptions
//!
//! A [`Child`] describes what a position in the tree should contain on the
//! next render. Descriptions are immutable once built; elements are shared
//! behind `Rc` so fibers can hold on to the props they were rendered with.

use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::{Map, Value};

use crate::hooks::{Hooks, RenderInterrupt};

/// Render function of a function component
pub type RenderFn = dyn Fn(&Element, &mut Hooks<'_>) -> Result<Child, RenderInterrupt>;

/// A function component. Identity is the render function itself: two
/// components are the same type only if they share the same `Rc`.
#[derive(Clone)]
pub struct Component {
    name: Rc<str>,
    render: Rc<RenderFn>,
}

impl Component {
    pub fn new<F>(name: &str, render: F) -> Self
    where
        F: Fn(&Element, &mut Hooks<'_>) -> Result<Child, RenderInterrupt> + 'static,
    {
        Self {
            name: Rc::from(name),
            render: Rc::new(render),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn render(
        &self,
        element: &Element,
        hooks: &mut Hooks<'_>,
    ) -> Result<Child, RenderInterrupt> {
        (self.render)(element, hooks)
    }
}

impl PartialEq for Component {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.render, &other.render)
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Component").field(&self.name).finish()
    }
}

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

/// A context channel. Providers below a fiber override the default value for
/// every `use_context` read in their subtree.
#[derive(Debug, Clone)]
pub struct Context {
    id: u64,
    default: Value,
}

impl Context {
    pub fn new(default: Value) -> Self {
        Self {
            id: NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed),
            default,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn default_value(&self) -> &Value {
        &self.default
    }
}

impl PartialEq for Context {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

/// What kind of node an element describes
#[derive(Debug, Clone, PartialEq)]
pub enum ElementType {
    Host(String),
    Function(Component),
    Fragment,
    Provider(Context),
}

impl ElementType {
    pub fn describe(&self) -> String {
        match self {
            ElementType::Host(tag) => tag.clone(),
            ElementType::Function(component) => component.name().to_string(),
            ElementType::Fragment => "Fragment".to_string(),
            ElementType::Provider(_) => "Provider".to_string(),
        }
    }
}

/// A described element: type, optional key, attributes and children
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub element_type: ElementType,
    pub key: Option<String>,
    pub attrs: Map<String, Value>,
    pub children: Vec<Child>,
}

impl Element {
    fn new(element_type: ElementType) -> Self {
        Self {
            element_type,
            key: None,
            attrs: Map::new(),
            children: Vec::new(),
        }
    }

    /// A host element such as `div`
    pub fn host(tag: impl Into<String>) -> Self {
        Self::new(ElementType::Host(tag.into()))
    }

    pub fn component(component: &Component) -> Self {
        Self::new(ElementType::Function(component.clone()))
    }

    pub fn fragment() -> Self {
        Self::new(ElementType::Fragment)
    }

    /// A context provider; `value` is visible to `use_context` below it
    pub fn provider(context: &Context, value: Value) -> Self {
        Self::new(ElementType::Provider(context.clone())).attr("value", value)
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    pub fn child(mut self, child: impl Into<Child>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn children<I, C>(mut self, children: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Child>,
    {
        self.children.extend(children.into_iter().map(Into::into));
        self
    }

    /// Children as one description: nothing, the single child, or a list
    pub fn children_as_child(&self) -> Child {
        match self.children.as_slice() {
            [] => Child::Empty,
            [only] => only.clone(),
            many => Child::List(many.to_vec()),
        }
    }

    pub fn is_fragment(&self) -> bool {
        self.element_type == ElementType::Fragment
    }

    pub fn attr_value(&self, name: &str) -> Option<&Value> {
        self.attrs.get(name)
    }
}

/// A child description
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Child {
    /// Render nothing at this position
    #[default]
    Empty,
    Text(String),
    Element(Rc<Element>),
    List(Vec<Child>),
    /// A shape the reconciler cannot diff; rendering it removes the
    /// position's existing children and records a diagnostic
    Unsupported(String),
}

impl Child {
    pub fn text(text: impl Into<String>) -> Self {
        Child::Text(text.into())
    }

    pub fn list<I, C>(items: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Child>,
    {
        Child::List(items.into_iter().map(Into::into).collect())
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Child::Empty)
    }

    /// Build a description from JSON
    ///
    /// Strings and numbers become text, arrays become lists, `null` and
    /// booleans render nothing, and objects of the form
    /// `{"type": "div", "key": "k", "props": {..., "children": ...}}` become
    /// host elements. Anything else is kept as [`Child::Unsupported`].
    pub fn from_json(value: &Value) -> Child {
        match value {
            Value::Null | Value::Bool(_) => Child::Empty,
            Value::String(text) => Child::Text(text.clone()),
            Value::Number(number) => Child::Text(number.to_string()),
            Value::Array(items) => Child::List(items.iter().map(Child::from_json).collect()),
            Value::Object(object) => match object.get("type") {
                Some(Value::String(tag)) => Child::from(host_from_json(tag, object)),
                _ => Child::Unsupported(format!("object without a string type: {}", value)),
            },
        }
    }
}

fn host_from_json(tag: &str, object: &Map<String, Value>) -> Element {
    let mut element = if tag == "#fragment" {
        Element::fragment()
    } else {
        Element::host(tag)
    };
    match object.get("key") {
        Some(Value::String(key)) => element.key = Some(key.clone()),
        Some(Value::Number(key)) => element.key = Some(key.to_string()),
        _ => {}
    }
    if let Some(Value::Object(props)) = object.get("props") {
        for (name, prop) in props {
            if name == "children" {
                match Child::from_json(prop) {
                    Child::List(items) => element.children = items,
                    Child::Empty => {}
                    single => element.children.push(single),
                }
            } else {
                element.attrs.insert(name.clone(), prop.clone());
            }
        }
    }
    element
}

impl From<Element> for Child {
    fn from(element: Element) -> Self {
        Child::Element(Rc::new(element))
    }
}

impl From<Rc<Element>> for Child {
    fn from(element: Rc<Element>) -> Self {
        Child::Element(element)
    }
}

impl From<&str> for Child {
    fn from(text: &str) -> Self {
        Child::Text(text.to_string())
    }
}

impl From<String> for Child {
    fn from(text: String) -> Self {
        Child::Text(text)
    }
}

impl From<i64> for Child {
    fn from(number: i64) -> Self {
        Child::Text(number.to_string())
    }
}

impl From<i32> for Child {
    fn from(number: i32) -> Self {
        Child::Text(number.to_string())
    }
}

impl From<u32> for Child {
    fn from(number: u32) -> Self {
        Child::Text(number.to_string())
    }
}

impl From<f64> for Child {
    fn from(number: f64) -> Self {
        Child::Text(number.to_string())
    }
}

impl From<Vec<Child>> for Child {
    fn from(items: Vec<Child>) -> Self {
        Child::List(items)
    }
}

impl<T: Into<Child>> From<Option<T>> for Child {
    fn from(child: Option<T>) -> Self {
        child.map_or(Child::Empty, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builder() {
        let element = Element::host("ul")
            .key("list")
            .attr("class", "items")
            .child(Element::host("li").key("a").child("A"))
            .child(Element::host("li").key("b").child("B"));

        assert_eq!(element.key.as_deref(), Some("list"));
        assert_eq!(element.attr_value("class"), Some(&json!("items")));
        assert_eq!(element.children.len(), 2);
        assert!(matches!(element.children_as_child(), Child::List(ref items) if items.len() == 2));
    }

    #[test]
    fn test_children_as_child_unwraps_single() {
        let element = Element::host("p").child("hello");
        assert_eq!(element.children_as_child(), Child::text("hello"));
        assert_eq!(Element::host("br").children_as_child(), Child::Empty);
    }

    #[test]
    fn test_component_identity_is_pointer_identity() {
        let a = Component::new("Same", |_, _| Ok(Child::Empty));
        let b = Component::new("Same", |_, _| Ok(Child::Empty));
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }

    #[test]
    fn test_context_identity() {
        let theme = Context::new(json!("light"));
        let other = Context::new(json!("light"));
        assert_eq!(theme, theme.clone());
        assert_ne!(theme, other);
    }

    #[test]
    fn test_from_json() {
        let value = json!({
            "type": "ul",
            "props": {
                "id": "list",
                "children": [
                    {"type": "li", "key": "a", "props": {"children": "A"}},
                    {"type": "li", "key": 2, "props": {"children": 42}},
                    null
                ]
            }
        });

        let Child::Element(list) = Child::from_json(&value) else {
            panic!("expected element");
        };
        assert_eq!(list.element_type, ElementType::Host("ul".to_string()));
        assert_eq!(list.attr_value("id"), Some(&json!("list")));
        assert_eq!(list.children.len(), 3);
        let Child::Element(second) = &list.children[1] else {
            panic!("expected element");
        };
        assert_eq!(second.key.as_deref(), Some("2"));
        assert_eq!(second.children, vec![Child::text("42")]);
        assert_eq!(list.children[2], Child::Empty);
    }

    #[test]
    fn test_from_json_unsupported_object() {
        let child = Child::from_json(&json!({"tag": "div"}));
        assert!(matches!(child, Child::Unsupported(_)));
    }
}
