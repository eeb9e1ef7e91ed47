//! Per-clause bind value storage.

use crate::error::QbError;
use crate::value::Value;
use std::fmt;
use std::str::FromStr;

/// Binding category a value belongs to.
///
/// Categories are flattened in declaration order for SELECT statements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingKind {
    Select,
    Join,
    Where,
    Having,
    Order,
    Union,
}

impl BindingKind {
    pub const ALL: [BindingKind; 6] = [
        BindingKind::Select,
        BindingKind::Join,
        BindingKind::Where,
        BindingKind::Having,
        BindingKind::Order,
        BindingKind::Union,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Select => "select",
            Self::Join => "join",
            Self::Where => "where",
            Self::Having => "having",
            Self::Order => "order",
            Self::Union => "union",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for BindingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BindingKind {
    type Err = QbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BindingKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| QbError::invalid_argument(format!("Invalid binding type: {s}")))
    }
}

/// Ordered bind values, one list per [`BindingKind`].
///
/// Values of the union-level ORDER BY are kept apart from the union branches
/// and always flatten after them, whatever order they were added in.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bindings {
    lists: [Vec<Value>; 6],
    union_order: Vec<Value>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, kind: BindingKind) -> &[Value] {
        &self.lists[kind.index()]
    }

    pub fn push(&mut self, kind: BindingKind, value: Value) {
        self.lists[kind.index()].push(value);
    }

    pub fn extend<I>(&mut self, kind: BindingKind, values: I)
    where
        I: IntoIterator<Item = Value>,
    {
        self.lists[kind.index()].extend(values);
    }

    /// Values of the ORDER BY that applies to the whole union.
    pub fn union_order(&self) -> &[Value] {
        &self.union_order
    }

    pub fn extend_union_order<I>(&mut self, values: I)
    where
        I: IntoIterator<Item = Value>,
    {
        self.union_order.extend(values);
    }

    /// Clearing [`BindingKind::Union`] also clears the union-level order values.
    pub fn clear(&mut self, kind: BindingKind) {
        self.lists[kind.index()].clear();
        if kind == BindingKind::Union {
            self.union_order.clear();
        }
    }

    /// Total number of bound values.
    pub fn len(&self) -> usize {
        self.lists.iter().map(Vec::len).sum::<usize>() + self.union_order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lists.iter().all(Vec::is_empty) && self.union_order.is_empty()
    }

    /// Values of one category as they are bound: union branches are followed
    /// by the union-level order values.
    fn bound(&self, kind: BindingKind) -> impl Iterator<Item = &Value> {
        let trailing: &[Value] = if kind == BindingKind::Union {
            &self.union_order
        } else {
            &[]
        };
        self.get(kind).iter().chain(trailing)
    }

    /// All values in SELECT order.
    pub fn flatten(&self) -> Vec<Value> {
        self.flatten_only(&BindingKind::ALL)
    }

    /// Values of the given categories, in the order the categories are listed.
    pub fn flatten_only(&self, kinds: &[BindingKind]) -> Vec<Value> {
        kinds
            .iter()
            .flat_map(|k| self.bound(*k).cloned())
            .collect()
    }

    /// Values of every category except the excluded ones, in SELECT order.
    pub fn flatten_except(&self, excluded: &[BindingKind]) -> Vec<Value> {
        BindingKind::ALL
            .iter()
            .filter(|k| !excluded.contains(k))
            .flat_map(|k| self.bound(*k).cloned())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_categories() {
        assert_eq!("where".parse::<BindingKind>().unwrap(), BindingKind::Where);
        assert_eq!("union".parse::<BindingKind>().unwrap(), BindingKind::Union);
        assert!("wheres".parse::<BindingKind>().unwrap_err().is_invalid_argument());
    }

    #[test]
    fn flattens_in_category_order() {
        let mut b = Bindings::new();
        b.push(BindingKind::Order, Value::Int(5));
        b.push(BindingKind::Where, Value::Int(3));
        b.push(BindingKind::Select, Value::Int(1));
        b.push(BindingKind::Join, Value::Int(2));
        assert_eq!(
            b.flatten(),
            vec![Value::Int(1), Value::Int(2), Value::Int(3), Value::Int(5)]
        );
        assert_eq!(
            b.flatten_except(&[BindingKind::Select, BindingKind::Join]),
            vec![Value::Int(3), Value::Int(5)]
        );
        assert_eq!(b.len(), 4);
    }

    #[test]
    fn union_order_values_follow_every_branch() {
        let mut b = Bindings::new();
        b.push(BindingKind::Union, Value::Int(1));
        b.extend_union_order([Value::Int(2)]);
        b.push(BindingKind::Union, Value::Int(3));
        assert_eq!(
            b.flatten(),
            vec![Value::Int(1), Value::Int(3), Value::Int(2)]
        );
        assert_eq!(b.len(), 3);

        b.clear(BindingKind::Union);
        assert!(b.is_empty());
    }
}
