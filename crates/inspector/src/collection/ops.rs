//! Structural collection edits.
//!
//! Each operation mutates the element vector in place and returns the
//! selection re-expressed in the new positions of the elements that
//! survived. Removals and insertions walk indices in descending order so
//! pending indices stay valid.

use gantry_common::value::{FieldType, Value};
use std::cmp::Ordering;
use std::collections::BTreeSet;

pub type Selection = BTreeSet<usize>;

/// Element ordering picked from the collection's element type
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortStrategy {
    /// Reference elements by referenced object name; nulls last
    ByName,
    /// Numbers, strings, booleans and enums in natural order
    Ascending,
    /// Vectors by length
    ByMagnitude,
}

impl SortStrategy {
    pub fn for_type(element: &FieldType) -> Option<Self> {
        match element {
            FieldType::Reference(_) => Some(SortStrategy::ByName),
            FieldType::Int | FieldType::Float | FieldType::String | FieldType::Bool | FieldType::Enum(_) => {
                Some(SortStrategy::Ascending)
            }
            FieldType::Vector2 | FieldType::Vector3 => Some(SortStrategy::ByMagnitude),
            FieldType::Color | FieldType::Object(_) | FieldType::List(_) => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SortStrategy::ByName => "Sort by Name",
            SortStrategy::Ascending => "Sort Ascending",
            SortStrategy::ByMagnitude => "Sort by Magnitude",
        }
    }

    pub fn compare(&self, a: &Value, b: &Value) -> Ordering {
        match self {
            SortStrategy::ByName => match (a.as_reference().flatten(), b.as_reference().flatten()) {
                (Some(a), Some(b)) => a.name.cmp(&b.name),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            },
            SortStrategy::Ascending => match (a, b) {
                (Value::String(a), Value::String(b)) => a.cmp(b),
                (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
                (Value::Enum(a), Value::Enum(b)) => a.bits.cmp(&b.bits),
                _ => match (a.as_f64(), b.as_f64()) {
                    (Some(a), Some(b)) => a.total_cmp(&b),
                    _ => Ordering::Equal,
                },
            },
            SortStrategy::ByMagnitude => magnitude(a).total_cmp(&magnitude(b)),
        }
    }
}

fn magnitude(value: &Value) -> f32 {
    match value {
        Value::Vector2(v) => v.length(),
        Value::Vector3(v) => v.length(),
        _ => 0.0,
    }
}

/// Selection after a permutation/filter: `origins[new] = old`
fn remap(origins: &[usize], selection: &Selection) -> Selection {
    origins
        .iter()
        .enumerate()
        .filter(|(_, old)| selection.contains(old))
        .map(|(new, _)| new)
        .collect()
}

/// Move `dragged` so they start at `insertion`. Returns the new selection,
/// or `None` when the drop lands inside the dragged span (no change).
pub fn reorder(items: &mut Vec<Value>, dragged: &[usize], insertion: usize) -> Option<Selection> {
    let mut dragged: Vec<usize> = dragged.iter().copied().filter(|i| *i < items.len()).collect();
    dragged.sort_unstable();
    dragged.dedup();
    let (&first, &last) = (dragged.first()?, dragged.last()?);
    let insertion = insertion.min(items.len());
    if (first..=last + 1).contains(&insertion) {
        return None;
    }

    let mut moved: Vec<Value> = dragged.iter().rev().map(|index| items.remove(*index)).collect();
    moved.reverse();

    let shift = dragged.iter().filter(|i| **i < insertion).count();
    let target = insertion - shift;
    let count = moved.len();
    items.splice(target..target, moved);

    Some((target..target + count).collect())
}

/// Remove the selected elements; nothing stays selected
pub fn delete(items: &mut Vec<Value>, selection: &Selection) -> Selection {
    for index in selection.iter().rev() {
        if *index < items.len() {
            items.remove(*index);
        }
    }
    Selection::new()
}

/// Insert a copy right after each selected element; the copies become the selection
pub fn duplicate(items: &mut Vec<Value>, selection: &Selection) -> Selection {
    let valid: Vec<usize> = selection.iter().copied().filter(|i| *i < items.len()).collect();
    for index in valid.iter().rev() {
        let copy = items[*index].clone();
        items.insert(index + 1, copy);
    }
    valid.iter().enumerate().map(|(earlier, index)| index + earlier + 1).collect()
}

pub fn clear(items: &mut Vec<Value>) -> Selection {
    items.clear();
    Selection::new()
}

/// Drop null references
pub fn remove_nulls(items: &mut Vec<Value>, selection: &Selection) -> Selection {
    retain_indexed(items, selection, |_, value, _| !value.is_null_reference())
}

/// Drop every element equal to an earlier one
pub fn remove_duplicates(items: &mut Vec<Value>, selection: &Selection) -> Selection {
    retain_indexed(items, selection, |index, value, all| !all[..index].contains(value))
}

fn retain_indexed<F>(items: &mut Vec<Value>, selection: &Selection, keep: F) -> Selection
where
    F: Fn(usize, &Value, &[Value]) -> bool,
{
    let all: &[Value] = items;
    let origins: Vec<usize> = (0..all.len()).filter(|i| keep(*i, &all[*i], all)).collect();
    for index in (0..items.len()).rev() {
        if !origins.contains(&index) {
            items.remove(index);
        }
    }
    remap(&origins, selection)
}

pub fn reverse(items: &mut [Value], selection: &Selection) -> Selection {
    items.reverse();
    let len = items.len();
    selection.iter().filter(|i| **i < len).map(|i| len - 1 - i).collect()
}

/// Stable sort; selected elements stay selected at their new positions
pub fn sort(items: &mut Vec<Value>, strategy: SortStrategy, selection: &Selection) -> Selection {
    let mut order: Vec<usize> = (0..items.len()).collect();
    order.sort_by(|a, b| strategy.compare(&items[*a], &items[*b]));

    let mut taken: Vec<Option<Value>> = items.drain(..).map(Some).collect();
    items.extend(order.iter().filter_map(|i| taken[*i].take()));
    remap(&order, selection)
}

/// Append `value`; it becomes the selection
pub fn add(items: &mut Vec<Value>, value: Value) -> Selection {
    items.push(value);
    Selection::from([items.len() - 1])
}
