//! Lazy, restartable traversals.
//!
//! A [`LispSeq`] never mutates a cursor: [`LispSeq::next`] hands back the head
//! together with a new sequence for the tail, so any intermediate sequence can
//! be walked again from where it was taken.

use std::sync::Arc;

use im::Vector;

use crate::value::{Conjable, HasMetadata, MetaMap, Seqable, Sequential};
use crate::{LispValue, Result};

#[derive(Clone, Debug)]
enum SeqNode {
    Empty,
    Items(Vector<LispValue>),
    Chars {
        text: Arc<str>,
        offset: usize,
    },
    Cons(Arc<(LispValue, LispSeq)>),
    Range {
        next: i64,
        upper: Option<i64>,
        step: i64,
    },
    // every member is non-empty and there are at least two of them
    Concat(Vector<LispSeq>),
}

#[derive(Clone, Debug)]
pub struct LispSeq {
    node: SeqNode,
    meta: Option<MetaMap>,
}

impl LispSeq {
    fn with_node(node: SeqNode) -> Self {
        LispSeq { node, meta: None }
    }

    pub fn empty() -> Self {
        Self::with_node(SeqNode::Empty)
    }

    /// One-character strings over `text`, by Unicode scalar value.
    pub fn chars(text: &str) -> Self {
        Self::with_node(SeqNode::Chars {
            text: Arc::from(text),
            offset: 0,
        })
    }

    pub fn cons(head: LispValue, tail: LispSeq) -> Self {
        Self::with_node(SeqNode::Cons(Arc::new((head, tail))))
    }

    /// Integers from `lower` stepping by `step`, stopping before `upper` if
    /// one is given. A zero step never terminates.
    pub fn range(lower: i64, upper: Option<i64>, step: i64) -> Self {
        Self::with_node(SeqNode::Range {
            next: lower,
            upper,
            step,
        })
    }

    /// Lazily joins `seqs` end to end, skipping the empty ones. Members that
    /// are themselves joins are spliced in, so nesting never grows.
    pub fn concat<I: IntoIterator<Item = LispSeq>>(seqs: I) -> Self {
        let mut members = Vector::new();
        for seq in seqs {
            match &seq.node {
                SeqNode::Concat(inner) => members.append(inner.clone()),
                _ if seq.is_empty() => (),
                _ => members.push_back(seq),
            }
        }
        Self::joined(members)
    }

    fn joined(mut members: Vector<LispSeq>) -> Self {
        match members.len() {
            0 => Self::empty(),
            1 => members.pop_front().unwrap_or_else(Self::empty),
            _ => Self::with_node(SeqNode::Concat(members)),
        }
    }

    /// The head and the sequence of everything after it, or `None` when exhausted.
    pub fn next(&self) -> Option<(LispValue, LispSeq)> {
        match &self.node {
            SeqNode::Empty => None,
            SeqNode::Items(items) => {
                let head = items.front()?.clone();
                let tail = Self::with_node(SeqNode::Items(items.skip(1)));
                Some((head, tail))
            }
            SeqNode::Chars { text, offset } => {
                let c = text.get(*offset..)?.chars().next()?;
                let tail = Self::with_node(SeqNode::Chars {
                    text: text.clone(),
                    offset: offset + c.len_utf8(),
                });
                Some((LispValue::String(c.to_string()), tail))
            }
            SeqNode::Cons(cell) => Some((cell.0.clone(), cell.1.clone())),
            SeqNode::Range { next, upper, step } => {
                if range_done(*next, *upper, *step) {
                    return None;
                }
                // stepping past the integer range ends the sequence
                let tail = match next.checked_add(*step) {
                    Some(after) => Self::with_node(SeqNode::Range {
                        next: after,
                        upper: *upper,
                        step: *step,
                    }),
                    None => Self::empty(),
                };
                Some((LispValue::Integer(*next), tail))
            }
            SeqNode::Concat(members) => {
                let (head, first_tail) = members.front()?.next()?;
                let mut members = members.skip(1);
                match &first_tail.node {
                    SeqNode::Concat(inner) => {
                        let mut front = inner.clone();
                        front.append(members);
                        members = front;
                    }
                    _ if first_tail.is_empty() => (),
                    _ => members.push_front(first_tail),
                }
                Some((head, Self::joined(members)))
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        match &self.node {
            SeqNode::Empty => true,
            SeqNode::Items(items) => items.is_empty(),
            SeqNode::Chars { text, offset } => *offset >= text.len(),
            SeqNode::Cons(_) | SeqNode::Concat(_) => false,
            SeqNode::Range { next, upper, step } => range_done(*next, *upper, *step),
        }
    }

    /// Whether a full traversal terminates.
    pub fn is_bounded(&self) -> bool {
        let mut pending = vec![self];
        while let Some(seq) = pending.pop() {
            match &seq.node {
                SeqNode::Range { next, upper, step } => {
                    let bounded = match upper {
                        _ if range_done(*next, *upper, *step) => true,
                        Some(upper) => (*step > 0 && upper > next) || (*step < 0 && upper < next),
                        None => false,
                    };
                    if !bounded {
                        return false;
                    }
                }
                SeqNode::Cons(cell) => pending.push(&cell.1),
                SeqNode::Concat(members) => pending.extend(members.iter()),
                _ => (),
            }
        }
        true
    }

    /// Whether a form with this shape is evaluated as an application.
    pub fn is_applicable(&self) -> bool {
        match &self.node {
            SeqNode::Items(items) => !items.is_empty(),
            SeqNode::Cons(_) | SeqNode::Concat(_) => self.is_bounded(),
            _ => false,
        }
    }

    pub fn first(&self) -> LispValue {
        self.next().map(|(head, _)| head).unwrap_or_default()
    }

    pub fn rest(&self) -> LispSeq {
        self.next().map(|(_, tail)| tail).unwrap_or_else(Self::empty)
    }

    /// Element count, or an error for sequences that never end.
    pub fn count(&self) -> Result<usize> {
        crate::value::assert_bounded(self)?;
        match &self.node {
            SeqNode::Items(items) => Ok(items.len()),
            _ => Ok(self.iter().count()),
        }
    }

    pub fn iter(&self) -> SeqIter {
        SeqIter(self.clone())
    }
}

fn range_done(next: i64, upper: Option<i64>, step: i64) -> bool {
    match upper {
        Some(upper) if step >= 0 => next >= upper,
        Some(upper) => next <= upper,
        None => false,
    }
}

// Long cons chains would otherwise be released one native frame per cell.
impl Drop for LispSeq {
    fn drop(&mut self) {
        let mut node = std::mem::replace(&mut self.node, SeqNode::Empty);
        while let SeqNode::Cons(cell) = node {
            node = match Arc::try_unwrap(cell) {
                Ok((_, mut tail)) => std::mem::replace(&mut tail.node, SeqNode::Empty),
                Err(_) => break,
            };
        }
    }
}

impl From<Vector<LispValue>> for LispSeq {
    fn from(items: Vector<LispValue>) -> Self {
        LispSeq::with_node(SeqNode::Items(items))
    }
}

impl Seqable for LispSeq {
    fn seq(&self) -> LispSeq {
        self.clone()
    }
}
impl Sequential for LispSeq {}

impl Conjable for LispSeq {
    fn conj(&self, val: LispValue) -> Result<LispValue> {
        Ok(LispValue::Seq(LispSeq::cons(val, self.clone())))
    }
}

impl HasMetadata for LispSeq {
    fn meta(&self) -> Option<&MetaMap> {
        self.meta.as_ref()
    }
    fn with_meta(&self, meta: Option<MetaMap>) -> Self {
        LispSeq {
            node: self.node.clone(),
            meta,
        }
    }
}

pub struct SeqIter(LispSeq);

impl Iterator for SeqIter {
    type Item = LispValue;

    fn next(&mut self) -> Option<LispValue> {
        let (head, tail) = self.0.next()?;
        self.0 = tail;
        Some(head)
    }
}

impl IntoIterator for LispSeq {
    type Item = LispValue;
    type IntoIter = SeqIter;

    fn into_iter(self) -> SeqIter {
        SeqIter(self)
    }
}
