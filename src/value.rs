use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use by_address::ByAddress;
use derivative::Derivative;
use im::{HashMap, Vector};
use parking_lot::RwLock;

use crate::collections::{LispList, LispMap, LispVector};
use crate::env::{intern, LispEnv};
use crate::seq::LispSeq;
use crate::{LispError, Result};

/// Metadata attached to collections, symbols and functions.
pub type MetaMap = HashMap<LispValue, LispValue>;

/// Host operation backing a native function.
pub type NativeFn = Arc<dyn Fn(Vector<LispValue>) -> Result<LispValue> + Send + Sync>;

/// Collections that produce a sequence over their contents.
pub trait Seqable {
    fn seq(&self) -> LispSeq;
}

/// Seqables whose traversal order is meaningful (and which compare element-wise).
pub trait Sequential: Seqable {}

/// Collections that support lookup by key (or by index).
pub trait Indexed {
    fn lookup(&self, key: &LispValue) -> Option<LispValue>;
}

/// Collections that can have a value conjoined at their natural end.
pub trait Conjable {
    fn conj(&self, value: LispValue) -> Result<LispValue>;
}

pub trait HasMetadata: Sized {
    fn meta(&self) -> Option<&MetaMap>;
    fn with_meta(&self, meta: Option<MetaMap>) -> Self;
}

#[derive(Clone, Debug)]
pub struct LispSymbol {
    name: Arc<str>,
    meta: Option<MetaMap>,
}

impl LispSymbol {
    pub fn new(name: &str) -> Self {
        LispSymbol {
            name: intern(name),
            meta: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn interned(&self) -> Arc<str> {
        self.name.clone()
    }
}

impl PartialEq for LispSymbol {
    fn eq(&self, other: &LispSymbol) -> bool {
        Arc::ptr_eq(&self.name, &other.name) || self.name == other.name
    }
}
impl Eq for LispSymbol {}

impl HasMetadata for LispSymbol {
    fn meta(&self) -> Option<&MetaMap> {
        self.meta.as_ref()
    }
    fn with_meta(&self, meta: Option<MetaMap>) -> Self {
        LispSymbol {
            name: self.name.clone(),
            meta,
        }
    }
}

/// The one mutable value: a shared slot compared by identity.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct LispAtom(ByAddress<Arc<RwLock<LispValue>>>);

impl LispAtom {
    pub fn new(val: LispValue) -> Self {
        LispAtom(ByAddress(Arc::new(RwLock::new(val))))
    }

    pub fn deref(&self) -> LispValue {
        self.0.read().clone()
    }

    pub fn reset(&self, val: LispValue) -> LispValue {
        *self.0.write() = val.clone();
        val
    }

    /// Replace the held value with `f(current)`. The lock is not held while
    /// `f` runs, so `f` may itself read the atom.
    pub fn swap<F>(&self, f: F) -> Result<LispValue>
    where
        F: FnOnce(LispValue) -> Result<LispValue>,
    {
        let current = self.deref();
        let new_val = f(current)?;
        Ok(self.reset(new_val))
    }
}

#[derive(Clone, Derivative)]
#[derivative(Debug)]
pub enum FuncKind {
    Native {
        name: Arc<str>,
        #[derivative(Debug = "ignore")]
        f: NativeFn,
    },
    Closure {
        params: Vec<LispSymbol>,
        body: LispValue,
        // the captured frame may contain this very function
        #[derivative(Debug = "ignore")]
        env: LispEnv,
    },
}

#[derive(Clone, Debug)]
pub struct LispFunc {
    pub(crate) kind: FuncKind,
    pub(crate) is_macro: bool,
    pub(crate) meta: Option<MetaMap>,
}

impl LispFunc {
    pub fn native<F>(name: &str, f: F) -> Self
    where
        F: Fn(Vector<LispValue>) -> Result<LispValue> + Send + Sync + 'static,
    {
        LispFunc {
            kind: FuncKind::Native {
                name: Arc::from(name),
                f: Arc::new(f),
            },
            is_macro: false,
            meta: None,
        }
    }

    pub fn closure(params: Vec<LispSymbol>, body: LispValue, env: LispEnv) -> Self {
        LispFunc {
            kind: FuncKind::Closure { params, body, env },
            is_macro: false,
            meta: None,
        }
    }

    pub fn is_macro(&self) -> bool {
        self.is_macro
    }

    pub fn is_native(&self) -> bool {
        matches!(self.kind, FuncKind::Native { .. })
    }

    /// A copy of this closure flagged as a macro; native functions cannot be macros.
    pub fn to_macro(&self) -> Result<LispFunc> {
        match self.kind {
            FuncKind::Closure { .. } => Ok(LispFunc {
                kind: self.kind.clone(),
                is_macro: true,
                meta: self.meta.clone(),
            }),
            FuncKind::Native { .. } => Err(LispError::NotAMacro),
        }
    }
}

impl HasMetadata for LispFunc {
    fn meta(&self) -> Option<&MetaMap> {
        self.meta.as_ref()
    }
    fn with_meta(&self, meta: Option<MetaMap>) -> Self {
        LispFunc {
            kind: self.kind.clone(),
            is_macro: self.is_macro,
            meta,
        }
    }
}

#[derive(Clone, Debug)]
pub enum LispValue {
    Nil,
    Bool(bool),
    Integer(i64),
    String(String),
    Symbol(LispSymbol),
    Keyword(Arc<str>),
    List(LispList),
    Vector(LispVector),
    Map(LispMap),
    Seq(LispSeq),
    Func(Arc<LispFunc>),
    Atom(LispAtom),
    Error(Arc<LispError>),
}

impl LispValue {
    pub const fn nil() -> Self {
        LispValue::Nil
    }

    pub fn symbol(name: &str) -> Self {
        LispValue::Symbol(LispSymbol::new(name))
    }

    pub fn keyword(name: &str) -> Self {
        LispValue::Keyword(Arc::from(name))
    }

    pub fn error(err: LispError) -> Self {
        LispValue::Error(Arc::new(err))
    }

    pub fn atom(val: LispValue) -> Self {
        LispValue::Atom(LispAtom::new(val))
    }

    pub fn list_from<I: IntoIterator<Item = LispValue>>(items: I) -> Self {
        LispValue::List(items.into_iter().collect())
    }

    pub fn vector_from<I: IntoIterator<Item = LispValue>>(items: I) -> Self {
        LispValue::Vector(items.into_iter().collect())
    }

    pub fn map_from<I: IntoIterator<Item = (LispValue, LispValue)>>(entries: I) -> Self {
        LispValue::Map(entries.into_iter().collect())
    }

    pub fn func(f: LispFunc) -> Self {
        LispValue::Func(Arc::new(f))
    }

    pub fn type_of(&self) -> &'static str {
        match self {
            LispValue::Nil => "nil",
            LispValue::Bool(_) => "bool",
            LispValue::Integer(_) => "integer",
            LispValue::String(_) => "string",
            LispValue::Symbol(_) => "symbol",
            LispValue::Keyword(_) => "keyword",
            LispValue::List(_) => "list",
            LispValue::Vector(_) => "vector",
            LispValue::Map(_) => "map",
            LispValue::Seq(_) => "seq",
            LispValue::Func(f) if f.is_macro => "macro",
            LispValue::Func(_) => "function",
            LispValue::Atom(_) => "atom",
            LispValue::Error(_) => "error",
        }
    }

    /// Only `nil` and `false` are falsy.
    pub fn truthiness(&self) -> bool {
        !matches!(self, LispValue::Nil | LispValue::Bool(false))
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, LispValue::Nil)
    }

    pub fn is_sequential(&self) -> bool {
        matches!(
            self,
            LispValue::List(_) | LispValue::Vector(_) | LispValue::Seq(_)
        )
    }

    /// Whether evaluating this value means applying its head to its tail.
    pub fn is_applicable(&self) -> bool {
        match self {
            LispValue::List(l) => !l.is_empty(),
            LispValue::Seq(s) => s.is_applicable(),
            _ => false,
        }
    }

    /// The head and remaining elements of a non-empty applicable form.
    pub fn split_applicable(&self) -> Option<(LispValue, LispValue)> {
        match self {
            LispValue::List(l) => {
                let head = l.first()?;
                Some((head, LispValue::List(l.rest())))
            }
            LispValue::Seq(s) if s.is_applicable() => {
                let (head, tail) = s.next()?;
                Some((head, LispValue::Seq(tail)))
            }
            _ => None,
        }
    }

    /// All elements of a bounded sequential or seqable value.
    pub fn to_items(&self) -> Result<Vector<LispValue>> {
        match self {
            LispValue::List(l) => Ok(l.items().clone()),
            LispValue::Vector(v) => Ok(v.items().clone()),
            x => {
                let seq = x.seq()?;
                assert_bounded(&seq)?;
                Ok(seq.iter().collect())
            }
        }
    }

    /// A traversal of this value, if it is seqable. `nil` seqs as empty.
    pub fn seq(&self) -> Result<LispSeq> {
        match self {
            LispValue::Nil => Ok(LispSeq::empty()),
            LispValue::List(l) => Ok(l.seq()),
            LispValue::Vector(v) => Ok(v.seq()),
            LispValue::Map(m) => Ok(m.seq()),
            LispValue::Seq(s) => Ok(s.clone()),
            LispValue::String(s) => Ok(LispSeq::chars(s)),
            x => Err(LispError::InvalidDataType("seqable", x.type_of())),
        }
    }

    pub fn lookup(&self, key: &LispValue) -> Option<LispValue> {
        match self {
            LispValue::Map(m) => m.lookup(key),
            LispValue::Vector(v) => v.lookup(key),
            _ => None,
        }
    }

    pub fn conj(&self, val: LispValue) -> Result<LispValue> {
        match self {
            LispValue::Nil => Ok(LispValue::list_from([val])),
            LispValue::List(l) => l.conj(val),
            LispValue::Vector(v) => v.conj(val),
            LispValue::Map(m) => m.conj(val),
            LispValue::Seq(s) => s.conj(val),
            x => Err(LispError::InvalidDataType("collection", x.type_of())),
        }
    }

    /// Metadata as a value; `nil` when none is attached.
    pub fn meta(&self) -> Result<LispValue> {
        let meta = match self {
            LispValue::List(l) => l.meta(),
            LispValue::Vector(v) => v.meta(),
            LispValue::Map(m) => m.meta(),
            LispValue::Seq(s) => s.meta(),
            LispValue::Symbol(s) => s.meta(),
            LispValue::Func(f) => f.meta(),
            x => return Err(LispError::InvalidDataType("value with metadata", x.type_of())),
        };
        Ok(meta.cloned().map(LispValue::from).unwrap_or(LispValue::Nil))
    }

    pub fn with_meta(&self, meta: &LispValue) -> Result<LispValue> {
        let meta = match meta {
            LispValue::Nil => None,
            LispValue::Map(m) => Some(m.entries().clone()),
            x => return Err(LispError::InvalidDataType("map", x.type_of())),
        };
        Ok(match self {
            LispValue::List(l) => LispValue::List(l.with_meta(meta)),
            LispValue::Vector(v) => LispValue::Vector(v.with_meta(meta)),
            LispValue::Map(m) => LispValue::Map(m.with_meta(meta)),
            LispValue::Seq(s) => LispValue::Seq(s.with_meta(meta)),
            LispValue::Symbol(s) => LispValue::Symbol(s.with_meta(meta)),
            LispValue::Func(f) => LispValue::Func(Arc::new(f.with_meta(meta))),
            x => return Err(LispError::InvalidDataType("value with metadata", x.type_of())),
        })
    }

    pub fn expect_symbol(&self) -> Result<LispSymbol> {
        match self {
            LispValue::Symbol(s) => Ok(s.clone()),
            x => Err(LispError::InvalidDataType("symbol", x.type_of())),
        }
    }

    pub fn expect_integer(&self) -> Result<i64> {
        match self {
            LispValue::Integer(i) => Ok(*i),
            x => Err(LispError::InvalidDataType("integer", x.type_of())),
        }
    }

    pub fn expect_string(&self) -> Result<&str> {
        match self {
            LispValue::String(s) => Ok(s),
            x => Err(LispError::InvalidDataType("string", x.type_of())),
        }
    }

    pub fn expect_map(&self) -> Result<&LispMap> {
        match self {
            LispValue::Map(m) => Ok(m),
            x => Err(LispError::InvalidDataType("map", x.type_of())),
        }
    }

    pub fn expect_atom(&self) -> Result<&LispAtom> {
        match self {
            LispValue::Atom(a) => Ok(a),
            x => Err(LispError::InvalidDataType("atom", x.type_of())),
        }
    }

    pub fn expect_func(&self) -> Result<&Arc<LispFunc>> {
        match self {
            LispValue::Func(f) => Ok(f),
            x => Err(LispError::InvalidDataType("function", x.type_of())),
        }
    }

    /// Structural hash as a single number, stable across maps and runs.
    pub fn hash_code(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        hasher.finish()
    }
}

impl Default for LispValue {
    fn default() -> Self {
        LispValue::Nil
    }
}

pub(crate) fn assert_bounded(seq: &LispSeq) -> Result<()> {
    if seq.is_bounded() {
        Ok(())
    } else {
        Err(LispError::InfiniteSequence)
    }
}

impl From<i64> for LispValue {
    fn from(item: i64) -> Self {
        LispValue::Integer(item)
    }
}
impl From<bool> for LispValue {
    fn from(item: bool) -> Self {
        LispValue::Bool(item)
    }
}
impl From<String> for LispValue {
    fn from(item: String) -> Self {
        LispValue::String(item)
    }
}
impl From<&str> for LispValue {
    fn from(item: &str) -> Self {
        LispValue::String(item.to_owned())
    }
}
impl From<LispSymbol> for LispValue {
    fn from(item: LispSymbol) -> Self {
        LispValue::Symbol(item)
    }
}
impl From<Vector<LispValue>> for LispValue {
    fn from(item: Vector<LispValue>) -> Self {
        LispValue::List(LispList::from(item))
    }
}
impl From<MetaMap> for LispValue {
    fn from(item: MetaMap) -> Self {
        LispValue::Map(LispMap::from(item))
    }
}
impl From<LispSeq> for LispValue {
    fn from(item: LispSeq) -> Self {
        LispValue::Seq(item)
    }
}

fn sequential_eq(a: &LispValue, b: &LispValue) -> bool {
    let fast = match (a, b) {
        (LispValue::List(x), LispValue::List(y)) => Some((x.items(), y.items())),
        (LispValue::List(x), LispValue::Vector(y)) => Some((x.items(), y.items())),
        (LispValue::Vector(x), LispValue::List(y)) => Some((x.items(), y.items())),
        (LispValue::Vector(x), LispValue::Vector(y)) => Some((x.items(), y.items())),
        _ => None,
    };
    if let Some((x, y)) = fast {
        return x.len() == y.len() && x.iter().zip(y.iter()).all(|(x, y)| x == y);
    }
    let (Ok(mut xs), Ok(mut ys)) = (a.seq(), b.seq()) else {
        return false;
    };
    loop {
        match (xs.next(), ys.next()) {
            (None, None) => return true,
            (Some((x, x_tail)), Some((y, y_tail))) => {
                if x != y {
                    return false;
                }
                xs = x_tail;
                ys = y_tail;
            }
            _ => return false,
        }
    }
}

impl PartialEq for LispValue {
    fn eq(&self, other: &LispValue) -> bool {
        match (self, other) {
            (LispValue::Nil, LispValue::Nil) => true,
            (LispValue::Bool(a), LispValue::Bool(b)) => a == b,
            (LispValue::Integer(a), LispValue::Integer(b)) => a == b,
            (LispValue::String(a), LispValue::String(b)) => a == b,
            (LispValue::Symbol(a), LispValue::Symbol(b)) => a == b,
            (LispValue::Keyword(a), LispValue::Keyword(b)) => a == b,
            (LispValue::Map(a), LispValue::Map(b)) => a == b,
            (LispValue::Func(a), LispValue::Func(b)) => Arc::ptr_eq(a, b),
            (LispValue::Atom(a), LispValue::Atom(b)) => a == b,
            (LispValue::Error(a), LispValue::Error(b)) => {
                Arc::ptr_eq(a, b) || a.to_string() == b.to_string()
            }
            (a, b) if a.is_sequential() && b.is_sequential() => sequential_eq(a, b),
            _ => false,
        }
    }
}
impl Eq for LispValue {}

// Must stay in step with `PartialEq` above: every sequential kind hashes the
// same way, and map entries are combined independently of iteration order.
impl Hash for LispValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            LispValue::Nil => state.write_u8(0),
            LispValue::Bool(b) => {
                state.write_u8(1);
                b.hash(state)
            }
            LispValue::Integer(i) => {
                state.write_u8(2);
                i.hash(state)
            }
            LispValue::String(s) => {
                state.write_u8(b'"');
                s.hash(state)
            }
            LispValue::Symbol(s) => {
                state.write_u8(b'\'');
                s.name().hash(state)
            }
            LispValue::Keyword(k) => {
                state.write_u8(b':');
                k.hash(state)
            }
            LispValue::List(_) | LispValue::Vector(_) | LispValue::Seq(_) => {
                state.write_u8(b'(');
                // an unbounded sequence never compares equal, so its tag is enough
                if let Ok(items) = self.to_items() {
                    for item in items.iter() {
                        item.hash(state);
                    }
                    state.write_usize(items.len());
                }
            }
            LispValue::Map(m) => {
                state.write_u8(b'{');
                state.write_u64(m.content_hash());
                state.write_usize(m.len());
            }
            LispValue::Func(f) => {
                state.write_u8(b'#');
                std::ptr::hash(Arc::as_ptr(f), state)
            }
            LispValue::Atom(a) => {
                state.write_u8(b'@');
                a.hash(state)
            }
            LispValue::Error(e) => {
                state.write_u8(b'!');
                e.to_string().hash(state)
            }
        }
    }
}
