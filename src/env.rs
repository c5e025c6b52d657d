use std::sync::{Arc, Weak};

use dashmap::DashSet;
use im::{HashMap, Vector};
use once_cell::sync::Lazy;
use parking_lot::RwLock;

use crate::builtins;
use crate::value::{LispFunc, LispSymbol};
use crate::{LispError, LispValue, Result};

static SYMBOLS: Lazy<DashSet<Arc<str>>> = Lazy::new(DashSet::new);

/// The shared name for `name`; equal names intern to the same allocation.
pub fn intern(name: &str) -> Arc<str> {
    if let Some(existing) = SYMBOLS.get(name) {
        return existing.key().clone();
    }
    let sym: Arc<str> = Arc::from(name);
    SYMBOLS.insert(sym.clone());
    sym
}

#[derive(Debug)]
struct InnerEnv {
    data: RwLock<HashMap<Arc<str>, LispValue>>,
    enclosing: Option<LispEnv>,
}

/// A frame of bindings plus its enclosing frame. Cloning is cheap and yields
/// a handle to the same frame.
#[derive(Clone, Debug)]
pub struct LispEnv(Arc<InnerEnv>);

/// Non-owning handle, for natives that need the environment they were
/// installed into without keeping it alive.
#[derive(Clone, Debug)]
pub(crate) struct WeakEnv(Weak<InnerEnv>);

impl WeakEnv {
    pub(crate) fn upgrade(&self) -> Option<LispEnv> {
        self.0.upgrade().map(LispEnv)
    }
}

impl LispEnv {
    fn with_data(data: HashMap<Arc<str>, LispValue>, enclosing: Option<LispEnv>) -> Self {
        LispEnv(Arc::new(InnerEnv {
            data: RwLock::new(data),
            enclosing,
        }))
    }

    /// A root frame with no bindings at all.
    pub fn new_empty() -> Self {
        Self::with_data(HashMap::new(), None)
    }

    #[cfg(feature = "io-stdlib")]
    pub fn new_stdlib() -> Self {
        let env = Self::new_empty();
        builtins::populate(&env);
        builtins::populate_io(&env);
        builtins::populate_prelude(&env);
        env
    }

    /// Standard library without the builtins that touch the filesystem or
    /// the terminal.
    pub fn new_stdlib_protected() -> Self {
        let env = Self::new_empty();
        builtins::populate(&env);
        builtins::populate_prelude(&env);
        env
    }

    pub fn new_nested(&self) -> Self {
        Self::with_data(HashMap::new(), Some(self.clone()))
    }

    /// A child frame binding `params` to `args`. When the second-to-last
    /// parameter is `&`, the last one gathers the remaining arguments into a
    /// list; a `&` anywhere else is an ordinary name. Missing arguments are an
    /// error; surplus ones are ignored.
    pub fn derive(&self, params: &[LispSymbol], args: Vector<LispValue>) -> Result<LispEnv> {
        let (fixed, rest) = match params {
            [fixed @ .., marker, rest] if marker.name() == "&" => (fixed, Some(rest)),
            _ => (params, None),
        };
        if args.len() < fixed.len() {
            return Err(LispError::IncorrectArguments(fixed.len(), args.len()));
        }

        let mut args = args;
        let mut data = HashMap::new();
        for param in fixed {
            // checked against `fixed.len()` above
            let arg = args.pop_front().unwrap_or_default();
            data.insert(param.interned(), arg);
        }
        if let Some(rest) = rest {
            data.insert(rest.interned(), LispValue::from(args));
        }
        Ok(Self::with_data(data, Some(self.clone())))
    }

    /// The root frame of this chain.
    pub fn global(&self) -> LispEnv {
        let mut env = self;
        while let Some(enclosing) = &env.0.enclosing {
            env = enclosing;
        }
        env.clone()
    }

    pub fn is_global(&self) -> bool {
        self.0.enclosing.is_none()
    }

    pub(crate) fn downgrade(&self) -> WeakEnv {
        WeakEnv(Arc::downgrade(&self.0))
    }

    /// Looks `name` up in this frame, then outward.
    pub fn lookup(&self, name: &str) -> Option<LispValue> {
        let mut env = Some(self);
        while let Some(inner) = env {
            if let Some(val) = inner.0.data.read().get(name) {
                return Some(val.clone());
            }
            env = inner.0.enclosing.as_ref();
        }
        None
    }

    pub fn get(&self, name: &str) -> Result<LispValue> {
        self.lookup(name)
            .ok_or_else(|| LispError::UndefinedVariable(name.to_owned()))
    }

    /// Binds `name` in this frame only; enclosing frames are never touched.
    pub fn set(&self, name: &str, val: LispValue) {
        self.0.data.write().insert(intern(name), val);
    }

    pub fn bind_func<F>(&self, name: &str, f: F)
    where
        F: Fn(Vector<LispValue>) -> Result<LispValue> + Send + Sync + 'static,
    {
        self.set(name, LispValue::func(LispFunc::native(name, f)));
    }

    pub fn ptr_eq(&self, other: &LispEnv) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

cfg_if::cfg_if! {
    if #[cfg(feature = "io-stdlib")] {
        impl Default for LispEnv {
            fn default() -> Self {
                Self::new_stdlib()
            }
        }
    } else {
        impl Default for LispEnv {
            fn default() -> Self {
                Self::new_stdlib_protected()
            }
        }
    }
}
