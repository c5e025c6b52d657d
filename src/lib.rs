#![forbid(unsafe_code)]

// Closures hold an `Arc` to the frame they were created in, and a frame that
// binds a closure holds the closure, so a `def!`'d function keeps its own
// frame alive. Those cycles are never collected; for a REPL-lifetime global
// environment that doesn't matter, but a host creating many short-lived
// environments will see them accumulate. `eval` and `load-file` only hold a
// weak handle to the environment they were installed into, so an environment
// with no user definitions is freed normally.

mod builtins;
pub mod collections;
pub mod env;
pub use crate::env::LispEnv;
pub mod error;
pub use crate::error::{LispError, Result};
pub mod eval;
pub use crate::eval::{apply, eval, eval_str, expand_macros};
pub mod parser;
pub use crate::parser::LispParser;
mod printer;
pub mod seq;
pub use crate::seq::LispSeq;
pub mod specials;
pub mod value;
pub use crate::value::{LispFunc, LispSymbol, LispValue};
