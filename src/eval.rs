use im::Vector;
use tracing::trace;

use crate::parser::LispParser;
use crate::specials::{eval_special, LispSpecialForm, Step};
use crate::value::{FuncKind, LispFunc};
use crate::{LispEnv, LispError, LispValue, Result};

/// Evaluates every element of a non-applicable value; symbols resolve in `env`.
fn eval_ast(ast: LispValue, env: &LispEnv) -> Result<LispValue> {
    match ast {
        LispValue::Symbol(s) => env.get(s.name()),
        LispValue::Vector(v) => {
            let items = v
                .iter()
                .map(|x| eval(x.clone(), env))
                .collect::<Result<Vector<_>>>()?;
            Ok(LispValue::Vector(items.into()))
        }
        LispValue::Map(m) => {
            let entries = m
                .iter()
                .map(|(k, v)| Ok((eval(k.clone(), env)?, eval(v.clone(), env)?)))
                .collect::<Result<Vec<_>>>()?;
            Ok(LispValue::map_from(entries))
        }
        x => Ok(x),
    }
}

/// The macro named by the head of `ast`, along with its unevaluated operands.
fn macro_call(ast: &LispValue, env: &LispEnv) -> Option<(LispFunc, Vector<LispValue>)> {
    let (LispValue::Symbol(head), tail) = ast.split_applicable()? else {
        return None;
    };
    match env.lookup(head.name())? {
        LispValue::Func(f) if f.is_macro() => Some(((*f).clone(), tail.to_items().ok()?)),
        _ => None,
    }
}

/// Repeatedly expands `ast` while its head names a macro.
pub fn expand_macros(ast: LispValue, env: &LispEnv) -> Result<LispValue> {
    let mut ast = ast;
    while let Some((mac, args)) = macro_call(&ast, env) {
        trace!(form = %ast.inspect(), "expanding macro");
        ast = apply_func(&mac, args)?;
    }
    Ok(ast)
}

/// Calls `f` with already-evaluated arguments.
pub fn apply(f: &LispValue, args: Vector<LispValue>) -> Result<LispValue> {
    match f {
        LispValue::Func(func) => apply_func(func, args),
        x => Err(LispError::NotApplicable(x.type_of())),
    }
}

pub(crate) fn apply_func(func: &LispFunc, args: Vector<LispValue>) -> Result<LispValue> {
    match &func.kind {
        FuncKind::Native { f, .. } => f(args),
        FuncKind::Closure { params, body, env } => {
            let fn_env = env.derive(params, args)?;
            eval(body.clone(), &fn_env)
        }
    }
}

/// Evaluates `ast` in `env`.
///
/// Tail positions (`if` branches, the last form of `do`, `let*` and
/// `try*`/`catch*` bodies, and closure bodies) are evaluated by looping with
/// a new form and environment rather than by recursing, so tail-recursive
/// programs run in constant host stack.
pub fn eval(ast: LispValue, env: &LispEnv) -> Result<LispValue> {
    let mut ast = ast;
    let mut env = env.clone();
    loop {
        if !ast.is_applicable() {
            return eval_ast(ast, &env);
        }
        ast = expand_macros(ast, &env)?;
        let Some((head, tail)) = ast.split_applicable() else {
            return eval_ast(ast, &env);
        };
        let args = tail.to_items()?;

        if let LispValue::Symbol(s) = &head {
            if let Some(form) = LispSpecialForm::lookup(s.name()) {
                match eval_special(form, args, &env)? {
                    Step::Done(val) => return Ok(val),
                    Step::Continue(next) => ast = next,
                    Step::ContinueIn(next, next_env) => {
                        ast = next;
                        env = next_env;
                    }
                }
                continue;
            }
        }

        // every operand runs before the head is checked
        let head = eval(head, &env)?;
        let args = args
            .into_iter()
            .map(|x| eval(x, &env))
            .collect::<Result<Vector<_>>>()?;
        let func = match head {
            LispValue::Func(func) => func,
            x => return Err(LispError::NotApplicable(x.type_of())),
        };
        match &func.kind {
            FuncKind::Native { f, .. } => return f(args),
            FuncKind::Closure { params, body, env: captured } => {
                env = captured.derive(params, args)?;
                ast = body.clone();
            }
        }
    }
}

/// Reads and evaluates every form in `input`, returning the last result
/// (`nil` when there are no forms).
pub fn eval_str(input: &str, env: &LispEnv) -> Result<LispValue> {
    let mut parser = LispParser::new();
    parser.add_tokenize(input);
    let mut last = LispValue::Nil;
    for form in parser {
        last = eval(form?, env)?;
    }
    Ok(last)
}
