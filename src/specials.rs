use im::{vector, Vector};
use phf::phf_map;

use crate::error::assert_or_err;
use crate::eval::{eval, expand_macros};
use crate::value::LispFunc;
use crate::{LispEnv, LispError, LispValue, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LispSpecialForm {
    Def,
    Defmacro,
    Let,
    Do,
    If,
    Fn,
    Quote,
    Quasiquote,
    Unquote,
    SpliceUnquote,
    Macroexpand,
    Try,
    Catch,
}

static SPECIAL_FORMS: phf::Map<&'static str, LispSpecialForm> = phf_map! {
    "def!" => LispSpecialForm::Def,
    "defmacro!" => LispSpecialForm::Defmacro,
    "let*" => LispSpecialForm::Let,
    "do" => LispSpecialForm::Do,
    "if" => LispSpecialForm::If,
    "fn*" => LispSpecialForm::Fn,
    "quote" => LispSpecialForm::Quote,
    "quasiquote" => LispSpecialForm::Quasiquote,
    "unquote" => LispSpecialForm::Unquote,
    "splice-unquote" => LispSpecialForm::SpliceUnquote,
    "macroexpand" => LispSpecialForm::Macroexpand,
    "try*" => LispSpecialForm::Try,
    "catch*" => LispSpecialForm::Catch,
};

impl LispSpecialForm {
    pub fn lookup(name: &str) -> Option<LispSpecialForm> {
        SPECIAL_FORMS.get(name).copied()
    }
}

/// What the evaluator loop does after a special form has run.
pub(crate) enum Step {
    Done(LispValue),
    /// Evaluate this form next, in the same environment.
    Continue(LispValue),
    ContinueIn(LispValue, LispEnv),
}

fn binding_forms(val: LispValue) -> Result<Vector<LispValue>> {
    match val {
        LispValue::List(l) => Ok(l.items().clone()),
        LispValue::Vector(v) => Ok(v.items().clone()),
        x => Err(LispError::InvalidDataType("list or vector", x.type_of())),
    }
}

pub(crate) fn eval_special(
    form: LispSpecialForm,
    mut args: Vector<LispValue>,
    env: &LispEnv,
) -> Result<Step> {
    let argc = args.len();
    match form {
        LispSpecialForm::Def => {
            assert_or_err!(argc == 2, LispError::IncorrectArguments(2, argc));
            let name = args[0].expect_symbol()?;
            let val = eval(args[1].clone(), env)?;
            env.set(name.name(), val.clone());
            Ok(Step::Done(val))
        }
        LispSpecialForm::Defmacro => {
            assert_or_err!(argc == 2, LispError::IncorrectArguments(2, argc));
            let name = args[0].expect_symbol()?;
            let val = match eval(args[1].clone(), env)? {
                LispValue::Func(f) => LispValue::func(f.to_macro()?),
                _ => return Err(LispError::NotAMacro),
            };
            env.set(name.name(), val.clone());
            Ok(Step::Done(val))
        }
        LispSpecialForm::Let => {
            assert_or_err!(argc == 2, LispError::IncorrectArguments(2, argc));
            let bindings = binding_forms(args[0].clone())?;
            assert_or_err!(bindings.len() % 2 == 0, LispError::MissingBinding);
            // one frame per binding, so each initializer sees the ones before it
            let mut inner = env.new_nested();
            let mut bindings = bindings.into_iter();
            while let (Some(name), Some(expr)) = (bindings.next(), bindings.next()) {
                let name = name.expect_symbol()?;
                let val = eval(expr, &inner)?;
                inner = inner.derive(&[name], vector![val])?;
            }
            Ok(Step::ContinueIn(args[1].clone(), inner))
        }
        LispSpecialForm::Do => {
            let Some(last) = args.pop_back() else {
                return Ok(Step::Done(LispValue::Nil));
            };
            for form in args {
                eval(form, env)?;
            }
            Ok(Step::Continue(last))
        }
        LispSpecialForm::If => {
            assert_or_err!(
                argc == 2 || argc == 3,
                LispError::IncorrectArguments(2, argc)
            );
            let cond = eval(args[0].clone(), env)?;
            if cond.truthiness() {
                Ok(Step::Continue(args[1].clone()))
            } else if argc == 3 {
                Ok(Step::Continue(args[2].clone()))
            } else {
                Ok(Step::Done(LispValue::Nil))
            }
        }
        LispSpecialForm::Fn => {
            assert_or_err!(argc == 2, LispError::IncorrectArguments(2, argc));
            let params = binding_forms(args[0].clone())?
                .iter()
                .map(LispValue::expect_symbol)
                .collect::<Result<Vec<_>>>()?;
            let func = LispFunc::closure(params, args[1].clone(), env.clone());
            Ok(Step::Done(LispValue::func(func)))
        }
        LispSpecialForm::Quote => {
            assert_or_err!(argc == 1, LispError::IncorrectArguments(1, argc));
            Ok(Step::Done(args[0].clone()))
        }
        LispSpecialForm::Quasiquote => {
            assert_or_err!(argc == 1, LispError::IncorrectArguments(1, argc));
            Ok(Step::Continue(quasiquote(args[0].clone())?))
        }
        // rewritten away by `quasiquote` before evaluation
        LispSpecialForm::Unquote | LispSpecialForm::SpliceUnquote => {
            Err(LispError::OnlyInQuasiquote)
        }
        LispSpecialForm::Macroexpand => {
            assert_or_err!(argc == 1, LispError::IncorrectArguments(1, argc));
            Ok(Step::Done(expand_macros(args[0].clone(), env)?))
        }
        LispSpecialForm::Try => {
            assert_or_err!(
                argc == 1 || argc == 2,
                LispError::IncorrectArguments(2, argc)
            );
            let handler = match args.get(1) {
                Some(clause) => Some(catch_clause(clause)?),
                None => None,
            };
            match (eval(args[0].clone(), env), handler) {
                (Ok(val), _) => Ok(Step::Done(val)),
                (Err(err), None) => Err(err),
                (Err(err), Some((name, body))) => {
                    let caught_env = env.derive(&[name], vector![err.into_reason()])?;
                    Ok(Step::ContinueIn(body, caught_env))
                }
            }
        }
        LispSpecialForm::Catch => Err(LispError::OnlyInTry),
    }
}

/// Splits `(catch* name body)` into its binding and body.
fn catch_clause(clause: &LispValue) -> Result<(crate::value::LispSymbol, LispValue)> {
    let LispValue::List(l) = clause else {
        return Err(LispError::TryNoCatch);
    };
    let is_catch = matches!(l.first(), Some(LispValue::Symbol(s)) if s.name() == "catch*");
    assert_or_err!(is_catch, LispError::TryNoCatch);
    assert_or_err!(
        l.len() == 3,
        LispError::IncorrectArguments(2, l.len() - 1)
    );
    let name = l.items()[1].expect_symbol()?;
    Ok((name, l.items()[2].clone()))
}

fn is_symbol(val: &LispValue, name: &str) -> bool {
    matches!(val, LispValue::Symbol(s) if s.name() == name)
}

fn only_operand(tail: LispValue) -> Result<LispValue> {
    let items = tail.to_items()?;
    assert_or_err!(
        items.len() == 1,
        LispError::IncorrectArguments(1, items.len())
    );
    Ok(items[0].clone())
}

/// Rewrites a quasiquote template into `cons`/`concat`/`quote` calls that
/// rebuild it with the unquoted holes filled in.
pub(crate) fn quasiquote(template: LispValue) -> Result<LispValue> {
    let Some((head, tail)) = template.split_applicable() else {
        return Ok(LispValue::list_from([LispValue::symbol("quote"), template]));
    };
    if is_symbol(&head, "unquote") {
        return only_operand(tail);
    }
    if let Some((inner_head, inner_tail)) = head.split_applicable() {
        if is_symbol(&inner_head, "splice-unquote") {
            return Ok(LispValue::list_from([
                LispValue::symbol("concat"),
                only_operand(inner_tail)?,
                quasiquote(tail)?,
            ]));
        }
    }
    Ok(LispValue::list_from([
        LispValue::symbol("cons"),
        quasiquote(head)?,
        quasiquote(tail)?,
    ]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn special_form_table() {
        assert_eq!(LispSpecialForm::lookup("let*"), Some(LispSpecialForm::Let));
        assert_eq!(LispSpecialForm::lookup("try*"), Some(LispSpecialForm::Try));
        assert_eq!(LispSpecialForm::lookup("let"), None);
    }

    #[test]
    fn quasiquote_rewrite() {
        let template = LispValue::list_from([
            1.into(),
            LispValue::list_from([LispValue::symbol("unquote"), LispValue::symbol("x")]),
        ]);
        let expected = LispValue::list_from([
            LispValue::symbol("cons"),
            LispValue::list_from([LispValue::symbol("quote"), 1.into()]),
            LispValue::list_from([
                LispValue::symbol("cons"),
                LispValue::symbol("x"),
                LispValue::list_from([LispValue::symbol("quote"), LispValue::list_from([])]),
            ]),
        ]);
        assert_eq!(quasiquote(template).unwrap(), expected);
    }

    #[test]
    fn quasiquote_splice() {
        let template = LispValue::list_from([LispValue::list_from([
            LispValue::symbol("splice-unquote"),
            LispValue::symbol("xs"),
        ])]);
        let expected = LispValue::list_from([
            LispValue::symbol("concat"),
            LispValue::symbol("xs"),
            LispValue::list_from([LispValue::symbol("quote"), LispValue::list_from([])]),
        ]);
        assert_eq!(quasiquote(template).unwrap(), expected);
    }

    #[test]
    fn quasiquote_leaves_vectors_whole() {
        let v = LispValue::vector_from([LispValue::symbol("a")]);
        assert_eq!(
            quasiquote(v.clone()).unwrap(),
            LispValue::list_from([LispValue::symbol("quote"), v])
        );
    }
}
