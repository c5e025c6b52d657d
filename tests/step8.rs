mod common;
use common::*;

fn basic_macros() -> LispEnv {
    let env = testing_env();
    eval!("(defmacro! one (fn* () 1))", &env);
    eval!("(defmacro! two (fn* () 2))", &env);
    eval!("(defmacro! unless (fn* (pred a b) `(if ~pred ~b ~a)))", &env);
    eval!(
        "(defmacro! unless2 (fn* (pred a b) (list 'if (list 'not pred) a b)))",
        &env
    );
    eval!("(defmacro! identity (fn* (x) x))", &env);
    env
}

#[test]
fn macros() {
    let env = basic_macros();
    eval_eq!("(one)", &env, 1);
    eval_eq!("(two)", &env, 2);
    eval_eq!("(unless false 7 8)", &env, 7);
    eval_eq!("(unless true 7 8)", &env, 8);
    eval_eq!("(unless2 false 7 8)", &env, 7);
    eval_eq!("(unless2 true 7 8)", &env, 8);
    eval_eq!("(let* (a 123) (identity a))", &env, 123);
}

#[test]
fn macroexpand() {
    let env = basic_macros();
    eval_eq!("(macroexpand (one))", &env, 1);
    assert_eq!(
        eval!("(macroexpand (unless PRED A B))", &env),
        parse("(if PRED B A)")
    );
    assert_eq!(
        eval!("(macroexpand (unless2 PRED A B))", &env),
        parse("(if (not PRED) A B)")
    );
    assert_eq!(
        eval!("(macroexpand (unless2 2 3 4))", &env),
        parse("(if (not 2) 3 4)")
    );
    assert_eq!(
        eval!("(let* (a 123) (macroexpand (identity a)))", &env),
        sym("a")
    );
    assert_eq!(eval!("(macroexpand (+ 1 2))", &env), parse("(+ 1 2)"));
}

#[test]
fn macro_predicates() {
    let env = basic_macros();
    eval_eq!("(macro? one)", &env, true);
    eval_eq!("(fn? one)", &env, false);
    eval_eq!("(fn? (fn* () 1))", &env, true);
    eval_eq!("(fn? +)", &env, true);
    eval_eq!("(macro? +)", &env, false);
    eval_eq!("(macro? cond)", &env, true);
}

#[test]
fn defmacro_needs_a_closure() {
    eval_err!("(defmacro! m 1)", LispError::NotAMacro);
    eval_err!("(defmacro! m +)", LispError::NotAMacro);
}

#[test]
fn list_functions() {
    eval_eq!("(nth (list 1) 0)", 1);
    eval_eq!("(nth (list 1 2) 1)", 2);
    assert_eq!(eval!("(nth (list 1 2 nil) 2)"), LispValue::Nil);
    eval_eq!("(nth [1 2 3] 2)", 3);
    assert_eq!(eval!("(first (list))"), LispValue::Nil);
    assert_eq!(eval!("(first nil)"), LispValue::Nil);
    eval_eq!("(first (list 6))", 6);
    eval_eq!("(first (list 7 8 9))", 7);
    assert_eq!(eval!("(rest (list))"), parse("()"));
    assert_eq!(eval!("(rest (list 6))"), parse("()"));
    assert_eq!(eval!("(rest nil)"), parse("()"));
    assert_eq!(eval!("(rest (list 7 8 9))"), parse("(8 9)"));
    eval_eq!("(first [10])", 10);
    assert_eq!(eval!("(rest [10 11 12])"), parse("(11 12)"));
}

#[test]
fn out_of_bounds_access() {
    eval_err!("(nth (list 1 2) 2)", LispError::IndexOutOfRange(2));
    eval_err!("(nth [1 2] -1)", LispError::IndexOutOfRange(-1));
}

#[test]
fn cond() {
    assert_eq!(eval!("(cond)"), LispValue::Nil);
    eval_eq!("(cond true 7)", 7);
    assert_eq!(eval!("(cond false 7)"), LispValue::Nil);
    eval_eq!("(cond true 7 true 8)", 7);
    eval_eq!("(cond false 7 true 8)", 8);
    eval_eq!("(cond false 7 false 8 \"else\" 9)", 9);
    assert_eq!(eval!("(cond false 7 false 8 false 9)"), LispValue::Nil);
    eval_eq!("(let* (x (cond false \"no\" true \"yes\")) x)", "yes");
}

#[test]
fn cond_uneven() {
    assert_eq!(
        eval_str("(cond true)").unwrap_err().to_string(),
        "uncaught exception: \"odd number of forms to cond\""
    );
}

#[test]
fn macro_closure() {
    let env = testing_env();
    eval!("(def! x 2)", &env);
    eval!("(defmacro! a (fn* [] x))", &env);
    eval_eq!("(a)", &env, 2);
    eval_eq!("(let* (x 3) (a))", &env, 2);
}

#[test]
fn macros_expand_recursively() {
    let env = testing_env();
    eval!("(defmacro! inner (fn* (x) `(+ ~x 1)))", &env);
    eval!("(defmacro! outer (fn* (x) `(inner ~x)))", &env);
    assert_eq!(eval!("(macroexpand (outer 1))", &env), parse("(+ 1 1)"));
    eval_eq!("(outer 1)", &env, 2);
}
