mod common;
use common::*;

#[test]
fn list_functions() {
    assert_eq!(eval!("(cons 1 (list))"), parse("(1)"));
    assert_eq!(eval!("(cons 1 (list 2))"), parse("(1 2)"));
    assert_eq!(eval!("(cons 1 (list 2 3))"), parse("(1 2 3)"));
    assert_eq!(eval!("(cons (list 1) (list 2 3))"), parse("((1) 2 3)"));
    assert_eq!(eval!("(cons 1 nil)"), parse("(1)"));
    assert_eq!(eval!("(concat)"), parse("()"));
    assert_eq!(eval!("(concat (list 1 2))"), parse("(1 2)"));
    assert_eq!(eval!("(concat (list 1 2) (list 3 4))"), parse("(1 2 3 4)"));
    assert_eq!(
        eval!("(concat (list 1 2) (list 3 4) (list 5 6))"),
        parse("(1 2 3 4 5 6)")
    );
    assert_eq!(eval!("(concat (list) (list))"), parse("()"));
    assert_eq!(eval!("(cons 1 [])"), parse("(1)"));
    assert_eq!(eval!("(cons [1] [2 3])"), parse("([1] 2 3)"));
    assert_eq!(
        eval!("(concat [1 2] (list 3 4) [5 6])"),
        parse("(1 2 3 4 5 6)")
    );
    eval_eq!("(vector? (cons 1 [2]))", false);
    eval_eq!("(list? (concat [1] [2]))", true);
}

#[test]
fn cons_does_not_mutate() {
    let env = testing_env();
    eval!("(def! a (list 2 3))", &env);
    assert_eq!(eval!("(cons 1 a)", &env), parse("(1 2 3)"));
    assert_eq!(eval!("a", &env), parse("(2 3)"));
}

#[test]
fn quote() {
    eval_eq!("(quote 7)", 7);
    assert_eq!(eval!("(quote (1 2 3))"), parse("(1 2 3)"));
    assert_eq!(eval!("(quote (1 2 (3 4)))"), parse("(1 2 (3 4))"));
    assert_eq!(eval!("(quote a)"), sym("a"));
    eval_eq!("'7", 7);
    assert_eq!(eval!("'(1 2 3)"), parse("(1 2 3)"));
    assert_eq!(eval!("'(1 2 (3 4))"), parse("(1 2 (3 4))"));
    eval_err!("(quote)", LispError::IncorrectArguments(1, 0));
}

#[test]
fn quasiquote() {
    assert_eq!(eval!("(quasiquote nil)"), LispValue::Nil);
    eval_eq!("(quasiquote 7)", 7);
    assert_eq!(eval!("(quasiquote ())"), parse("()"));
    assert_eq!(eval!("(quasiquote (1 2))"), parse("(1 2)"));
    assert_eq!(eval!("(quasiquote (1 () 2))"), parse("(1 () 2)"));
    assert_eq!(eval!("(quasiquote (()))"), parse("(())"));
    eval_eq!("`7", 7);
    assert_eq!(eval!("`(1 2 3)"), parse("(1 2 3)"));
}

#[test]
fn unquote() {
    let env = testing_env();
    eval!("(def! a 8)", &env);
    assert_eq!(eval!("(quasiquote a)", &env), sym("a"));
    eval_eq!("(quasiquote (unquote a))", &env, 8);
    assert_eq!(eval!("(quasiquote (1 a 3))", &env), parse("(1 a 3)"));
    assert_eq!(eval!("(quasiquote (1 (unquote a) 3))", &env), parse("(1 8 3)"));
    eval!("(def! b (quote (1 \"b\" \"d\")))", &env);
    assert_eq!(eval!("(quasiquote (1 b 3))", &env), parse("(1 b 3)"));
    assert_eq!(
        eval!("(quasiquote (1 (unquote b) 3))", &env),
        parse("(1 (1 \"b\" \"d\") 3)")
    );
    assert_eq!(
        eval!("(quasiquote ((unquote 1) (unquote 2)))", &env),
        parse("(1 2)")
    );
    eval_eq!("(let* (x 0) (quasiquote (unquote x)))", &env, 0);
    eval_eq!("`~7", &env, 7);
    assert_eq!(eval!("`(1 ~a 3)", &env), parse("(1 8 3)"));
    assert_eq!(eval!("`(1 ~b 3)", &env), parse("(1 (1 \"b\" \"d\") 3)"));
}

#[test]
fn splice_unquote() {
    let env = testing_env();
    eval!("(def! c (quote (1 \"b\" \"d\")))", &env);
    assert_eq!(eval!("(quasiquote (1 c 3))", &env), parse("(1 c 3)"));
    assert_eq!(
        eval!("(quasiquote (1 (splice-unquote c) 3))", &env),
        parse("(1 1 \"b\" \"d\" 3)")
    );
    assert_eq!(
        eval!("(quasiquote ((splice-unquote c) (splice-unquote c)))", &env),
        parse("(1 \"b\" \"d\" 1 \"b\" \"d\")")
    );
    assert_eq!(eval!("`(1 ~@c 3)", &env), parse("(1 1 \"b\" \"d\" 3)"));
    assert_eq!(eval!("`(~@c)", &env), parse("(1 \"b\" \"d\")"));
}

#[test]
fn vectors_are_left_whole() {
    let env = testing_env();
    eval!("(def! a 8)", &env);
    assert_eq!(eval!("`[1 a]", &env), parse("[1 a]"));
    eval_eq!("(vector? `[1 a])", &env, true);
}

#[test]
fn unquote_outside_quasiquote() {
    eval_err!("(unquote 1)", LispError::OnlyInQuasiquote);
    eval_err!("(splice-unquote (list 1))", LispError::OnlyInQuasiquote);
}

#[test]
fn vec() {
    assert_eq!(eval!("(vec (list))"), parse("[]"));
    assert_eq!(eval!("(vec (list 1 2))"), parse("[1 2]"));
    assert_eq!(eval!("(vec [])"), parse("[]"));
    eval_eq!("(vector? (vec (list 1)))", true);
    eval_err!("(vec (range))", LispError::InfiniteSequence);
}

#[test]
fn quine() {
    let expr = LispParser::parse(
        r#"
    ((fn* (q)
        (quasiquote ((unquote q) (quote (unquote q))))
    ) (quote (fn* (q)
        (quasiquote ((unquote q) (quote (unquote q))))
    )))
    "#,
    )
    .unwrap()
    .unwrap();
    let env = testing_env();
    assert_eq!(&eval(expr.clone(), &env).unwrap(), &expr);
}

#[test]
fn deep_concat_chain() {
    let env = testing_env();
    eval!(
        "(def! build (fn* (n acc) (if (= n 0) acc (build (- n 1) (concat acc (list n))))))",
        &env
    );
    eval!("(def! xs (build 100000 (list)))", &env);
    eval_eq!("(count xs)", &env, 100000);
    eval_eq!("(first xs)", &env, 100000);
    eval_eq!("(nth xs 99999)", &env, 1);
    eval_eq!("(count (concat xs xs))", &env, 200000);
}

#[test]
fn deep_cons_chain() {
    let env = testing_env();
    eval!(
        "(def! build (fn* (n acc) (if (= n 0) acc (build (- n 1) (cons n acc)))))",
        &env
    );
    eval!("(def! xs (build 100000 (list)))", &env);
    eval_eq!("(first xs)", &env, 1);
    eval_eq!("(count xs)", &env, 100000);
    eval_eq!("(nth xs 99999)", &env, 100000);
    eval_eq!("(first (concat (list 0) xs))", &env, 0);
    eval!("(def! xs nil)", &env);
}
