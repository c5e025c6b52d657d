#![allow(unused)]

pub use im::{hashmap, vector, HashMap, Vector};
pub use lisp_core::{eval, LispEnv, LispError, LispParser, LispSeq, LispValue, Result};
pub use once_cell::sync::Lazy;

pub static MOCK_FS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    hashmap! {
        "inc.mal" => r#"
            (def! inc1 (fn* (a) (+ 1 a)))
            (def! inc2 (fn* (a) (+ 2 a)))
            (def! inc3 (fn* (a)
                (+ 3 a)))
        "#,
        "incB.mal" => r#"
            ;; A comment in a file
            (def! inc4 (fn* (a) (+ 4 a)))
            (def! inc5 (fn* (a) ;; a comment after code
                (+ 5 a)))
            ;; ending comment without final new line"#,
        "incC.mal" => r#"
            (def! mymap {"a"
                        1})
        "#,
        "computations.mal" => r#"
            (def! sumdown
                (fn* [n]
                    (if (= n 0)
                        0
                        (+ n (sumdown (- n 1))))))
            (def! fib
                (fn* [n]
                    (if (<= n 1)
                        n
                        (+ (fib (- n 1)) (fib (- n 2))))))
        "#,
        "broken.mal" => "(def! half-done 1) (undefined-fn)",
        "test.txt" => "A line of text",
    }
});

fn mock_file(args: &Vector<LispValue>) -> Result<&'static str> {
    if args.len() != 1 {
        return Err(LispError::IncorrectArguments(1, args.len()));
    }
    let name = args[0].expect_string()?;
    MOCK_FS
        .get(name)
        .copied()
        .ok_or_else(|| LispError::UndefinedVariable(name.to_owned()))
}

/// A protected environment whose `slurp` and `load-file` read from
/// [`MOCK_FS`] instead of the disk.
pub fn testing_env() -> LispEnv {
    let env = LispEnv::new_stdlib_protected();
    env.bind_func("slurp", |args| Ok(mock_file(&args)?.into()));
    let global = env.clone();
    env.bind_func("load-file", move |args| {
        let source = mock_file(&args)?;
        lisp_core::eval_str(source, &global)?;
        Ok(LispValue::Nil)
    });
    env
}

#[inline]
pub fn eval_str(input: &str) -> Result<LispValue> {
    let env = testing_env();
    eval_str_in_env(input, &env)
}

#[inline]
pub fn eval_str_in_env(input: &str, env: &LispEnv) -> Result<LispValue> {
    let parsed = input.parse()?;
    eval(parsed, env)
}

pub fn parse(input: &str) -> LispValue {
    input.parse().unwrap()
}

pub fn sym(name: &str) -> LispValue {
    LispValue::symbol(name)
}

pub fn list<const N: usize>(items: [LispValue; N]) -> LispValue {
    LispValue::list_from(items)
}

pub fn vect<const N: usize>(items: [LispValue; N]) -> LispValue {
    LispValue::vector_from(items)
}

#[macro_export]
macro_rules! eval {
    ($code:expr) => {
        eval_str($code).unwrap()
    };
    ($code:expr, $env:expr) => {
        eval_str_in_env($code, $env).unwrap()
    };
}

#[macro_export]
macro_rules! eval_eq {
    ($code:expr, $val:expr) => {
        assert_eq!(eval_str($code).unwrap(), LispValue::from($val))
    };
    ($code:expr, $env:expr, $val:expr) => {
        assert_eq!(eval_str_in_env($code, $env).unwrap(), LispValue::from($val))
    };
}

#[macro_export]
macro_rules! eval_err {
    ($code:expr, $pat:pat) => {
        match eval_str($code) {
            Err($pat) => (),
            other => panic!("expected {}, got {:?}", stringify!($pat), other),
        }
    };
    ($code:expr, $env:expr, $pat:pat) => {
        match eval_str_in_env($code, $env) {
            Err($pat) => (),
            other => panic!("expected {}, got {:?}", stringify!($pat), other),
        }
    };
}
