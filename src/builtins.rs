use std::time::Instant;

use im::{vector, Vector};
use itertools::Itertools;
use once_cell::sync::Lazy;
use tracing::error;

use crate::error::assert_or_err;
use crate::eval::{apply, eval, eval_str};
use crate::parser::LispParser;
use crate::seq::LispSeq;
use crate::{LispEnv, LispError, LispValue, Result};

type BuiltinFn = fn(Vector<LispValue>) -> Result<LispValue>;

static START_TIME: Lazy<Instant> = Lazy::new(Instant::now);

fn arity(args: &Vector<LispValue>, n: usize) -> Result<()> {
    assert_or_err!(args.len() == n, LispError::IncorrectArguments(n, args.len()));
    Ok(())
}

fn arity_at_least(args: &Vector<LispValue>, n: usize) -> Result<()> {
    assert_or_err!(args.len() >= n, LispError::IncorrectArguments(n, args.len()));
    Ok(())
}

fn integers(args: &Vector<LispValue>) -> Result<Vec<i64>> {
    args.iter().map(LispValue::expect_integer).collect()
}

fn lisp_plus(args: Vector<LispValue>) -> Result<LispValue> {
    let nums = integers(&args)?;
    Ok(nums.into_iter().fold(0i64, i64::wrapping_add).into())
}

fn lisp_minus(args: Vector<LispValue>) -> Result<LispValue> {
    arity_at_least(&args, 1)?;
    let nums = integers(&args)?;
    if nums.len() == 1 {
        return Ok(nums[0].wrapping_neg().into());
    }
    Ok(nums[1..].iter().fold(nums[0], |acc, x| acc.wrapping_sub(*x)).into())
}

fn lisp_times(args: Vector<LispValue>) -> Result<LispValue> {
    let nums = integers(&args)?;
    Ok(nums.into_iter().fold(1i64, i64::wrapping_mul).into())
}

fn lisp_divide(args: Vector<LispValue>) -> Result<LispValue> {
    arity_at_least(&args, 1)?;
    let nums = integers(&args)?;
    let (first, rest) = if nums.len() == 1 {
        (1, &nums[..])
    } else {
        (nums[0], &nums[1..])
    };
    rest.iter()
        .try_fold(first, |acc, x| {
            assert_or_err!(*x != 0, LispError::DivideByZero);
            Ok(acc.wrapping_div(*x))
        })
        .map(LispValue::from)
}

fn compare_chain(args: Vector<LispValue>, op: fn(&i64, &i64) -> bool) -> Result<LispValue> {
    arity_at_least(&args, 1)?;
    let nums = integers(&args)?;
    Ok(nums.iter().tuple_windows().all(|(a, b)| op(a, b)).into())
}

fn lisp_lt(args: Vector<LispValue>) -> Result<LispValue> {
    compare_chain(args, i64::lt)
}

fn lisp_lte(args: Vector<LispValue>) -> Result<LispValue> {
    compare_chain(args, i64::le)
}

fn lisp_gt(args: Vector<LispValue>) -> Result<LispValue> {
    compare_chain(args, i64::gt)
}

fn lisp_gte(args: Vector<LispValue>) -> Result<LispValue> {
    compare_chain(args, i64::ge)
}

fn lisp_equals(args: Vector<LispValue>) -> Result<LispValue> {
    arity_at_least(&args, 1)?;
    Ok(args.iter().tuple_windows().all(|(a, b)| a == b).into())
}

fn lisp_list(args: Vector<LispValue>) -> Result<LispValue> {
    Ok(LispValue::from(args))
}

fn lisp_listq(args: Vector<LispValue>) -> Result<LispValue> {
    arity(&args, 1)?;
    Ok(matches!(args[0], LispValue::List(_) | LispValue::Seq(_)).into())
}

fn lisp_vector(args: Vector<LispValue>) -> Result<LispValue> {
    Ok(LispValue::Vector(args.into()))
}

fn lisp_vectorq(args: Vector<LispValue>) -> Result<LispValue> {
    arity(&args, 1)?;
    Ok(matches!(args[0], LispValue::Vector(_)).into())
}

fn lisp_vec(args: Vector<LispValue>) -> Result<LispValue> {
    arity(&args, 1)?;
    Ok(LispValue::Vector(args[0].to_items()?.into()))
}

fn lisp_hashmap(args: Vector<LispValue>) -> Result<LispValue> {
    assert_or_err!(args.len() % 2 == 0, LispError::MissingBinding);
    Ok(LispValue::map_from(args.into_iter().tuples()))
}

fn lisp_mapq(args: Vector<LispValue>) -> Result<LispValue> {
    arity(&args, 1)?;
    Ok(matches!(args[0], LispValue::Map(_)).into())
}

fn lisp_sequentialq(args: Vector<LispValue>) -> Result<LispValue> {
    arity(&args, 1)?;
    Ok(args[0].is_sequential().into())
}

fn lisp_emptyq(args: Vector<LispValue>) -> Result<LispValue> {
    arity(&args, 1)?;
    Ok(args[0].seq()?.is_empty().into())
}

fn lisp_count(args: Vector<LispValue>) -> Result<LispValue> {
    arity(&args, 1)?;
    let count = match &args[0] {
        LispValue::Nil => 0,
        LispValue::List(l) => l.len(),
        LispValue::Vector(v) => v.len(),
        LispValue::Map(m) => m.len(),
        LispValue::String(s) => s.chars().count(),
        LispValue::Seq(s) => s.count()?,
        x => return Err(LispError::InvalidDataType("collection", x.type_of())),
    };
    Ok((count as i64).into())
}

fn lisp_seq(args: Vector<LispValue>) -> Result<LispValue> {
    arity(&args, 1)?;
    let seq = args[0].seq()?;
    if seq.is_empty() {
        Ok(LispValue::Nil)
    } else {
        Ok(LispValue::Seq(seq))
    }
}

fn lisp_first(args: Vector<LispValue>) -> Result<LispValue> {
    arity(&args, 1)?;
    Ok(args[0].seq()?.first())
}

fn lisp_rest(args: Vector<LispValue>) -> Result<LispValue> {
    arity(&args, 1)?;
    match &args[0] {
        LispValue::List(l) => Ok(LispValue::List(l.rest())),
        x => Ok(LispValue::Seq(x.seq()?.rest())),
    }
}

fn lisp_take(args: Vector<LispValue>) -> Result<LispValue> {
    arity(&args, 2)?;
    let n = args[0].expect_integer()?.max(0) as usize;
    let items: Vector<LispValue> = args[1].seq()?.iter().take(n).collect();
    Ok(LispValue::Seq(items.into()))
}

fn lisp_cons(args: Vector<LispValue>) -> Result<LispValue> {
    arity(&args, 2)?;
    Ok(LispValue::Seq(LispSeq::cons(args[0].clone(), args[1].seq()?)))
}

fn lisp_concat(args: Vector<LispValue>) -> Result<LispValue> {
    let seqs = args.iter().map(LispValue::seq).collect::<Result<Vec<_>>>()?;
    Ok(LispValue::Seq(LispSeq::concat(seqs)))
}

fn lisp_conj(mut args: Vector<LispValue>) -> Result<LispValue> {
    arity_at_least(&args, 1)?;
    let coll = args.pop_front().unwrap_or_default();
    args.into_iter().try_fold(coll, |coll, x| coll.conj(x))
}

fn lisp_into(args: Vector<LispValue>) -> Result<LispValue> {
    arity(&args, 2)?;
    args[1]
        .seq()?
        .iter()
        .try_fold(args[0].clone(), |coll, x| coll.conj(x))
}

fn lisp_nth(args: Vector<LispValue>) -> Result<LispValue> {
    arity(&args, 2)?;
    let index = args[1].expect_integer()?;
    match &args[0] {
        LispValue::Vector(v) => v.get(index),
        coll => {
            let skip = usize::try_from(index).map_err(|_| LispError::IndexOutOfRange(index))?;
            coll.seq()?
                .iter()
                .nth(skip)
                .ok_or(LispError::IndexOutOfRange(index))
        }
    }
}

fn lisp_range(args: Vector<LispValue>) -> Result<LispValue> {
    let nums = integers(&args)?;
    let seq = match nums[..] {
        [] => LispSeq::range(0, None, 1),
        [upper] => LispSeq::range(0, Some(upper), 1),
        [lower, upper] => LispSeq::range(lower, Some(upper), 1),
        [lower, upper, step] => LispSeq::range(lower, Some(upper), step),
        _ => return Err(LispError::IncorrectArguments(3, nums.len())),
    };
    Ok(LispValue::Seq(seq))
}

fn lisp_assoc(mut args: Vector<LispValue>) -> Result<LispValue> {
    arity_at_least(&args, 1)?;
    let map = match args.pop_front().unwrap_or_default() {
        LispValue::Nil => Default::default(),
        LispValue::Map(m) => m,
        x => return Err(LispError::InvalidDataType("map", x.type_of())),
    };
    assert_or_err!(args.len() % 2 == 0, LispError::MissingBinding);
    let map = args
        .into_iter()
        .tuples()
        .fold(map, |map, (k, v)| map.assoc(k, v));
    Ok(LispValue::Map(map))
}

fn lisp_dissoc(mut args: Vector<LispValue>) -> Result<LispValue> {
    arity_at_least(&args, 1)?;
    let map = match args.pop_front().unwrap_or_default() {
        LispValue::Nil => return Ok(LispValue::Nil),
        LispValue::Map(m) => m,
        x => return Err(LispError::InvalidDataType("map", x.type_of())),
    };
    Ok(LispValue::Map(args.iter().fold(map, |map, k| map.dissoc(k))))
}

fn lisp_get(args: Vector<LispValue>) -> Result<LispValue> {
    assert_or_err!(
        args.len() == 2 || args.len() == 3,
        LispError::IncorrectArguments(2, args.len())
    );
    let default = args.get(2).cloned().unwrap_or_default();
    Ok(args[0].lookup(&args[1]).unwrap_or(default))
}

fn lisp_containsq(args: Vector<LispValue>) -> Result<LispValue> {
    arity(&args, 2)?;
    match &args[0] {
        LispValue::Nil => Ok(false.into()),
        LispValue::Map(m) => Ok(m.contains_key(&args[1]).into()),
        LispValue::Vector(v) => {
            Ok(matches!(&args[1], LispValue::Integer(i) if v.get(*i).is_ok()).into())
        }
        x => Err(LispError::InvalidDataType("map", x.type_of())),
    }
}

fn lisp_keys(args: Vector<LispValue>) -> Result<LispValue> {
    arity(&args, 1)?;
    let map = args[0].expect_map()?;
    Ok(LispValue::list_from(map.keys().cloned()))
}

fn lisp_vals(args: Vector<LispValue>) -> Result<LispValue> {
    arity(&args, 1)?;
    let map = args[0].expect_map()?;
    Ok(LispValue::list_from(map.values().cloned()))
}

fn lisp_hash(args: Vector<LispValue>) -> Result<LispValue> {
    arity(&args, 1)?;
    Ok((args[0].hash_code() as i64).into())
}

fn lisp_atom(args: Vector<LispValue>) -> Result<LispValue> {
    arity(&args, 1)?;
    Ok(LispValue::atom(args[0].clone()))
}

fn lisp_atomq(args: Vector<LispValue>) -> Result<LispValue> {
    arity(&args, 1)?;
    Ok(matches!(args[0], LispValue::Atom(_)).into())
}

fn lisp_deref(args: Vector<LispValue>) -> Result<LispValue> {
    arity(&args, 1)?;
    Ok(args[0].expect_atom()?.deref())
}

fn lisp_reset(args: Vector<LispValue>) -> Result<LispValue> {
    arity(&args, 2)?;
    Ok(args[0].expect_atom()?.reset(args[1].clone()))
}

fn lisp_swap(mut args: Vector<LispValue>) -> Result<LispValue> {
    arity_at_least(&args, 2)?;
    let atom = args.pop_front().unwrap_or_default();
    let f = args.pop_front().unwrap_or_default();
    atom.expect_atom()?.swap(|current| {
        let mut call = vector![current];
        call.append(args);
        apply(&f, call)
    })
}

fn lisp_symbol(args: Vector<LispValue>) -> Result<LispValue> {
    arity(&args, 1)?;
    Ok(LispValue::symbol(args[0].expect_string()?))
}

fn lisp_keyword(args: Vector<LispValue>) -> Result<LispValue> {
    arity(&args, 1)?;
    match &args[0] {
        LispValue::Keyword(_) => Ok(args[0].clone()),
        LispValue::String(s) => Ok(LispValue::keyword(s)),
        x => Err(LispError::InvalidDataType("string", x.type_of())),
    }
}

macro_rules! type_predicate {
    ($name:ident, $pat:pat) => {
        fn $name(args: Vector<LispValue>) -> Result<LispValue> {
            arity(&args, 1)?;
            Ok(matches!(&args[0], $pat).into())
        }
    };
}

type_predicate!(lisp_nilq, LispValue::Nil);
type_predicate!(lisp_trueq, LispValue::Bool(true));
type_predicate!(lisp_falseq, LispValue::Bool(false));
type_predicate!(lisp_symbolq, LispValue::Symbol(_));
type_predicate!(lisp_keywordq, LispValue::Keyword(_));
type_predicate!(lisp_stringq, LispValue::String(_));
type_predicate!(lisp_numberq, LispValue::Integer(_));

fn lisp_fnq(args: Vector<LispValue>) -> Result<LispValue> {
    arity(&args, 1)?;
    Ok(matches!(&args[0], LispValue::Func(f) if !f.is_macro()).into())
}

fn lisp_macroq(args: Vector<LispValue>) -> Result<LispValue> {
    arity(&args, 1)?;
    Ok(matches!(&args[0], LispValue::Func(f) if f.is_macro()).into())
}

fn lisp_not(args: Vector<LispValue>) -> Result<LispValue> {
    arity(&args, 1)?;
    Ok((!args[0].truthiness()).into())
}

fn lisp_apply(mut args: Vector<LispValue>) -> Result<LispValue> {
    arity_at_least(&args, 2)?;
    let f = args.pop_front().unwrap_or_default();
    let last = args.pop_back().unwrap_or_default();
    args.append(last.to_items()?);
    apply(&f, args)
}

fn lisp_map(args: Vector<LispValue>) -> Result<LispValue> {
    arity(&args, 2)?;
    let f = &args[0];
    args[1]
        .to_items()?
        .into_iter()
        .map(|x| apply(f, vector![x]))
        .collect::<Result<Vector<_>>>()
        .map(LispValue::from)
}

fn lisp_throw(args: Vector<LispValue>) -> Result<LispValue> {
    arity(&args, 1)?;
    Err(LispError::UncaughtException(args[0].clone()))
}

fn lisp_meta(args: Vector<LispValue>) -> Result<LispValue> {
    arity(&args, 1)?;
    args[0].meta()
}

fn lisp_with_meta(args: Vector<LispValue>) -> Result<LispValue> {
    arity(&args, 2)?;
    args[0].with_meta(&args[1])
}

fn lisp_pr_str(args: Vector<LispValue>) -> Result<LispValue> {
    Ok(args.iter().map(LispValue::inspect).join(" ").into())
}

fn lisp_str(args: Vector<LispValue>) -> Result<LispValue> {
    Ok(args.iter().join("").into())
}

fn lisp_read_string(args: Vector<LispValue>) -> Result<LispValue> {
    arity(&args, 1)?;
    let source = args[0].expect_string()?;
    LispParser::parse(source).unwrap_or(Ok(LispValue::Nil))
}

fn lisp_time_ms(_args: Vector<LispValue>) -> Result<LispValue> {
    Ok((START_TIME.elapsed().as_millis() as i64).into())
}

const BUILTINS: &[(&str, BuiltinFn)] = &[
    ("+", lisp_plus),
    ("-", lisp_minus),
    ("*", lisp_times),
    ("/", lisp_divide),
    ("<", lisp_lt),
    ("<=", lisp_lte),
    (">", lisp_gt),
    (">=", lisp_gte),
    ("=", lisp_equals),
    ("list", lisp_list),
    ("list?", lisp_listq),
    ("vector", lisp_vector),
    ("vector?", lisp_vectorq),
    ("vec", lisp_vec),
    ("hash-map", lisp_hashmap),
    ("map?", lisp_mapq),
    ("sequential?", lisp_sequentialq),
    ("empty?", lisp_emptyq),
    ("count", lisp_count),
    ("seq", lisp_seq),
    ("first", lisp_first),
    ("rest", lisp_rest),
    ("take", lisp_take),
    ("cons", lisp_cons),
    ("concat", lisp_concat),
    ("conj", lisp_conj),
    ("into", lisp_into),
    ("nth", lisp_nth),
    ("range", lisp_range),
    ("assoc", lisp_assoc),
    ("dissoc", lisp_dissoc),
    ("get", lisp_get),
    ("contains?", lisp_containsq),
    ("keys", lisp_keys),
    ("vals", lisp_vals),
    ("hash", lisp_hash),
    ("atom", lisp_atom),
    ("atom?", lisp_atomq),
    ("deref", lisp_deref),
    ("reset!", lisp_reset),
    ("swap!", lisp_swap),
    ("symbol", lisp_symbol),
    ("symbol?", lisp_symbolq),
    ("keyword", lisp_keyword),
    ("keyword?", lisp_keywordq),
    ("nil?", lisp_nilq),
    ("true?", lisp_trueq),
    ("false?", lisp_falseq),
    ("string?", lisp_stringq),
    ("number?", lisp_numberq),
    ("fn?", lisp_fnq),
    ("macro?", lisp_macroq),
    ("not", lisp_not),
    ("apply", lisp_apply),
    ("map", lisp_map),
    ("throw", lisp_throw),
    ("meta", lisp_meta),
    ("with-meta", lisp_with_meta),
    ("pr-str", lisp_pr_str),
    ("str", lisp_str),
    ("read-string", lisp_read_string),
    ("time-ms", lisp_time_ms),
];

#[cfg(feature = "io-stdlib")]
mod io {
    use std::io::{BufRead, Write};

    use im::Vector;
    use itertools::Itertools;
    use tracing::debug;

    use super::arity;
    use crate::eval::eval_str;
    use crate::{LispEnv, LispValue, Result};

    pub(super) fn lisp_prn(args: Vector<LispValue>) -> Result<LispValue> {
        println!("{}", args.iter().map(LispValue::inspect).join(" "));
        Ok(LispValue::Nil)
    }

    pub(super) fn lisp_println(args: Vector<LispValue>) -> Result<LispValue> {
        println!("{}", args.iter().join(" "));
        Ok(LispValue::Nil)
    }

    pub(super) fn lisp_slurp(args: Vector<LispValue>) -> Result<LispValue> {
        arity(&args, 1)?;
        let path = args[0].expect_string()?;
        Ok(std::fs::read_to_string(path)?.into())
    }

    pub(super) fn lisp_readline(args: Vector<LispValue>) -> Result<LispValue> {
        arity(&args, 1)?;
        let prompt = args[0].expect_string()?;
        let mut stdout = std::io::stdout();
        write!(stdout, "{}", prompt)?;
        stdout.flush()?;
        let mut line = String::new();
        if std::io::stdin().lock().read_line(&mut line)? == 0 {
            return Ok(LispValue::Nil);
        }
        let trimmed = line.trim_end_matches(['\n', '\r']);
        Ok(trimmed.into())
    }

    /// Evaluates every form in the file at `path`.
    pub(super) fn load_file(path: &str, env: &LispEnv) -> Result<LispValue> {
        debug!(path, "loading file");
        let source = std::fs::read_to_string(path)?;
        eval_str(&source, env)?;
        Ok(LispValue::Nil)
    }
}

pub(crate) fn populate(env: &LispEnv) {
    // make `time-ms` count from environment creation
    Lazy::force(&START_TIME);
    for (name, f) in BUILTINS {
        env.bind_func(name, *f);
    }

    let weak = env.downgrade();
    env.bind_func("eval", move |args| {
        arity(&args, 1)?;
        let env = weak.upgrade().ok_or(LispError::DetachedEnvironment)?;
        eval(args[0].clone(), &env)
    });
}

#[cfg(feature = "io-stdlib")]
pub(crate) fn populate_io(env: &LispEnv) {
    env.bind_func("prn", io::lisp_prn);
    env.bind_func("println", io::lisp_println);
    env.bind_func("slurp", io::lisp_slurp);
    env.bind_func("readline", io::lisp_readline);

    let weak = env.downgrade();
    env.bind_func("load-file", move |args| {
        arity(&args, 1)?;
        let env = weak.upgrade().ok_or(LispError::DetachedEnvironment)?;
        io::load_file(args[0].expect_string()?, &env)
    });
}

const PRELUDE: &str = r#"
(defmacro! cond
  (fn* (& xs)
    (if (> (count xs) 0)
      (list 'if (first xs)
        (if (> (count xs) 1)
          (nth xs 1)
          (throw "odd number of forms to cond"))
        (cons 'cond (rest (rest xs)))))))
"#;

/// Definitions written in the language itself, plus the seeded globals.
pub(crate) fn populate_prelude(env: &LispEnv) {
    env.set("*host-language*", "rust".into());
    env.set("*ARGV*", LispValue::list_from([]));
    if let Err(err) = eval_str(PRELUDE, env) {
        error!(%err, "failed to evaluate prelude");
    }
}
