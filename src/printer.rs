use std::fmt::{self, Write};

use crate::value::FuncKind;
use crate::LispValue;

/// Unbounded sequences print this many elements before giving up.
const UNBOUNDED_PRINT_LIMIT: usize = 10;

fn write_escaped(f: &mut impl Write, s: &str) -> fmt::Result {
    f.write_char('"')?;
    for c in s.chars() {
        match c {
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\t' => f.write_str("\\t")?,
            c => f.write_char(c)?,
        }
    }
    f.write_char('"')
}

fn write_items<'a>(
    f: &mut impl Write,
    items: impl Iterator<Item = &'a LispValue>,
    readably: bool,
) -> fmt::Result {
    for (i, item) in items.enumerate() {
        if i > 0 {
            f.write_char(' ')?;
        }
        item.print(f, readably)?;
    }
    Ok(())
}

impl LispValue {
    fn print(&self, f: &mut impl Write, readably: bool) -> fmt::Result {
        match self {
            LispValue::Nil => f.write_str("nil"),
            LispValue::Bool(b) => write!(f, "{}", b),
            LispValue::Integer(i) => write!(f, "{}", i),
            LispValue::String(s) if readably => write_escaped(f, s),
            LispValue::String(s) => f.write_str(s),
            LispValue::Symbol(s) => f.write_str(s.name()),
            LispValue::Keyword(k) => write!(f, ":{}", k),
            LispValue::List(l) => {
                f.write_char('(')?;
                write_items(f, l.iter(), readably)?;
                f.write_char(')')
            }
            LispValue::Vector(v) => {
                f.write_char('[')?;
                write_items(f, v.iter(), readably)?;
                f.write_char(']')
            }
            LispValue::Map(m) => {
                f.write_char('{')?;
                for (i, (k, v)) in m.iter().enumerate() {
                    if i > 0 {
                        f.write_char(' ')?;
                    }
                    k.print(f, readably)?;
                    f.write_char(' ')?;
                    v.print(f, readably)?;
                }
                f.write_char('}')
            }
            LispValue::Seq(s) => {
                f.write_char('(')?;
                if s.is_bounded() {
                    let items: Vec<_> = s.iter().collect();
                    write_items(f, items.iter(), readably)?;
                } else {
                    let items: Vec<_> = s.iter().take(UNBOUNDED_PRINT_LIMIT).collect();
                    write_items(f, items.iter(), readably)?;
                    f.write_str(" ...")?;
                }
                f.write_char(')')
            }
            LispValue::Func(func) => match &func.kind {
                FuncKind::Native { name, .. } => write!(f, "#<native fn {}>", name),
                FuncKind::Closure { .. } if func.is_macro() => f.write_str("#<macro>"),
                FuncKind::Closure { .. } => f.write_str("#<function>"),
            },
            LispValue::Atom(a) => {
                f.write_str("(atom ")?;
                a.deref().print(f, readably)?;
                f.write_char(')')
            }
            LispValue::Error(e) => write!(f, "{}", e),
        }
    }

    /// Readable form: strings are quoted and escaped, so the output reads
    /// back as an equal value.
    pub fn inspect(&self) -> String {
        let mut out = String::new();
        // writing into a String cannot fail
        let _ = self.print(&mut out, true);
        out
    }
}

impl fmt::Display for LispValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.print(f, false)
    }
}
