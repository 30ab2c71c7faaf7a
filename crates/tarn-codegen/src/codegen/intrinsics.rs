//! Built-in operators and runtime routines.
//!
//! Calls to built-in names with exactly matching argument types lower to a
//! single native instruction. The remaining built-ins (`^` and `print`)
//! become calls to runtime routines, declared at the end of the module
//! when used.

/// A built-in that lowers to one instruction.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Native {
    /// `op ty a, b` for arithmetic, comparison and logic.
    Binary { op: &'static str, ty: &'static str },
    /// `sub i64 0, a`
    NegInt,
    /// `fneg double a`
    NegFloat,
    /// `xor i1 a, true`
    Not,
}

impl Native {
    /// Instruction text for the given operands.
    pub fn render(self, args: &[String]) -> String {
        match (self, args) {
            (Native::Binary { op, ty }, [a, b]) => format!("{} {} {}, {}", op, ty, a, b),
            (Native::NegInt, [a]) => format!("sub i64 0, {}", a),
            (Native::NegFloat, [a]) => format!("fneg double {}", a),
            (Native::Not, [a]) => format!("xor i1 {}, true", a),
            _ => unreachable!("native lowering picked for a different arity"),
        }
    }
}

/// Native lowering of `name` applied to arguments of IR types `args`.
pub fn native(name: &str, args: &[&str]) -> Option<Native> {
    let binary = |op: &'static str, ty: &'static str| Some(Native::Binary { op, ty });
    match (name, args) {
        ("+", ["i64", "i64"]) => binary("add", "i64"),
        ("-", ["i64", "i64"]) => binary("sub", "i64"),
        ("*", ["i64", "i64"]) => binary("mul", "i64"),
        ("/", ["i64", "i64"]) => binary("sdiv", "i64"),
        ("%", ["i64", "i64"]) => binary("srem", "i64"),

        ("+", ["double", "double"]) => binary("fadd", "double"),
        ("-", ["double", "double"]) => binary("fsub", "double"),
        ("*", ["double", "double"]) => binary("fmul", "double"),
        ("/", ["double", "double"]) => binary("fdiv", "double"),
        ("%", ["double", "double"]) => binary("frem", "double"),

        ("==", ["i64", "i64"]) => binary("icmp eq", "i64"),
        ("!=", ["i64", "i64"]) => binary("icmp ne", "i64"),
        ("<", ["i64", "i64"]) => binary("icmp slt", "i64"),
        ("<=", ["i64", "i64"]) => binary("icmp sle", "i64"),
        (">", ["i64", "i64"]) => binary("icmp sgt", "i64"),
        (">=", ["i64", "i64"]) => binary("icmp sge", "i64"),

        ("==", ["double", "double"]) => binary("fcmp oeq", "double"),
        ("!=", ["double", "double"]) => binary("fcmp one", "double"),
        ("<", ["double", "double"]) => binary("fcmp olt", "double"),
        ("<=", ["double", "double"]) => binary("fcmp ole", "double"),
        (">", ["double", "double"]) => binary("fcmp ogt", "double"),
        (">=", ["double", "double"]) => binary("fcmp oge", "double"),

        ("==", ["i1", "i1"]) => binary("icmp eq", "i1"),
        ("!=", ["i1", "i1"]) => binary("icmp ne", "i1"),
        ("and", ["i1", "i1"]) => binary("and", "i1"),
        ("or", ["i1", "i1"]) => binary("or", "i1"),

        ("-", ["i64"]) => Some(Native::NegInt),
        ("-", ["double"]) => Some(Native::NegFloat),
        ("not", ["i1"]) => Some(Native::Not),
        _ => None,
    }
}

/// A routine provided by the runtime or by LLVM.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Routine {
    pub symbol: &'static str,
    pub ret: &'static str,
    pub params: &'static [&'static str],
}

impl Routine {
    /// The `declare` line for this routine.
    pub fn declaration(&self) -> String {
        format!("declare {} @{}({})", self.ret, self.symbol, self.params.join(", "))
    }
}

/// Runtime routine implementing `name` for arguments of IR types `args`.
pub fn runtime_routine(name: &str, args: &[&str]) -> Option<Routine> {
    let routine = |symbol: &'static str, ret: &'static str, params: &'static [&'static str]| {
        Some(Routine {
            symbol,
            ret,
            params,
        })
    };
    match (name, args) {
        ("^", ["i64", "i64"]) => routine("tarn_ipow", "i64", &["i64", "i64"]),
        ("^", ["double", "double"]) => routine("llvm.pow.f64", "double", &["double", "double"]),
        ("print", ["i64"]) => routine("tarn_print_int", "void", &["i64"]),
        ("print", ["double"]) => routine("tarn_print_float", "void", &["double"]),
        ("print", ["i1"]) => routine("tarn_print_bool", "void", &["i1"]),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ops(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn arithmetic_lowers_by_type() {
        let add = native("+", &["i64", "i64"]).unwrap();
        assert_eq!(add.render(&ops(&["%x", "1"])), "add i64 %x, 1");
        let div = native("/", &["double", "double"]).unwrap();
        assert_eq!(div.render(&ops(&["%a", "%b"])), "fdiv double %a, %b");
    }

    #[test]
    fn comparisons_pick_signed_or_ordered_predicates() {
        let le = native("<=", &["i64", "i64"]).unwrap();
        assert_eq!(le.render(&ops(&["%i", "3"])), "icmp sle i64 %i, 3");
        let ne = native("!=", &["double", "double"]).unwrap();
        assert_eq!(ne.render(&ops(&["%a", "%b"])), "fcmp one double %a, %b");
        let eq = native("==", &["i1", "i1"]).unwrap();
        assert_eq!(eq.render(&ops(&["%p", "true"])), "icmp eq i1 %p, true");
    }

    #[test]
    fn unary_operators() {
        assert_eq!(native("-", &["i64"]).unwrap().render(&ops(&["%x"])), "sub i64 0, %x");
        assert_eq!(native("-", &["double"]).unwrap().render(&ops(&["%y"])), "fneg double %y");
        assert_eq!(native("not", &["i1"]).unwrap().render(&ops(&["%b"])), "xor i1 %b, true");
    }

    #[test]
    fn mixed_operands_have_no_lowering() {
        assert_eq!(native("+", &["i64", "double"]), None);
        assert_eq!(native("<", &["i1", "i1"]), None);
        assert_eq!(native("^", &["i64", "i64"]), None);
    }

    #[test]
    fn runtime_routines_declare_their_signature() {
        let pow = runtime_routine("^", &["i64", "i64"]).unwrap();
        assert_eq!(pow.declaration(), "declare i64 @tarn_ipow(i64, i64)");
        let print = runtime_routine("print", &["i1"]).unwrap();
        assert_eq!(print.declaration(), "declare void @tarn_print_bool(i1)");
        assert!(runtime_routine("print", &["void"]).is_none());
    }
}
