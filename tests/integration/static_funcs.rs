//! Declared functions: resolution, recursion, literals and inlining decisions.

mod common;

use common::{compile, ints, no_inlining, run, run_with, unit_with};
use xqfunc::expr::{CmpOp, Expr};
use xqfunc::func::registry::CompileState;
use xqfunc::{CompileOptions, QueryBuilder, QueryError, SeqType, Signature, Span, Value};

/// `declare function local:{name}($n) { if ($n = 0) then {base} else local:{other}($n - 1) }`
fn declare_parity(q: &mut QueryBuilder, name: &str, other: &str, base: bool) -> Result<(), QueryError> {
    q.declare(Signature::new(name).param("n"), |q| {
        let n = q.var("n")?;
        let cond = q.compare(CmpOp::Eq, n, q.int(0));
        let n = q.var("n")?;
        let rec = q.call(other, vec![q.sub(n, q.int(1))])?;
        Ok(q.iff(cond, q.bool(base), rec))
    })?;
    Ok(())
}

fn declare_inc(q: &mut QueryBuilder, sig: Signature) -> Result<(), QueryError> {
    q.declare(sig, |q| {
        let x = q.var("x")?;
        Ok(q.add(x, q.int(1)))
    })?;
    Ok(())
}

#[test]
fn mutual_recursion_in_either_declaration_order() {
    for even_first in [true, false] {
        for options in [CompileOptions::default(), no_inlining()] {
            let result = run_with(options, |q| {
                if even_first {
                    declare_parity(q, "local:even", "local:odd", true)?;
                    declare_parity(q, "local:odd", "local:even", false)?;
                } else {
                    declare_parity(q, "local:odd", "local:even", false)?;
                    declare_parity(q, "local:even", "local:odd", true)?;
                }
                let even = q.call("local:even", vec![q.int(10)])?;
                let odd = q.call("local:odd", vec![q.int(7)])?;
                let not_even = q.call("local:even", vec![q.int(3)])?;
                Ok(q.seq(vec![even, odd, not_even]))
            });
            let expected = Value::from_items(vec![Value::Bool(true), Value::Bool(true), Value::Bool(false)]);
            assert_eq!(result.unwrap(), expected, "even declared first: {even_first}");
        }
    }
}

#[test]
fn call_before_any_declaration() {
    let result = run(|q| {
        let main = q.call("local:later", vec![q.int(2)])?;
        q.declare(Signature::new("local:later").param("x"), |q| {
            let x = q.var("x")?;
            Ok(q.mul(x, q.int(21)))
        })?;
        Ok(main)
    });
    assert_eq!(result.unwrap(), Value::Int(42));
}

#[test]
fn unknown_function_suggests_a_close_name() {
    let err = compile(|q| {
        declare_inc(q, Signature::new("local:count").param("x"))?;
        q.at(Span::new(5, 19));
        q.call("local:cuont", vec![q.int(1)])
    })
    .unwrap_err();
    assert_eq!(
        err,
        QueryError::resolution("local:cuont", 1, Some("local:count".to_string()), Span::new(5, 19))
    );
}

#[test]
fn unknown_function_without_candidates() {
    let err = compile(|q| q.call("local:nothing", vec![])).unwrap_err();
    assert!(matches!(err, QueryError::Resolution { suggestion: None, arity: 0, .. }));
}

#[test]
fn known_name_with_other_arity_is_an_arity_error() {
    let err = compile(|q| {
        declare_inc(q, Signature::new("local:inc").param("x"))?;
        q.call("local:inc", vec![])
    })
    .unwrap_err();
    assert!(matches!(err, QueryError::Arity { expected: 1, actual: 0, .. }), "{err:?}");
}

#[test]
fn duplicate_declaration_is_rejected() {
    let err = unit_with(CompileOptions::default(), |q| {
        declare_inc(q, Signature::new("local:inc").param("x"))?;
        q.at(Span::new(30, 40));
        declare_inc(q, Signature::new("local:inc").param("x"))?;
        Ok(q.empty())
    })
    .unwrap_err();
    assert_eq!(err, QueryError::Duplicate { name: "local:inc".into(), arity: 1, span: Span::new(30, 40) });
}

#[test]
fn same_name_with_different_arities_is_allowed() {
    let result = run(|q| {
        declare_inc(q, Signature::new("local:f").param("x"))?;
        q.declare(Signature::new("local:f"), |q| Ok(q.int(100)))?;
        let one = q.call("local:f", vec![q.int(1)])?;
        let zero = q.call("local:f", vec![])?;
        Ok(q.add(one, zero))
    });
    assert_eq!(result.unwrap(), Value::Int(102));
}

#[test]
fn named_literal_passed_to_higher_order_function() {
    let body = |q: &mut QueryBuilder| -> Result<Expr, QueryError> {
        declare_inc(q, Signature::new("local:inc").param("x"))?;
        let inc = q.literal("local:inc", 1)?;
        let seq = q.seq(vec![q.int(1), q.int(2), q.int(3)]);
        q.call("for-each", vec![seq, inc])
    };
    assert_eq!(run(body).unwrap(), ints(&[2, 3, 4]));
    assert_eq!(run_with(no_inlining(), body).unwrap(), ints(&[2, 3, 4]));
}

#[test]
fn named_literal_keeps_name_and_parameter_names() {
    let result = run(|q| {
        declare_inc(q, Signature::new("local:inc").typed_param("x", SeqType::Integer))?;
        q.literal("local:inc", 1)
    })
    .unwrap();
    let Value::Func(item) = result else { panic!("expected a function item") };
    assert_eq!(item.name(), Some("local:inc"));
    assert_eq!(item.param_name(0), Some("x"));
    assert_eq!(item.func_type().params, vec![SeqType::Integer]);
    assert_eq!(item.to_string(), "local:inc#1");
}

#[test]
fn literal_of_unknown_function() {
    let err = compile(|q| q.literal("local:missing", 2)).unwrap_err();
    assert_eq!(err.code(), "XPST0017");
}

#[test]
fn small_function_is_inlined_into_main() {
    let unit = compile(|q| {
        declare_inc(q, Signature::new("local:inc").param("x"))?;
        q.call("local:inc", vec![q.int(41)])
    })
    .unwrap();
    assert_eq!(unit.main(), &Expr::Value(Value::Int(42)));
}

#[test]
fn inline_annotation_overrides_the_limit() {
    let mut unit = compile(|q| {
        declare_inc(q, Signature::new("local:inc").param("x").inline_limit(0))?;
        q.call("local:inc", vec![q.int(41)])
    })
    .unwrap();
    assert!(matches!(unit.main(), Expr::StaticCall(_)));
    assert_eq!(unit.evaluate().unwrap(), Value::Int(42));
}

#[test]
fn recursive_function_is_not_inlined() {
    let unit = compile(|q| {
        declare_parity(q, "local:zero", "local:zero", true)?;
        q.call("local:zero", vec![q.int(3)])
    })
    .unwrap();
    assert!(matches!(unit.main(), Expr::StaticCall(_)));
    let id = unit.funcs().lookup("local:zero", 1).unwrap();
    assert!(unit.funcs().get(id).recursive);
}

#[test]
fn nondeterministic_function_is_not_inlined() {
    let unit = compile(|q| {
        q.declare(Signature::new("local:roll"), |q| q.call("random", vec![q.int(6)]))?;
        q.call("local:roll", vec![])
    })
    .unwrap();
    assert!(matches!(unit.main(), Expr::StaticCall(_)));
}

#[test]
fn unreferenced_function_is_not_compiled() {
    let unit = compile(|q| {
        declare_inc(q, Signature::new("local:unused").param("x"))?;
        Ok(q.int(1))
    })
    .unwrap();
    let id = unit.funcs().lookup("local:unused", 1).unwrap();
    assert_eq!(unit.funcs().get(id).state, CompileState::Pending);
}

#[test]
fn declared_return_type_is_enforced() {
    let err = run_with(no_inlining(), |q| {
        q.declare(Signature::new("local:s").returns(SeqType::Integer), |q| Ok(q.string("text")))?;
        q.call("local:s", vec![])
    })
    .unwrap_err();
    assert_eq!(err.code(), "XPTY0004");
}

#[test]
fn function_descriptions_as_json() {
    let unit = compile(|q| {
        let sig = Signature::new("local:add")
            .typed_param("a", SeqType::Integer)
            .param("b")
            .returns(SeqType::Integer)
            .inline_limit(3);
        q.declare(sig, |q| {
            let (a, b) = (q.var("a")?, q.var("b")?);
            Ok(q.treat(q.add(a, b), SeqType::Integer))
        })?;
        Ok(q.int(0))
    })
    .unwrap();

    let info = unit.function_info();
    assert_eq!(info.len(), 1);
    assert_eq!(info[0].name.as_deref(), Some("local:add"));

    let json: serde_json::Value = serde_json::from_str(&unit.functions_json().unwrap()).unwrap();
    let add = &json[0];
    assert_eq!(add["name"], "local:add");
    assert_eq!(add["arity"], 2);
    assert_eq!(add["params"][0]["name"], "a");
    assert_eq!(add["params"][0]["type"], "xs:integer");
    assert_eq!(add["params"][1]["type"], "item()*");
    assert_eq!(add["returns"], "xs:integer");
    assert_eq!(add["annotations"]["updating"], false);
    assert_eq!(add["annotations"]["inline"], 3);
}

#[test]
fn failing_function_reports_its_own_error_every_time() {
    let mut unit = unit_with(CompileOptions::default(), |q| {
        q.declare(Signature::new("local:bad"), |q| {
            let f = q.closure(Signature::anonymous().param("a"), |q| q.var("a"))?;
            Ok(q.dyn_call(f, vec![q.int(1), q.int(2)]))
        })?;
        let deferred = q.closure(Signature::anonymous(), |q| q.call("local:bad", vec![]))?;
        let direct = q.call("local:bad", vec![])?;
        Ok(q.seq(vec![deferred, direct]))
    })
    .unwrap();
    let err = unit.compile().unwrap_err();
    assert!(matches!(err, QueryError::Arity { expected: 1, actual: 2, .. }), "{err:?}");
    let id = unit.funcs().lookup("local:bad", 0).unwrap();
    assert_eq!(unit.funcs().get(id).state, CompileState::Failed(err));
}

#[test]
fn nondeterminism_reaches_mutually_recursive_callers() {
    let mut unit = unit_with(no_inlining(), |q| {
        q.declare(Signature::new("local:f").param("n"), |q| {
            let n = q.var("n")?;
            let cond = q.compare(CmpOp::Le, n, q.int(0));
            let roll = q.call("random", vec![q.int(10)])?;
            let n = q.var("n")?;
            let rec = q.call("local:g", vec![q.sub(n, q.int(1))])?;
            Ok(q.iff(cond, roll, rec))
        })?;
        q.declare(Signature::new("local:g").param("n"), |q| {
            let n = q.var("n")?;
            q.call("local:f", vec![n])
        })?;
        q.call("local:f", vec![q.int(3)])
    })
    .unwrap();
    unit.compile().unwrap();
    for name in ["local:f", "local:g"] {
        let id = unit.funcs().lookup(name, 1).unwrap();
        assert!(unit.funcs().get(id).flags.ndt, "{name} should be non-deterministic");
    }
    match unit.evaluate().unwrap() {
        Value::Int(n) => assert!((0..10).contains(&n)),
        other => panic!("unexpected value: {other:?}"),
    }
}
