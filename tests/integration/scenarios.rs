//! End-to-end runs of small queries over declared functions.

mod common;

use common::{compile_with, no_inlining, run, run_with, unit_with};
use xqfunc::expr::{CmpOp, Expr};
use xqfunc::{CompileOptions, QueryBuilder, QueryError, Signature, Span, Value};

/// `declare function local:count($n) { if ($n <= 0) then 0 else 1 + local:count($n - 1) }`
fn declare_count(q: &mut QueryBuilder) -> Result<(), QueryError> {
    q.declare(Signature::new("local:count").param("n"), |q| {
        let n = q.var("n")?;
        let cond = q.compare(CmpOp::Le, n, q.int(0));
        let n = q.var("n")?;
        let rec = q.call("local:count", vec![q.sub(n, q.int(1))])?;
        Ok(q.iff(cond, q.int(0), q.add(q.int(1), rec)))
    })?;
    Ok(())
}

/// `declare function local:count2($n, $acc) { if ($n <= 0) then $acc else local:count2($n - 1, $acc + 1) }`
fn declare_count2(q: &mut QueryBuilder) -> Result<(), QueryError> {
    q.declare(Signature::new("local:count2").param("n").param("acc"), |q| {
        let n = q.var("n")?;
        let cond = q.compare(CmpOp::Le, n, q.int(0));
        let acc = q.var("acc")?;
        let (n, acc2) = (q.var("n")?, q.var("acc")?);
        let rec = q.call("local:count2", vec![q.sub(n, q.int(1)), q.add(acc2, q.int(1))])?;
        Ok(q.iff(cond, acc, rec))
    })?;
    Ok(())
}

#[test]
fn increment_function() {
    let result = run(|q| {
        q.declare(Signature::new("local:f").param("x"), |q| {
            let x = q.var("x")?;
            Ok(q.add(x, q.int(1)))
        })?;
        q.call("local:f", vec![q.int(41)])
    });
    assert_eq!(result.unwrap(), Value::Int(42));
}

#[test]
fn increment_function_without_inlining() {
    let result = run_with(no_inlining(), |q| {
        q.declare(Signature::new("local:f").param("x"), |q| {
            let x = q.var("x")?;
            Ok(q.add(x, q.int(1)))
        })?;
        q.call("local:f", vec![q.int(41)])
    });
    assert_eq!(result.unwrap(), Value::Int(42));
}

#[test]
fn self_recursive_count() {
    let result = run(|q| {
        declare_count(q)?;
        q.call("local:count", vec![q.int(5)])
    });
    assert_eq!(result.unwrap(), Value::Int(5));
}

#[test]
fn deep_non_tail_recursion_fails_cleanly() {
    let result = run(|q| {
        declare_count(q)?;
        q.call("local:count", vec![q.int(1_000)])
    });
    match result {
        Ok(value) => assert_eq!(value, Value::Int(1_000)),
        Err(err) => assert!(matches!(err, QueryError::StackOverflow { .. }), "{err:?}"),
    }
}

#[test]
fn failed_unit_keeps_failing() {
    let mut unit = unit_with(CompileOptions::default(), |q| {
        let f = q.closure(Signature::anonymous().param("a"), |q| q.var("a"))?;
        Ok(q.dyn_call(f, vec![q.int(1), q.int(2)]))
    })
    .unwrap();
    let first = unit.compile().unwrap_err();
    assert!(matches!(first, QueryError::Arity { expected: 1, actual: 2, .. }), "{first:?}");
    assert_eq!(unit.compile().unwrap_err(), first);
    assert_eq!(unit.evaluate().unwrap_err(), first);
    assert!(!unit.is_compiled());
    assert!(matches!(unit.main(), Expr::DynCall(_)));
}

#[test]
fn tail_recursive_count_runs_in_constant_depth() {
    let options = CompileOptions { max_depth: 64, ..CompileOptions::default() };
    let result = run_with(options, |q| {
        declare_count2(q)?;
        q.call("local:count2", vec![q.int(100_000), q.int(0)])
    });
    assert_eq!(result.unwrap(), Value::Int(100_000));
}

#[test]
fn without_tail_calls_deep_recursion_overflows() {
    let options = CompileOptions { tail_calls: false, max_depth: 50, ..CompileOptions::default() };
    let result = run_with(options.clone(), |q| {
        declare_count2(q)?;
        q.call("local:count2", vec![q.int(40), q.int(0)])
    });
    assert_eq!(result.unwrap(), Value::Int(40));

    let err = run_with(options, |q| {
        declare_count2(q)?;
        q.call("local:count2", vec![q.int(100), q.int(0)])
    })
    .unwrap_err();
    assert_eq!(err, QueryError::StackOverflow { depth: 50 });
}

#[test]
fn partial_application_of_declared_function() {
    let result = run(|q| {
        q.declare(Signature::new("local:add").param("a").param("b"), |q| {
            let (a, b) = (q.var("a")?, q.var("b")?);
            Ok(q.add(a, b))
        })?;
        let partial = q.partial("local:add", vec![None, Some(q.int(10))])?;
        Ok(q.dyn_call(partial, vec![q.int(5)]))
    });
    assert_eq!(result.unwrap(), Value::Int(15));
}

#[test]
fn forward_reference_is_resolved_by_later_declaration() {
    let result = run(|q| {
        q.declare(Signature::new("local:a"), |q| q.call("local:b", vec![]))?;
        q.declare(Signature::new("local:b"), |q| Ok(q.int(7)))?;
        q.call("local:a", vec![])
    });
    assert_eq!(result.unwrap(), Value::Int(7));
}

#[test]
fn too_many_arguments() {
    let err = compile_with(CompileOptions::default(), |q| {
        q.declare(Signature::new("local:add").param("a").param("b"), |q| {
            let (a, b) = (q.var("a")?, q.var("b")?);
            Ok(q.add(a, b))
        })?;
        q.at(Span::new(20, 38));
        q.call("local:add", vec![q.int(1), q.int(2), q.int(3)])
    })
    .unwrap_err();
    assert_eq!(err, QueryError::arity("local:add", 2, 3, Span::new(20, 38)));
    let QueryError::Arity { expected, actual, .. } = err else { unreachable!() };
    assert_eq!((expected, actual), (2, 3));
}

#[test]
fn main_expression_sees_let_bindings() {
    let result = run(|q| {
        q.declare(Signature::new("local:double").param("x"), |q| {
            let x = q.var("x")?;
            Ok(q.mul(x, q.int(2)))
        })?;
        q.let_in("v", Expr::Value(Value::Int(21)), |q| {
            let v = q.var("v")?;
            q.call("local:double", vec![v])
        })
    });
    assert_eq!(result.unwrap(), Value::Int(42));
}
