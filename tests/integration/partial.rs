//! Partial function application.

mod common;

use common::{compile, ints, no_inlining, run, run_with};
use xqfunc::expr::Expr;
use xqfunc::{QueryBuilder, QueryError, Signature, Value};

fn declare_add(q: &mut QueryBuilder) -> Result<(), QueryError> {
    q.declare(Signature::new("local:add").param("a").param("b"), |q| {
        let (a, b) = (q.var("a")?, q.var("b")?);
        Ok(q.add(a, b))
    })?;
    Ok(())
}

/// `local:add(?, 10)(5)`
fn add_ten_to_five(q: &mut QueryBuilder) -> Result<Expr, QueryError> {
    declare_add(q)?;
    let partial = q.partial("local:add", vec![None, Some(q.int(10))])?;
    Ok(q.dyn_call(partial, vec![q.int(5)]))
}

#[test]
fn partial_application_folds_at_compile_time() {
    let unit = compile(add_ten_to_five).unwrap();
    assert_eq!(unit.main(), &Expr::Value(Value::Int(15)));
}

#[test]
fn partial_application_at_run_time() {
    assert_eq!(run_with(no_inlining(), add_ten_to_five).unwrap(), Value::Int(15));
}

#[test]
fn partial_item_takes_parameter_names_of_target() {
    let result = run(|q| {
        declare_add(q)?;
        q.partial("local:add", vec![None, Some(q.int(10))])
    })
    .unwrap();
    let Value::Func(item) = result else { panic!("expected a function item") };
    assert_eq!(item.arity(), 1);
    assert_eq!(item.param_name(0), Some("a"));
    assert_eq!(item.name(), None);
}

#[test]
fn arity_of_partial_application() {
    let result = run(|q| {
        declare_add(q)?;
        let partial = q.partial("local:add", vec![None, None])?;
        q.call("function-arity", vec![partial])
    });
    assert_eq!(result.unwrap(), Value::Int(2));
}

#[test]
fn partial_builtin_fold() {
    let body = |q: &mut QueryBuilder| -> Result<Expr, QueryError> {
        let sum = q.closure(Signature::anonymous().param("acc").param("x"), |q| {
            let (acc, x) = (q.var("acc")?, q.var("x")?);
            Ok(q.add(acc, x))
        })?;
        let total = q.partial("fold-left", vec![None, Some(q.int(0)), Some(sum)])?;
        let seq = q.seq(vec![q.int(1), q.int(2), q.int(3)]);
        Ok(q.dyn_call(total, vec![seq]))
    };
    assert_eq!(run(body).unwrap(), Value::Int(6));
    assert_eq!(run_with(no_inlining(), body).unwrap(), Value::Int(6));
}

#[test]
fn partial_closure_with_capture() {
    let body = |q: &mut QueryBuilder| -> Result<Expr, QueryError> {
        q.let_in("k", q.int(3), |q| {
            let f = q.closure(Signature::anonymous().param("a").param("b"), |q| {
                let (a, b, k) = (q.var("a")?, q.var("b")?, q.var("k")?);
                Ok(q.add(q.mul(a, b), k))
            })?;
            let partial = q.partial_dyn(f, vec![None, Some(q.int(2))]);
            Ok(q.dyn_call(partial, vec![q.int(5)]))
        })
    };
    assert_eq!(run(body).unwrap(), Value::Int(13));
    assert_eq!(run_with(no_inlining(), body).unwrap(), Value::Int(13));
}

#[test]
fn placeholders_keep_argument_positions() {
    let result = run(|q| {
        q.declare(Signature::new("local:triple").param("a").param("b").param("c"), |q| {
            let (a, b, c) = (q.var("a")?, q.var("b")?, q.var("c")?);
            Ok(q.seq(vec![a, b, c]))
        })?;
        let partial = q.partial("local:triple", vec![None, Some(q.int(2)), None])?;
        Ok(q.dyn_call(partial, vec![q.int(1), q.int(3)]))
    });
    assert_eq!(result.unwrap(), ints(&[1, 2, 3]));
}

#[test]
fn partial_with_wrong_argument_count_fails_to_compile() {
    let err = compile(|q| {
        let f = q.closure(Signature::anonymous().param("a"), |q| q.var("a"))?;
        Ok(q.partial_dyn(f, vec![None, Some(q.int(1))]))
    })
    .unwrap_err();
    assert!(matches!(err, QueryError::Arity { expected: 1, actual: 2, .. }), "{err:?}");
}

#[test]
fn partial_with_wrong_argument_count_fails_at_run_time() {
    let err = run_with(no_inlining(), |q| {
        q.declare(Signature::new("local:bind").param("f"), |q| {
            let f = q.var("f")?;
            Ok(q.partial_dyn(f, vec![None, Some(q.int(1))]))
        })?;
        let identity = q.closure(Signature::anonymous().param("a"), |q| q.var("a"))?;
        q.call("local:bind", vec![identity])
    })
    .unwrap_err();
    assert!(matches!(err, QueryError::Arity { expected: 1, actual: 2, .. }), "{err:?}");
}
