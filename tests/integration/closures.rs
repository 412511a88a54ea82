//! Inline function expressions: capture, pre-evaluation, deferred errors.

mod common;

use common::{compile, ints, no_inlining, run, run_with};
use xqfunc::expr::{ArithOp, CmpOp, Expr};
use xqfunc::{QueryBuilder, QueryError, SeqType, Signature, Value};

/// `function($x) { $x + $a }` inside a binding of `$a`.
fn add_captured(q: &mut QueryBuilder) -> Result<Expr, QueryError> {
    q.closure(Signature::anonymous().param("x"), |q| {
        let (x, a) = (q.var("x")?, q.var("a")?);
        Ok(q.add(x, a))
    })
}

#[test]
fn captured_variable_is_visible_in_body() {
    let result = run(|q| {
        q.let_in("a", q.int(10), |q| {
            let f = add_captured(q)?;
            Ok(q.dyn_call(f, vec![q.int(5)]))
        })
    });
    assert_eq!(result.unwrap(), Value::Int(15));
}

#[test]
fn captured_variable_without_inlining() {
    let result = run_with(no_inlining(), |q| {
        q.let_in("a", q.int(10), |q| {
            let f = add_captured(q)?;
            q.let_in("f", f, |q| {
                let f = q.var("f")?;
                Ok(q.dyn_call(f, vec![q.int(5)]))
            })
        })
    });
    assert_eq!(result.unwrap(), Value::Int(15));
}

#[test]
fn nested_closures_capture_through_each_level() {
    let body = |q: &mut QueryBuilder| -> Result<Expr, QueryError> {
        q.let_in("a", q.int(1), |q| {
            q.let_in("b", q.int(2), |q| {
                let outer = q.closure(Signature::anonymous(), |q| {
                    q.closure(Signature::anonymous(), |q| {
                        let (a, b) = (q.var("a")?, q.var("b")?);
                        Ok(q.add(a, b))
                    })
                })?;
                let inner = q.dyn_call(outer, vec![]);
                Ok(q.dyn_call(inner, vec![]))
            })
        })
    };
    assert_eq!(run(body).unwrap(), Value::Int(3));
    assert_eq!(run_with(no_inlining(), body).unwrap(), Value::Int(3));
}

#[test]
fn closure_returned_by_declared_function() {
    let body = |q: &mut QueryBuilder| -> Result<Expr, QueryError> {
        q.declare(Signature::new("local:adder").param("n"), |q| {
            q.closure(Signature::anonymous().param("x"), |q| {
                let (x, n) = (q.var("x")?, q.var("n")?);
                Ok(q.add(x, n))
            })
        })?;
        let adder = q.call("local:adder", vec![q.int(5)])?;
        Ok(q.dyn_call(adder, vec![q.int(10)]))
    };
    assert_eq!(run(body).unwrap(), Value::Int(15));
    assert_eq!(run_with(no_inlining(), body).unwrap(), Value::Int(15));
}

#[test]
fn captured_random_value_is_taken_once() {
    let body = |q: &mut QueryBuilder| -> Result<Expr, QueryError> {
        let random = q.call("random", vec![q.int(1_000_000)])?;
        q.let_in("r", random, |q| {
            let f = q.closure(Signature::anonymous(), |q| q.var("r"))?;
            q.let_in("f", f, |q| {
                let (f1, f2) = (q.var("f")?, q.var("f")?);
                let (c1, c2) = (q.dyn_call(f1, vec![]), q.dyn_call(f2, vec![]));
                Ok(q.compare(CmpOp::Eq, c1, c2))
            })
        })
    };
    assert_eq!(run(body).unwrap(), Value::Bool(true));
    assert_eq!(run_with(no_inlining(), body).unwrap(), Value::Bool(true));
}

#[test]
fn closure_with_random_body_is_not_pre_evaluated() {
    let unit = compile(|q| q.closure(Signature::anonymous(), |q| q.call("random", vec![q.int(100)]))).unwrap();
    assert!(matches!(unit.main(), Expr::Closure(_)));
}

#[test]
fn closure_without_captures_is_pre_evaluated() {
    let unit = compile(|q| {
        q.closure(Signature::anonymous().param("x"), |q| {
            let x = q.var("x")?;
            Ok(q.add(x, q.int(1)))
        })
    })
    .unwrap();
    let Expr::Value(Value::Func(item)) = unit.main() else { panic!("expected a function item, got {:?}", unit.main()) };
    assert_eq!(item.arity(), 1);
    assert_eq!(item.name(), None);
    assert_eq!(item.to_string(), "(anonymous-function)#1");
}

/// `function() { function($a) { $a }(1, 2) }`: the inner call can never succeed.
fn broken_closure(q: &mut QueryBuilder) -> Result<Expr, QueryError> {
    q.closure(Signature::anonymous(), |q| {
        let inner = q.closure(Signature::anonymous().param("a"), |q| q.var("a"))?;
        Ok(q.dyn_call(inner, vec![q.int(1), q.int(2)]))
    })
}

#[test]
fn error_in_uncalled_closure_is_not_raised() {
    let result = run(|q| {
        let f = broken_closure(q)?;
        q.let_in("f", f, |q| Ok(q.int(42)))
    });
    assert_eq!(result.unwrap(), Value::Int(42));
}

#[test]
fn error_in_closure_is_raised_when_called() {
    let body = |q: &mut QueryBuilder| -> Result<Expr, QueryError> {
        let f = broken_closure(q)?;
        q.let_in("f", f, |q| {
            let f = q.var("f")?;
            Ok(q.dyn_call(f, vec![]))
        })
    };
    let err = run(body).unwrap_err();
    assert!(matches!(err, QueryError::Arity { expected: 1, actual: 2, .. }), "{err:?}");
    let err = run_with(no_inlining(), body).unwrap_err();
    assert!(matches!(err, QueryError::Arity { expected: 1, actual: 2, .. }), "{err:?}");
}

#[test]
fn division_by_zero_in_closure_is_deferred() {
    let unit = compile(|q| {
        let f = q.closure(Signature::anonymous(), |q| Ok(q.arith(ArithOp::IDiv, q.int(1), q.int(0))))?;
        q.let_in("f", f, |q| Ok(q.int(1)))
    });
    assert!(unit.is_ok());
}

#[test]
fn parameter_type_is_checked() {
    let body = |q: &mut QueryBuilder| -> Result<Expr, QueryError> {
        let f = q.closure(Signature::anonymous().typed_param("x", SeqType::Integer), |q| q.var("x"))?;
        Ok(q.dyn_call(f, vec![q.string("a")]))
    };
    assert_eq!(run(body).unwrap_err().code(), "XPTY0004");
    assert_eq!(run_with(no_inlining(), body).unwrap_err().code(), "XPTY0004");
}

#[test]
fn return_type_is_checked() {
    let body = |q: &mut QueryBuilder| -> Result<Expr, QueryError> {
        let f = q.closure(Signature::anonymous().returns(SeqType::Integer), |q| Ok(q.string("a")))?;
        Ok(q.dyn_call(f, vec![]))
    };
    assert_eq!(run(body).unwrap_err().code(), "XPTY0004");
    assert_eq!(run_with(no_inlining(), body).unwrap_err().code(), "XPTY0004");
}

#[test]
fn matching_types_pass() {
    let result = run(|q| {
        let sig = Signature::anonymous().typed_param("x", SeqType::Integer).returns(SeqType::Integer);
        let f = q.closure(sig, |q| {
            let x = q.var("x")?;
            Ok(q.mul(x.clone(), x))
        })?;
        Ok(q.dyn_call(f, vec![q.int(7)]))
    });
    assert_eq!(result.unwrap(), Value::Int(49));
}

/// `let $f := function($g, $n) { if ($n <= 0) then 3 else $g($g, $n - 1) } return $f($f, 5)`
#[test]
fn self_application_terminates() {
    let body = |q: &mut QueryBuilder| -> Result<Expr, QueryError> {
        let f = q.closure(Signature::anonymous().param("g").param("n"), |q| {
            let n = q.var("n")?;
            let cond = q.compare(CmpOp::Le, n, q.int(0));
            let (g1, g2, n) = (q.var("g")?, q.var("g")?, q.var("n")?);
            let rec = q.dyn_call(g1, vec![g2, q.sub(n, q.int(1))]);
            Ok(q.iff(cond, q.int(3), rec))
        })?;
        q.let_in("f", f, |q| {
            let (f1, f2) = (q.var("f")?, q.var("f")?);
            Ok(q.dyn_call(f1, vec![f2, q.int(5)]))
        })
    };
    assert_eq!(run(body).unwrap(), Value::Int(3));
    assert_eq!(run_with(no_inlining(), body).unwrap(), Value::Int(3));
}

#[test]
fn closure_passed_to_for_each() {
    let result = run(|q| {
        let square = q.closure(Signature::anonymous().param("x"), |q| {
            let x = q.var("x")?;
            Ok(q.mul(x.clone(), x))
        })?;
        let seq = q.seq(vec![q.int(1), q.int(2), q.int(3)]);
        q.call("for-each", vec![seq, square])
    });
    assert_eq!(result.unwrap(), ints(&[1, 4, 9]));
}

#[test]
fn function_items_compare_by_identity() {
    let result = run(|q| {
        let f = q.closure(Signature::anonymous(), |q| Ok(q.int(1)))?;
        q.let_in("f", f, |q| {
            let (a, b) = (q.var("f")?, q.var("f")?);
            Ok(q.seq(vec![a, b]))
        })
    })
    .unwrap();
    let items = result.items();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0], items[1]);
}
