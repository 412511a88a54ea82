//! Messages of errors raised by compiling and running queries.

mod common;

use common::{compile, compile_with, run, run_with};
use xqfunc::diagnostics::render_to_string;
use xqfunc::expr::{ArithOp, CmpOp};
use xqfunc::{CompileOptions, QueryBuilder, QueryError, Signature};

fn message(result: Result<impl std::fmt::Debug, QueryError>) -> String {
    result.unwrap_err().to_string()
}

fn declare_add(q: &mut QueryBuilder) -> Result<(), QueryError> {
    q.declare(Signature::new("local:add").param("a").param("b"), |q| {
        let (a, b) = (q.var("a")?, q.var("b")?);
        Ok(q.add(a, b))
    })?;
    Ok(())
}

#[test]
fn too_many_arguments() {
    let msg = message(compile(|q| {
        declare_add(q)?;
        q.call("local:add", vec![q.int(1), q.int(2), q.int(3)])
    }));
    insta::assert_snapshot!(msg, @"[XPTY0004] local:add: 3 argument(s) supplied, 2 expected");
}

#[test]
fn unknown_function_with_suggestion() {
    let msg = message(compile(|q| {
        declare_add(q)?;
        q.call("local:ad", vec![q.int(1), q.int(2)])
    }));
    insta::assert_snapshot!(msg, @"[XPST0017] Unknown function: local:ad#2; did you mean 'local:add'?");
}

#[test]
fn duplicate_declaration() {
    let msg = message(compile(|q| {
        declare_add(q)?;
        declare_add(q)?;
        Ok(q.empty())
    }));
    insta::assert_snapshot!(msg, @"[XQST0034] Duplicate declaration of function local:add#2");
}

#[test]
fn undeclared_variable() {
    let msg = message(compile(|q| q.var("nope")));
    insta::assert_snapshot!(msg, @"[XPST0008] Undeclared variable: $nope");
}

#[test]
fn function_performing_undeclared_updates() {
    let msg = message(compile(|q| {
        q.declare(Signature::new("local:log").param("x"), |q| {
            let x = q.var("x")?;
            q.call("output", vec![x])
        })?;
        Ok(q.empty())
    }));
    insta::assert_snapshot!(msg, @"[XUST0001] Function local:log#1 performs updates but is not declared updating");
}

#[test]
fn updating_function_without_updates() {
    let msg = message(compile(|q| {
        q.declare(Signature::new("local:nothing").updating(), |q| Ok(q.int(1)))?;
        Ok(q.empty())
    }));
    insta::assert_snapshot!(msg, @"[XUST0002] Function local:nothing#0 is declared updating but does not perform updates");
}

#[test]
fn closure_performing_undeclared_updates() {
    let msg = message(compile(|q| q.closure(Signature::anonymous(), |q| q.call("output", vec![q.int(1)]))));
    insta::assert_snapshot!(msg, @"[XUST0001] Function expression performs updates but is not declared updating");
}

#[test]
fn invoke_updating_of_plain_function() {
    let msg = message(compile(|q| {
        let f = q.closure(Signature::anonymous().param("a"), |q| q.var("a"))?;
        Ok(q.updating_dyn_call(f, vec![q.int(1)]))
    }));
    insta::assert_snapshot!(msg, @"[XUST0002] Function (anonymous-function)#1 is not updating");
}

#[test]
fn division_by_zero_inside_called_closure() {
    let msg = message(run(|q| {
        let f = q.closure(Signature::anonymous(), |q| Ok(q.arith(ArithOp::IDiv, q.int(1), q.int(0))))?;
        Ok(q.dyn_call(f, vec![]))
    }));
    insta::assert_snapshot!(msg, @"[FOAR0001] Division by zero");
}

#[test]
fn stack_overflow() {
    let options = CompileOptions { tail_calls: false, max_depth: 20, ..CompileOptions::default() };
    let msg = message(run_with(options, |q| {
        q.declare(Signature::new("local:down").param("n"), |q| {
            let n = q.var("n")?;
            let cond = q.compare(CmpOp::Le, n, q.int(0));
            let n = q.var("n")?;
            let rec = q.call("local:down", vec![q.sub(n, q.int(1))])?;
            Ok(q.iff(cond, q.int(0), rec))
        })?;
        q.call("local:down", vec![q.int(100)])
    }));
    insta::assert_snapshot!(msg, @"Stack overflow: more than 20 nested function calls");
}

#[test]
fn invalid_options() {
    let options = CompileOptions { max_depth: 0, ..CompileOptions::default() };
    let err = compile_with(options, |q| Ok(q.int(1))).unwrap_err();
    insta::assert_snapshot!(render_to_string("1", &err).trim_end(), @"error: Configuration error: max_depth must be at least 1");
}

#[test]
fn interrupted_query() {
    insta::assert_snapshot!(render_to_string("", &QueryError::Cancelled).trim_end(), @"error: Query was interrupted");
}
