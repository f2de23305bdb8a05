// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn binop(lhs: Expr, op: BinOp, rhs: Expr) -> Expr {
    Expr::Binary {
        lhs: Box::new(lhs),
        op,
        rhs: Box::new(rhs),
    }
}

#[test]
fn precedence_mul_binds_tighter_than_add() {
    let parsed = parse_formula("1 + 2 * 3").unwrap();
    assert_eq!(
        parsed,
        binop(
            Expr::Int(1),
            BinOp::Add,
            binop(Expr::Int(2), BinOp::Mul, Expr::Int(3)),
        )
    );
}

#[test]
fn parens_override_precedence() {
    let parsed = parse_formula("(1 + 2) * 3").unwrap();
    assert_eq!(
        parsed,
        binop(
            binop(Expr::Int(1), BinOp::Add, Expr::Int(2)),
            BinOp::Mul,
            Expr::Int(3),
        )
    );
}

#[test]
fn comparison_binds_looser_than_arithmetic() {
    let parsed = parse_formula("a.x + 1 > 2").unwrap();
    assert_eq!(
        parsed,
        binop(
            binop(Expr::Lookup("a.x".into()), BinOp::Add, Expr::Int(1)),
            BinOp::Gt,
            Expr::Int(2),
        )
    );
}

#[test]
fn logical_operators_bind_loosest() {
    let parsed = parse_formula("a.x > 1 && a.y < 2 || a.z == 3").unwrap();
    match parsed {
        Expr::Binary { op: BinOp::Or, .. } => {}
        other => panic!("expected top-level ||, got {other:?}"),
    }
}

#[test]
fn power_is_right_associative() {
    let parsed = parse_formula("2 ** 3 ** 2").unwrap();
    assert_eq!(
        parsed,
        binop(
            Expr::Int(2),
            BinOp::Pow,
            binop(Expr::Int(3), BinOp::Pow, Expr::Int(2)),
        )
    );
}

#[test]
fn dotted_lookup_with_numeric_segment() {
    assert_eq!(
        parse_formula("previous.files.0").unwrap(),
        Expr::Lookup("previous.files.0".into())
    );
}

#[test]
fn postfix_index_parses() {
    assert_eq!(
        parse_formula("recipe.files[0]").unwrap(),
        Expr::Index {
            base: Box::new(Expr::Lookup("recipe.files".into())),
            index: Box::new(Expr::Int(0)),
        }
    );
}

#[test]
fn call_with_args() {
    assert_eq!(
        parse_formula("RANGE(1, 5)").unwrap(),
        Expr::Call {
            func: "RANGE".into(),
            args: vec![Expr::Int(1), Expr::Int(5)],
        }
    );
}

#[test]
fn call_no_args_and_nested_calls() {
    assert_eq!(
        parse_formula("LIST()").unwrap(),
        Expr::Call {
            func: "LIST".into(),
            args: vec![],
        }
    );
    let parsed = parse_formula("MAX(MIN(1, 2), 3)").unwrap();
    match parsed {
        Expr::Call { func, args } => {
            assert_eq!(func, "MAX");
            assert_eq!(args.len(), 2);
            assert!(matches!(&args[0], Expr::Call { func, .. } if func == "MIN"));
        }
        other => panic!("expected call, got {other:?}"),
    }
}

#[test]
fn list_literal() {
    assert_eq!(
        parse_formula("[1, 'a', true]").unwrap(),
        Expr::List(vec![Expr::Int(1), Expr::Str("a".into()), Expr::Bool(true)])
    );
}

#[test]
fn membership_and_negation() {
    let parsed = parse_formula("'L' in recipe.bands").unwrap();
    assert_eq!(
        parsed,
        binop(
            Expr::Str("L".into()),
            BinOp::In,
            Expr::Lookup("recipe.bands".into()),
        )
    );
    let parsed = parse_formula("x not in [1, 2]").unwrap();
    assert!(matches!(parsed, Expr::Binary { op: BinOp::NotIn, .. }));
}

#[test]
fn unary_chain() {
    let parsed = parse_formula("!-1").unwrap();
    assert_eq!(
        parsed,
        Expr::Unary {
            op: UnOp::Not,
            expr: Box::new(Expr::Unary {
                op: UnOp::Neg,
                expr: Box::new(Expr::Int(1)),
            }),
        }
    );
}

#[test]
fn boolean_literals_both_casings() {
    assert_eq!(parse_formula("true").unwrap(), Expr::Bool(true));
    assert_eq!(parse_formula("False").unwrap(), Expr::Bool(false));
}

#[test]
fn trailing_tokens_are_an_error() {
    assert!(matches!(
        parse_formula("1 2"),
        Err(SubstError::Syntax { .. })
    ));
}

#[test]
fn empty_formula_is_an_error() {
    assert!(matches!(parse_formula(""), Err(SubstError::Syntax { .. })));
}

#[test]
fn unclosed_paren_is_an_error() {
    assert!(matches!(
        parse_formula("(1 + 2"),
        Err(SubstError::Syntax { .. })
    ));
}
