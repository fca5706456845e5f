use super::*;

fn ident(name: &str, offset: usize) -> Box<Expr> {
    Box::new(Expr::Ident(name.to_owned(), offset))
}

#[test]
fn power_binds_tighter_than_negation() {
    let e = parse_equation("-x^2").unwrap();
    assert_eq!(
        e,
        Expr::Unary {
            op: UnaryOp::Neg,
            expr: Box::new(Expr::Binary {
                op: BinaryOp::Pow,
                left: ident("x", 1),
                right: Box::new(Expr::Num(2.0)),
            }),
        }
    );
}

#[test]
fn power_is_right_associative() {
    match parse_equation("x^2^3").unwrap() {
        Expr::Binary {
            op: BinaryOp::Pow,
            right,
            ..
        } => assert!(matches!(
            *right,
            Expr::Binary {
                op: BinaryOp::Pow,
                ..
            }
        )),
        other => panic!("unexpected ast: {other:?}"),
    }
}

#[test]
fn equation_becomes_difference() {
    let e = parse_equation("x = y").unwrap();
    assert_eq!(
        e,
        Expr::Binary {
            op: BinaryOp::Sub,
            left: ident("x", 0),
            right: ident("y", 4),
        }
    );
}

#[test]
fn parses_calls_with_offsets() {
    match parse_equation("1 + max(x, 2)").unwrap() {
        Expr::Binary { right, .. } => match *right {
            Expr::Call { func, args, offset } => {
                assert_eq!(func, "max");
                assert_eq!(args.len(), 2);
                assert_eq!(offset, 4);
            }
            other => panic!("unexpected ast: {other:?}"),
        },
        other => panic!("unexpected ast: {other:?}"),
    }
}

#[test]
fn rejects_trailing_garbage_and_double_equals() {
    assert!(parse_equation("x + ").is_err());
    assert!(parse_equation("x = y = z").is_err());
    assert!(parse_equation("(x").is_err());
}
