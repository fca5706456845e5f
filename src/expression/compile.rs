use std::collections::BTreeMap;

use crate::expression::ast::{BinaryOp, Expr, UnaryOp};
use crate::expression::bytecode::{Axis, BuiltinId, BytecodeProgram, Op};
use crate::expression::error::ExprError;
use crate::expression::parser::parse_equation;
use crate::expression::vm::{VmStack, eval_program};
use crate::foundation::error::{SurferError, SurferResult};
use crate::foundation::math::Vec3;

/// Names a formula may use as free parameters.
pub const FORMULA_PARAMETERS: [&str; 4] = ["a", "b", "c", "d"];

/// A compiled implicit surface `f(x, y, z; a, b, c, d) = 0`.
///
/// Immutable once built, so it can be shared between the control thread and the worker behind an
/// `Arc`.
#[derive(Debug, Clone)]
pub struct SurfaceProgram {
    source: String,
    bytecode: BytecodeProgram,
    params: Vec<String>,
}

impl SurfaceProgram {
    /// Parse, bind and lower `source`.
    pub fn compile(source: &str) -> SurferResult<Self> {
        let ast = parse_equation(source)?;
        let mut params = Vec::new();
        let bound = bind(ast, &mut params)?;
        let folded = fold(bound);
        let bytecode = lower(&folded);
        Ok(Self {
            source: source.to_owned(),
            bytecode,
            params,
        })
    }

    /// The formula text this program was compiled from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Parameters referenced by the formula, in slot order.
    pub fn parameters(&self) -> &[String] {
        &self.params
    }

    /// Resolve slot values from a name → value map.
    ///
    /// Every referenced parameter must be assigned.
    pub fn bind_parameters(&self, values: &BTreeMap<String, f64>) -> SurferResult<Vec<f64>> {
        self.params
            .iter()
            .map(|name| {
                values.get(name).copied().ok_or_else(|| {
                    SurferError::formula(format!("parameter '{name}' has no value"))
                })
            })
            .collect()
    }

    /// Evaluate at a point. Allocates a fresh stack; use [`Self::eval_with_stack`] in loops.
    pub fn eval(&self, p: Vec3, params: &[f64]) -> f64 {
        let mut stack = VmStack::new();
        self.eval_with_stack(p, params, &mut stack)
    }

    pub(crate) fn eval_with_stack(&self, p: Vec3, params: &[f64], stack: &mut VmStack) -> f64 {
        eval_program(&self.bytecode, p, params, stack)
    }
}

fn bind(expr: Expr, params: &mut Vec<String>) -> Result<Expr, ExprError> {
    Ok(match expr {
        Expr::Ident(name, offset) => match name.as_str() {
            "x" => Expr::Coord(Axis::X),
            "y" => Expr::Coord(Axis::Y),
            "z" => Expr::Coord(Axis::Z),
            "pi" => Expr::Num(std::f64::consts::PI),
            _ if FORMULA_PARAMETERS.contains(&name.as_str()) => {
                let slot = match params.iter().position(|p| *p == name) {
                    Some(i) => i,
                    None => {
                        params.push(name);
                        params.len() - 1
                    }
                };
                Expr::Param(slot as u8)
            }
            _ => {
                return Err(ExprError::new(
                    offset,
                    format!("undefined parameter '{name}'"),
                ));
            }
        },
        Expr::Call { func, args, offset } => {
            let Some(id) = BuiltinId::lookup(&func) else {
                return Err(ExprError::new(offset, format!("unknown function '{func}'")));
            };
            if args.len() != id.arity() {
                return Err(ExprError::new(
                    offset,
                    format!(
                        "{func} expects {} argument(s), got {}",
                        id.arity(),
                        args.len()
                    ),
                ));
            }
            let args = args
                .into_iter()
                .map(|a| bind(a, params))
                .collect::<Result<Vec<_>, _>>()?;
            Expr::Builtin { id, args }
        }
        Expr::Unary { op, expr } => Expr::Unary {
            op,
            expr: Box::new(bind(*expr, params)?),
        },
        Expr::Binary { op, left, right } => Expr::Binary {
            op,
            left: Box::new(bind(*left, params)?),
            right: Box::new(bind(*right, params)?),
        },
        e @ (Expr::Num(_) | Expr::Coord(_) | Expr::Param(_) | Expr::Builtin { .. }) => e,
    })
}

// Constant folding over literal-only subtrees.
fn fold(expr: Expr) -> Expr {
    match expr {
        Expr::Unary { op, expr } => match (op, fold(*expr)) {
            (UnaryOp::Neg, Expr::Num(v)) => Expr::Num(-v),
            (op, e) => Expr::Unary {
                op,
                expr: Box::new(e),
            },
        },
        Expr::Binary { op, left, right } => match (fold(*left), fold(*right)) {
            (Expr::Num(a), Expr::Num(b)) => Expr::Num(apply_binary(op, a, b)),
            (l, r) => Expr::Binary {
                op,
                left: Box::new(l),
                right: Box::new(r),
            },
        },
        Expr::Builtin { id, args } => {
            let args: Vec<Expr> = args.into_iter().map(fold).collect();
            match args.as_slice() {
                [Expr::Num(a)] => Expr::Num(id.apply1(*a)),
                [Expr::Num(a), Expr::Num(b)] => Expr::Num(id.apply2(*a, *b)),
                _ => Expr::Builtin { id, args },
            }
        }
        e => e,
    }
}

pub(crate) fn apply_binary(op: BinaryOp, a: f64, b: f64) -> f64 {
    match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div => a / b,
        BinaryOp::Pow => a.powf(b),
    }
}

fn lower(expr: &Expr) -> BytecodeProgram {
    let mut out = BytecodeProgram::new();
    let mut depth = 0usize;
    emit(expr, &mut out, &mut depth);
    out
}

fn emit(expr: &Expr, out: &mut BytecodeProgram, depth: &mut usize) {
    match expr {
        Expr::Num(v) => {
            let idx = out.push_const(*v);
            push(out, depth, Op::PushConst(idx), 1);
        }
        Expr::Coord(axis) => push(out, depth, Op::LoadCoord(*axis), 1),
        Expr::Param(slot) => push(out, depth, Op::LoadParam(*slot), 1),
        Expr::Unary {
            op: UnaryOp::Neg,
            expr,
        } => {
            emit(expr, out, depth);
            push(out, depth, Op::Neg, 0);
        }
        Expr::Binary { op, left, right } => {
            emit(left, out, depth);
            if *op == BinaryOp::Pow
                && let Some(n) = integral_exponent(right)
            {
                push(out, depth, Op::PowI(n), 0);
                return;
            }
            emit(right, out, depth);
            let op = match op {
                BinaryOp::Add => Op::Add,
                BinaryOp::Sub => Op::Sub,
                BinaryOp::Mul => Op::Mul,
                BinaryOp::Div => Op::Div,
                BinaryOp::Pow => Op::Pow,
            };
            push(out, depth, op, -1);
        }
        Expr::Builtin { id, args } => {
            for a in args {
                emit(a, out, depth);
            }
            if args.len() == 2 {
                push(out, depth, Op::Call2(*id), -1);
            } else {
                push(out, depth, Op::Call1(*id), 0);
            }
        }
        // Unbound nodes never reach lowering; `bind` rejects or resolves them.
        Expr::Ident(..) | Expr::Call { .. } => {
            let idx = out.push_const(f64::NAN);
            push(out, depth, Op::PushConst(idx), 1);
        }
    }
}

fn push(out: &mut BytecodeProgram, depth: &mut usize, op: Op, delta: isize) {
    out.ops.push(op);
    *depth = depth.saturating_add_signed(delta);
    out.max_stack = out.max_stack.max(*depth);
}

fn integral_exponent(e: &Expr) -> Option<i32> {
    match e {
        Expr::Num(v) if v.fract() == 0.0 && v.abs() <= 64.0 => Some(*v as i32),
        _ => None,
    }
}

#[cfg(test)]
#[path = "../../tests/unit/expression/compile.rs"]
mod tests;
