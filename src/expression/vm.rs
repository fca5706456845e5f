use smallvec::SmallVec;

use crate::expression::bytecode::{Axis, BytecodeProgram, Op};
use crate::foundation::math::Vec3;

/// Operand stack reused across evaluations; stays inline for typical surface formulas.
pub(crate) type VmStack = SmallVec<[f64; 32]>;

/// Run `p` at point `pt`.
///
/// Programs come from the compiler, which tracks stack depth, so malformed programs are not
/// expected here; an underflow yields NaN rather than a panic.
pub(crate) fn eval_program(
    p: &BytecodeProgram,
    pt: Vec3,
    params: &[f64],
    stack: &mut VmStack,
) -> f64 {
    stack.clear();

    for &op in &p.ops {
        match op {
            Op::PushConst(idx) => {
                stack.push(p.consts.get(idx.0 as usize).copied().unwrap_or(f64::NAN));
            }
            Op::LoadCoord(axis) => stack.push(match axis {
                Axis::X => pt.x,
                Axis::Y => pt.y,
                Axis::Z => pt.z,
            }),
            Op::LoadParam(slot) => {
                stack.push(params.get(slot as usize).copied().unwrap_or(f64::NAN));
            }

            Op::Neg => {
                let v = pop(stack);
                stack.push(-v);
            }
            Op::Add => bin(stack, |a, b| a + b),
            Op::Sub => bin(stack, |a, b| a - b),
            Op::Mul => bin(stack, |a, b| a * b),
            Op::Div => bin(stack, |a, b| a / b),
            Op::Pow => bin(stack, f64::powf),
            Op::PowI(n) => {
                let v = pop(stack);
                stack.push(v.powi(n));
            }

            Op::Call1(id) => {
                let v = pop(stack);
                stack.push(id.apply1(v));
            }
            Op::Call2(id) => bin(stack, |a, b| id.apply2(a, b)),
        }
    }

    if stack.len() != 1 {
        return f64::NAN;
    }
    pop(stack)
}

fn pop(stack: &mut VmStack) -> f64 {
    stack.pop().unwrap_or(f64::NAN)
}

fn bin(stack: &mut VmStack, f: impl FnOnce(f64, f64) -> f64) {
    let b = pop(stack);
    let a = pop(stack);
    stack.push(f(a, b));
}
