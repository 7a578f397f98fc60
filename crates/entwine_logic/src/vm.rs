//! The stack machine that evaluates compiled rules.
//!
//! Each execution gets a fresh 256-slot stack. The result is whatever is on
//! top of the stack at end of tape, or null when the stack is empty. The VM
//! holds the frozen object table, the built-in dispatch table, and one hot
//! slot: the quantity-check function CHK_QTY calls without the generic
//! dispatch detour.

use crate::code::{read_u16, Bytecode, Op};
use crate::error::RuntimeError;
use crate::objects::{Object, Table};

/// A runtime built-in: receives the object table and the argument window.
pub type BuiltInFn<'w> = Box<dyn Fn(&Table, &[Object]) -> Result<Object, RuntimeError> + 'w>;

/// The hot path for CHK_QTY: token pointer and decoded quantity.
pub type QuantityFn<'w> = Box<dyn Fn(&Table, Object, f64) -> Result<Object, RuntimeError> + 'w>;

/// Built-ins in definition order; indices match the object builder's
/// function definitions.
pub struct BuiltInFunctions<'w> {
    funcs: Vec<BuiltInFn<'w>>,
}

impl<'w> BuiltInFunctions<'w> {
    pub fn new(funcs: Vec<BuiltInFn<'w>>) -> Self {
        BuiltInFunctions { funcs }
    }

    pub fn len(&self) -> usize {
        self.funcs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.funcs.is_empty()
    }

    /// Dispatches a call through a function-pointer object, checking the
    /// definition's arity first.
    pub fn call(
        &self,
        table: &Table,
        callee: Object,
        args: &[Object],
    ) -> Result<Object, RuntimeError> {
        let index = callee.unpack_function().ok_or_else(|| {
            RuntimeError::Type(format!("cannot invoke a {}", callee.type_name()))
        })?;
        let def = table
            .function(index)
            .ok_or_else(|| RuntimeError::Type(format!("no function at index {index}")))?;
        if def.params > -1 && def.params as usize != args.len() {
            return Err(RuntimeError::Arity {
                name: def.name.clone(),
                expects: def.params,
                got: args.len(),
            });
        }
        let func = self
            .funcs
            .get(index as usize)
            .ok_or_else(|| RuntimeError::Type(format!("{:?} has no binding", def.name)))?;
        func(table, args)
    }
}

const STACK_CAPACITY: usize = 256;

/// A rule evaluator bound to one world's tables.
pub struct Vm<'r> {
    pub objects: &'r Table,
    pub funcs: &'r BuiltInFunctions<'r>,
    /// Bound quantity-check used by CHK_QTY; unset is a runtime error.
    pub chk_qty: Option<&'r QuantityFn<'r>>,
}

impl<'r> Vm<'r> {
    /// Runs a module to completion and returns the result object, or null
    /// when the tape leaves the stack empty.
    pub fn execute(&self, bytecode: &Bytecode) -> Result<Object, RuntimeError> {
        let tape = &bytecode.tape;
        let mut stack: Vec<Object> = Vec::with_capacity(STACK_CAPACITY);
        let mut ip = 0usize;

        while ip < tape.len() {
            let op = Op::try_from(tape[ip]).map_err(|_| RuntimeError::UnknownOp(tape[ip]))?;
            ip += 1;
            match op {
                Op::Nop => {}
                Op::Err => return Err(RuntimeError::Halted),

                Op::PushT => push(&mut stack, Object::TRUE)?,
                Op::PushF => push(&mut stack, Object::FALSE)?,

                Op::PushConst | Op::PushPtr | Op::PushStr | Op::PushFunc => {
                    let index = operand_u16(tape, &mut ip)?;
                    push(&mut stack, self.constant(index)?)?;
                }

                Op::Invert => {
                    let top = pop(&mut stack)?;
                    push(&mut stack, Object::pack_bool(!self.truthy(top)))?;
                }

                Op::NeedAll => {
                    let count = operand_u16(tape, &mut ip)? as usize;
                    let window = window(&stack, count)?;
                    let reduction = window.iter().all(|obj| self.truthy(*obj));
                    truncate(&mut stack, count);
                    push(&mut stack, Object::pack_bool(reduction))?;
                }

                Op::NeedAny => {
                    let count = operand_u16(tape, &mut ip)? as usize;
                    let window = window(&stack, count)?;
                    let reduction = window.iter().any(|obj| self.truthy(*obj));
                    truncate(&mut stack, count);
                    push(&mut stack, Object::pack_bool(reduction))?;
                }

                Op::Invoke => {
                    let callee = pop(&mut stack)?;
                    let count = operand_u16(tape, &mut ip)? as usize;
                    let answer = {
                        let args = window(&stack, count)?;
                        self.funcs.call(self.objects, callee, args)?
                    };
                    truncate(&mut stack, count);
                    if !answer.is_null() {
                        push(&mut stack, answer)?;
                    }
                }

                Op::Invoke0 => {
                    let index = operand_u16(tape, &mut ip)?;
                    let callee = self.constant(index)?;
                    let answer = self.funcs.call(self.objects, callee, &[])?;
                    if !answer.is_null() {
                        push(&mut stack, answer)?;
                    }
                }

                Op::ChkQty => {
                    let Some(chk_qty) = self.chk_qty else {
                        return Err(RuntimeError::FastOpUnbound);
                    };
                    let index = operand_u16(tape, &mut ip)?;
                    let qty = operand_u8(tape, &mut ip)?;
                    let what = self.constant(index)?;
                    let answer = chk_qty(self.objects, what, qty as f64)?;
                    push(&mut stack, answer)?;
                }

                Op::CmpEq | Op::CmpNq | Op::CmpLt => {
                    return Err(RuntimeError::Comparison);
                }
            }
        }

        Ok(pop(&mut stack).unwrap_or(Object::NULL))
    }

    /// True and false map to themselves; anything else logs a warning and
    /// counts as false.
    pub fn truthy(&self, obj: Object) -> bool {
        if obj == Object::TRUE {
            return true;
        }
        if obj != Object::FALSE {
            log::warn!(
                "truthy checked non-boolean {} 0x{:08X}",
                obj.type_name(),
                obj.raw()
            );
        }
        false
    }

    fn constant(&self, index: u16) -> Result<Object, RuntimeError> {
        self.objects
            .at_index(crate::objects::Index::new(index))
            .ok_or_else(|| RuntimeError::Type(format!("no object at index 0x{index:04X}")))
    }
}

fn push(stack: &mut Vec<Object>, obj: Object) -> Result<(), RuntimeError> {
    if stack.len() >= STACK_CAPACITY {
        return Err(RuntimeError::StackOverflow);
    }
    stack.push(obj);
    Ok(())
}

fn pop(stack: &mut Vec<Object>) -> Result<Object, RuntimeError> {
    stack.pop().ok_or(RuntimeError::StackUnderflow)
}

fn window(stack: &[Object], count: usize) -> Result<&[Object], RuntimeError> {
    stack
        .len()
        .checked_sub(count)
        .map(|start| &stack[start..])
        .ok_or(RuntimeError::StackUnderflow)
}

fn truncate(stack: &mut Vec<Object>, count: usize) {
    let keep = stack.len().saturating_sub(count);
    stack.truncate(keep);
}

fn operand_u16(tape: &[u8], ip: &mut usize) -> Result<u16, RuntimeError> {
    if *ip + 2 > tape.len() {
        return Err(RuntimeError::TruncatedTape);
    }
    let value = read_u16(&tape[*ip..]);
    *ip += 2;
    Ok(value)
}

fn operand_u8(tape: &[u8], ip: &mut usize) -> Result<u8, RuntimeError> {
    if *ip >= tape.len() {
        return Err(RuntimeError::TruncatedTape);
    }
    let value = tape[*ip];
    *ip += 1;
    Ok(value)
}
