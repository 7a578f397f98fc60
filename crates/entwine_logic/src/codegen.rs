//! Bytecode emission.
//!
//! A post-order walk over the optimized tree. Two specialisations are not
//! optional: a `has` of a literal token and a literal quantity that fits a
//! byte fuses into CHK_QTY, and any call to a function whose static
//! parameter count is zero emits INVOKE_0. Every constant-producing operand
//! lands in the module's `consts` set; pointer operands also record their
//! source symbol name for disassembly.

use crate::ast::{CompareOp, Node};
use crate::code::{emit, Bytecode, Op};
use crate::error::{CompileError, PipelineError};
use crate::objects::{Builder, Index};
use crate::symbols::{Symbol, SymbolKind, SymbolTable};
use entwine_base::Interner;
use rustc_hash::{FxHashMap, FxHashSet};

/// Compiles one optimized rule into a module.
pub fn compile<'a>(
    node: &'a Node<'a>,
    symbols: &SymbolTable,
    interner: &Interner,
    objects: &mut Builder,
) -> Result<Bytecode, PipelineError> {
    let mut emitter = Emitter {
        symbols,
        interner,
        objects,
        tape: Vec::new(),
        consts: FxHashSet::default(),
        names: FxHashMap::default(),
    };
    emitter.visit(node)?;

    let mut consts: Vec<Index> = emitter.consts.into_iter().collect();
    consts.sort();
    Ok(Bytecode {
        tape: emitter.tape,
        consts,
        names: emitter.names,
    })
}

struct Emitter<'e> {
    symbols: &'e SymbolTable,
    interner: &'e Interner,
    objects: &'e mut Builder,
    tape: Vec<u8>,
    consts: FxHashSet<Index>,
    names: FxHashMap<Index, String>,
}

impl<'e> Emitter<'e> {
    fn visit(&mut self, node: &Node<'_>) -> Result<(), PipelineError> {
        match *node {
            Node::Boolean(true) => {
                emit(&mut self.tape, Op::PushT, &[]);
                Ok(())
            }
            Node::Boolean(false) => {
                emit(&mut self.tape, Op::PushF, &[]);
                Ok(())
            }

            Node::Number(value) => {
                let index = self.objects.intern_number(value);
                self.consts.insert(index);
                emit(&mut self.tape, Op::PushConst, &[index.as_u16() as u32]);
                Ok(())
            }

            Node::String(handle) => {
                let index = self.objects.intern_string(self.interner.resolve(handle));
                self.consts.insert(index);
                emit(&mut self.tape, Op::PushStr, &[index.as_u16() as u32]);
                Ok(())
            }

            Node::Identifier(id) => {
                let symbol = self.symbols.symbol(id);
                match symbol.kind {
                    SymbolKind::BuiltInFn => {
                        let index = self.objects.ptr_for(symbol)?;
                        self.push_named(Op::PushFunc, index, &symbol.name);
                        Ok(())
                    }
                    SymbolKind::Token | SymbolKind::Setting => {
                        let index = self.objects.ptr_for(symbol)?;
                        self.push_named(Op::PushPtr, index, &symbol.name);
                        Ok(())
                    }
                    kind => Err(CompileError::UncompilableIdentifier {
                        name: symbol.name.clone(),
                        kind: kind.name(),
                    }
                    .into()),
                }
            }

            Node::Invert(inner) => {
                self.visit(inner)?;
                emit(&mut self.tape, Op::Invert, &[]);
                Ok(())
            }

            Node::Every(children) => {
                for child in children {
                    self.visit(child)?;
                }
                emit(&mut self.tape, Op::NeedAll, &[children.len() as u32]);
                Ok(())
            }

            Node::AnyOf(children) => {
                for child in children {
                    self.visit(child)?;
                }
                emit(&mut self.tape, Op::NeedAny, &[children.len() as u32]);
                Ok(())
            }

            Node::Compare { op, lhs, rhs } => {
                self.visit(rhs)?;
                self.visit(lhs)?;
                let op = match op {
                    CompareOp::Eq => Op::CmpEq,
                    CompareOp::Nq => Op::CmpNq,
                    CompareOp::Lt => Op::CmpLt,
                };
                emit(&mut self.tape, op, &[]);
                Ok(())
            }

            Node::Invoke { target, args } => self.invoke(target, args),
        }
    }

    fn invoke(&mut self, target: &Node<'_>, args: &[Node<'_>]) -> Result<(), PipelineError> {
        let Node::Identifier(id) = *target else {
            return Err(CompileError::CalleeNotIdentifier.into());
        };
        let callee = self.symbols.symbol(id);
        if callee.kind != SymbolKind::BuiltInFn {
            return Err(CompileError::UncompilableCallee {
                name: callee.name.clone(),
                kind: callee.kind.name(),
            }
            .into());
        }

        let def = self.objects.function_definition(callee)?;
        let params = def.params;
        if params > -1 && params as usize != args.len() {
            return Err(CompileError::ArityMismatch {
                name: callee.name.clone(),
                expects: params,
                got: args.len(),
            }
            .into());
        }

        if self.try_specialize(callee, params, args)? {
            return Ok(());
        }

        for arg in args {
            self.visit(arg)?;
        }
        self.visit(target)?;
        emit(&mut self.tape, Op::Invoke, &[args.len() as u32]);
        Ok(())
    }

    /// CHK_QTY for unit-style `has` checks, INVOKE_0 for zero-param calls.
    fn try_specialize(
        &mut self,
        callee: &Symbol,
        params: i8,
        args: &[Node<'_>],
    ) -> Result<bool, PipelineError> {
        if callee.name == "has" {
            if let [Node::Identifier(what), Node::Number(qty)] = args {
                let what = self.symbols.symbol(*what);
                if let Some(qty) = byte_quantity(*qty) {
                    let index = self.objects.ptr_for(what)?;
                    self.consts.insert(index);
                    self.names.insert(index, what.name.clone());
                    emit(
                        &mut self.tape,
                        Op::ChkQty,
                        &[index.as_u16() as u32, qty as u32],
                    );
                    return Ok(true);
                }
            }
        }

        if params == 0 {
            let index = self.objects.ptr_for(callee)?;
            self.push_named(Op::Invoke0, index, &callee.name);
            return Ok(true);
        }

        Ok(false)
    }

    fn push_named(&mut self, op: Op, index: Index, name: &str) {
        self.consts.insert(index);
        self.names.insert(index, name.to_string());
        emit(&mut self.tape, op, &[index.as_u16() as u32]);
    }
}

/// A literal quantity is fusable when it is a whole number a u8 can hold;
/// anything else goes through the generic call path.
fn byte_quantity(qty: f64) -> Option<u8> {
    (qty.fract() == 0.0 && (0.0..=255.0).contains(&qty)).then(|| qty as u8)
}
