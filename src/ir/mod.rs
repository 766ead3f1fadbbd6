//! Block IR: an append-only arena of SSA instructions.
//!
//! Instructions are addressed by [`InstRef`] into their owning [`Block`].
//! Folding never removes instructions; it installs a *replacement* value in
//! the instruction header, and every argument read chases replacements
//! transitively. Each instruction tracks how many argument slots still refer
//! to it (`remaining_uses`); the register allocator decrements this as it
//! consumes operands.

mod opcode;
mod value;

pub use opcode::Opcode;
pub use value::{Imm, Type, Value};

/// Index of an instruction within its [`Block`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct InstRef(pub u32);

impl InstRef {
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// One SSA instruction.
#[derive(Clone, Debug)]
pub struct Inst {
    opcode: Opcode,
    args: Vec<Value>,
    remaining_uses: u32,
    /// Associated carry pseudo-op, if a `GetCarryFromOp` reads this inst.
    carry_inst: Option<InstRef>,
    /// Once set, consumers observe this value instead. Monotonic.
    repl: Option<Value>,
}

impl Inst {
    #[must_use]
    pub fn opcode(&self) -> Opcode {
        self.opcode
    }

    #[must_use]
    pub fn num_args(&self) -> usize {
        self.args.len()
    }

    #[must_use]
    pub fn remaining_uses(&self) -> u32 {
        self.remaining_uses
    }
}

/// A straight-line sequence of instructions. Terminators are handled by the
/// translator front-end and are not part of this model.
#[derive(Clone, Debug, Default)]
pub struct Block {
    insts: Vec<Inst>,
}

impl Block {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.insts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.insts.is_empty()
    }

    pub fn inst_refs(&self) -> impl Iterator<Item = InstRef> {
        (0..self.insts.len() as u32).map(InstRef)
    }

    /// Append an instruction. Use counts of referenced instructions are
    /// incremented; pushing a `GetCarryFromOp` records the pseudo-op link on
    /// its primary (argument 0).
    pub fn push(&mut self, opcode: Opcode, args: &[Value]) -> InstRef {
        let inst = InstRef(u32::try_from(self.insts.len()).expect("block too large"));
        for &arg in args {
            if let Value::Inst(target) = self.resolve(arg) {
                self.insts[target.index()].remaining_uses += 1;
            }
        }
        self.insts.push(Inst {
            opcode,
            args: args.to_vec(),
            remaining_uses: 0,
            carry_inst: None,
            repl: None,
        });
        if opcode == Opcode::GetCarryFromOp {
            let primary = args[0].inst();
            let slot = &mut self.insts[primary.index()].carry_inst;
            assert!(slot.is_none(), "instruction already has a carry pseudo-op");
            *slot = Some(inst);
        }
        inst
    }

    #[must_use]
    pub fn opcode(&self, inst: InstRef) -> Opcode {
        self.insts[inst.index()].opcode
    }

    #[must_use]
    pub fn num_args(&self, inst: InstRef) -> usize {
        self.insts[inst.index()].args.len()
    }

    /// Read an argument, chasing replacements transitively.
    #[must_use]
    pub fn arg(&self, inst: InstRef, index: usize) -> Value {
        self.resolve(self.insts[inst.index()].args[index])
    }

    #[must_use]
    pub fn all_args_immediate(&self, inst: InstRef) -> bool {
        (0..self.num_args(inst)).all(|i| self.arg(inst, i).is_immediate())
    }

    /// Overwrite an argument slot, releasing the old argument's use and
    /// claiming the new one.
    pub fn set_arg(&mut self, inst: InstRef, index: usize, value: Value) {
        let old = self.arg(inst, index);
        if let Value::Inst(target) = old {
            self.decrement_remaining_uses(target);
        }
        if let Value::Inst(target) = self.resolve(value) {
            self.insts[target.index()].remaining_uses += 1;
        }
        self.insts[inst.index()].args[index] = value;
    }

    /// Redirect all consumers of `inst` to `value`.
    ///
    /// The instruction becomes a pass-through: it releases its own argument
    /// reads (it will never execute) and its outstanding uses transfer to the
    /// replacement's target. Replacing twice is a caller bug.
    pub fn replace_uses_with(&mut self, inst: InstRef, value: Value) {
        let value = self.resolve(value);
        assert!(
            self.insts[inst.index()].repl.is_none(),
            "instruction replaced twice: {inst:?}"
        );
        for i in 0..self.num_args(inst) {
            if let Value::Inst(target) = self.arg(inst, i) {
                self.decrement_remaining_uses(target);
            }
        }
        let transferred = self.insts[inst.index()].remaining_uses;
        if let Value::Inst(target) = value {
            self.insts[target.index()].remaining_uses += transferred;
        }
        let entry = &mut self.insts[inst.index()];
        entry.remaining_uses = 0;
        entry.repl = Some(value);
        if self.insts[inst.index()].opcode == Opcode::GetCarryFromOp {
            let primary = self.insts[inst.index()].args[0].inst();
            self.insts[primary.index()].carry_inst = None;
        }
    }

    /// The installed replacement, if this instruction has been folded away.
    #[must_use]
    pub fn replacement(&self, inst: InstRef) -> Option<Value> {
        self.insts[inst.index()].repl.map(|v| self.resolve(v))
    }

    /// The associated `GetCarryFromOp` consumer, if one is still live.
    #[must_use]
    pub fn carry_pseudo_op(&self, inst: InstRef) -> Option<InstRef> {
        self.insts[inst.index()].carry_inst
    }

    #[must_use]
    pub fn remaining_uses(&self, inst: InstRef) -> u32 {
        self.insts[inst.index()].remaining_uses
    }

    pub fn decrement_remaining_uses(&mut self, inst: InstRef) {
        let uses = &mut self.insts[inst.index()].remaining_uses;
        assert!(*uses > 0, "use-count underflow on {inst:?}");
        *uses -= 1;
    }

    fn resolve(&self, mut value: Value) -> Value {
        while let Value::Inst(inst) = value {
            match self.insts[inst.index()].repl {
                Some(next) => value = next,
                None => break,
            }
        }
        value
    }
}
