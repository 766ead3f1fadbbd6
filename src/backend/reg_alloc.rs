//! Single-pass register allocator.
//!
//! The emitter walks the block in program order and, for each IR
//! instruction, asks the allocator for operand locations (`use_*`),
//! destinations (`scratch_reg`, `define`), or combined read/write operands
//! (`use_def_oparg`). Requests lock locations for the duration of one
//! operation; [`RegAlloc::end_of_alloc_scope`] releases all locks and drops
//! values whose use counts reached zero.
//!
//! The invariant maintained at every operation boundary: each live value is
//! bound to exactly one host location, and no location is locked.
//!
//! Every misuse (consuming a value past its declared use count, defining a
//! value twice, locking more locations than the desired set allows, running
//! out of spill slots) is a bug in the emitter driving the allocator, and
//! panics.

use crate::ir::{Block, InstRef, Value};

use super::abi::HostAbi;
use super::emitter::{CodeEmitter, OpArg};
use super::hostloc::{HostLoc, LocInfo, HOST_LOC_COUNT, SPILL_COUNT};

pub struct RegAlloc<E: CodeEmitter> {
    code: E,
    abi: HostAbi,
    hostloc_info: Vec<LocInfo>,
}

impl<E: CodeEmitter> RegAlloc<E> {
    #[must_use]
    pub fn new(code: E, abi: HostAbi) -> Self {
        Self {
            code,
            abi,
            hostloc_info: vec![LocInfo::Empty; HOST_LOC_COUNT],
        }
    }

    /// The host-code sink, for the emitter to issue real instructions
    /// between allocation requests.
    pub fn code(&mut self) -> &mut E {
        &mut self.code
    }

    #[must_use]
    pub fn abi(&self) -> &HostAbi {
        &self.abi
    }

    pub fn into_code(self) -> E {
        self.code
    }

    fn loc(&self, loc: HostLoc) -> &LocInfo {
        &self.hostloc_info[loc.index()]
    }

    fn loc_mut(&mut self, loc: HostLoc) -> &mut LocInfo {
        &mut self.hostloc_info[loc.index()]
    }

    /// Read `value` in a register from `desired`, locking it for this
    /// operation. Immediates are materialized into a scratch register.
    pub fn use_reg(&mut self, block: &mut Block, value: Value, desired: &[HostLoc]) -> HostLoc {
        if value.is_immediate() {
            let loc = self.scratch_reg(desired);
            return self.load_imm_into(value, loc);
        }

        let use_inst = value.inst();
        block.decrement_remaining_uses(use_inst);
        let current = self.location_of(use_inst);

        if desired.contains(&current) {
            self.loc_mut(current).lock();
            return current;
        }

        if self.loc(current).is_locked() {
            // The home is tied up in this same operation; hand out a copy.
            return self.use_scratch_inst(use_inst, desired);
        }

        let destination = self.select_a_register(desired);
        if HostLoc::same_class(destination, current) {
            self.exchange(destination, current);
        } else {
            self.move_out_of_the_way(destination);
            self.move_value(destination, current);
        }
        self.loc_mut(destination).lock();
        destination
    }

    /// Read `value` as an emitter operand: its home register if acceptable,
    /// its spill slot as a memory operand, or a register it is exchanged
    /// into. Locked (Use) for this operation either way.
    pub fn use_oparg(&mut self, block: &mut Block, value: Value, desired: &[HostLoc]) -> OpArg {
        debug_assert!(desired.iter().all(|loc| loc.is_register()));

        if value.is_immediate() {
            let loc = self.scratch_reg(desired);
            return OpArg::Reg(self.load_imm_into(value, loc));
        }

        let use_inst = value.inst();
        block.decrement_remaining_uses(use_inst);
        let current = self.location_of(use_inst);

        if desired.contains(&current) {
            self.loc_mut(current).lock();
            return OpArg::Reg(current);
        }

        if current.is_spill() {
            self.loc_mut(current).lock();
            return OpArg::Mem(current);
        }

        let destination = self.select_a_register(desired);
        assert!(
            self.loc(current).is_idle(),
            "cannot relocate a locked register {current:?}"
        );
        self.exchange(destination, current);
        self.loc_mut(destination).lock();
        OpArg::Reg(destination)
    }

    /// Read `value` once into a register from `desired` whose contents the
    /// operation may then clobber. The register is locked (Scratch); the
    /// value keeps its home elsewhere unless this was its only copy.
    pub fn use_scratch_reg(
        &mut self,
        block: &mut Block,
        value: Value,
        desired: &[HostLoc],
    ) -> HostLoc {
        if value.is_immediate() {
            let loc = self.scratch_reg(desired);
            return self.load_imm_into(value, loc);
        }

        let use_inst = value.inst();
        assert!(
            block.remaining_uses(use_inst) > 0,
            "{use_inst:?} consumed more times than its declared use count"
        );
        block.decrement_remaining_uses(use_inst);
        self.use_scratch_inst(use_inst, desired)
    }

    fn use_scratch_inst(&mut self, use_inst: InstRef, desired: &[HostLoc]) -> HostLoc {
        debug_assert!(desired.iter().all(|loc| loc.is_register()));

        let current = self.location_of(use_inst);
        let new = self.select_a_register(desired);
        if new != current && self.loc(new).is_occupied() {
            self.spill_register(new);
        }

        if current.is_spill() {
            // Copy out of the slot; the binding stays in the slot.
            self.emit_move(new, current);
            self.loc_mut(new).lock();
            debug_assert!(self.loc(new).is_scratch());
            new
        } else if new != current {
            assert!(self.loc(current).is_idle() || self.loc(current).is_use());
            self.emit_move(new, current);
            self.loc_mut(new).lock();
            debug_assert!(self.loc(new).is_scratch());
            new
        } else {
            // Clobbering the value's own home: legal only when nothing else
            // in this operation holds it, and the value dies with the read.
            assert!(self.loc(current).is_idle());
            *self.loc_mut(current) = LocInfo::Empty;
            self.loc_mut(current).lock();
            debug_assert!(self.loc(current).is_scratch());
            current
        }
    }

    /// Lock a register from `desired` for writing, spilling whatever lived
    /// there.
    pub fn scratch_reg(&mut self, desired: &[HostLoc]) -> HostLoc {
        debug_assert!(desired.iter().all(|loc| loc.is_register()));

        let location = self.select_a_register(desired);
        if self.loc(location).is_occupied() {
            self.spill_register(location);
        }
        self.loc_mut(location).lock();
        debug_assert!(self.loc(location).is_scratch());
        location
    }

    /// Bind `def_inst` to `host_loc`. Must precede any `use_*` of the inst.
    pub fn define(&mut self, def_inst: InstRef, host_loc: HostLoc) {
        assert!(
            self.value_location(def_inst).is_none(),
            "{def_inst:?} has already been defined"
        );
        self.loc_mut(host_loc).add_value(def_inst);
    }

    /// Bind `def_inst` to wherever `use_value` already lives (consuming one
    /// use), or to a scratch register holding the immediate.
    pub fn define_from(&mut self, block: &mut Block, def_inst: InstRef, use_value: Value) {
        assert!(
            self.value_location(def_inst).is_none(),
            "{def_inst:?} has already been defined"
        );

        if use_value.is_immediate() {
            let order = self.abi.gpr_order.clone();
            let location = self.scratch_reg(&order);
            self.define(def_inst, location);
            self.load_imm_into(use_value, location);
            return;
        }

        let use_inst = use_value.inst();
        block.decrement_remaining_uses(use_inst);
        let location = self.location_of(use_inst);
        self.loc_mut(location).add_value(def_inst);
    }

    /// Combined read/write operand for two-address host instructions.
    ///
    /// At `use_value`'s last use with an unlocked home, the home register is
    /// repurposed as the destination (no copy); an unlocked spill home is
    /// handed out as the memory operand with a fresh scratch destination.
    /// Otherwise the value is materialized as an ordinary operand and the
    /// destination is a fresh scratch from `desired`.
    pub fn use_def_oparg(
        &mut self,
        block: &mut Block,
        use_value: Value,
        def_inst: InstRef,
        desired: &[HostLoc],
    ) -> (OpArg, HostLoc) {
        debug_assert!(desired.iter().all(|loc| loc.is_register()));
        assert!(
            self.value_location(def_inst).is_none(),
            "{def_inst:?} has already been defined"
        );

        if !use_value.is_immediate() {
            let use_inst = use_value.inst();
            if self.is_last_use(block, use_inst) {
                let current = self.location_of(use_inst);
                if self.loc(current).is_idle() {
                    block.decrement_remaining_uses(use_inst);
                    if current.is_spill() {
                        self.loc_mut(current).lock();
                        let def_reg = self.scratch_reg(desired);
                        self.define(def_inst, def_reg);
                        return (OpArg::Mem(current), def_reg);
                    }
                    self.loc_mut(current).lock();
                    self.define(def_inst, current);
                    return (OpArg::Reg(current), current);
                }
            }
        }

        let order = self.abi.gpr_order.clone();
        let use_oparg = self.use_oparg(block, use_value, &order);
        let def_reg = self.scratch_reg(desired);
        self.define(def_inst, def_reg);
        (use_oparg, def_reg)
    }

    /// Marshal up to four arguments into the ABI parameter registers, claim
    /// the return register for `result_def` (or as plain scratch), and
    /// scratch every other caller-saved register so live values bound there
    /// are spilled before the call.
    pub fn host_call(
        &mut self,
        block: &mut Block,
        result_def: Option<InstRef>,
        args: [Value; 4],
    ) {
        let params = self.abi.param_regs;
        let return_reg = self.abi.return_reg;

        match result_def {
            Some(def_inst) => {
                let loc = self.scratch_reg(&[return_reg]);
                self.define(def_inst, loc);
            }
            None => {
                self.scratch_reg(&[return_reg]);
            }
        }

        for (arg, param) in args.into_iter().zip(params) {
            if !arg.is_empty() {
                self.use_scratch_reg(block, arg, &[param]);
            } else {
                self.scratch_reg(&[param]);
            }
        }

        let other_caller_save: Vec<HostLoc> = self
            .abi
            .caller_saved
            .iter()
            .copied()
            .filter(|loc| *loc != return_reg && !params.contains(loc))
            .collect();
        for caller_saved in other_caller_save {
            self.scratch_reg(&[caller_saved]);
        }
    }

    /// Release every lock and drop values whose use counts reached zero.
    /// Called at the boundary between IR instructions.
    pub fn end_of_alloc_scope(&mut self, block: &Block) {
        for info in &mut self.hostloc_info {
            info.end_of_alloc_scope(|inst| block.remaining_uses(inst) == 0);
        }
    }

    /// Debug check: no value survived the block.
    pub fn assert_no_more_uses(&self) {
        assert!(
            self.hostloc_info.iter().all(LocInfo::is_empty),
            "values remain bound at end of block"
        );
    }

    /// Clear all state between blocks.
    pub fn reset(&mut self) {
        self.hostloc_info.fill(LocInfo::Empty);
    }

    /// The single host location holding `inst`, if it is live.
    #[must_use]
    pub fn value_location(&self, inst: InstRef) -> Option<HostLoc> {
        (0..HOST_LOC_COUNT)
            .map(HostLoc::from_index)
            .find(|loc| self.loc(*loc).contains_value(inst))
    }

    /// Occupied locations and their bound values, for diagnostics and tests.
    pub fn bound_locations(&self) -> impl Iterator<Item = (HostLoc, &[InstRef])> + '_ {
        (0..HOST_LOC_COUNT).map(HostLoc::from_index).filter_map(|loc| {
            let info = self.loc(loc);
            info.is_occupied().then(|| (loc, info.values()))
        })
    }

    fn location_of(&self, inst: InstRef) -> HostLoc {
        self.value_location(inst)
            .unwrap_or_else(|| panic!("{inst:?} has no live host location"))
    }

    /// Remaining uses == 1 and the home binds only this value, so the read
    /// being assembled is the last anywhere.
    fn is_last_use(&self, block: &Block, inst: InstRef) -> bool {
        if block.remaining_uses(inst) != 1 {
            return false;
        }
        match self.value_location(inst) {
            Some(loc) => self.loc(loc).values().len() == 1,
            None => false,
        }
    }

    /// Pick a location from `desired`: locked candidates are out (none left
    /// is a fatal emitter bug), then empty locations win over occupied ones,
    /// preference order deciding ties.
    fn select_a_register(&self, desired: &[HostLoc]) -> HostLoc {
        let mut first_unlocked = None;
        for &candidate in desired {
            let info = self.loc(candidate);
            if info.is_locked() {
                continue;
            }
            if info.is_empty() {
                return candidate;
            }
            if first_unlocked.is_none() {
                first_unlocked = Some(candidate);
            }
        }
        first_unlocked.expect("all candidate registers are already locked this operation")
    }

    /// Evacuate an occupied, unlocked register to the first free spill slot.
    fn spill_register(&mut self, loc: HostLoc) {
        assert!(loc.is_register(), "only registers can be spilled");
        assert!(
            self.loc(loc).is_occupied(),
            "no need to spill an unoccupied register"
        );
        assert!(!self.loc(loc).is_locked(), "cannot spill a locked register");

        let slot = self.find_free_spill();
        tracing::trace!(?loc, ?slot, "spill");
        self.emit_move(slot, loc);
        let info = std::mem::take(self.loc_mut(loc));
        *self.loc_mut(slot) = info;
    }

    fn find_free_spill(&self) -> HostLoc {
        (0..SPILL_COUNT as u8)
            .map(HostLoc::Spill)
            .find(|slot| !self.loc(*slot).is_occupied())
            .expect("all spill slots are full")
    }

    /// Migrate the contents of `from` into the empty, unlocked `to`.
    fn move_value(&mut self, to: HostLoc, from: HostLoc) {
        assert!(self.loc(to).is_empty() && !self.loc(from).is_locked());

        if self.loc(from).is_empty() {
            return;
        }

        let info = std::mem::take(self.loc_mut(from));
        *self.loc_mut(to) = info;
        self.emit_move(to, from);
    }

    /// Swap the contents of two same-class, unlocked locations. Degenerates
    /// to a move when either side is empty.
    fn exchange(&mut self, a: HostLoc, b: HostLoc) {
        assert!(!self.loc(a).is_locked() && !self.loc(b).is_locked());

        if self.loc(a).is_empty() {
            self.move_value(a, b);
            return;
        }
        if self.loc(b).is_empty() {
            self.move_value(b, a);
            return;
        }

        self.hostloc_info.swap(a.index(), b.index());
        self.emit_exchange(a, b);
    }

    fn move_out_of_the_way(&mut self, reg: HostLoc) {
        assert!(!self.loc(reg).is_locked());
        if self.loc(reg).is_occupied() {
            self.spill_register(reg);
        }
    }

    fn load_imm_into(&mut self, imm: Value, host_loc: HostLoc) -> HostLoc {
        assert!(imm.is_immediate(), "not an immediate: {imm:?}");
        assert!(host_loc.is_gpr(), "immediates load into GPRs only");

        let imm_value = imm.as_u64();
        if imm_value == 0 {
            self.code.zero_reg(host_loc);
        } else {
            self.code.mov_imm(host_loc, imm_value);
        }
        host_loc
    }

    fn emit_move(&mut self, to: HostLoc, from: HostLoc) {
        match (to, from) {
            (HostLoc::Gpr(_), HostLoc::Gpr(_)) => self.code.mov_reg_reg(to, from),
            (HostLoc::Xmm(_), HostLoc::Xmm(_)) => self.code.mov_xmm_xmm(to, from),
            (HostLoc::Gpr(_), HostLoc::Spill(slot)) => self.code.mov_reg_spill(to, slot as usize),
            (HostLoc::Spill(slot), HostLoc::Gpr(_)) => self.code.mov_spill_reg(slot as usize, from),
            (HostLoc::Xmm(_), HostLoc::Spill(slot)) => self.code.mov_xmm_spill(to, slot as usize),
            (HostLoc::Spill(slot), HostLoc::Xmm(_)) => self.code.mov_spill_xmm(slot as usize, from),
            _ => panic!("invalid move: {to:?} <- {from:?}"),
        }
    }

    fn emit_exchange(&mut self, a: HostLoc, b: HostLoc) {
        match (a, b) {
            (HostLoc::Gpr(_), HostLoc::Gpr(_)) => self.code.xchg_reg_reg(a, b),
            (HostLoc::Xmm(_), HostLoc::Xmm(_)) => {
                panic!("exchanging vector registers is never necessary")
            }
            _ => panic!("invalid exchange: {a:?} <-> {b:?}"),
        }
    }
}
