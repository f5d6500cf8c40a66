//! Fetch/decode/execute cycle of the microcoded control unit.
//!
//! Each control word is applied as two half-steps. The rising edge drives the
//! bus and runs the counters, ALU and flag logic against the state left by the
//! previous word; the falling edge latches the bus into its sink and applies the
//! post-increments. A value latched on the falling edge of one word is therefore
//! only visible to the rising edge of the next.

pub mod alu;

use tracing::{debug, trace};

use crate::config::SimConfig;
use crate::control::{BusSink, BusSource, ControlStore, ControlWord};
use crate::error::SimError;
use crate::memory::Memory;
use crate::state::{Register, RegisterFile};

/// Summary of one completed instruction cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleOutcome {
    /// Opcode byte fetched from memory.
    pub opcode: u8,
    /// Control-store address the micro-sequence started at.
    pub entry: usize,
    /// Number of control words applied, including the terminal one.
    pub micro_steps: usize,
}

/// Register file, memory and control store of one simulated processor.
#[derive(Debug, Clone)]
pub struct ControlUnit {
    config: SimConfig,
    regs: RegisterFile,
    memory: Memory,
    store: ControlStore,
    mcp: usize,
}

impl Default for ControlUnit {
    fn default() -> Self {
        Self::new(&SimConfig::default())
    }
}

impl ControlUnit {
    /// Creates a reset control unit sized by `config`.
    #[must_use]
    pub fn new(config: &SimConfig) -> Self {
        Self {
            config: config.clone(),
            regs: RegisterFile::with_pc(config.reset_pc),
            memory: Memory::new(config.memory_bytes),
            store: ControlStore::new(config.control_store_words),
            mcp: 0,
        }
    }

    /// Configuration this unit was built with.
    #[must_use]
    pub const fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Register state.
    #[must_use]
    pub const fn registers(&self) -> &RegisterFile {
        &self.regs
    }

    /// Mutable register state, for seeding tests and entry points.
    pub const fn registers_mut(&mut self) -> &mut RegisterFile {
        &mut self.regs
    }

    /// Memory image.
    #[must_use]
    pub const fn memory(&self) -> &Memory {
        &self.memory
    }

    /// Mutable memory image.
    pub const fn memory_mut(&mut self) -> &mut Memory {
        &mut self.memory
    }

    /// Control store.
    #[must_use]
    pub const fn control_store(&self) -> &ControlStore {
        &self.store
    }

    /// Mutable control store.
    pub const fn control_store_mut(&mut self) -> &mut ControlStore {
        &mut self.store
    }

    /// Current micro-program counter.
    #[must_use]
    pub const fn micro_pc(&self) -> usize {
        self.mcp
    }

    /// Places the byte at `PC` on the bus and advances `PC`.
    pub fn fetch(&mut self) -> u8 {
        let pc = self.regs.pc();
        let opcode = self.memory.read_byte(pc);
        self.regs.set_bus(u16::from(opcode));
        self.regs.adjust(Register::Pc, 1);
        trace!(pc, opcode, "fetch");
        opcode
    }

    /// Points the micro-program counter at the sequence for the opcode on the bus.
    ///
    /// When the first word of that sequence is flag-conditional and any flag in
    /// its mask is set, the configured branch offset is ORed into the address.
    ///
    /// # Errors
    ///
    /// Returns a [`SimError`] when the entry word is out of range or undecodable.
    pub fn decode(&mut self) -> Result<usize, SimError> {
        let mut address = self.config.entry_address(self.regs.bus());
        let first = self.store.read(address)?;
        if first.conditional && first.flag_mask.intersects(self.regs.flags()) {
            address |= self.config.branch_offset;
        }
        self.mcp = address;
        debug!(opcode = self.regs.bus(), entry = address, "decode");
        Ok(address)
    }

    /// Applies control words from the micro-program counter until a terminal word.
    ///
    /// The terminal word's own effects are applied before the loop stops.
    ///
    /// # Errors
    ///
    /// Returns a [`SimError`] when the sequence runs off the control store or
    /// contains an undecodable word.
    pub fn execute(&mut self) -> Result<usize, SimError> {
        let mut steps = 0;
        loop {
            let word = self.store.read(self.mcp)?;
            debug!(mcp = self.mcp, ?word, "micro-step");
            self.mcp += 1;
            self.apply(&word);
            steps += 1;
            if word.end {
                return Ok(steps);
            }
        }
    }

    /// Applies one control word: rising edge, then falling edge.
    pub fn apply(&mut self, word: &ControlWord) {
        self.rising(word);
        self.falling(word);
    }

    /// Runs one full fetch/decode/execute cycle.
    ///
    /// # Errors
    ///
    /// Propagates decode and execute failures.
    pub fn cycle(&mut self) -> Result<CycleOutcome, SimError> {
        let opcode = self.fetch();
        let entry = self.decode()?;
        let micro_steps = self.execute()?;
        Ok(CycleOutcome {
            opcode,
            entry,
            micro_steps,
        })
    }

    /// Runs `count` instruction cycles, stopping at the first failure.
    ///
    /// # Errors
    ///
    /// Propagates the first cycle failure.
    pub fn run(&mut self, count: usize) -> Result<Vec<CycleOutcome>, SimError> {
        (0..count).map(|_| self.cycle()).collect()
    }

    /// Value driven onto the bus by `sources`, or `None` when nothing drives it.
    ///
    /// Several selected sources combine by bitwise OR.
    fn drive(&self, sources: BusSource) -> Option<u16> {
        if sources.is_empty() {
            return None;
        }
        let address = self.regs.address();
        let fixed = [
            (BusSource::MEMORY_BYTE, u16::from(self.memory.read_byte(address))),
            (BusSource::MEMORY_WORD, self.memory.read_word(address)),
            (BusSource::ADDRESS, address),
            (BusSource::W_SWAPPED, self.regs.get(Register::W).swap_bytes()),
            (BusSource::FLAGS, self.regs.flags().bits()),
        ];
        fixed
            .into_iter()
            .chain(
                Register::ALL
                    .iter()
                    .map(|&reg| (BusSource::register(reg), self.regs.get(reg))),
            )
            .filter(|&(source, _)| sources.contains(source))
            .map(|(_, value)| value)
            .reduce(|bus, value| bus | value)
    }

    fn rising(&mut self, word: &ControlWord) {
        if let Some(value) = self.drive(word.sources) {
            trace!(bus = value, sources = ?word.sources, "drive");
            self.regs.set_bus(value);
        }

        if word.fetch {
            self.regs.set_address(self.regs.pc());
        }
        if word.sp_pre_decrement {
            self.regs.adjust(Register::Sp, -2);
        }
        if word.rsp_pre_decrement {
            self.regs.adjust(Register::Rsp, -2);
        }

        if let Some(outcome) = alu::evaluate(
            word.alu,
            self.regs.get(Register::Alu1),
            self.regs.get(Register::Alu2),
        ) {
            self.regs.set(Register::AluResult, outcome.result);
            self.regs.set_flags(outcome.update(self.regs.flags()));
        }

        if word.set_flags {
            self.regs.set_flags(self.regs.flags() | word.flag_mask);
        }
        if word.clear_flags {
            self.regs.set_flags(self.regs.flags() - word.flag_mask);
        }
    }

    fn falling(&mut self, word: &ControlWord) {
        let bus = self.regs.bus();
        let address = self.regs.address();
        let sinks = word.sinks;
        if sinks.contains(BusSink::MEMORY_BYTE) {
            self.memory.write_byte(address, bus.to_le_bytes()[0]);
        }
        if sinks.contains(BusSink::MEMORY_WORD) {
            self.memory.write_word(address, bus);
        }
        if sinks.contains(BusSink::ADDRESS) {
            self.regs.set_address(bus);
        }
        for &reg in &Register::ALL {
            if sinks.contains(BusSink::register(reg)) {
                self.regs.set(reg, bus);
            }
        }
        if sinks.contains(BusSink::FLAGS) {
            self.regs.set_flags_bits(bus);
        }
        if !sinks.is_empty() {
            trace!(bus, ?sinks, "latch");
        }

        if word.sp_post_increment {
            self.regs.adjust(Register::Sp, 2);
        }
        if word.rsp_post_increment {
            self.regs.adjust(Register::Rsp, 2);
        }
        if word.pc_plus1 {
            self.regs.adjust(Register::Pc, 1);
        }
        if word.pc_plus2 {
            self.regs.adjust(Register::Pc, 2);
        }
        if word.fetch {
            self.regs.adjust(Register::Pc, 1);
        }
    }
}
