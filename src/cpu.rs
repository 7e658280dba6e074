//! Implementation of the core CPU ([Sharp LR35902](https://en.wikipedia.org/wiki/Game_Boy)) logic for the Game Boy.
//!
//! Does not include the instruction set implementation, only the core
//! CPU logic and the CPU struct definition.
//!
//! Most of the core CPU logic is implemented in the [`Cpu::clock`] method.

use std::{
    fmt::{self, Display, Formatter},
    io::Cursor,
};

use dotmatrix_common::{
    data::{read_u16, read_u8, write_u16, write_u8},
    error::Error,
};

use crate::{
    assert_pedantic_gb,
    consts::{BGP_ADDR, IF_ADDR, LCDC_ADDR},
    debugln,
    inst::{Instruction, EXTENDED, INSTRUCTIONS},
    mmu::Mmu,
    state::{StateComponent, StateFormat},
};

pub const PREFIX: u8 = 0xcb;

pub struct Cpu {
    pub pc: u16,
    pub sp: u16,
    pub a: u8,
    pub b: u8,
    pub c: u8,
    pub d: u8,
    pub e: u8,
    pub h: u8,
    pub l: u8,

    ime: bool,

    /// Latch set by the EI instruction, promoted into `ime` only
    /// after the instruction that follows EI has retired.
    ime_pending: bool,

    zero: bool,
    sub: bool,
    half_carry: bool,
    carry: bool,
    halted: bool,

    /// Set by the STOP instruction, released by a joypad press.
    stopped: bool,

    /// Fault channel raised by the illegal opcode handler, drained
    /// by the clock loop into a typed error.
    fault: Option<u8>,

    /// Reference to the MMU (Memory Management Unit) to be used
    /// for memory bus access operations.
    pub mmu: Mmu,

    /// Reference to the PC (Program Counter) of the previous executed
    /// instruction, used to provide a reference to the instruction
    /// so that it can be logged or used for debugging purposes.
    pub ppc: u16,

    /// Opcode of the previous executed instruction, kept together
    /// with `ppc` for post-mortem inspection.
    opcode: u8,
}

impl Cpu {
    pub fn new(mmu: Mmu) -> Self {
        Self {
            pc: 0x0,
            sp: 0x0,
            a: 0x0,
            b: 0x0,
            c: 0x0,
            d: 0x0,
            e: 0x0,
            h: 0x0,
            l: 0x0,
            ime: false,
            ime_pending: false,
            zero: false,
            sub: false,
            half_carry: false,
            carry: false,
            halted: false,
            stopped: false,
            fault: None,
            mmu,
            ppc: 0x0,
            opcode: 0x0,
        }
    }

    pub fn reset(&mut self) {
        self.pc = 0x0;
        self.sp = 0x0;
        self.a = 0x0;
        self.b = 0x0;
        self.c = 0x0;
        self.d = 0x0;
        self.e = 0x0;
        self.h = 0x0;
        self.l = 0x0;
        self.ime = false;
        self.ime_pending = false;
        self.zero = false;
        self.sub = false;
        self.half_carry = false;
        self.carry = false;
        self.halted = false;
        self.stopped = false;
        self.fault = None;
        self.ppc = 0x0;
        self.opcode = 0x0;
    }

    /// Sets the CPU registers and some of the memory space to the
    /// expected state after the DMG boot ROM finishes.
    ///
    /// Using this strategy it's possible to skip the "normal" boot
    /// loading process for the original DMG Game Boy.
    pub fn boot(&mut self) {
        self.pc = 0x0100;
        self.sp = 0xfffe;
        self.a = 0x01;
        self.b = 0x00;
        self.c = 0x13;
        self.d = 0x00;
        self.e = 0xd8;
        self.h = 0x01;
        self.l = 0x4d;
        self.zero = true;
        self.sub = false;
        self.half_carry = true;
        self.carry = true;

        // updates part of the MMU state, disabling the
        // boot memory overlap and setting the LCD control
        // and background palette registers to the values
        // left behind by the boot program
        self.mmu.set_boot_active(false);
        self.mmu.write(LCDC_ADDR, 0x91);
        self.mmu.write(BGP_ADDR, 0xfc);
    }

    /// Runs one iteration of the CPU, executing either an interrupt
    /// service routine or a single instruction, and returns the
    /// number of T-cycles consumed by the operation.
    ///
    /// Decoding an undefined opcode is a fatal condition surfaced
    /// as [`Error::IllegalOpcode`].
    pub fn clock(&mut self) -> Result<u8, Error> {
        // gathers the PC (program counter) reference that
        // is going to be used in the fetching phase
        let pc = self.pc;

        // runs a series of assertions to guarantee CPU execution
        // state, only if pedantic mode is set
        assert_pedantic_gb!(
            !(0x8000..=0x9fff).contains(&pc),
            "Invalid PC area at 0x{:04x}",
            pc
        );
        assert_pedantic_gb!(
            !self.mmu.boot_active() || pc <= 0x00ff,
            "Invalid boot address: {:04x}",
            pc
        );

        // prefetch the pending interrupt bits so that we can quickly
        // check if any enabled interrupt is waiting to be served, used
        // both to release a halted CPU and to run the proper handler
        let pending = self.mmu.read(IF_ADDR) & self.mmu.ie & 0x1f;

        // a stopped CPU only resumes execution once a joypad
        // press has raised the pad latch
        if self.stopped {
            if self.mmu.pad_i().int_pad() {
                self.stopped = false;
            } else {
                return Ok(4);
            }
        }

        // in case the CPU execution halted and there's a pending interrupt
        // while IME is disabled, release the CPU from the halted state so
        // execution can continue until the interrupt is serviced
        if self.halted && !self.ime && pending != 0 {
            self.halted = false;
        }

        // with the master enable set and at least one interrupt both
        // enabled and flagged, runs the service routine for the lowest
        // set bit (V-Blank, STAT, Timer, Serial, Joypad in priority
        // order), acknowledging the source latch
        if self.ime && pending != 0 {
            self.disable_int();
            self.push_word(pc);
            self.halted = false;

            if pending & 0x01 == 0x01 {
                debugln!("Going to run V-Blank interrupt handler (0x40)");
                self.pc = 0x40;
                self.mmu.ppu().ack_vblank();
            } else if pending & 0x02 == 0x02 {
                debugln!("Going to run LCD STAT interrupt handler (0x48)");
                self.pc = 0x48;
                self.mmu.ppu().ack_stat();
            } else if pending & 0x04 == 0x04 {
                debugln!("Going to run Timer interrupt handler (0x50)");
                self.pc = 0x50;
                self.mmu.timer().ack_tima();
            } else if pending & 0x08 == 0x08 {
                debugln!("Going to run Serial interrupt handler (0x58)");
                self.pc = 0x58;
                self.mmu.ack_serial();
            } else {
                debugln!("Going to run JoyPad interrupt handler (0x60)");
                self.pc = 0x60;
                self.mmu.pad().ack_pad();
            }

            return Ok(20);
        }

        // in case the CPU is currently in the halted state
        // returns the control flow immediately with the associated
        // number of cycles estimated for the halted execution
        if self.halted {
            return Ok(4);
        }

        // captures the EI latch before execution so that the master
        // enable is only promoted after the instruction that follows
        // the EI has retired
        let promote_ime = self.ime_pending;

        // fetches the current instruction and updates the PC
        // (Program Counter) according to the final value returned
        // by the fetch operation (we may need to fetch instruction
        // more than one byte of length)
        let (inst, pc) = self.fetch(self.pc);
        self.ppc = self.pc;
        self.opcode = self.mmu.read(self.ppc);
        self.pc = pc;

        let (inst_fn, inst_time, _inst_str) = inst;

        #[cfg(feature = "cpulog")]
        {
            println!("{}", self.description(inst, self.ppc));
        }

        // calls the handler of the current instruction, gathering the
        // extra cycles consumed by a taken conditional branch
        let extra_time = inst_fn(self);

        // drains the fault channel possibly raised by the decode of
        // an undefined opcode, this is fatal to the step loop
        if let Some(opcode) = self.fault.take() {
            return Err(Error::IllegalOpcode(opcode, self.ppc));
        }

        if promote_ime && self.ime_pending {
            self.ime = true;
            self.ime_pending = false;
        }

        Ok(inst_time.wrapping_add(extra_time))
    }

    #[inline(always)]
    fn fetch(&self, pc: u16) -> (&'static Instruction, u16) {
        let mut pc = pc;

        // fetches the current instruction and increments
        // the PC (program counter) accordingly
        let mut opcode = self.mmu.read(pc);
        pc = pc.wrapping_add(1);

        // checks if the current instruction is a prefix
        // instruction, in case it is, fetches the next
        // instruction and increments the PC accordingly
        let inst: &'static Instruction;
        if opcode == PREFIX {
            opcode = self.mmu.read(pc);
            pc = pc.wrapping_add(1);
            inst = &EXTENDED[opcode as usize];
        } else {
            inst = &INSTRUCTIONS[opcode as usize];
        }

        // returns both the fetched instruction and the
        // updated PC (Program Counter) value
        (inst, pc)
    }

    #[inline(always)]
    pub fn mmu(&mut self) -> &mut Mmu {
        &mut self.mmu
    }

    #[inline(always)]
    pub fn mmu_i(&self) -> &Mmu {
        &self.mmu
    }

    #[inline(always)]
    pub fn halted(&self) -> bool {
        self.halted
    }

    #[inline(always)]
    pub fn set_halted(&mut self, value: bool) {
        self.halted = value
    }

    #[inline(always)]
    pub fn stopped(&self) -> bool {
        self.stopped
    }

    #[inline(always)]
    pub fn pc(&self) -> u16 {
        self.pc
    }

    #[inline(always)]
    pub fn set_pc(&mut self, value: u16) {
        self.pc = value;
    }

    #[inline(always)]
    pub fn sp(&self) -> u16 {
        self.sp
    }

    #[inline(always)]
    pub fn set_sp(&mut self, value: u16) {
        self.sp = value;
    }

    /// PC of the last executed instruction, to be used together
    /// with [`Cpu::opcode`] for post-mortem inspection.
    #[inline(always)]
    pub fn ppc(&self) -> u16 {
        self.ppc
    }

    /// Opcode of the last executed instruction.
    #[inline(always)]
    pub fn opcode(&self) -> u8 {
        self.opcode
    }

    #[inline(always)]
    pub fn af(&self) -> u16 {
        ((self.a as u16) << 8) | self.f() as u16
    }

    #[inline(always)]
    pub fn bc(&self) -> u16 {
        ((self.b as u16) << 8) | self.c as u16
    }

    /// Composes the flags register from the individual flag booleans,
    /// only the high nibble carries information, the low nibble always
    /// reads as zero.
    #[inline(always)]
    pub fn f(&self) -> u8 {
        let mut f = 0x0u8;
        if self.zero {
            f |= 0x80;
        }
        if self.sub {
            f |= 0x40;
        }
        if self.half_carry {
            f |= 0x20;
        }
        if self.carry {
            f |= 0x10;
        }
        f
    }

    #[inline(always)]
    pub fn set_f(&mut self, value: u8) {
        self.zero = value & 0x80 == 0x80;
        self.sub = value & 0x40 == 0x40;
        self.half_carry = value & 0x20 == 0x20;
        self.carry = value & 0x10 == 0x10;
    }

    #[inline(always)]
    pub fn set_af(&mut self, value: u16) {
        self.a = (value >> 8) as u8;
        self.set_f(value as u8);
    }

    #[inline(always)]
    pub fn set_bc(&mut self, value: u16) {
        self.b = (value >> 8) as u8;
        self.c = value as u8;
    }

    #[inline(always)]
    pub fn de(&self) -> u16 {
        ((self.d as u16) << 8) | self.e as u16
    }

    #[inline(always)]
    pub fn set_de(&mut self, value: u16) {
        self.d = (value >> 8) as u8;
        self.e = value as u8;
    }

    #[inline(always)]
    pub fn hl(&self) -> u16 {
        ((self.h as u16) << 8) | self.l as u16
    }

    #[inline(always)]
    pub fn set_hl(&mut self, value: u16) {
        self.h = (value >> 8) as u8;
        self.l = value as u8;
    }

    #[inline(always)]
    pub fn ime(&self) -> bool {
        self.ime
    }

    #[inline(always)]
    pub fn set_ime(&mut self, value: bool) {
        self.ime = value;
    }

    #[inline(always)]
    pub fn read_u8(&mut self) -> u8 {
        let byte = self.mmu.read(self.pc);
        self.pc = self.pc.wrapping_add(1);
        byte
    }

    #[inline(always)]
    pub fn read_u16(&mut self) -> u16 {
        let byte1 = self.read_u8();
        let byte2 = self.read_u8();

        byte1 as u16 | ((byte2 as u16) << 8)
    }

    #[inline(always)]
    pub fn push_byte(&mut self, byte: u8) {
        self.sp = self.sp.wrapping_sub(1);
        self.mmu.write(self.sp, byte);
    }

    #[inline(always)]
    pub fn push_word(&mut self, word: u16) {
        self.push_byte((word >> 8) as u8);
        self.push_byte(word as u8);
    }

    #[inline(always)]
    pub fn pop_byte(&mut self) -> u8 {
        let byte = self.mmu.read(self.sp);
        self.sp = self.sp.wrapping_add(1);
        byte
    }

    #[inline(always)]
    pub fn pop_word(&mut self) -> u16 {
        self.pop_byte() as u16 | ((self.pop_byte() as u16) << 8)
    }

    #[inline(always)]
    pub fn zero(&self) -> bool {
        self.zero
    }

    #[inline(always)]
    pub fn set_zero(&mut self, value: bool) {
        self.zero = value
    }

    #[inline(always)]
    pub fn sub(&self) -> bool {
        self.sub
    }

    #[inline(always)]
    pub fn set_sub(&mut self, value: bool) {
        self.sub = value;
    }

    #[inline(always)]
    pub fn half_carry(&self) -> bool {
        self.half_carry
    }

    #[inline(always)]
    pub fn set_half_carry(&mut self, value: bool) {
        self.half_carry = value
    }

    #[inline(always)]
    pub fn carry(&self) -> bool {
        self.carry
    }

    #[inline(always)]
    pub fn set_carry(&mut self, value: bool) {
        self.carry = value;
    }

    #[inline(always)]
    pub fn halt(&mut self) {
        self.halted = true;
    }

    #[inline(always)]
    pub fn stop(&mut self) {
        self.stopped = true;
    }

    /// Immediate interrupt master enable, used by RETI.
    #[inline(always)]
    pub fn enable_int(&mut self) {
        self.ime = true;
        self.ime_pending = false;
    }

    /// Immediate interrupt master disable, clears any delayed
    /// enable that an EI may have left pending.
    #[inline(always)]
    pub fn disable_int(&mut self) {
        self.ime = false;
        self.ime_pending = false;
    }

    /// Delayed interrupt master enable, used by EI, the request
    /// is promoted only after the next instruction retires.
    #[inline(always)]
    pub fn request_int(&mut self) {
        self.ime_pending = true;
    }

    pub(crate) fn trigger_illegal(&mut self, opcode: u8) {
        self.fault = Some(opcode);
    }

    pub fn description(&self, inst: &Instruction, inst_pc: u16) -> String {
        let (_, inst_time, inst_str) = inst;
        let title_str: String = format!("[0x{inst_pc:04x}] {inst_str}");
        let inst_time_str = format!("({inst_time} cycles)");
        let registers_str = format!("[PC=0x{:04x} SP=0x{:04x}] [A=0x{:02x} B=0x{:02x} C=0x{:02x} D=0x{:02x} E=0x{:02x} H=0x{:02x} L=0x{:02x}]",
        self.pc, self.sp, self.a, self.b, self.c, self.d, self.e, self.h, self.l);
        format!("{title_str: <24} {inst_time_str: <11} {registers_str: <10}")
    }

    pub fn description_default(&self) -> String {
        let (inst, _) = self.fetch(self.ppc);
        self.description(inst, self.ppc)
    }
}

impl StateComponent for Cpu {
    fn state(&self, _format: Option<StateFormat>) -> Result<Vec<u8>, Error> {
        let mut cursor = Cursor::new(vec![]);
        write_u16(&mut cursor, self.pc)?;
        write_u16(&mut cursor, self.sp)?;
        write_u8(&mut cursor, self.a)?;
        write_u8(&mut cursor, self.b)?;
        write_u8(&mut cursor, self.c)?;
        write_u8(&mut cursor, self.d)?;
        write_u8(&mut cursor, self.e)?;
        write_u8(&mut cursor, self.h)?;
        write_u8(&mut cursor, self.l)?;
        write_u8(&mut cursor, self.ime as u8)?;
        write_u8(&mut cursor, self.ime_pending as u8)?;
        write_u8(&mut cursor, self.zero as u8)?;
        write_u8(&mut cursor, self.sub as u8)?;
        write_u8(&mut cursor, self.half_carry as u8)?;
        write_u8(&mut cursor, self.carry as u8)?;
        write_u8(&mut cursor, self.halted as u8)?;
        write_u8(&mut cursor, self.stopped as u8)?;
        write_u16(&mut cursor, self.ppc)?;
        write_u8(&mut cursor, self.opcode)?;
        Ok(cursor.into_inner())
    }

    fn set_state(&mut self, data: &[u8], _format: Option<StateFormat>) -> Result<(), Error> {
        let mut cursor = Cursor::new(data);
        self.pc = read_u16(&mut cursor)?;
        self.sp = read_u16(&mut cursor)?;
        self.a = read_u8(&mut cursor)?;
        self.b = read_u8(&mut cursor)?;
        self.c = read_u8(&mut cursor)?;
        self.d = read_u8(&mut cursor)?;
        self.e = read_u8(&mut cursor)?;
        self.h = read_u8(&mut cursor)?;
        self.l = read_u8(&mut cursor)?;
        self.ime = read_u8(&mut cursor)? != 0;
        self.ime_pending = read_u8(&mut cursor)? != 0;
        self.zero = read_u8(&mut cursor)? != 0;
        self.sub = read_u8(&mut cursor)? != 0;
        self.half_carry = read_u8(&mut cursor)? != 0;
        self.carry = read_u8(&mut cursor)? != 0;
        self.halted = read_u8(&mut cursor)? != 0;
        self.stopped = read_u8(&mut cursor)? != 0;
        self.ppc = read_u16(&mut cursor)?;
        self.opcode = read_u8(&mut cursor)?;
        Ok(())
    }
}

impl Default for Cpu {
    fn default() -> Self {
        Cpu::new(Mmu::default())
    }
}

impl Display for Cpu {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description_default())
    }
}

#[cfg(test)]
mod tests {
    use dotmatrix_common::error::Error;

    use crate::{consts::IF_ADDR, state::StateComponent};

    use super::Cpu;

    #[test]
    fn test_cpu_clock() {
        let mut cpu = Cpu::default();
        cpu.boot();

        // test NOP instruction
        cpu.pc = 0xc000;
        cpu.mmu.write(0xc000, 0x00);
        let cycles = cpu.clock().unwrap();
        assert_eq!(cycles, 4);
        assert_eq!(cpu.pc, 0xc001);

        // test LD A, d8 instruction
        cpu.pc = 0xc000;
        cpu.mmu.write(0xc000, 0x3e);
        cpu.mmu.write(0xc001, 0x42);
        let cycles = cpu.clock().unwrap();
        assert_eq!(cycles, 8);
        assert_eq!(cpu.pc, 0xc002);
        assert_eq!(cpu.a, 0x42);

        // test LD (HL+), A instruction
        cpu.pc = 0xc000;
        cpu.mmu.write(0xc000, 0x22);
        cpu.set_hl(0xc000);
        let cycles = cpu.clock().unwrap();
        assert_eq!(cycles, 8);
        assert_eq!(cpu.pc, 0xc001);
        assert_eq!(cpu.hl(), 0xc001);
        assert_eq!(cpu.mmu.read(cpu.hl()), 0x42);

        // test INC A instruction
        cpu.pc = 0xc000;
        cpu.mmu.write(0xc000, 0x3c);
        cpu.a = 0x42;
        let cycles = cpu.clock().unwrap();
        assert_eq!(cycles, 4);
        assert_eq!(cpu.pc, 0xc001);
        assert_eq!(cpu.a, 0x43);

        // test DEC A instruction
        cpu.pc = 0xc000;
        cpu.mmu.write(0xc000, 0x3d);
        cpu.a = 0x42;
        let cycles = cpu.clock().unwrap();
        assert_eq!(cycles, 4);
        assert_eq!(cpu.pc, 0xc001);
        assert_eq!(cpu.a, 0x41);

        // test LD (HL), d8 instruction
        cpu.pc = 0xc000;
        cpu.mmu.write(0xc000, 0x36);
        cpu.set_hl(0xc000);
        cpu.mmu.write(0xc001, 0x42);
        let cycles = cpu.clock().unwrap();
        assert_eq!(cycles, 12);
        assert_eq!(cpu.pc, 0xc002);
        assert_eq!(cpu.hl(), 0xc000);
        assert_eq!(cpu.mmu.read(cpu.hl()), 0x42);

        // test JR n instruction
        cpu.pc = 0xc000;
        cpu.mmu.write(0xc000, 0x18);
        cpu.mmu.write(0xc001, 0x03);
        let cycles = cpu.clock().unwrap();
        assert_eq!(cycles, 12);
        assert_eq!(cpu.pc, 0xc005);
    }

    #[test]
    fn test_illegal_opcode() {
        let mut cpu = Cpu::default();
        cpu.boot();

        cpu.pc = 0xc000;
        cpu.mmu.write(0xc000, 0xd3);
        let result = cpu.clock();
        assert_eq!(result, Err(Error::IllegalOpcode(0xd3, 0xc000)));
    }

    #[test]
    fn test_interrupt_service() {
        let mut cpu = Cpu::default();
        cpu.boot();

        cpu.pc = 0xc000;
        cpu.sp = 0xd000;
        cpu.set_ime(true);
        cpu.mmu.ie = 0x01;
        cpu.mmu.write(IF_ADDR, 0x01);

        let cycles = cpu.clock().unwrap();
        assert_eq!(cycles, 20);
        assert_eq!(cpu.pc, 0x40);
        assert_eq!(cpu.sp, 0xcffe);
        assert_eq!(cpu.mmu.read_word(0xcffe), 0xc000);
        assert!(!cpu.ime());

        // the V-Blank bit has been acknowledged
        assert_eq!(cpu.mmu.read(IF_ADDR) & 0x01, 0x00);
    }

    #[test]
    fn test_interrupt_priority() {
        let mut cpu = Cpu::default();
        cpu.boot();

        cpu.pc = 0xc000;
        cpu.sp = 0xd000;
        cpu.set_ime(true);
        cpu.mmu.ie = 0x1f;
        cpu.mmu.write(IF_ADDR, 0x14);

        // timer (0x04) wins over joypad (0x10)
        cpu.clock().unwrap();
        assert_eq!(cpu.pc, 0x50);
        assert_eq!(cpu.mmu.read(IF_ADDR) & 0x1f, 0x10);
    }

    #[test]
    fn test_ei_delay() {
        let mut cpu = Cpu::default();
        cpu.boot();

        cpu.pc = 0xc000;
        cpu.sp = 0xd000;
        cpu.set_ime(false);
        cpu.mmu.ie = 0x01;
        cpu.mmu.write(IF_ADDR, 0x01);

        // EI followed by two NOPs
        cpu.mmu.write(0xc000, 0xfb);
        cpu.mmu.write(0xc001, 0x00);
        cpu.mmu.write(0xc002, 0x00);

        // EI retires, IME is still low
        cpu.clock().unwrap();
        assert!(!cpu.ime());
        assert_eq!(cpu.pc, 0xc001);

        // the following instruction retires, IME is promoted
        // afterwards and the pending interrupt is not serviced yet
        cpu.clock().unwrap();
        assert!(cpu.ime());
        assert_eq!(cpu.pc, 0xc002);

        // the interrupt is serviced at the next boundary
        let cycles = cpu.clock().unwrap();
        assert_eq!(cycles, 20);
        assert_eq!(cpu.pc, 0x40);
    }

    #[test]
    fn test_di_clears_pending_enable() {
        let mut cpu = Cpu::default();
        cpu.boot();

        cpu.pc = 0xc000;
        cpu.sp = 0xd000;
        cpu.mmu.ie = 0x01;
        cpu.mmu.write(IF_ADDR, 0x01);

        // EI; DI; NOP - the delayed enable must not survive the DI
        cpu.mmu.write(0xc000, 0xfb);
        cpu.mmu.write(0xc001, 0xf3);
        cpu.mmu.write(0xc002, 0x00);

        cpu.clock().unwrap();
        cpu.clock().unwrap();
        assert!(!cpu.ime());
        cpu.clock().unwrap();
        assert!(!cpu.ime());
        assert_eq!(cpu.pc, 0xc003);
    }

    #[test]
    fn test_halted_release() {
        let mut cpu = Cpu::default();
        cpu.boot();

        cpu.pc = 0xc000;
        cpu.set_ime(false);
        cpu.set_halted(true);
        cpu.mmu.ie = 0x04;

        // no pending interrupt, the CPU stays halted
        assert_eq!(cpu.clock().unwrap(), 4);
        assert!(cpu.halted());

        // a pending enabled interrupt releases the halt even
        // with the master enable off, no service routine runs
        cpu.mmu.write(IF_ADDR, 0x04);
        cpu.mmu.write(0xc000, 0x00);
        cpu.clock().unwrap();
        assert!(!cpu.halted());
        assert_eq!(cpu.pc, 0xc001);
    }

    #[test]
    fn test_state_and_set_state() {
        let mut cpu = Cpu::default();
        cpu.pc = 0x1234;
        cpu.sp = 0x5678;
        cpu.a = 0x9a;
        cpu.b = 0xbc;
        cpu.c = 0xde;
        cpu.d = 0xf0;
        cpu.e = 0x12;
        cpu.h = 0x34;
        cpu.l = 0x56;
        cpu.set_ime(true);
        cpu.set_zero(true);
        cpu.set_half_carry(true);
        cpu.set_halted(true);
        cpu.ppc = 0x9abc;

        let state = cpu.state(None).unwrap();
        assert_eq!(state.len(), 22);

        let mut new_cpu = Cpu::default();
        new_cpu.set_state(&state, None).unwrap();

        assert_eq!(new_cpu.pc, 0x1234);
        assert_eq!(new_cpu.sp, 0x5678);
        assert_eq!(new_cpu.a, 0x9a);
        assert_eq!(new_cpu.b, 0xbc);
        assert_eq!(new_cpu.c, 0xde);
        assert_eq!(new_cpu.d, 0xf0);
        assert_eq!(new_cpu.e, 0x12);
        assert_eq!(new_cpu.h, 0x34);
        assert_eq!(new_cpu.l, 0x56);
        assert!(new_cpu.ime());
        assert!(new_cpu.zero());
        assert!(!new_cpu.sub());
        assert!(new_cpu.half_carry());
        assert!(!new_cpu.carry());
        assert!(new_cpu.halted());
        assert_eq!(new_cpu.ppc, 0x9abc);
    }
}
