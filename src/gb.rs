//! Game Boy emulation entrypoint and associated functions and structures.
//!
//! Most of the meaningful publicly available functions and structures to build
//! a working emulator should be present here.
//!
//! # Examples
//!
//! Creates a simple [`GameBoy`] instance and runs the boot program. Does that
//! by clocking the CPU until PC reaches 0x0100 (post boot address).
//!
//! ```rust
//! use dotmatrix::gb::GameBoy;
//! let mut game_boy = GameBoy::new();
//! game_boy.load(true).unwrap();
//! game_boy.load_rom_empty().unwrap();
//! let cycles = game_boy.step_to(0x0100).unwrap();
//! println!("Ran {} cycles", cycles);
//! ```

use std::fmt::{self, Display, Formatter};

use dotmatrix_common::{error::Error, util::read_file};

use crate::{
    cpu::Cpu,
    data::{BootRom, DMG_STUB},
    info::Info,
    mmu::Mmu,
    pad::{Pad, PadKey},
    ppu::{Ppu, PpuMode, Tile, DISPLAY_HEIGHT, DISPLAY_WIDTH, FRAME_BUFFER_SIZE},
    rom::Cartridge,
    timer::Timer,
};

/// Aggregation structure allowing the bundling of
/// all the components of a GameBoy into a single
/// element for easy access.
pub struct Components {
    pub ppu: Ppu,
    pub pad: Pad,
    pub timer: Timer,
}

/// Snapshot of both the CPU and the PPU registers, to be
/// used mostly for introspection and debugging.
pub struct Registers {
    pub pc: u16,
    pub sp: u16,
    pub a: u8,
    pub b: u8,
    pub c: u8,
    pub d: u8,
    pub e: u8,
    pub h: u8,
    pub l: u8,
    pub scy: u8,
    pub scx: u8,
    pub wy: u8,
    pub wx: u8,
    pub ly: u8,
    pub lyc: u8,
}

/// Top level structure that abstracts the usage of the
/// Game Boy system under the dotmatrix emulator.
///
/// Should serve as the main entry-point API.
pub struct GameBoy {
    /// If the PPU is enabled, it will be clocked.
    ppu_enabled: bool,

    /// If the timer is enabled, it will be clocked.
    timer_enabled: bool,

    /// The boot ROM that will (or was) used to boot the
    /// current Game Boy system.
    boot_rom: BootRom,

    /// Callback called once per V-Blank entry with the
    /// complete RGBA frame buffer, this is the hook to be
    /// used by the embedder to present frames.
    frame_callback: fn(frame: &[u8]),

    /// Reference to the Game Boy CPU component to be
    /// used as the main element of the system, when
    /// clocked, the amount of ticks from it will be
    /// used as reference for the rest of the components.
    cpu: Cpu,
}

impl GameBoy {
    pub fn new() -> Self {
        let components = Components {
            ppu: Ppu::default(),
            pad: Pad::default(),
            timer: Timer::default(),
        };
        let mmu = Mmu::new(components);
        let cpu = Cpu::new(mmu);

        Self {
            ppu_enabled: true,
            timer_enabled: true,
            boot_rom: BootRom::None,
            frame_callback: |_| {},
            cpu,
        }
    }

    pub fn reset(&mut self) {
        self.ppu().reset();
        self.timer().reset();
        self.mmu().reset();
        self.cpu.reset();
        self.boot_rom = BootRom::None;
    }

    /// Advances the clock of the system by one tick, this will
    /// usually imply executing one CPU instruction and advancing
    /// all the other components of the system by the required
    /// amount of cycles.
    ///
    /// The amount of T-cycles executed by the CPU is returned.
    pub fn clock(&mut self) -> Result<u16, Error> {
        let cycles = self.cpu_clock()? as u16;
        self.clock_devices(cycles);
        Ok(cycles)
    }

    /// Function equivalent to `clock()` but that allows pre-emptive
    /// breaking of the clock cycle loop if the PC (Program Counter)
    /// reaches the provided address, making sure that in such a situation
    /// the devices are not clocked.
    pub fn clock_step(&mut self, addr: u16) -> Result<u16, Error> {
        let cycles = self.cpu_clock()? as u16;
        if self.cpu_i().pc() == addr {
            return Ok(cycles);
        }
        self.clock_devices(cycles);
        Ok(cycles)
    }

    /// Equivalent to `clock()` but allows the execution of multiple
    /// clock operations in a single call.
    pub fn clocks(&mut self, count: usize) -> Result<u64, Error> {
        let mut cycles = 0_u64;
        for _ in 0..count {
            cycles += self.clock()? as u64;
        }
        Ok(cycles)
    }

    /// Clocks the emulator until the limit of cycles that has been
    /// provided and returns the amount of cycles that have been
    /// clocked.
    pub fn clocks_cycles(&mut self, limit: usize) -> Result<u64, Error> {
        let mut cycles = 0_u64;
        while cycles < limit as u64 {
            cycles += self.clock()? as u64;
        }
        Ok(cycles)
    }

    /// Runs the system until the next complete frame has been pushed
    /// into the frame buffer, returning the number of cycles consumed.
    pub fn next_frame(&mut self) -> Result<u32, Error> {
        let mut cycles = 0u32;
        let current_frame = self.ppu_frame();
        while self.ppu_frame() == current_frame {
            cycles += self.clock()? as u32;
        }
        Ok(cycles)
    }

    /// Runs the system until the PC (Program Counter) reaches the
    /// provided address, returning the number of cycles consumed.
    pub fn step_to(&mut self, addr: u16) -> Result<u32, Error> {
        let mut cycles = 0u32;
        while self.cpu_i().pc() != addr {
            cycles += self.clock_step(addr)? as u32;
        }
        Ok(cycles)
    }

    #[inline(always)]
    fn clock_devices(&mut self, cycles: u16) {
        if self.ppu_enabled {
            self.ppu_clock(cycles);
            if self.ppu().take_frame_ready() {
                let callback = self.frame_callback;
                callback(self.ppu_i().frame_buffer());
            }
        }
        if self.timer_enabled {
            self.timer_clock(cycles);
        }
    }

    pub fn key_press(&mut self, key: PadKey) {
        self.pad().key_press(key);
    }

    pub fn key_lift(&mut self, key: PadKey) {
        self.pad().key_lift(key);
    }

    pub fn cpu_clock(&mut self) -> Result<u8, Error> {
        self.cpu.clock()
    }

    pub fn ppu_clock(&mut self, cycles: u16) {
        self.ppu().clock(cycles)
    }

    pub fn timer_clock(&mut self, cycles: u16) {
        self.timer().clock(cycles)
    }

    pub fn ppu_ly(&mut self) -> u8 {
        self.ppu().ly()
    }

    pub fn ppu_mode(&mut self) -> PpuMode {
        self.ppu().mode()
    }

    pub fn ppu_frame(&mut self) -> u64 {
        self.ppu().frame_number()
    }

    /// Direct boot method that immediately jumps the machine
    /// to the post boot state, this will effectively skip the
    /// boot sequence and jump to the cartridge execution.
    pub fn boot(&mut self) {
        self.cpu.boot();
    }

    pub fn registers(&mut self) -> Registers {
        let ppu_registers = self.ppu().registers();
        Registers {
            pc: self.cpu.pc,
            sp: self.cpu.sp,
            a: self.cpu.a,
            b: self.cpu.b,
            c: self.cpu.c,
            d: self.cpu.d,
            e: self.cpu.e,
            h: self.cpu.h,
            l: self.cpu.l,
            scy: ppu_registers.scy,
            scx: ppu_registers.scx,
            wy: ppu_registers.wy,
            wx: ppu_registers.wx,
            ly: ppu_registers.ly,
            lyc: ppu_registers.lyc,
        }
    }

    /// Obtains the tile structure for the tile at the
    /// given index, no conversion in the pixel buffer
    /// is done so that the color reference is the GB one.
    pub fn get_tile(&mut self, index: usize) -> Tile {
        self.ppu().tiles()[index]
    }

    pub fn ppu_enabled(&self) -> bool {
        self.ppu_enabled
    }

    pub fn set_ppu_enabled(&mut self, value: bool) {
        self.ppu_enabled = value;
    }

    pub fn timer_enabled(&self) -> bool {
        self.timer_enabled
    }

    pub fn set_timer_enabled(&mut self, value: bool) {
        self.timer_enabled = value;
    }

    pub fn set_all_enabled(&mut self, value: bool) {
        self.set_ppu_enabled(value);
        self.set_timer_enabled(value);
    }

    pub fn boot_rom(&self) -> BootRom {
        self.boot_rom
    }

    pub fn set_boot_rom(&mut self, value: BootRom) {
        self.boot_rom = value;
    }

    /// Registers the callback invoked with the RGBA frame buffer
    /// once per V-Blank entry.
    pub fn set_frame_callback(&mut self, callback: fn(frame: &[u8])) {
        self.frame_callback = callback;
    }

    pub fn display_width(&self) -> usize {
        DISPLAY_WIDTH
    }

    pub fn display_height(&self) -> usize {
        DISPLAY_HEIGHT
    }

    pub fn description(&self, column_length: usize) -> String {
        let version_l = format!("{:width$}", "Version", width = column_length);
        let system_l = format!("{:width$}", "System", width = column_length);
        let boot_rom_l = format!("{:width$}", "Boot ROM", width = column_length);
        let clock_l = format!("{:width$}", "Clock", width = column_length);
        format!(
            "{}  {}\n{}  {}\n{}  {}\n{}  {}",
            version_l,
            Info::version(),
            system_l,
            Info::system(),
            boot_rom_l,
            self.boot_rom(),
            clock_l,
            self.clock_freq_s(),
        )
    }

    pub fn description_debug(&self) -> String {
        format!(
            "{}\nCPU:\n{}",
            self.description(12),
            self.cpu_i().description_default(),
        )
    }
}

/// Gameboy implementations that are meant with performance
/// in mind.
impl GameBoy {
    /// The logic frequency of the Game Boy
    /// CPU in hz.
    pub const CPU_FREQ: u32 = 4194304;

    /// The visual frequency (refresh rate)
    /// of the Game Boy, close to 60 hz.
    pub const VISUAL_FREQ: f32 = 59.7275;

    /// The cycles taken to run a complete frame
    /// loop in the Game Boy's PPU (in CPU cycles).
    pub const LCD_CYCLES: u32 = 70224;

    pub fn cpu(&mut self) -> &mut Cpu {
        &mut self.cpu
    }

    pub fn cpu_i(&self) -> &Cpu {
        &self.cpu
    }

    pub fn mmu(&mut self) -> &mut Mmu {
        self.cpu.mmu()
    }

    pub fn mmu_i(&self) -> &Mmu {
        self.cpu.mmu_i()
    }

    pub fn ppu(&mut self) -> &mut Ppu {
        self.cpu.mmu().ppu()
    }

    pub fn ppu_i(&self) -> &Ppu {
        self.cpu.mmu_i().ppu_i()
    }

    pub fn pad(&mut self) -> &mut Pad {
        self.cpu.mmu().pad()
    }

    pub fn pad_i(&self) -> &Pad {
        self.cpu.mmu_i().pad_i()
    }

    pub fn timer(&mut self) -> &mut Timer {
        self.cpu.mmu().timer()
    }

    pub fn timer_i(&self) -> &Timer {
        self.cpu.mmu_i().timer_i()
    }

    pub fn rom(&mut self) -> &mut Cartridge {
        self.mmu().rom()
    }

    pub fn rom_i(&self) -> &Cartridge {
        self.mmu_i().rom_i()
    }

    pub fn frame_buffer(&mut self) -> &[u8; FRAME_BUFFER_SIZE] {
        self.ppu().frame_buffer()
    }

    pub fn clock_freq_s(&self) -> String {
        format!("{:.02} Mhz", Self::CPU_FREQ as f32 / 1000.0 / 1000.0)
    }

    /// Allocates the memory of the system and optionally loads
    /// the embedded boot stub, making the machine ready to clock.
    pub fn load(&mut self, boot: bool) -> Result<(), Error> {
        self.mmu().allocate();
        if boot {
            self.load_boot_stub();
        }
        Ok(())
    }

    pub fn load_boot(&mut self, data: &[u8]) {
        self.cpu.mmu().write_boot(0x0000, data);
    }

    pub fn load_boot_stub(&mut self) {
        self.load_boot(&DMG_STUB);
        self.boot_rom = BootRom::Stub;
    }

    pub fn load_boot_path(&mut self, path: &str) -> Result<(), Error> {
        let data = read_file(path)?;
        self.load_boot(&data);
        self.boot_rom = BootRom::Other;
        Ok(())
    }

    pub fn load_cartridge(&mut self, rom: Cartridge) -> Result<&mut Cartridge, Error> {
        self.mmu().set_rom(rom);
        Ok(self.mmu().rom())
    }

    pub fn load_rom(&mut self, data: &[u8]) -> Result<&mut Cartridge, Error> {
        let rom = Cartridge::from_data(data)?;
        self.load_cartridge(rom)
    }

    pub fn load_rom_file(&mut self, path: &str) -> Result<&mut Cartridge, Error> {
        let data = read_file(path)?;
        self.load_rom(&data)
    }

    /// Loads a blank 32K cartridge, useful for testing, the header
    /// checksum byte is patched so that validation passes.
    pub fn load_rom_empty(&mut self) -> Result<&mut Cartridge, Error> {
        let mut data = [0u8; 32 * 1024];
        data[0x014d] = 0xe7;
        self.load_rom(&data)
    }

    pub fn read_memory(&mut self, addr: u16) -> u8 {
        self.mmu().read(addr)
    }

    pub fn write_memory(&mut self, addr: u16, value: u8) {
        self.mmu().write(addr, value);
    }
}

impl Default for GameBoy {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for GameBoy {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description(9))
    }
}

#[cfg(test)]
mod tests {
    use super::GameBoy;
    use crate::consts::{BGP_ADDR, IF_ADDR, LCDC_ADDR, LY_ADDR};

    #[test]
    fn test_post_boot_state() {
        let mut game_boy = GameBoy::new();
        game_boy.load(false).unwrap();
        game_boy.load_rom_empty().unwrap();
        game_boy.boot();

        assert_eq!(game_boy.cpu_i().pc(), 0x0100);
        assert_eq!(game_boy.cpu_i().sp(), 0xfffe);
        assert_eq!(game_boy.cpu_i().af(), 0x01b0);
        assert_eq!(game_boy.cpu_i().bc(), 0x0013);
        assert_eq!(game_boy.cpu_i().de(), 0x00d8);
        assert_eq!(game_boy.cpu_i().hl(), 0x014d);
        assert!(!game_boy.cpu_i().ime());

        assert_eq!(game_boy.read_memory(LCDC_ADDR), 0x91);
        assert_eq!(game_boy.read_memory(BGP_ADDR), 0xfc);
        assert_eq!(game_boy.read_memory(LY_ADDR), 0x00);
        assert_eq!(game_boy.read_memory(IF_ADDR), 0xe0);
    }

    #[test]
    fn test_frame_pacing() {
        let mut game_boy = GameBoy::new();
        game_boy.load(false).unwrap();

        // a blank cartridge with a HALT at the entry point, the
        // parked CPU keeps ticking in 4 cycle steps
        let mut data = [0u8; 32 * 1024];
        data[0x0100] = 0x76;
        data[0x014d] = 0xe7;
        game_boy.load_rom(&data).unwrap();
        game_boy.boot();

        game_boy.next_frame().unwrap();

        // the cycle delta between consecutive frames is exactly
        // one LCD period
        for _ in 0..3 {
            let cycles = game_boy.next_frame().unwrap();
            assert_eq!(cycles, GameBoy::LCD_CYCLES);
        }
    }

    #[test]
    fn test_vblank_interrupt_service() {
        let mut game_boy = GameBoy::new();
        game_boy.load(false).unwrap();

        // EI followed by a spin loop at the entry point, with the
        // V-Blank interrupt enabled the handler at 0x40 must run
        // once the first frame completes
        let mut data = [0u8; 32 * 1024];
        data[0x0100] = 0xfb;
        data[0x0101] = 0x18;
        data[0x0102] = 0xfe;
        data[0x0040] = 0x76;
        data[0x014d] = 0xe7;
        game_boy.load_rom(&data).unwrap();
        game_boy.boot();
        game_boy.mmu().ie = 0x01;

        game_boy
            .clocks_cycles(GameBoy::LCD_CYCLES as usize + 100)
            .unwrap();
        assert_eq!(game_boy.cpu_i().pc(), 0x0041);
        assert!(game_boy.cpu_i().halted());
    }
}
