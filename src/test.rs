//! Test harness helpers together with system level tests that
//! exercise complete boot and execution scenarios.

use dotmatrix_common::error::Error;

use crate::gb::GameBoy;

#[derive(Default)]
pub struct TestOptions {
    pub ppu_enabled: Option<bool>,
    pub timer_enabled: Option<bool>,
    pub boot: Option<bool>,
}

/// Builds a [`GameBoy`] instance ready for testing according
/// to the provided options, memory is allocated and the boot
/// stub optionally loaded.
pub fn build_test(options: TestOptions) -> Box<GameBoy> {
    let mut game_boy = Box::new(GameBoy::new());
    game_boy.set_ppu_enabled(options.ppu_enabled.unwrap_or(true));
    game_boy.set_timer_enabled(options.timer_enabled.unwrap_or(true));
    game_boy.load(options.boot.unwrap_or(true)).unwrap();
    game_boy
}

/// Runs the ROM at the provided path until the limit of cycles
/// has been reached, returning the resulting system.
pub fn run_test(
    rom_path: &str,
    max_cycles: Option<u64>,
    options: TestOptions,
) -> Result<Box<GameBoy>, Error> {
    let max_cycles = max_cycles.unwrap_or(u64::MAX);
    let mut game_boy = build_test(options);
    game_boy.load_rom_file(rom_path)?;
    game_boy.clocks_cycles(max_cycles as usize)?;
    Ok(game_boy)
}

/// Runs the ROM at the provided path until the PC reaches the
/// provided address, returning the resulting system.
pub fn run_step_test(
    rom_path: &str,
    addr: u16,
    options: TestOptions,
) -> Result<Box<GameBoy>, Error> {
    let mut game_boy = build_test(options);
    game_boy.load_rom_file(rom_path)?;
    game_boy.step_to(addr)?;
    Ok(game_boy)
}

#[cfg(test)]
mod tests {
    use super::{build_test, TestOptions};
    use crate::{consts::LCDC_ADDR, pad::PadKey};

    #[test]
    fn test_boot_stub_vram_clear() {
        let mut game_boy = build_test(TestOptions::default());
        game_boy.load_rom_empty().unwrap();

        // dirties the VRAM region so that the clear loop of the
        // boot program has observable work to do
        for addr in 0x8000..=0x9fffu16 {
            game_boy.write_memory(addr, 0xaa);
        }

        // runs the boot program until the clear loop has exited
        game_boy.step_to(0x000c).unwrap();

        let cpu = game_boy.cpu_i();
        assert_eq!(cpu.pc(), 0x000c);
        assert_eq!(cpu.a, 0x00);
        assert_eq!(cpu.h, 0x7f);
        assert_eq!(cpu.l, 0xff);
        assert_eq!(cpu.sp(), 0xfffe);
        assert_eq!(cpu.f(), 0xa0);

        for addr in 0x8000..=0x9fffu16 {
            assert_eq!(game_boy.read_memory(addr), 0x00);
        }

        // the decoded tile cache observed every clearing write
        for tile in game_boy.ppu_i().tiles() {
            assert_eq!(tile.buffer(), vec![0u8; 64]);
        }
    }

    #[test]
    fn test_boot_stub_handoff() {
        let mut game_boy = build_test(TestOptions::default());
        game_boy.load_rom_empty().unwrap();

        assert!(game_boy.mmu_i().boot_active());

        // the boot program must end up at the cartridge entry
        // point with the boot region unmapped and the LCD on
        game_boy.step_to(0x0100).unwrap();
        assert!(!game_boy.mmu_i().boot_active());
        assert_eq!(game_boy.cpu_i().a, 0x01);
        assert_eq!(game_boy.read_memory(LCDC_ADDR), 0x91);
        assert_eq!(game_boy.read_memory(0xff47), 0xfc);
    }

    #[test]
    fn test_stop_released_by_joypad() {
        let mut game_boy = build_test(TestOptions {
            boot: Some(false),
            ..Default::default()
        });
        game_boy.load_rom_empty().unwrap();
        game_boy.boot();

        // STOP with its padding byte, followed by a NOP
        game_boy.write_memory(0xc000, 0x10);
        game_boy.write_memory(0xc001, 0x00);
        game_boy.write_memory(0xc002, 0x00);
        game_boy.cpu().set_pc(0xc000);

        game_boy.clock().unwrap();
        assert!(game_boy.cpu_i().stopped());
        assert_eq!(game_boy.cpu_i().pc(), 0xc002);

        // while stopped the CPU idles in 4 cycle steps
        assert_eq!(game_boy.clock().unwrap(), 4);
        assert_eq!(game_boy.clock().unwrap(), 4);
        assert!(game_boy.cpu_i().stopped());

        // a key press releases the stopped state and execution
        // resumes on the next clock
        game_boy.key_press(PadKey::Start);
        game_boy.clock().unwrap();
        assert!(!game_boy.cpu_i().stopped());
        assert_eq!(game_boy.cpu_i().pc(), 0xc003);
    }

    #[test]
    fn test_halt_runs_frames() {
        let mut game_boy = build_test(TestOptions {
            boot: Some(false),
            ..Default::default()
        });
        game_boy.load_rom_empty().unwrap();
        game_boy.boot();

        // parks the CPU and verifies the PPU keeps producing
        // frames from the retired idle cycles
        game_boy.cpu().set_halted(true);
        let cycles = game_boy.next_frame().unwrap();
        assert!(cycles > 0);
        assert_eq!(game_boy.ppu_frame(), 1);
    }
}
