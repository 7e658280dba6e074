use std::{process::exit, time::Instant};

use clap::Parser;
use dotmatrix::{
    gb::GameBoy,
    ppu::{DISPLAY_HEIGHT, DISPLAY_WIDTH, RGBA_SIZE},
};
use dotmatrix_common::{error::Error, util::save_bmp};

#[derive(Parser)]
#[command(
    name = "dotmatrix-console",
    about = "Console frontend for the dotmatrix emulator"
)]
struct Args {
    /// Path to the cartridge ROM file to be loaded
    rom_path: String,

    /// Runs without any per-frame progress output
    #[arg(long)]
    headless: bool,

    /// Number of frames to run before exiting
    #[arg(long, default_value_t = 600)]
    frames: u32,

    /// Path to an external boot ROM image to be used instead
    /// of the embedded boot stub
    #[arg(long)]
    boot: Option<String>,

    /// Skips the boot program, jumping directly to the post
    /// boot state
    #[arg(long)]
    skip_boot: bool,

    /// Writes the final frame as a BMP file at the provided path
    #[arg(long)]
    screenshot: Option<String>,
}

fn run(args: &Args) -> Result<(), Error> {
    let mut game_boy = GameBoy::new();
    game_boy.load(!args.skip_boot)?;

    if let Some(boot_path) = &args.boot {
        game_boy.load_boot_path(boot_path)?;
    }

    let rom = game_boy.load_rom_file(&args.rom_path)?;
    println!("{}\n", rom.description(9));
    println!("{}\n", game_boy.description(9));

    if args.skip_boot {
        game_boy.boot();
    }

    let mut cycles = 0u64;
    let start = Instant::now();

    for frame in 0..args.frames {
        match game_boy.next_frame() {
            Ok(frame_cycles) => cycles += frame_cycles as u64,
            Err(error) => {
                // surfaces the post-mortem information of the CPU
                // together with the error that stopped the loop
                eprintln!("Execution stopped: {}", error);
                eprintln!(
                    "Last instruction 0x{:02x} at 0x{:04x}",
                    game_boy.cpu_i().opcode(),
                    game_boy.cpu_i().ppc()
                );
                return Err(error);
            }
        }
        if !args.headless && frame % 60 == 0 {
            println!("Frame {} ({} cycles)", frame, cycles);
        }
    }

    let elapsed = start.elapsed();
    let frequency = cycles as f64 / elapsed.as_secs_f64() / 1000.0 / 1000.0;
    println!(
        "Ran {} frames ({} cycles) in {:?} ({:.02} Mhz)",
        args.frames, cycles, elapsed, frequency
    );

    if let Some(screenshot) = &args.screenshot {
        let frame_buffer = game_boy.frame_buffer();
        let mut pixels = vec![0u8; DISPLAY_WIDTH * DISPLAY_HEIGHT * 3];
        for (index, pixel) in frame_buffer.chunks(RGBA_SIZE).enumerate() {
            pixels[index * 3] = pixel[0];
            pixels[index * 3 + 1] = pixel[1];
            pixels[index * 3 + 2] = pixel[2];
        }
        save_bmp(
            screenshot,
            &pixels,
            DISPLAY_WIDTH as u32,
            DISPLAY_HEIGHT as u32,
        )?;
        println!("Saved screenshot to {}", screenshot);
    }

    Ok(())
}

fn main() {
    let args = Args::parse();
    if run(&args).is_err() {
        exit(1);
    }
}
