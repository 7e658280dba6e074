//! Gamepad (joypad) functions and structures.

use crate::{consts::P1_ADDR, mmu::BusComponent, warnln};

/// The state of the eight Game Boy keys together with the
/// matrix line selection latched through the P1 register.
pub struct Pad {
    down: bool,
    up: bool,
    left: bool,
    right: bool,
    start: bool,
    select: bool,
    b: bool,
    a: bool,
    selection: PadSelection,
    int_pad: bool,
}

#[derive(Clone, Copy, PartialEq)]
pub enum PadSelection {
    Action,
    Direction,
}

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum PadKey {
    Up,
    Down,
    Left,
    Right,
    Start,
    Select,
    A,
    B,
}

impl Pad {
    pub fn new() -> Self {
        Self {
            down: false,
            up: false,
            left: false,
            right: false,
            start: false,
            select: false,
            b: false,
            a: false,
            selection: PadSelection::Action,
            int_pad: false,
        }
    }

    pub fn reset(&mut self) {
        self.down = false;
        self.up = false;
        self.left = false;
        self.right = false;
        self.start = false;
        self.select = false;
        self.b = false;
        self.a = false;
        self.selection = PadSelection::Action;
        self.int_pad = false;
    }

    pub fn read(&self, addr: u16) -> u8 {
        match addr {
            P1_ADDR => {
                let mut value = match self.selection {
                    PadSelection::Action => {
                        (if self.a { 0x00 } else { 0x01 })
                            | (if self.b { 0x00 } else { 0x02 })
                            | (if self.select { 0x00 } else { 0x04 })
                            | (if self.start { 0x00 } else { 0x08 })
                    }
                    PadSelection::Direction => {
                        (if self.right { 0x00 } else { 0x01 })
                            | (if self.left { 0x00 } else { 0x02 })
                            | (if self.up { 0x00 } else { 0x04 })
                            | (if self.down { 0x00 } else { 0x08 })
                    }
                };
                value |= if self.selection == PadSelection::Direction {
                    0x10
                } else {
                    0x20
                };
                value
            }
            _ => {
                warnln!("Reading from unknown Pad location 0x{:04x}", addr);
                #[allow(unreachable_code)]
                0xff
            }
        }
    }

    pub fn write(&mut self, addr: u16, value: u8) {
        match addr {
            P1_ADDR => {
                self.selection = if value & 0x10 == 0x00 {
                    PadSelection::Direction
                } else {
                    PadSelection::Action
                }
            }
            _ => warnln!("Writing to unknown Pad location 0x{:04x}", addr),
        }
    }

    /// Presses a key, raising the joypad interrupt latch. The
    /// latch also releases the CPU from the stopped state.
    pub fn key_press(&mut self, key: PadKey) {
        match key {
            PadKey::Up => self.up = true,
            PadKey::Down => self.down = true,
            PadKey::Left => self.left = true,
            PadKey::Right => self.right = true,
            PadKey::Start => self.start = true,
            PadKey::Select => self.select = true,
            PadKey::A => self.a = true,
            PadKey::B => self.b = true,
        }
        self.int_pad = true;
    }

    pub fn key_lift(&mut self, key: PadKey) {
        match key {
            PadKey::Up => self.up = false,
            PadKey::Down => self.down = false,
            PadKey::Left => self.left = false,
            PadKey::Right => self.right = false,
            PadKey::Start => self.start = false,
            PadKey::Select => self.select = false,
            PadKey::A => self.a = false,
            PadKey::B => self.b = false,
        }
    }

    #[inline(always)]
    pub fn int_pad(&self) -> bool {
        self.int_pad
    }

    #[inline(always)]
    pub fn set_int_pad(&mut self, value: bool) {
        self.int_pad = value;
    }

    #[inline(always)]
    pub fn ack_pad(&mut self) {
        self.set_int_pad(false);
    }
}

impl BusComponent for Pad {
    fn read(&self, addr: u16) -> u8 {
        self.read(addr)
    }

    fn write(&mut self, addr: u16, value: u8) {
        self.write(addr, value);
    }
}

impl Default for Pad {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::{Pad, PadKey};
    use crate::consts::P1_ADDR;

    #[test]
    fn test_selection_lines() {
        let mut pad = Pad::default();
        pad.key_press(PadKey::A);
        pad.key_press(PadKey::Down);

        // action line selected (P1.4 high), A pressed reads low
        pad.write(P1_ADDR, 0x10);
        assert_eq!(pad.read(P1_ADDR), 0x20 | 0x0e);

        // direction line selected (P1.4 low), down pressed reads low
        pad.write(P1_ADDR, 0x20);
        assert_eq!(pad.read(P1_ADDR), 0x10 | 0x07);

        pad.key_lift(PadKey::A);
        pad.write(P1_ADDR, 0x10);
        assert_eq!(pad.read(P1_ADDR), 0x20 | 0x0f);
    }

    #[test]
    fn test_interrupt_latch() {
        let mut pad = Pad::default();
        assert!(!pad.int_pad());
        pad.key_press(PadKey::Start);
        assert!(pad.int_pad());
        pad.ack_pad();
        assert!(!pad.int_pad());
    }
}
