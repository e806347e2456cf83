//! Driver for RGB character LCD plates: an HD44780 16x2 LCD and five buttons
//! wired to an MCP23017 I2C port expander.
//!
//! Port A: buttons on GPA0..GPA4 (select, right, down, up, left), red and
//! green backlight on GPA6 and GPA7.
//! Port B: blue backlight on GPB0, LCD D7..D4 on GPB1..GPB4, E on GPB5,
//! RW on GPB6, RS on GPB7.
//!
//! Buttons and backlight LEDs are active low.
use std::fmt::Debug;

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use tracing::debug;

use super::{Backlight, Buttons, CharDisplay};

pub const DEFAULT_ADDRESS: u8 = 0x20;
pub const COLUMNS: usize = 16;
pub const ROWS: usize = 2;

// MCP23017 registers, IOCON.BANK = 0
const IODIRA: u8 = 0x00;
const IODIRB: u8 = 0x01;
const GPPUA: u8 = 0x0C;
const GPIOA: u8 = 0x12;
const OLATA: u8 = 0x14;
const OLATB: u8 = 0x15;

// Port A
const BUTTON_SELECT: u8 = 1 << 0;
const BUTTON_RIGHT: u8 = 1 << 1;
const BUTTON_DOWN: u8 = 1 << 2;
const BUTTON_UP: u8 = 1 << 3;
const BUTTON_LEFT: u8 = 1 << 4;
const BUTTON_MASK: u8 = 0b0001_1111;
const LED_RED: u8 = 1 << 6;
const LED_GREEN: u8 = 1 << 7;

// Port B
const LED_BLUE: u8 = 1 << 0;
const LCD_D7: u8 = 1 << 1;
const LCD_D6: u8 = 1 << 2;
const LCD_D5: u8 = 1 << 3;
const LCD_D4: u8 = 1 << 4;
const LCD_E: u8 = 1 << 5;
const LCD_RS: u8 = 1 << 7;

// HD44780 commands
const CMD_CLEAR: u8 = 0x01;
const CMD_ENTRY_LEFT: u8 = 0x06;
const CMD_DISPLAY_CONTROL: u8 = 0x08;
const DISPLAY_ON: u8 = 0x04;
const CMD_FUNCTION_4BIT_2LINE: u8 = 0x28;
const CMD_SET_DDRAM: u8 = 0x80;
const ROW_OFFSETS: [u8; ROWS] = [0x00, 0x40];

#[derive(thiserror::Error, Debug)]
pub enum LcdError<E: Debug> {
    #[error("i2c transfer to the port expander failed: {0:?}")]
    I2c(E),
}

pub struct RgbLcdPlate<I, D> {
    i2c: I,
    delay: D,
    address: u8,
    /// Output latches, kept so a write to one pin doesn't clobber the others
    olata: u8,
    olatb: u8,
    display_control: u8,
}

impl<I: I2c, D: DelayNs> RgbLcdPlate<I, D> {
    /// Configure the port expander and put the LCD into 4-bit, two line mode.
    /// The display starts cleared and off with the backlight dark.
    pub fn new(i2c: I, delay: D, address: u8) -> Result<Self, LcdError<I::Error>> {
        let mut plate = RgbLcdPlate {
            i2c,
            delay,
            address,
            olata: LED_RED | LED_GREEN,
            olatb: LED_BLUE,
            display_control: CMD_DISPLAY_CONTROL,
        };

        // Latches first so the outputs come up with the LEDs dark.
        plate.write_register(OLATA, plate.olata)?;
        plate.write_register(OLATB, plate.olatb)?;
        plate.write_register(IODIRA, BUTTON_MASK | 1 << 5)?;
        plate.write_register(IODIRB, 0x00)?;
        plate.write_register(GPPUA, BUTTON_MASK)?;

        plate.command(0x33)?;
        plate.delay.delay_ms(5);
        plate.command(0x32)?;
        plate.delay.delay_ms(5);
        plate.command(CMD_FUNCTION_4BIT_2LINE)?;
        plate.command(plate.display_control)?;
        plate.command(CMD_ENTRY_LEFT)?;
        plate.command(CMD_CLEAR)?;
        plate.delay.delay_ms(3);

        debug!(address = plate.address, "lcd plate initialised");

        Ok(plate)
    }

    fn write_register(&mut self, register: u8, value: u8) -> Result<(), LcdError<I::Error>> {
        self.i2c
            .write(self.address, &[register, value])
            .map_err(LcdError::I2c)
    }

    /// Clock one nibble into the LCD on the falling edge of E
    fn write_nibble(&mut self, nibble: u8, rs: bool) -> Result<(), LcdError<I::Error>> {
        let mut bits = self.olatb & LED_BLUE;
        if rs {
            bits |= LCD_RS;
        }
        for (mask, pin) in [(0x1, LCD_D4), (0x2, LCD_D5), (0x4, LCD_D6), (0x8, LCD_D7)] {
            if nibble & mask != 0 {
                bits |= pin;
            }
        }

        self.write_register(OLATB, bits | LCD_E)?;
        self.write_register(OLATB, bits)?;
        self.olatb = bits;

        Ok(())
    }

    fn write_byte(&mut self, value: u8, rs: bool) -> Result<(), LcdError<I::Error>> {
        self.write_nibble(value >> 4, rs)?;
        self.write_nibble(value & 0x0F, rs)?;
        self.delay.delay_us(50);

        Ok(())
    }

    fn command(&mut self, command: u8) -> Result<(), LcdError<I::Error>> {
        self.write_byte(command, false)
    }

    fn set_cursor(&mut self, column: u8, row: usize) -> Result<(), LcdError<I::Error>> {
        let offset = ROW_OFFSETS[row.min(ROWS - 1)];
        self.command(CMD_SET_DDRAM | (offset + column))
    }
}

/// The HD44780 ROM only matches ASCII for printable characters
fn lcd_byte(c: char) -> u8 {
    if c.is_ascii() && !c.is_ascii_control() {
        c as u8
    } else {
        b'?'
    }
}

impl<I, D> CharDisplay for RgbLcdPlate<I, D>
where
    I: I2c,
    I::Error: Send + Sync + 'static,
    D: DelayNs,
{
    type Error = LcdError<I::Error>;

    fn clear(&mut self) -> Result<(), Self::Error> {
        self.command(CMD_CLEAR)?;
        self.delay.delay_ms(3);

        Ok(())
    }

    /// Each line is padded with spaces to the full width so leftovers of a
    /// longer previous message disappear. Text past the last column is cut.
    fn write_message(&mut self, message: &str) -> Result<(), Self::Error> {
        for (row, line) in message.split('\n').take(ROWS).enumerate() {
            self.set_cursor(0, row)?;

            let mut chars = line.chars().map(lcd_byte);
            for _ in 0..COLUMNS {
                let byte = chars.next().unwrap_or(b' ');
                self.write_byte(byte, true)?;
            }
        }

        Ok(())
    }

    fn set_enabled(&mut self, enabled: bool) -> Result<(), Self::Error> {
        if enabled {
            self.display_control |= DISPLAY_ON;
        } else {
            self.display_control &= !DISPLAY_ON;
        }

        self.command(self.display_control)
    }

    fn set_backlight(&mut self, backlight: Backlight) -> Result<(), Self::Error> {
        self.olata |= LED_RED | LED_GREEN;
        if backlight.red {
            self.olata &= !LED_RED;
        }
        if backlight.green {
            self.olata &= !LED_GREEN;
        }
        self.write_register(OLATA, self.olata)?;

        self.olatb |= LED_BLUE;
        if backlight.blue {
            self.olatb &= !LED_BLUE;
        }
        self.write_register(OLATB, self.olatb)
    }

    fn buttons(&mut self) -> Result<Buttons, Self::Error> {
        let mut gpioa = [0u8];
        self.i2c
            .write_read(self.address, &[GPIOA], &mut gpioa)
            .map_err(LcdError::I2c)?;

        let pressed = !gpioa[0] & BUTTON_MASK;

        Ok(Buttons {
            select: pressed & BUTTON_SELECT != 0,
            right: pressed & BUTTON_RIGHT != 0,
            down: pressed & BUTTON_DOWN != 0,
            up: pressed & BUTTON_UP != 0,
            left: pressed & BUTTON_LEFT != 0,
        })
    }
}
