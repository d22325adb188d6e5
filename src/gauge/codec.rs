//! # Register Codec
//!
//! Decodes register words and converts raw register units into physical units.
//!
//! Every conversion here is a direct transcription of the MAX17205 register map
//! scaling factors, so results must stay bit-exact:
//!
//! | Quantity   | LSB                          |
//! |------------|------------------------------|
//! | Percentage | 1/256 %                      |
//! | Current    | 1.5625 µV / R_sense          |
//! | Voltage    | 78.125 µV (0.625 mV / 8)     |

use crate::error::{GaugeMonitorError, Result};

/// Decode a hexadecimal register word
///
/// Accepts an optional `0x`/`0X` prefix. Leading zeros are allowed, but the
/// value must fit in 16 bits.
///
/// # Arguments
///
/// * `raw_hex` - Hexadecimal text, e.g. `"0x1a2b"`
/// * `signed` - Reinterpret the word as two's complement
///
/// # Returns
///
/// * `Result<i32>` - `0..=65535` when unsigned, `-32768..=32767` when signed
///
/// # Errors
///
/// Returns `Parse` if the text is not hexadecimal or exceeds 16 bits.
///
/// # Examples
///
/// ```
/// use gauge_monitor::gauge::codec::decode;
///
/// assert_eq!(decode("ffff", true).unwrap(), -1);
/// assert_eq!(decode("0xffff", false).unwrap(), 65535);
/// ```
pub fn decode(raw_hex: &str, signed: bool) -> Result<i32> {
    let word = parse_word(raw_hex)?;
    if signed {
        Ok(i32::from(word as i16))
    } else {
        Ok(i32::from(word))
    }
}

/// Decode an unsigned register word
pub fn decode_unsigned(raw_hex: &str) -> Result<u16> {
    parse_word(raw_hex)
}

/// Decode a two's complement register word
pub fn decode_signed(raw_hex: &str) -> Result<i16> {
    parse_word(raw_hex).map(|word| word as i16)
}

fn parse_word(raw_hex: &str) -> Result<u16> {
    let digits = raw_hex
        .strip_prefix("0x")
        .or_else(|| raw_hex.strip_prefix("0X"))
        .unwrap_or(raw_hex);

    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(GaugeMonitorError::Parse(format!(
            "Invalid register value: {:?}",
            raw_hex
        )));
    }

    // Leading zeros do not count towards the 16-bit width
    let significant = digits.trim_start_matches('0');
    if significant.len() > 4 {
        return Err(GaugeMonitorError::Parse(format!(
            "Register value exceeds 16 bits: {:?}",
            raw_hex
        )));
    }

    let significant = if significant.is_empty() { "0" } else { significant };
    u16::from_str_radix(significant, 16)
        .map_err(|e| GaugeMonitorError::Parse(format!("Invalid register value {:?}: {}", raw_hex, e)))
}

/// Convert a state-of-charge register to percent
pub fn to_percent(raw: u16) -> f64 {
    raw as f64 / 256.0
}

/// Convert a current register to amps
///
/// # Arguments
///
/// * `raw` - Signed current register value
/// * `sense_resistor_milliohm` - Shunt resistance (10 mΩ on the reference pack)
pub fn to_amps(raw: i16, sense_resistor_milliohm: f64) -> f64 {
    raw as f64 * 15625.0 / (sense_resistor_milliohm * 10.0) / 1e6
}

/// Convert a cell voltage register to volts
pub fn to_volts(raw: u16) -> f64 {
    raw as f64 * 625.0 / 8.0 / 1e6
}
