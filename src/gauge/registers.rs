//! # Register Address Table
//!
//! Fixed mapping from the sampled fields to their MAX17205 register address
//! and signedness. This table is configuration, not runtime state.

/// One 16-bit register sampled every cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Register {
    /// Field name, also used as the key in the persisted file
    pub name: &'static str,
    /// Register address on the device
    pub address: u8,
    /// Two's complement register
    pub signed: bool,
}

impl Register {
    const fn unsigned(name: &'static str, address: u8) -> Self {
        Self { name, address, signed: false }
    }

    const fn signed(name: &'static str, address: u8) -> Self {
        Self { name, address, signed: true }
    }
}

/// Voltage-based state of charge (1/256 %)
pub const VFSOC: Register = Register::unsigned("VFSOC", 0xFF);

/// Full state-of-charge threshold (1/256 %)
pub const FULL_SOC_THR: Register = Register::unsigned("FullSOCThr", 0x13);

/// Averaged pack current (current LSB)
pub const AVG_CURRENT: Register = Register::signed("AvgCurrent", 0x0B);

/// Charge termination current (current LSB)
pub const ICHG_TERM: Register = Register::signed("IChgTerm", 0x1E);

/// Averaged cell 1 voltage (voltage LSB)
pub const AVG_CELL1: Register = Register::unsigned("AvgCell1", 0xD4);

/// Averaged cell 2 voltage (voltage LSB)
pub const AVG_CELL2: Register = Register::unsigned("AvgCell2", 0xD3);

/// Reported state of charge (1/256 %)
pub const REP_SOC: Register = Register::unsigned("RepSOC", 0x06);

/// Registers in the order they are read each cycle
pub const SAMPLED_REGISTERS: [Register; 7] = [
    VFSOC,
    FULL_SOC_THR,
    AVG_CURRENT,
    ICHG_TERM,
    AVG_CELL1,
    AVG_CELL2,
    REP_SOC,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_table() {
        let table: Vec<_> = SAMPLED_REGISTERS
            .iter()
            .map(|r| (r.name, r.address, r.signed))
            .collect();

        assert_eq!(
            table,
            vec![
                ("VFSOC", 0xFF, false),
                ("FullSOCThr", 0x13, false),
                ("AvgCurrent", 0x0B, true),
                ("IChgTerm", 0x1E, true),
                ("AvgCell1", 0xD4, false),
                ("AvgCell2", 0xD3, false),
                ("RepSOC", 0x06, false),
            ]
        );
    }

    #[test]
    fn test_addresses_are_unique() {
        for (i, a) in SAMPLED_REGISTERS.iter().enumerate() {
            for b in &SAMPLED_REGISTERS[i + 1..] {
                assert_ne!(a.address, b.address, "{} and {} share an address", a.name, b.name);
            }
        }
    }
}
