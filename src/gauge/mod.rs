//! # Fuel Gauge Module
//!
//! Register-level access to the MAX17205 fuel gauge.
//!
//! This module handles:
//! - Decoding 16-bit register words (signed and unsigned)
//! - Converting raw register units into %, A and V
//! - The fixed register address table sampled every cycle
//! - Reading registers through `i2cget` on the remote shell
//!
//! ## Device preconditions
//!
//! The gauge must be configured once before monitoring, for example:
//!
//! ```text
//! i2cset -f 0 0x36 0x0BD 0x1c62 w   # PackCfg: 2 cells
//! i2cset -f 0 0x36 0x018 0x1BBC w   # DesignCap: 3.35 Ah
//! i2cset -f 0 0x36 0x013 0x2000 w   # optional: lower FullSOCThr to widen balancing
//! ```

pub mod codec;
pub mod reader;
pub mod registers;
