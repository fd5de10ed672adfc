//! The payload module contains the components responsible for decoding the
//! measurement fields carried in Mercury responses.

pub mod data_encoding;
pub mod reading;

pub use data_encoding::{bcd_to_int, int_to_bcd};
pub use reading::{decode_energy, decode_instant, EnergyTotals, InstantValues};
