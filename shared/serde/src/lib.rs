//! # Chanmesh Serde
//! Bit-level encoding for chanmesh control messages, data-frame headers and
//! typed channel payloads.

mod bit_reader;
mod bit_writer;
mod error;
mod impls;
mod integer;
mod serde;

pub use bit_reader::BitReader;
pub use bit_writer::{BitCounter, BitWrite, BitWriter};
pub use error::SerdeErr;
pub use integer::{SerdeInteger, UnsignedInteger, UnsignedVariableInteger};
pub use serde::{ConstBitLength, Serde};
