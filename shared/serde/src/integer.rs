use crate::{bit_reader::BitReader, bit_writer::BitWrite, error::SerdeErr, serde::Serde, ConstBitLength};

pub type UnsignedInteger<const BITS: u8> = SerdeInteger<false, BITS>;
pub type UnsignedVariableInteger<const BITS: u8> = SerdeInteger<true, BITS>;

/// An unsigned integer written with exactly `BITS` bits, or, when `VARIABLE`
/// is set, as a chain of `BITS`-wide groups each prefixed by a continuation bit.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct SerdeInteger<const VARIABLE: bool, const BITS: u8> {
    inner: SerdeIntegerInner,
}

// The generic wrapper delegates to a non-generic inner type to keep
// monomorphized code small.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
struct SerdeIntegerInner {
    value: u64,
    variable: bool,
    bits: u8,
}

impl SerdeIntegerInner {
    fn new(variable: bool, bits: u8, value: u64) -> Self {
        if bits == 0 {
            panic!("can't create an integer with 0 bits...");
        }
        if bits > 64 {
            panic!("can't create an integer with more than 64 bits...");
        }
        if !variable && bits < 64 && value >= (1_u64 << bits) {
            panic!(
                "with {} bits, can't encode number greater than {}",
                bits,
                (1_u64 << bits) - 1
            );
        }

        Self {
            value,
            variable,
            bits,
        }
    }

    fn ser(&self, writer: &mut dyn BitWrite) {
        let mut value = self.value;

        if self.variable {
            loop {
                let proceed = self.bits < 64 && value >= (1_u64 << self.bits);
                writer.write_bit(proceed);
                for _ in 0..self.bits {
                    writer.write_bit(value & 1 != 0);
                    value >>= 1;
                }
                if !proceed {
                    return;
                }
            }
        } else {
            for _ in 0..self.bits {
                writer.write_bit(value & 1 != 0);
                value >>= 1;
            }
        }
    }

    fn de(reader: &mut BitReader, variable: bool, bits: u8) -> Result<Self, SerdeErr> {
        let mut output: u64 = 0;
        let mut shift: u32 = 0;

        loop {
            let proceed = if variable { reader.read_bit()? } else { false };

            for _ in 0..bits {
                let bit = reader.read_bit()?;
                if bit {
                    if shift >= 64 {
                        return Err(SerdeErr);
                    }
                    output |= 1_u64 << shift;
                }
                shift += 1;
            }

            if !proceed {
                return Ok(Self {
                    value: output,
                    variable,
                    bits,
                });
            }
        }
    }
}

impl<const VARIABLE: bool, const BITS: u8> SerdeInteger<VARIABLE, BITS> {
    pub fn new<T: Into<u64>>(value: T) -> Self {
        Self {
            inner: SerdeIntegerInner::new(VARIABLE, BITS, value.into()),
        }
    }

    pub fn get(&self) -> u64 {
        self.inner.value
    }
}

impl<const VARIABLE: bool, const BITS: u8> Serde for SerdeInteger<VARIABLE, BITS> {
    fn ser(&self, writer: &mut dyn BitWrite) {
        self.inner.ser(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        let inner = SerdeIntegerInner::de(reader, VARIABLE, BITS)?;
        Ok(Self { inner })
    }
}

impl<const BITS: u8> ConstBitLength for SerdeInteger<false, BITS> {
    fn const_bit_length() -> u32 {
        BITS as u32
    }
}
