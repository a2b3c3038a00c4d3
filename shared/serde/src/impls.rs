use crate::{
    bit_reader::BitReader, bit_writer::BitWrite, error::SerdeErr, serde::Serde,
    ConstBitLength, UnsignedVariableInteger,
};

// Unit

impl Serde for () {
    fn ser(&self, _: &mut dyn BitWrite) {}

    fn de(_: &mut BitReader) -> Result<Self, SerdeErr> {
        Ok(())
    }
}

// Booleans

impl Serde for bool {
    fn ser(&self, writer: &mut dyn BitWrite) {
        writer.write_bit(*self);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        reader.read_bit()
    }
}

impl ConstBitLength for bool {
    fn const_bit_length() -> u32 {
        1
    }
}

// Fixed-width unsigned integers

macro_rules! impl_serde_for_uint {
    ($impl_type:ident, $bytes:expr) => {
        impl Serde for $impl_type {
            fn ser(&self, writer: &mut dyn BitWrite) {
                for byte in self.to_le_bytes() {
                    writer.write_byte(byte);
                }
            }

            fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
                let mut bytes = [0_u8; $bytes];
                for byte in bytes.iter_mut() {
                    *byte = reader.read_byte()?;
                }
                Ok($impl_type::from_le_bytes(bytes))
            }
        }

        impl ConstBitLength for $impl_type {
            fn const_bit_length() -> u32 {
                $bytes * 8
            }
        }
    };
}

impl_serde_for_uint!(u8, 1);
impl_serde_for_uint!(u16, 2);
impl_serde_for_uint!(u32, 4);
impl_serde_for_uint!(u64, 8);
impl_serde_for_uint!(i32, 4);
impl_serde_for_uint!(i64, 8);

impl Serde for f64 {
    fn ser(&self, writer: &mut dyn BitWrite) {
        self.to_bits().ser(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        Ok(f64::from_bits(u64::de(reader)?))
    }
}

// Length-prefixed containers

fn ser_len(len: usize, writer: &mut dyn BitWrite) {
    UnsignedVariableInteger::<7>::new(len as u64).ser(writer);
}

fn de_len(reader: &mut BitReader) -> Result<usize, SerdeErr> {
    let len = UnsignedVariableInteger::<7>::de(reader)?.get();
    usize::try_from(len).map_err(|_| SerdeErr)
}

impl Serde for String {
    fn ser(&self, writer: &mut dyn BitWrite) {
        ser_len(self.len(), writer);
        for byte in self.as_bytes() {
            writer.write_byte(*byte);
        }
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        let len = de_len(reader)?;
        let mut bytes = Vec::with_capacity(len.min(4096));
        for _ in 0..len {
            bytes.push(reader.read_byte()?);
        }
        String::from_utf8(bytes).map_err(|_| SerdeErr)
    }
}

impl Serde for Box<[u8]> {
    fn ser(&self, writer: &mut dyn BitWrite) {
        ser_len(self.len(), writer);
        for byte in self.iter() {
            writer.write_byte(*byte);
        }
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        let len = de_len(reader)?;
        let mut bytes = Vec::with_capacity(len.min(4096));
        for _ in 0..len {
            bytes.push(reader.read_byte()?);
        }
        Ok(bytes.into_boxed_slice())
    }
}

impl<T: Serde> Serde for Vec<T> {
    fn ser(&self, writer: &mut dyn BitWrite) {
        ser_len(self.len(), writer);
        for item in self {
            item.ser(writer);
        }
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        let len = de_len(reader)?;
        let mut output = Vec::with_capacity(len.min(256));
        for _ in 0..len {
            output.push(T::de(reader)?);
        }
        Ok(output)
    }
}

impl<T: Serde> Serde for Option<T> {
    fn ser(&self, writer: &mut dyn BitWrite) {
        match self {
            Some(value) => {
                writer.write_bit(true);
                value.ser(writer);
            }
            None => writer.write_bit(false),
        }
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        if reader.read_bit()? {
            Ok(Some(T::de(reader)?))
        } else {
            Ok(None)
        }
    }
}
