pub trait BitWrite {
    fn write_bit(&mut self, bit: bool);
    fn write_byte(&mut self, byte: u8);
    fn write_bits(&mut self, bits: u32) {
        for _ in 0..bits {
            self.write_bit(false);
        }
    }
}

/// A growable bit buffer. Frames on the data plane and control messages have
/// no MTU limit at this layer, so the buffer simply extends as needed.
pub struct BitWriter {
    scratch: u8,
    scratch_index: u8,
    buffer: Vec<u8>,
    bits_written: u32,
}

impl BitWriter {
    pub fn new() -> Self {
        Self {
            scratch: 0,
            scratch_index: 0,
            buffer: Vec::with_capacity(64),
            bits_written: 0,
        }
    }

    fn flush_scratch(&mut self) {
        if self.scratch_index > 0 {
            let byte = (self.scratch << (8 - self.scratch_index)).reverse_bits();
            self.buffer.push(byte);
            self.scratch = 0;
            self.scratch_index = 0;
        }
    }

    pub fn to_bytes(mut self) -> Box<[u8]> {
        self.flush_scratch();
        self.buffer.into_boxed_slice()
    }

    pub fn bits_written(&self) -> u32 {
        self.bits_written
    }
}

impl Default for BitWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl BitWrite for BitWriter {
    fn write_bit(&mut self, bit: bool) {
        self.scratch <<= 1;

        if bit {
            self.scratch |= 1;
        }

        self.scratch_index += 1;
        self.bits_written += 1;

        if self.scratch_index >= 8 {
            self.buffer.push(self.scratch.reverse_bits());
            self.scratch_index = 0;
            self.scratch = 0;
        }
    }

    fn write_byte(&mut self, byte: u8) {
        let mut temp = byte;
        for _ in 0..8 {
            self.write_bit(temp & 1 != 0);
            temp >>= 1;
        }
    }
}

/// Counts bits without storing them, used to size payloads up front.
pub struct BitCounter {
    count: u32,
}

impl BitCounter {
    pub fn new() -> Self {
        Self { count: 0 }
    }

    pub fn bits_needed(&self) -> u32 {
        self.count
    }
}

impl Default for BitCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl BitWrite for BitCounter {
    fn write_bit(&mut self, _: bool) {
        self.count += 1;
    }

    fn write_byte(&mut self, _: u8) {
        self.count += 8;
    }

    fn write_bits(&mut self, bits: u32) {
        self.count += bits;
    }
}
