/// Two running 8-bit sums over the frame, seeded with the length byte.
///
/// Every byte after `length` up to the checksum feeds `ck_a`, and `ck_b`
/// accumulates successive values of `ck_a`. STX is not included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Checksum {
    pub ck_a: u8,
    pub ck_b: u8,
}

impl Checksum {
    pub fn seed(length: u8) -> Self {
        Self {
            ck_a: length,
            ck_b: length,
        }
    }

    pub fn update(&mut self, byte: u8) {
        self.ck_a = self.ck_a.wrapping_add(byte);
        self.ck_b = self.ck_b.wrapping_add(self.ck_a);
    }

    pub fn update_slice(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.update(byte);
        }
    }

    /// Checksum of a whole frame body (header ids and payload).
    pub fn compute(length: u8, body: &[u8]) -> Self {
        let mut sum = Self::seed(length);
        sum.update_slice(body);
        sum
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_only() {
        assert_eq!(Checksum::compute(6, &[]), Checksum { ck_a: 6, ck_b: 6 });
    }

    #[test]
    fn sums_wrap() {
        assert_eq!(
            Checksum::compute(6, &[5, 8]),
            Checksum {
                ck_a: 0x13,
                ck_b: 0x24
            }
        );
        let sum = Checksum::compute(0xFF, &[0xFF, 0xFF]);
        assert_eq!(sum.ck_a, 0xFD);
        assert_eq!(sum.ck_b, 0xFA);
    }
}
