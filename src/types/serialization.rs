//! Little-endian primitives and var-uint framed byte strings used by the
//! canonical transaction encoding.

use crate::error::{Result, WalletCliError};

pub fn write_var_uint(out: &mut Vec<u8>, n: u64) {
    match n {
        0x00..=0xfc => out.push(n as u8),
        0xfd..=0xffff => {
            out.push(0xfd);
            out.extend_from_slice(&(n as u16).to_le_bytes());
        }
        0x1_0000..=0xffff_ffff => {
            out.push(0xfe);
            out.extend_from_slice(&(n as u32).to_le_bytes());
        }
        _ => {
            out.push(0xff);
            out.extend_from_slice(&n.to_le_bytes());
        }
    }
}

pub fn write_var_bytes(out: &mut Vec<u8>, bytes: &[u8]) {
    write_var_uint(out, bytes.len() as u64);
    out.extend_from_slice(bytes);
}

pub fn write_var_string(out: &mut Vec<u8>, s: &str) {
    write_var_bytes(out, s.as_bytes());
}

/// Bounds-checked cursor over a serialized transaction.
pub struct Reader<'a> {
    b: &'a [u8],
    off: usize,
}

impl<'a> Reader<'a> {
    pub fn new(b: &'a [u8]) -> Self {
        Self { b, off: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.b.len() - self.off
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        if n > self.remaining() {
            return Err(WalletCliError::format(format!(
                "unexpected EOF at offset {} (need {} bytes, have {})",
                self.off,
                n,
                self.remaining()
            )));
        }
        let v = &self.b[self.off..self.off + n];
        self.off += n;
        Ok(v)
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    pub fn read_u16_le(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    pub fn read_u32_le(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    pub fn read_u64_le(&mut self) -> Result<u64> {
        Ok(u64::from_le_bytes(self.read_array()?))
    }

    pub fn read_i64_le(&mut self) -> Result<i64> {
        Ok(i64::from_le_bytes(self.read_array()?))
    }

    pub fn read_var_uint(&mut self) -> Result<u64> {
        let tag = self.read_u8()?;
        let (v, minimal_ok) = match tag {
            0x00..=0xfc => (tag as u64, true),
            0xfd => {
                let v = self.read_u16_le()? as u64;
                (v, v >= 0xfd)
            }
            0xfe => {
                let v = self.read_u32_le()? as u64;
                (v, v > 0xffff)
            }
            0xff => {
                let v = self.read_u64_le()?;
                (v, v > 0xffff_ffff)
            }
        };
        if !minimal_ok {
            return Err(WalletCliError::format("non-minimal var uint"));
        }
        Ok(v)
    }

    pub fn read_var_bytes(&mut self) -> Result<Vec<u8>> {
        let len = self.read_var_uint()?;
        let len = usize::try_from(len)
            .map_err(|_| WalletCliError::format("var bytes length overflows usize"))?;
        Ok(self.read_bytes(len)?.to_vec())
    }

    pub fn read_var_string(&mut self) -> Result<String> {
        let bytes = self.read_var_bytes()?;
        String::from_utf8(bytes).map_err(|e| WalletCliError::format(format!("var string: {e}")))
    }

    /// Number of items in a var-uint prefixed list. Every item needs at least
    /// one byte, which caps allocations driven by hostile input.
    pub fn read_count(&mut self) -> Result<usize> {
        let n = self.read_var_uint()?;
        if n > self.remaining() as u64 {
            return Err(WalletCliError::format(format!(
                "item count {} exceeds remaining {} bytes",
                n,
                self.remaining()
            )));
        }
        Ok(n as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, vec![0x00])]
    #[case(0xfc, vec![0xfc])]
    #[case(0xfd, vec![0xfd, 0xfd, 0x00])]
    #[case(0x1_0000, vec![0xfe, 0x00, 0x00, 0x01, 0x00])]
    #[case(0x1_0000_0000, vec![0xff, 0, 0, 0, 0, 1, 0, 0, 0])]
    fn var_uint_boundaries(#[case] n: u64, #[case] expected: Vec<u8>) {
        let mut out = Vec::new();
        write_var_uint(&mut out, n);
        assert_eq!(out, expected);
        assert_eq!(Reader::new(&out).read_var_uint().unwrap(), n);
    }

    #[test]
    fn non_minimal_var_uint_rejected() {
        let mut r = Reader::new(&[0xfd, 0x10, 0x00]);
        assert!(r.read_var_uint().is_err());
    }

    #[test]
    fn truncated_bytes_rejected() {
        let mut r = Reader::new(&[0x05, 0x01, 0x02]);
        assert!(matches!(r.read_var_bytes(), Err(WalletCliError::Format(_))));
    }

    #[test]
    fn hostile_count_rejected() {
        let mut r = Reader::new(&[0xfe, 0xff, 0xff, 0xff, 0x0f]);
        assert!(r.read_count().is_err());
    }
}
