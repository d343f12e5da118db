/// Stack-machine opcodes used by the client.
pub mod op {
    pub const PUSH0: u8 = 0x00;
    pub const PUSHF: u8 = PUSH0;
    pub const PUSHBYTES1: u8 = 0x01;
    pub const PUSHBYTES75: u8 = 0x4b;
    pub const PUSHDATA1: u8 = 0x4c;
    pub const PUSHDATA2: u8 = 0x4d;
    pub const PUSHDATA4: u8 = 0x4e;
    pub const PUSHM1: u8 = 0x4f;
    pub const PUSH1: u8 = 0x51;
    pub const PUSHT: u8 = PUSH1;
    pub const PUSH16: u8 = 0x60;
    pub const TAILCALL: u8 = 0x69;
    pub const CHECKSIG: u8 = 0xac;
    pub const CHECKMULTISIG: u8 = 0xae;
    pub const CROSSCHAIN: u8 = 0xaf;
    pub const PACK: u8 = 0xc1;
    /// Trailing marker of smart contract code.
    pub const SMARTCONTRACT: u8 = 0x1c;
}

/// Append-only program writer.
#[derive(Debug, Default, Clone)]
pub struct ProgramBuilder {
    buf: Vec<u8>,
}

impl ProgramBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&mut self, opcode: u8) -> &mut Self {
        self.buf.push(opcode);
        self
    }

    pub fn emit_raw(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    pub fn push_bool(&mut self, value: bool) -> &mut Self {
        self.emit(if value { op::PUSHT } else { op::PUSHF })
    }

    pub fn push_integer(&mut self, value: i64) -> &mut Self {
        match value {
            -1 => self.emit(op::PUSHM1),
            0 => self.emit(op::PUSH0),
            1..=16 => self.emit(op::PUSH1 + (value as u8 - 1)),
            _ => {
                let bytes = integer_bytes(value);
                self.push_bytes(&bytes)
            }
        }
    }

    pub fn push_bytes(&mut self, data: &[u8]) -> &mut Self {
        let len = data.len();
        if len < op::PUSHDATA1 as usize {
            self.buf.push(len as u8);
        } else if len <= 0xff {
            self.buf.push(op::PUSHDATA1);
            self.buf.push(len as u8);
        } else if len <= 0xffff {
            self.buf.push(op::PUSHDATA2);
            self.buf.extend_from_slice(&(len as u16).to_le_bytes());
        } else {
            self.buf.push(op::PUSHDATA4);
            self.buf.extend_from_slice(&(len as u32).to_le_bytes());
        }
        self.emit_raw(data)
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

/// Minimal little-endian two's complement encoding.
fn integer_bytes(value: i64) -> Vec<u8> {
    let mut bytes = value.to_le_bytes().to_vec();
    while bytes.len() > 1 {
        let last = bytes[bytes.len() - 1];
        let sign_of_prev = bytes[bytes.len() - 2] & 0x80;
        if (last == 0x00 && sign_of_prev == 0) || (last == 0xff && sign_of_prev != 0) {
            bytes.pop();
        } else {
            break;
        }
    }
    bytes
}
