use std::collections::HashMap;

use super::*;

/// How data registers are reported by [`MonitorSession::sample`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum SampleMode {
    #[default]
    Numeric,
    /// Keep the four hex digits, restored to natural byte order.
    RawHex,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MonitorValue {
    Word(u16),
    Hex(String),
    Bit(bool),
}

/// Values of one sample, in monitor insertion order (data registers first).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MonitorSample {
    values: Vec<(String, MonitorValue)>,
    index: HashMap<String, usize>,
}

impl MonitorSample {
    fn insert(&mut self, name: String, value: MonitorValue) {
        match self.index.get(&name) {
            Some(&slot) => self.values[slot].1 = value,
            None => {
                self.index.insert(name.clone(), self.values.len());
                self.values.push((name, value));
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&MonitorValue> {
        self.index.get(name).map(|&slot| &self.values[slot].1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &MonitorValue)> {
        self.values.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Device-side batched poll.
///
/// Registers are collected while idle; [`arm`](Self::arm) installs them on
/// the PLC and afterwards every [`sample`](Self::sample) fetches all of them
/// in one round trip. Insertion order fixes the layout of both the install
/// command and the sample reply.
///
/// [`disarm`](Self::disarm) only resets local state. The protocol has no
/// uninstall command, so the device keeps its list until the next install.
#[derive(Debug, Default)]
pub struct MonitorSession {
    data_registers: Vec<RegisterRef>,
    bit_registers: Vec<RegisterRef>,
    armed: bool,
}

impl MonitorSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn data_registers(&self) -> &[RegisterRef] {
        &self.data_registers
    }

    pub fn bit_registers(&self) -> &[RegisterRef] {
        &self.bit_registers
    }

    /// Append a word-sized register to the data section.
    pub fn add_data_register(&mut self, name: &str) -> Result<(), RegisterError> {
        if self.refuse_when_armed(name) {
            return Ok(());
        }
        let reg = sized_register(name, WordSize::Word)?;
        self.data_registers.push(reg);
        Ok(())
    }

    /// Append a bit-sized register to the bit section.
    pub fn add_bit_register(&mut self, name: &str) -> Result<(), RegisterError> {
        if self.refuse_when_armed(name) {
            return Ok(());
        }
        let reg = sized_register(name, WordSize::Bit)?;
        self.bit_registers.push(reg);
        Ok(())
    }

    /// Append a register to the section matching its size.
    pub fn add_register(&mut self, name: &str) -> Result<(), RegisterError> {
        if self.refuse_when_armed(name) {
            return Ok(());
        }
        let (reg, _, size) = resolve(name)?;
        match size {
            WordSize::Word => self.data_registers.push(reg),
            WordSize::Bit => self.bit_registers.push(reg),
        }
        Ok(())
    }

    fn refuse_when_armed(&self, name: &str) -> bool {
        if self.armed {
            tracing::error!(register = name, "Unable to add registers to monitor while it is active");
        }
        self.armed
    }

    /// Install the monitor on the device. The session is armed only if the
    /// PLC acknowledges; otherwise it stays idle and may be retried.
    pub fn arm<T: Transport>(&mut self, plc: &mut Plc<T>) -> Result<bool, PlcError> {
        if self.armed {
            tracing::info!("Monitor already installed");
            return Ok(true);
        }

        let payload = build_monitor_install(&self.data_registers, &self.bit_registers);
        match plc.send_command(&payload)? {
            Response::Ack => {
                tracing::info!(
                    data = self.data_registers.len(),
                    bits = self.bit_registers.len(),
                    "Monitor installed correctly"
                );
                self.armed = true;
            }
            other => {
                tracing::info!(response = ?other, "Unable to install the monitor");
            }
        }
        Ok(self.armed)
    }

    pub fn disarm(&mut self) {
        self.armed = false;
    }

    /// Poll every monitored register in one exchange.
    pub fn sample<T: Transport>(
        &self,
        plc: &mut Plc<T>,
        mode: SampleMode,
    ) -> Result<MonitorSample, PlcError> {
        if !self.armed {
            return Err(PlcError::MonitorNotArmed);
        }
        let payload = build_monitor_sample(self.data_registers.len(), self.bit_registers.len());
        let text = plc.request(&payload)?;
        self.decode_sample(&text, mode)
    }

    /// Decode a sample reply against the current register layout.
    ///
    /// Data register `i` sits at text offset `4 * i`, low byte first. Bit
    /// register `j` is bit `j % 8` of the hex byte at `4 * data + 2 * (j / 8)`.
    pub fn decode_sample(&self, text: &str, mode: SampleMode) -> Result<MonitorSample, PlcError> {
        let data_count = self.data_registers.len();
        let expected = data_count * 4 + self.bit_registers.len().div_ceil(8) * 2;
        if text.len() < expected {
            return Err(PlcError::ShortResponse {
                expected,
                actual: text.len(),
            });
        }

        let mut sample = MonitorSample::default();
        for (idx, reg) in self.data_registers.iter().enumerate() {
            let offset = 4 * idx;
            let code = hex_field(text, offset, 4)?;
            let value = match mode {
                SampleMode::Numeric => MonitorValue::Word(
                    decode_swapped_word(code).ok_or_else(|| PlcError::InvalidHex(code.to_string()))?,
                ),
                SampleMode::RawHex => MonitorValue::Hex(swap_hex_word(code).to_ascii_uppercase()),
            };
            sample.insert(reg.to_string(), value);
        }

        for (idx, reg) in self.bit_registers.iter().enumerate() {
            let offset = 4 * data_count + 2 * (idx / 8);
            let code = hex_field(text, offset, 2)?;
            let byte =
                u8::from_str_radix(code, 16).map_err(|_| PlcError::InvalidHex(code.to_string()))?;
            sample.insert(reg.to_string(), MonitorValue::Bit(byte & (1 << (idx % 8)) != 0));
        }

        Ok(sample)
    }
}

fn sized_register(name: &str, expected: WordSize) -> Result<RegisterRef, RegisterError> {
    let (reg, _, size) = resolve(name)?;
    if size != expected {
        return Err(RegisterError::SizeMismatch {
            register: name.to_string(),
            expected,
        });
    }
    Ok(reg)
}

fn hex_field(text: &str, offset: usize, width: usize) -> Result<&str, PlcError> {
    let field = text
        .get(offset..offset + width)
        .ok_or_else(|| PlcError::InvalidHex(text.to_string()))?;
    if field.bytes().all(|b| b.is_ascii_hexdigit()) {
        Ok(field)
    } else {
        Err(PlcError::InvalidHex(field.to_string()))
    }
}
