/// Incremental UTF-8 decoder for byte chunks that may split a character.
///
/// Incomplete trailing sequences are held until the next chunk completes
/// them; invalid sequences decode to U+FFFD.
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes as much of `bytes` (plus any held-back bytes) as possible.
    pub fn decode(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);
        let mut output = String::new();

        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(text) => {
                    output.push_str(text);
                    self.pending.clear();
                    return output;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    output.push_str(&String::from_utf8_lossy(&self.pending[..valid]));

                    match e.error_len() {
                        // Truncated sequence at the end; wait for more bytes.
                        None => {
                            self.pending.drain(..valid);
                            return output;
                        }
                        Some(len) => {
                            output.push(char::REPLACEMENT_CHARACTER);
                            self.pending.drain(..valid + len);
                        }
                    }
                }
            }
        }
    }

    /// Flushes whatever is still held back.
    pub fn finish(&mut self) -> String {
        let rest = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        rest
    }
}
