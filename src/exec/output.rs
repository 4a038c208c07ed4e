// src/exec/output.rs

//! Turning raw pipe reads into deliverable text.

/// Decoder for one child stream.
#[derive(Debug)]
pub enum StreamDecoder {
    Lines(LineBuffer),
    Chunks(ChunkDecoder),
}

impl StreamDecoder {
    pub fn new(line_buffered: bool) -> Self {
        if line_buffered {
            StreamDecoder::Lines(LineBuffer::default())
        } else {
            StreamDecoder::Chunks(ChunkDecoder::default())
        }
    }

    /// Feed freshly read bytes; returns whatever is ready for delivery.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        match self {
            StreamDecoder::Lines(lines) => lines.push(bytes),
            StreamDecoder::Chunks(chunks) => chunks.push(bytes).into_iter().collect(),
        }
    }

    /// End of stream: whatever is still buffered.
    pub fn finish(&mut self) -> Option<String> {
        match self {
            StreamDecoder::Lines(lines) => lines.finish(),
            StreamDecoder::Chunks(chunks) => chunks.finish(),
        }
    }
}

/// Reassembles complete lines. Lines are yielded without `\n` / `\r\n`.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(bytes);

        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let mut line: Vec<u8> = self.pending.drain(..=pos).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            lines.push(String::from_utf8_lossy(&line).into_owned());
        }
        lines
    }

    /// The trailing partial line, if any.
    pub fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.pending);
        Some(String::from_utf8_lossy(&rest).into_owned())
    }
}

/// Passes chunks through as they arrive, holding back only an incomplete
/// UTF-8 sequence at the end of a read. Invalid bytes become U+FFFD.
#[derive(Debug, Default)]
pub struct ChunkDecoder {
    carry: Vec<u8>,
}

impl ChunkDecoder {
    pub fn push(&mut self, bytes: &[u8]) -> Option<String> {
        self.carry.extend_from_slice(bytes);

        let mut out = String::new();
        let mut rest: &[u8] = &self.carry;
        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    out.push_str(valid);
                    rest = &[];
                    break;
                }
                Err(e) => {
                    let (valid, after) = rest.split_at(e.valid_up_to());
                    out.push_str(&String::from_utf8_lossy(valid));
                    match e.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[len..];
                        }
                        None => {
                            rest = after;
                            break;
                        }
                    }
                }
            }
        }

        let tail = rest.to_vec();
        self.carry = tail;
        (!out.is_empty()).then_some(out)
    }

    pub fn finish(&mut self) -> Option<String> {
        if self.carry.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.carry);
        Some(String::from_utf8_lossy(&rest).into_owned())
    }
}
