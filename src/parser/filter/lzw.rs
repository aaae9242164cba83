const CLEAR_TABLE: usize = 256;
const EOD: usize = 257;
const MAX_ENTRIES: usize = 4096;
const INITIAL_SIZE: usize = 258;

/// Decode LZW data with 9 to 12 bit codes.
pub fn decode(data: &[u8], early_change: bool) -> Option<Vec<u8>> {
    let mut table = Table::new(early_change);
    let mut bits = BitReader::new(data);
    let mut decoded = Vec::new();
    let mut prev: Option<usize> = None;

    loop {
        let Some(code) = bits.read(table.code_length()) else {
            // Missing EOD is common; keep what we have.
            return Some(decoded);
        };

        match code {
            CLEAR_TABLE => {
                table.clear();
                prev = None;
            }
            EOD => return Some(decoded),
            code => {
                if let Some(entry) = table.get(code) {
                    let first = entry[0];
                    decoded.extend_from_slice(entry);
                    if let Some(p) = prev {
                        table.register(p, first);
                    }
                } else {
                    let p = prev?;
                    let first = table.get(p)?[0];
                    table.register(p, first);
                    decoded.extend_from_slice(table.get(code)?);
                }
                prev = Some(code);
            }
        }
    }
}

struct Table {
    early_change: bool,
    entries: Vec<Vec<u8>>,
}

impl Table {
    fn new(early_change: bool) -> Self {
        let mut entries: Vec<Vec<u8>> = (0..=255u8).map(|b| vec![b]).collect();
        entries.push(Vec::new());
        entries.push(Vec::new());
        Self {
            early_change,
            entries,
        }
    }

    fn register(&mut self, prev: usize, byte: u8) {
        if self.entries.len() >= MAX_ENTRIES {
            return;
        }
        if let Some(base) = self.entries.get(prev) {
            let mut entry = Vec::with_capacity(base.len() + 1);
            entry.extend_from_slice(base);
            entry.push(byte);
            self.entries.push(entry);
        }
    }

    fn get(&self, code: usize) -> Option<&[u8]> {
        self.entries
            .get(code)
            .filter(|e| !e.is_empty())
            .map(Vec::as_slice)
    }

    fn clear(&mut self) {
        self.entries.truncate(INITIAL_SIZE);
    }

    fn code_length(&self) -> u32 {
        let adjusted = self.entries.len() + usize::from(self.early_change);
        match adjusted {
            n if n >= 2048 => 12,
            n if n >= 1024 => 11,
            n if n >= 512 => 10,
            _ => 9,
        }
    }
}

struct BitReader<'a> {
    data: &'a [u8],
    bit_pos: usize,
}

impl<'a> BitReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, bit_pos: 0 }
    }

    fn read(&mut self, count: u32) -> Option<usize> {
        let mut value = 0usize;
        for _ in 0..count {
            let byte = *self.data.get(self.bit_pos / 8)?;
            let bit = (byte >> (7 - self.bit_pos % 8)) & 1;
            value = (value << 1) | usize::from(bit);
            self.bit_pos += 1;
        }
        Some(value)
    }
}
