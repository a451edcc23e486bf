use log::{debug, trace};

use super::bit_reader::BitReader;
use crate::error::DecodeError;

const MAX_CODE_SIZE: u32 = 12;
const MAX_TABLE_LENGTH: usize = 1 << MAX_CODE_SIZE;

#[derive(Debug, Clone, Copy)]
struct CodeEntry {
    prefix: Option<u16>,
    suffix: u8,
    first: u8,
    len: usize,
}

/// Code table for a single decode pass.
///
/// Each entry is stored as its prefix code plus one trailing index, so expanding a code
/// walks the prefix chain backwards. `size` keeps counting once the table is full even
/// though no 12 bit code can reach those entries.
struct CodeTable {
    entries: Vec<CodeEntry>,
    size: usize,
}

impl CodeTable {
    fn new(minimum_code_size: u32) -> Self {
        let mut table = Self {
            entries: Vec::with_capacity(MAX_TABLE_LENGTH),
            size: 0,
        };
        table.reset(minimum_code_size);
        table
    }

    fn reset(&mut self, minimum_code_size: u32) {
        // literal indices followed by the clear and end of information slots, the
        // latter two are never expanded.
        let length = (1 << minimum_code_size) + 2;

        self.entries.clear();
        self.entries.extend((0..length).map(|i| CodeEntry {
            prefix: None,
            suffix: i as u8,
            first: i as u8,
            len: 1,
        }));
        self.size = length;
    }

    fn len(&self) -> usize {
        self.size
    }

    fn first(&self, code: u16) -> u8 {
        self.entries[code as usize].first
    }

    fn push(&mut self, prefix: u16, suffix: u8) {
        if self.entries.len() < MAX_TABLE_LENGTH {
            let parent = self.entries[prefix as usize];
            self.entries.push(CodeEntry {
                prefix: Some(prefix),
                suffix,
                first: parent.first,
                len: parent.len + 1,
            });
        }
        self.size += 1;
    }

    fn expand_into(&self, code: u16, indices: &mut Vec<u8>) {
        let start = indices.len();
        let mut position = start + self.entries[code as usize].len;
        indices.resize(position, 0);

        let mut cursor = Some(code);
        while let Some(code) = cursor {
            let entry = &self.entries[code as usize];
            position -= 1;
            indices[position] = entry.suffix;
            cursor = entry.prefix;
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Step {
    Continue,
    Done,
}

pub(crate) struct LzwDecoder<'a> {
    reader: BitReader<'a>,
    table: CodeTable,
    minimum_code_size: u32,
    code_size: u32,
    clear_code: u16,
    end_of_information_code: u16,
    // `None` while the next code is a bare literal: at the start and after a clear code
    last_code: Option<u16>,
}

impl<'a> LzwDecoder<'a> {
    pub fn new(buf: &'a [u8], minimum_code_size: u8) -> Result<Self, DecodeError> {
        if !(1..=8).contains(&minimum_code_size) {
            return Err(DecodeError::InvalidMinimumCodeSize(minimum_code_size));
        }

        let minimum_code_size = u32::from(minimum_code_size);
        let clear_code: u16 = 1 << minimum_code_size;

        Ok(Self {
            reader: BitReader::new(buf),
            table: CodeTable::new(minimum_code_size),
            minimum_code_size,
            code_size: minimum_code_size + 1,
            clear_code,
            end_of_information_code: clear_code + 1,
            last_code: None,
        })
    }

    pub fn decode(mut self) -> Result<Vec<u8>, DecodeError> {
        debug!(
            "lzw decode: {} bytes, clear_code={} end_of_information_code={}",
            self.reader.len() / 8,
            self.clear_code,
            self.end_of_information_code
        );

        let mut indices = Vec::new();
        while self.step(&mut indices)? == Step::Continue {}

        debug!("lzw decode produced {} indices", indices.len());
        Ok(indices)
    }

    fn reset(&mut self) {
        self.table.reset(self.minimum_code_size);
        self.code_size = self.minimum_code_size + 1;
        self.last_code = None;
    }

    fn step(&mut self, indices: &mut Vec<u8>) -> Result<Step, DecodeError> {
        let position = self.reader.position();
        let code = self.reader.read_bits(self.code_size)? as u16;
        trace!(
            "code={code} code_size={} dict_size={} last_code={:?} bit={position}",
            self.code_size,
            self.table.len(),
            self.last_code
        );

        if code == self.clear_code {
            trace!("clear code, resetting code table");
            self.reset();
            return Ok(Step::Continue);
        }

        if code == self.end_of_information_code {
            return Ok(Step::Done);
        }

        let Some(last_code) = self.last_code else {
            if code > self.end_of_information_code {
                return Err(DecodeError::CorruptStream {
                    code,
                    dict_size: self.table.len(),
                });
            }
            indices.push(code as u8);
            self.last_code = Some(code);
            return Ok(Step::Continue);
        };

        let dict_size = self.table.len();
        match usize::from(code) {
            // {CODE} is in the table: output it, add {CODE-1}+K where K is the first
            // index of {CODE}
            c if c < dict_size => {
                self.table.expand_into(code, indices);
                let k = self.table.first(code);
                self.table.push(last_code, k);
            }
            // {CODE} is the entry about to be defined: {CODE-1}+K where K is the first
            // index of {CODE-1}
            c if c == dict_size => {
                let k = self.table.first(last_code);
                self.table.push(last_code, k);
                self.table.expand_into(code, indices);
            }
            _ => return Err(DecodeError::CorruptStream { code, dict_size }),
        }

        if self.table.len() == 1 << self.code_size && self.code_size < MAX_CODE_SIZE {
            self.code_size += 1;
        }

        self.last_code = Some(code);
        Ok(Step::Continue)
    }
}

pub(crate) fn lzw_decode(buf: &[u8], minimum_code_size: u8) -> Result<Vec<u8>, DecodeError> {
    LzwDecoder::new(buf, minimum_code_size)?.decode()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{pack_codes, CHECKER_2X2, SINGLE_PIXEL};

    fn weezl_encode(data: &[u8], minimum_code_size: u8) -> Vec<u8> {
        weezl::encode::Encoder::new(weezl::BitOrder::Lsb, minimum_code_size)
            .encode(data)
            .unwrap()
    }

    // deterministic, run heavy data so the code table fills up
    fn sample_indices(len: usize, minimum_code_size: u8) -> Vec<u8> {
        let mut state: u32 = 0x2545_f491;
        let mut current = 0u8;
        (0..len)
            .map(|_| {
                state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
                if (state >> 16) % 4 == 0 {
                    current = ((state >> 8) % (1 << minimum_code_size)) as u8;
                }
                current
            })
            .collect()
    }

    #[test]
    fn decodes_checkerboard() {
        assert_eq!(lzw_decode(&CHECKER_2X2, 2).unwrap(), vec![0, 1, 0, 1]);
        assert_eq!(lzw_decode(&SINGLE_PIXEL, 2).unwrap(), vec![0]);
    }

    #[test]
    fn first_code_without_clear_is_a_literal() {
        let data = pack_codes(&[(0, 3), (1, 3), (5, 3)]);
        assert_eq!(lzw_decode(&data, 2).unwrap(), vec![0, 1]);
    }

    #[test]
    fn code_about_to_be_defined() {
        let data = pack_codes(&[(4, 3), (0, 3), (6, 3), (5, 3)]);
        assert_eq!(lzw_decode(&data, 2).unwrap(), vec![0, 0, 0]);
    }

    #[test]
    fn clear_then_end_is_empty() {
        let data = pack_codes(&[(4, 3), (5, 3)]);
        assert_eq!(lzw_decode(&data, 2).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn round_trips_reference_encoder() {
        for minimum_code_size in 2..=8u8 {
            for len in [1, 2, 17, 300, 5_000, 60_000] {
                let original = sample_indices(len, minimum_code_size);
                let encoded = weezl_encode(&original, minimum_code_size);
                let decoded = lzw_decode(&encoded, minimum_code_size).unwrap();
                assert_eq!(decoded, original, "min code size {minimum_code_size}, len {len}");
            }
        }
    }

    #[test]
    fn code_size_grows_with_the_table() {
        for minimum_code_size in 2..=8u8 {
            let original = sample_indices(60_000, minimum_code_size);
            let encoded = weezl_encode(&original, minimum_code_size);
            let mut decoder = LzwDecoder::new(&encoded, minimum_code_size).unwrap();
            let clear_code = 1usize << minimum_code_size;

            let mut indices = Vec::new();
            let mut widest = 0;
            loop {
                let width_before = decoder.code_size;
                let size_before = decoder.table.len();
                let step = decoder.step(&mut indices).unwrap();
                let width_after = decoder.code_size;
                let size_after = decoder.table.len();

                assert!(width_after <= MAX_CODE_SIZE);
                widest = widest.max(width_after);

                if step == Step::Done {
                    assert_eq!(width_after, width_before);
                    break;
                }

                if decoder.last_code.is_none() {
                    assert_eq!(size_after, clear_code + 2);
                    assert_eq!(width_after, u32::from(minimum_code_size) + 1);
                } else if size_after == size_before + 1 {
                    let grows = size_after == 1 << width_before && width_before < MAX_CODE_SIZE;
                    let expected = if grows { width_before + 1 } else { width_before };
                    assert_eq!(width_after, expected);
                } else {
                    assert_eq!(size_after, size_before);
                    assert_eq!(width_after, width_before);
                }
            }

            assert_eq!(widest, MAX_CODE_SIZE);
            assert_eq!(indices, original);
        }
    }

    #[test]
    fn clear_code_mid_stream_resets_table() {
        let data = pack_codes(&[
            (4, 3),
            (0, 3),
            (1, 3),
            (6, 3),
            (1, 4),
            (4, 4),
            (1, 3),
            (1, 3),
            (5, 3),
        ]);
        let mut decoder = LzwDecoder::new(&data, 2).unwrap();
        let mut indices = Vec::new();

        for _ in 0..5 {
            assert_eq!(decoder.step(&mut indices).unwrap(), Step::Continue);
        }
        assert_eq!(decoder.code_size, 4);
        assert_eq!(decoder.table.len(), 9);

        // clear
        assert_eq!(decoder.step(&mut indices).unwrap(), Step::Continue);
        assert_eq!(decoder.code_size, 3);
        assert_eq!(decoder.table.len(), 6);
        assert_eq!(decoder.last_code, None);

        // literal, no new entry
        let before = indices.len();
        assert_eq!(decoder.step(&mut indices).unwrap(), Step::Continue);
        assert_eq!(indices.len(), before + 1);
        assert_eq!(decoder.table.len(), 6);

        assert_eq!(decoder.step(&mut indices).unwrap(), Step::Continue);
        assert_eq!(decoder.step(&mut indices).unwrap(), Step::Done);
        assert_eq!(indices, vec![0, 1, 0, 1, 1, 1, 1]);
    }

    #[test]
    fn code_size_is_capped_at_twelve_bits() {
        let mut codes = vec![(4, 3), (0, 3)];
        let mut width = 3;
        let mut dict_size = 6;
        for _ in 0..5_000 {
            codes.push((0, width));
            dict_size += 1;
            if dict_size == 1 << width && width < 12 {
                width += 1;
            }
        }
        codes.push((5, width));
        assert_eq!(width, 12);

        let decoded = lzw_decode(&pack_codes(&codes), 2).unwrap();
        assert_eq!(decoded, vec![0; 5_001]);
    }

    #[test]
    fn code_past_dictionary_is_corrupt() {
        let data = pack_codes(&[(4, 3), (0, 3), (7, 3)]);
        assert!(matches!(
            lzw_decode(&data, 2),
            Err(DecodeError::CorruptStream { code: 7, dict_size: 6 })
        ));
    }

    #[test]
    fn non_literal_after_clear_is_corrupt() {
        let data = pack_codes(&[(4, 3), (6, 3)]);
        assert!(matches!(
            lzw_decode(&data, 2),
            Err(DecodeError::CorruptStream { code: 6, .. })
        ));
    }

    #[test]
    fn missing_end_code_runs_out_of_data() {
        assert!(matches!(lzw_decode(&[0x44], 2), Err(DecodeError::OutOfData)));
        assert!(matches!(lzw_decode(&[], 2), Err(DecodeError::OutOfData)));
    }

    #[test]
    fn rejects_unsupported_minimum_code_size() {
        assert!(matches!(
            lzw_decode(&CHECKER_2X2, 0),
            Err(DecodeError::InvalidMinimumCodeSize(0))
        ));
        assert!(matches!(
            lzw_decode(&CHECKER_2X2, 9),
            Err(DecodeError::InvalidMinimumCodeSize(9))
        ));
    }
}
