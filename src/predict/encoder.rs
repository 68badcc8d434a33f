/// Width of one encoded nucleotide.
pub const CHANNELS: usize = 4;

const ZERO: [f32; CHANNELS] = [0.0, 0.0, 0.0, 0.0];

/// Byte -> one-hot lookup. Anything not listed encodes to the zero vector,
/// which is also what `N` maps to.
static NUCLEOTIDE_TABLE: [[f32; CHANNELS]; 256] = build_table();

const fn build_table() -> [[f32; CHANNELS]; 256] {
    let mut table = [ZERO; 256];
    table[b'A' as usize] = [1.0, 0.0, 0.0, 0.0];
    table[b'a' as usize] = [1.0, 0.0, 0.0, 0.0];
    table[b'T' as usize] = [0.0, 1.0, 0.0, 0.0];
    table[b't' as usize] = [0.0, 1.0, 0.0, 0.0];
    table[b'U' as usize] = [0.0, 1.0, 0.0, 0.0];
    table[b'u' as usize] = [0.0, 1.0, 0.0, 0.0];
    table[b'G' as usize] = [0.0, 0.0, 1.0, 0.0];
    table[b'g' as usize] = [0.0, 0.0, 1.0, 0.0];
    table[b'C' as usize] = [0.0, 0.0, 0.0, 1.0];
    table[b'c' as usize] = [0.0, 0.0, 0.0, 1.0];
    table
}

/// `true` for the bytes the alphabet knows about, `N` included.
pub fn is_known_base(base: u8) -> bool {
    matches!(
        base.to_ascii_uppercase(),
        b'A' | b'T' | b'U' | b'G' | b'C' | b'N'
    )
}

/// One-hot encoding of a single sequence, shape `(len, 4)`.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedSequence {
    vectors: Vec<[f32; CHANNELS]>,
}

impl EncodedSequence {
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn vectors(&self) -> &[[f32; CHANNELS]] {
        &self.vectors
    }

    /// Row-major `(len * 4)` view, the layout the model input expects.
    pub fn flat(&self) -> impl Iterator<Item = f32> + '_ {
        self.vectors.iter().flat_map(|v| v.iter().copied())
    }
}

pub fn encode(sequence: &str) -> EncodedSequence {
    EncodedSequence {
        vectors: sequence
            .bytes()
            .map(|b| NUCLEOTIDE_TABLE[b as usize])
            .collect(),
    }
}

/// Number of bytes in `sequence` outside the recognised alphabet.
pub fn count_unknown(sequence: &str) -> usize {
    sequence.bytes().filter(|&b| !is_known_base(b)).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_each_base_to_its_channel() {
        let encoded = encode("ATUGCN");
        assert_eq!(
            encoded.vectors(),
            &[
                [1.0, 0.0, 0.0, 0.0],
                [0.0, 1.0, 0.0, 0.0],
                [0.0, 1.0, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
                [0.0, 0.0, 0.0, 1.0],
                [0.0, 0.0, 0.0, 0.0],
            ]
        );
    }

    #[test]
    fn every_vector_is_unit_or_zero() {
        let seq = "AATTGGCCNNUUAGCTNAGCTTGCA".repeat(8);
        let encoded = encode(&seq);
        assert_eq!(encoded.len(), seq.len());

        for (base, vector) in seq.bytes().zip(encoded.vectors()) {
            let sum: f32 = vector.iter().sum();
            assert!(vector.iter().all(|&x| x == 0.0 || x == 1.0));
            if base == b'N' {
                assert_eq!(sum, 0.0);
            } else {
                assert_eq!(sum, 1.0);
            }
        }
    }

    #[test]
    fn unknown_characters_become_zero_vectors() {
        let encoded = encode("AXR-");
        assert_eq!(encoded.vectors()[0], [1.0, 0.0, 0.0, 0.0]);
        assert!(encoded.vectors()[1..].iter().all(|v| *v == ZERO));
        assert_eq!(count_unknown("AXR-N"), 3);
    }

    #[test]
    fn lower_case_matches_upper_case() {
        assert_eq!(encode("acgtun"), encode("ACGTUN"));
    }

    #[test]
    fn flat_layout_is_row_major() {
        let flat: Vec<f32> = encode("AC").flat().collect();
        assert_eq!(flat, vec![1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0]);
    }
}
