use rand::{rngs::OsRng, Rng};

use super::{CODE_ALPHABET, CODE_LENGTH};

/// Source of candidate room codes
///
/// The store checks every draw for collisions, so implementations only need
/// to produce well-formed codes.
pub trait CodeGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// Draws codes uniformly from `CODE_ALPHABET` using the OS random source
///
/// 32 symbols over 6 positions gives ~10^9 codes, and nothing about a code
/// reveals how many rooms were created before it.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomCodeGenerator;

impl CodeGenerator for RandomCodeGenerator {
    fn generate(&self) -> String {
        (0..CODE_LENGTH)
            .map(|_| CODE_ALPHABET[OsRng.gen_range(0..CODE_ALPHABET.len())] as char)
            .collect()
    }
}

/// Normalize user input into the canonical (upper case) code form
pub fn normalize_code(raw: &str) -> String {
    raw.trim().to_ascii_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_code_format() {
        let code = RandomCodeGenerator.generate();

        assert_eq!(code.len(), CODE_LENGTH);
        assert!(code.bytes().all(|b| CODE_ALPHABET.contains(&b)));
    }

    #[test]
    fn test_code_excludes_ambiguous_characters() {
        for _ in 0..500 {
            let code = RandomCodeGenerator.generate();
            assert!(!code.contains(['0', 'O', '1', 'I']));
        }
    }

    #[test]
    fn test_codes_vary() {
        let codes: HashSet<String> = (0..100).map(|_| RandomCodeGenerator.generate()).collect();
        // collisions among 100 draws out of ~10^9 are effectively impossible
        assert!(codes.len() > 95);
    }

    #[test]
    fn test_normalize_code() {
        assert_eq!(normalize_code(" k7f3qz "), "K7F3QZ");
        assert_eq!(normalize_code("K7F3QZ"), "K7F3QZ");
    }
}
