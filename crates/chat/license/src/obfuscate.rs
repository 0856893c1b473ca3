//! Reversible scrambling for the locally stored activation.
//!
//! XOR with a fixed key, then base64. Anyone with this source can undo it;
//! it only keeps the activation from being edited by hand.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

const XOR_KEY: &[u8] = b"nothingai-local-activation";

fn xor(bytes: &[u8]) -> Vec<u8> {
    bytes
        .iter()
        .zip(XOR_KEY.iter().cycle())
        .map(|(b, k)| b ^ k)
        .collect()
}

/// Scramble `plain` into a base64 string
#[must_use]
pub fn obfuscate(plain: &str) -> String {
    STANDARD.encode(xor(plain.as_bytes()))
}

/// Undo [`obfuscate`]; `None` when the input was not produced by it
#[must_use]
pub fn deobfuscate(encoded: &str) -> Option<String> {
    let bytes = STANDARD.decode(encoded.trim()).ok()?;
    String::from_utf8(xor(&bytes)).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_is_not_plaintext() {
        let out = obfuscate(r#"{"key":"NOTHING-AAAA-BBBB-CCCC"}"#);
        assert!(!out.contains("NOTHING"));
        assert_eq!(
            deobfuscate(&out).as_deref(),
            Some(r#"{"key":"NOTHING-AAAA-BBBB-CCCC"}"#)
        );
    }

    #[test]
    fn garbage_is_rejected() {
        assert_eq!(deobfuscate("%%%"), None);
    }
}
