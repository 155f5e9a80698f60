use sha2::{Digest, Sha256};

const FINGERPRINT_BYTES: usize = 16;

/// Collapse whitespace runs to a single space and trim the ends.
pub fn normalize_content(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Conflict-detection key for a piece of content. Not a security primitive.
///
/// Two texts that differ only in whitespace layout share a fingerprint.
pub fn content_fingerprint(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalize_content(text).as_bytes());
    let digest = hasher.finalize();
    let mut hex = String::with_capacity(FINGERPRINT_BYTES * 2);
    for byte in digest.iter().take(FINGERPRINT_BYTES) {
        use std::fmt::Write;
        let _ = write!(&mut hex, "{byte:02x}");
    }
    hex
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whitespace_layout_does_not_change_fingerprint() {
        assert_eq!(
            content_fingerprint("Quarterly  results\n are up"),
            content_fingerprint(" Quarterly results are up ")
        );
    }

    #[test]
    fn wording_changes_fingerprint() {
        assert_ne!(
            content_fingerprint("Quarterly results are up"),
            content_fingerprint("Quarterly results are down")
        );
    }

    #[test]
    fn fingerprint_is_fixed_width_hex() {
        let fp = content_fingerprint("hello");
        assert_eq!(fp.len(), 32);
        assert!(fp.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
