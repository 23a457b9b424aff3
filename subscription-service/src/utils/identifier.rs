//! Identifier checks for subscription and owner ids.

use uuid::{Uuid, Variant};

const HYPHENATED_LEN: usize = 36;

/// Parse a version-4 UUID written in canonical hyphenated form.
///
/// Braced, URN and simple (no hyphens) spellings are rejected, as are
/// other versions and non RFC 4122 variants.
pub fn parse_identifier(value: &str) -> Option<Uuid> {
    if value.len() != HYPHENATED_LEN {
        return None;
    }

    let id = Uuid::try_parse(value).ok()?;
    if id.get_version_num() != 4 || id.get_variant() != Variant::RFC4122 {
        return None;
    }

    Some(id)
}

pub fn is_valid_identifier(value: &str) -> bool {
    parse_identifier(value).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_v4_uuids() {
        for value in [
            "60601fee-2bf1-4721-ae6f-7636e79a0cba",
            "60601FEE-2BF1-4721-AE6F-7636E79A0CBA",
            "00000000-0000-4000-8000-000000000000",
            "ffffffff-ffff-4fff-bfff-ffffffffffff",
            "12345678-1234-4234-9234-123456789abc",
            "12345678-1234-4234-a234-123456789abc",
        ] {
            assert!(is_valid_identifier(value), "{value} should be valid");
        }
    }

    #[test]
    fn generated_ids_are_valid() {
        for _ in 0..32 {
            assert!(is_valid_identifier(&Uuid::new_v4().to_string()));
        }
    }

    #[test]
    fn rejects_other_versions_and_variants() {
        // version 1
        assert!(!is_valid_identifier("60601fee-2bf1-1721-ae6f-7636e79a0cba"));
        // variant nibble outside 8..b
        assert!(!is_valid_identifier("60601fee-2bf1-4721-ce6f-7636e79a0cba"));
        assert!(!is_valid_identifier("60601fee-2bf1-4721-7e6f-7636e79a0cba"));
    }

    #[test]
    fn rejects_malformed_strings() {
        for value in [
            "",
            "not-a-uuid",
            "60601fee2bf14721ae6f7636e79a0cba",
            "{60601fee-2bf1-4721-ae6f-7636e79a0cba}",
            "urn:uuid:60601fee-2bf1-4721-ae6f-7636e79a0cba",
            "60601fee-2bf1-4721-ae6f-7636e79a0cbz",
            "60601fee-2bf1-4721-ae6f-7636e79a0cb",
            " 60601fee-2bf1-4721-ae6f-7636e79a0cba",
            "60601fee-2bf1-4721-|e6f-7636e79a0cba",
        ] {
            assert!(!is_valid_identifier(value), "{value:?} should be invalid");
        }
    }
}
