//! Named, optional metadata heuristics.

/// Parse the priming sample count from an `iTunSMPB` metadata tag.
///
/// Some encoders do not signal encoder delay in the container's sample
/// tables but do write an iTunes-style gapless-playback tag whose value is
/// a run of space-separated hexadecimal fields:
///
/// ```text
/// 00000000 <priming> <padding> <valid-sample-count-64bit> ...
/// ```
///
/// This is a best-effort recovery for that specific tag format and nothing
/// more; it is applied only when the option is enabled and the container
/// itself declared no priming.
pub fn itunes_priming(metadata: &[(String, String)]) -> Option<u32> {
    let value = metadata
        .iter()
        .find(|(key, _)| key == "iTunSMPB")
        .map(|(_, value)| value.as_str())?;

    let mut fields = value.split_whitespace();
    let reserved = fields.next()?;
    if u32::from_str_radix(reserved, 16) != Ok(0) {
        return None;
    }
    let priming = u32::from_str_radix(fields.next()?, 16).ok()?;
    // Padding and the 64-bit valid-sample count must at least be present
    // and well-formed for the tag to be trusted.
    u32::from_str_radix(fields.next()?, 16).ok()?;
    u64::from_str_radix(fields.next()?, 16).ok()?;

    if priming == 0 {
        None
    } else {
        Some(priming)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(value: &str) -> Vec<(String, String)> {
        vec![("iTunSMPB".to_string(), value.to_string())]
    }

    #[test]
    fn test_parses_documented_format() {
        let meta = tag("00000000 00000840 000001CA 0000000000233400 00000000");
        assert_eq!(itunes_priming(&meta), Some(0x840));
    }

    #[test]
    fn test_rejects_malformed_values() {
        assert_eq!(itunes_priming(&tag("")), None);
        assert_eq!(itunes_priming(&tag("00000000")), None);
        assert_eq!(itunes_priming(&tag("xyz 00000840 0 0")), None);
        // Nonzero reserved field: not the documented layout.
        assert_eq!(itunes_priming(&tag("00000001 00000840 000001CA 0000000000233400")), None);
        // Zero priming is not worth reporting.
        assert_eq!(itunes_priming(&tag("00000000 00000000 000001CA 0000000000233400")), None);
    }

    #[test]
    fn test_absent_tag() {
        let meta = vec![("title".to_string(), "x".to_string())];
        assert_eq!(itunes_priming(&meta), None);
    }
}
