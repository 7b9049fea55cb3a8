use areafilter_core::EntityKind;
use log::warn;

/// Map a raw OSM identifier into the unsigned id space, skipping negative
/// (locally created) identifiers with a warning.
pub(crate) fn entity_id(kind: EntityKind, raw_id: i64) -> Option<u64> {
    match u64::try_from(raw_id) {
        Ok(id) => Some(id),
        Err(_) => {
            warn!(
                "Skipped OSM element: kind={kind}, raw_id={raw_id} (negative identifiers are unsupported)"
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, Some(0))]
    #[case(42, Some(42))]
    #[case(i64::MAX, Some(9_223_372_036_854_775_807))]
    #[case(-1, None)]
    #[case(i64::MIN, None)]
    fn maps_raw_identifiers(#[case] raw: i64, #[case] expected: Option<u64>) {
        assert_eq!(entity_id(EntityKind::Way, raw), expected);
    }
}
