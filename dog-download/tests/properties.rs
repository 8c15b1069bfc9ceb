use dog_download::{
    parse_url, resolve_range, ByteRange, RangeDecision, SchemeTag, UrlCodec, BLOBHOLDER_0, DEFAULT_FILENAME,
};
use proptest::prelude::*;

fn scheme() -> impl Strategy<Value = SchemeTag> {
    prop::sample::select(SchemeTag::ALL.to_vec())
}

proptest! {
    #[test]
    fn bounded_range_inside_content_is_served_as_requested(
        (total, start, end) in (1u64..1_000_000).prop_flat_map(|total| {
            (0..total).prop_flat_map(move |start| (Just(total), Just(start), start..total))
        })
    ) {
        let header = format!("bytes={}-{}", start, end);
        prop_assert_eq!(
            resolve_range(Some(&header), total),
            RangeDecision::Partial(ByteRange::new(start, end).unwrap())
        );
    }

    #[test]
    fn open_range_from_zero_covers_everything(total in 1u64..u64::MAX) {
        prop_assert_eq!(
            resolve_range(Some("bytes=0-"), total),
            RangeDecision::Partial(ByteRange::new(0, total - 1).unwrap())
        );
    }

    #[test]
    fn start_at_or_past_the_end_is_not_satisfiable(total in 0u64..1_000_000, past in 0u64..1_000_000) {
        let start = total + past;
        let open = format!("bytes={}-", start);
        let bounded = format!("bytes={}-{}", start, start + 10);
        prop_assert_eq!(resolve_range(Some(&open), total), RangeDecision::NotSatisfiable);
        prop_assert_eq!(resolve_range(Some(&bounded), total), RangeDecision::NotSatisfiable);
    }

    #[test]
    fn partial_ranges_stay_within_content(total in 1u64..10_000, header in "bytes=[0-9]{0,5}-[0-9]{0,5}(,[0-9]{1,3}-[0-9]{1,3})?") {
        if let RangeDecision::Partial(range) = resolve_range(Some(&header), total) {
            prop_assert!(range.start() <= range.end());
            prop_assert!(range.end() < total);
        }
    }

    #[test]
    fn url_round_trips_reserved_characters(
        scheme in scheme(),
        repository in "\\PC{1,16}",
        entity_id in "\\PC{1,16}",
        locator in "(blobholder:[0-9]{1,3}|[a-z:/ %?#]{1,16})",
        filename in "\\PC{1,24}",
    ) {
        let url = UrlCodec::new(scheme).build(&repository, &entity_id, Some(&locator), &filename);
        let parsed = parse_url(&url).unwrap();

        prop_assert_eq!(parsed.scheme, scheme);
        prop_assert_eq!(parsed.repository, repository);
        prop_assert_eq!(parsed.entity_id, entity_id);
        prop_assert_eq!(parsed.locator, locator);
        prop_assert_eq!(parsed.filename, filename);
    }

    #[test]
    fn built_urls_always_parse_even_with_empty_components(
        locator in prop::option::of(prop_oneof![Just(String::new()), "blobholder:[0-9]{1,3}"]),
        filename in prop_oneof![Just(String::new()), "\\PC{1,16}"],
    ) {
        let url = UrlCodec::default().build("demo", "doc-1", locator.as_deref(), &filename);
        let parsed = parse_url(&url).unwrap();

        let expected_locator = locator.filter(|l| !l.is_empty()).unwrap_or_else(|| BLOBHOLDER_0.to_string());
        let expected_filename = if filename.is_empty() { DEFAULT_FILENAME.to_string() } else { filename };
        prop_assert_eq!(parsed.locator, expected_locator);
        prop_assert_eq!(parsed.filename, expected_filename);
    }
}

#[test]
fn scenario_e_filename_with_space_round_trips() {
    let codec = UrlCodec::default();
    let url = codec.build("demo", "doc-1", Some("blobholder:0"), "my file.png");
    let parsed = codec.parse(&url).unwrap();

    assert_eq!(parsed.repository, "demo");
    assert_eq!(parsed.entity_id, "doc-1");
    assert_eq!(parsed.locator, "blobholder:0");
    assert_eq!(parsed.filename, "my file.png");
}
