use agrilink_api::response::Meta;
use agrilink_api::services::admin_service::commission_split;

#[test]
fn commission_is_four_percent_rounded() {
    assert_eq!(commission_split(0), (0, 0));
    assert_eq!(commission_split(300), (12, 288));
    assert_eq!(commission_split(10_000), (400, 9_600));
}

// The halves round independently, so the sum may drift from the revenue by a
// unit. The documented formula is what holds, not exact additivity.
#[test]
fn commission_halves_round_independently() {
    for revenue in [1_i64, 13, 49, 99, 101, 12_345] {
        let (platform, farmer) = commission_split(revenue);
        assert_eq!(platform, (revenue as f64 * 0.04).round() as i64);
        assert_eq!(farmer, (revenue as f64 * 0.96).round() as i64);
        assert!((platform + farmer - revenue).abs() <= 1);
    }
}

#[test]
fn meta_pages_is_ceiling_of_total_over_page_size() {
    let meta = Meta::new(1, 10, 0);
    assert_eq!(meta.pages, Some(0));

    let meta = Meta::new(1, 10, 10);
    assert_eq!(meta.pages, Some(1));

    let meta = Meta::new(2, 10, 11);
    assert_eq!(meta.pages, Some(2));

    let meta = Meta::new(1, 15, 31);
    assert_eq!(meta.pages, Some(3));
}
