use super::*;
use rstest::rstest;
use std::collections::BTreeSet;
use uuid::Uuid;

fn uuid_from(n: u128) -> Uuid {
    Uuid::from_u128(n)
}

#[test]
fn test_new_ids_are_v7() {
    let id = EntryId::new();
    assert_eq!(id.into_inner().get_version_num(), 7);
    assert_ne!(CustomerId::default(), CustomerId::default());
}

#[test]
fn test_later_entry_ids_sort_after() {
    let first = EntryId::new();
    std::thread::sleep(std::time::Duration::from_millis(2));
    let second = EntryId::new();
    assert!(first < second);
    assert_eq!(first.max(second), second);
}

#[rstest]
#[case(1, 2)]
#[case(0xff, 0x100)]
#[case(u128::MAX - 1, u128::MAX)]
fn test_ordering_follows_uuid(#[case] low: u128, #[case] high: u128) {
    let (a, b) = (EntryId::from_uuid(uuid_from(low)), EntryId::from_uuid(uuid_from(high)));
    assert!(a < b);
    assert_eq!(a.cmp(&b), uuid_from(low).cmp(&uuid_from(high)));
}

#[test]
fn test_ids_in_ordered_set() {
    let set: BTreeSet<CustomerId> = [3, 1, 2, 1]
        .into_iter()
        .map(|n| CustomerId::from_uuid(uuid_from(n)))
        .collect();
    let inner: Vec<Uuid> = set.into_iter().map(Uuid::from).collect();
    assert_eq!(inner, vec![uuid_from(1), uuid_from(2), uuid_from(3)]);
}

#[test]
fn test_into_uuid() {
    let uuid = Uuid::now_v7();
    let id = AttachmentId::from_uuid(uuid);
    let converted: Uuid = id.into();
    assert_eq!(converted, uuid);
    assert_eq!(converted, id.into_inner());
}

#[test]
fn test_serializes_as_bare_uuid() {
    let uuid = uuid_from(42);
    let json = serde_json::to_string(&SupplierId::from_uuid(uuid)).unwrap();
    assert_eq!(json, format!("\"{uuid}\""));

    let back: SupplierId = serde_json::from_str(&json).unwrap();
    assert_eq!(back.into_inner(), uuid);
}

#[test]
fn test_display_parses_back() {
    let id = UserId::new();
    assert_eq!(id.to_string().parse::<UserId>().unwrap(), id);
}

#[rstest]
#[case("")]
#[case("not-a-uuid")]
#[case("0190a1b2-c3d4-7e5f-8a9b")]
fn test_parse_rejects_malformed(#[case] raw: &str) {
    assert!(raw.parse::<CustomerId>().is_err());
}
