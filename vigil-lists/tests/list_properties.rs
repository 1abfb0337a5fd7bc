use proptest::prelude::*;
use vigil_lists::{
    create_link, decrypt_list, decrypt_list_with_key, encrypt_list, encrypt_list_with_key,
    unwrap_for_party, LinkParty, ListFacts, Prayer,
};

fn arb_prayer() -> impl Strategy<Value = Prayer> {
    (
        "[a-zA-Z ]{1,40}",
        prop_oneof![
            Just("family".to_string()),
            Just("health".to_string()),
            Just("general".to_string()),
        ],
        proptest::option::of(0i64..2_000_000_000),
        0u32..50,
    )
        .prop_map(|(text, category, last_prayed_at, prayed_count)| {
            let mut p = Prayer::new(text, category);
            p.last_prayed_at = last_prayed_at;
            p.prayed_count = prayed_count;
            p
        })
}

proptest! {
    // Argon2id per case keeps this affordable at a reduced case count.
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn entity_roundtrip_for_any_list(
        passcode in "[a-zA-Z0-9]{4,24}",
        prayers in proptest::collection::vec(arb_prayer(), 0..8),
    ) {
        let encrypted = encrypt_list(&passcode, &prayers).unwrap();
        let decrypted = decrypt_list(&passcode, &encrypted).unwrap();
        prop_assert_eq!(decrypted, prayers);
    }

    #[test]
    fn wrong_passcode_never_yields_plaintext(
        passcode in "[a-z]{6,16}",
        prayers in proptest::collection::vec(arb_prayer(), 1..4),
    ) {
        let wrong = format!("{passcode}x");
        let encrypted = encrypt_list(&passcode, &prayers).unwrap();
        prop_assert!(decrypt_list(&wrong, &encrypted).is_err());
    }

    #[test]
    fn link_keys_are_byte_identical_for_any_passcode_pair(
        p1 in "[a-zA-Z0-9]{4,20}",
        p2 in "[a-zA-Z0-9]{4,20}",
    ) {
        let keys = create_link(&p1, &p2).unwrap();
        let k1 = unwrap_for_party(LinkParty::Person1, &p1, &keys).unwrap();
        let k2 = unwrap_for_party(LinkParty::Person2, &p2, &keys).unwrap();
        prop_assert_eq!(k1.as_bytes(), k2.as_bytes());
    }
}

#[test]
fn facts_never_contain_prayer_text() {
    let mut prayer = Prayer::new("deeply private text", "private");
    prayer.mark_prayed(1_700_000_123);
    let facts = ListFacts::compute(&[prayer]);

    let json = serde_json::to_string(&facts).unwrap();
    assert!(!json.contains("private text"));
    assert_eq!(facts.prayer_count, 1);
    assert_eq!(facts.last_prayed_at, Some(1_700_000_123));
}

#[test]
fn reencrypting_identical_plaintext_keeps_facts_stable() {
    let prayers = vec![Prayer::new("steadfast", "general")];
    let keys = create_link("a-pass", "b-pass").unwrap();
    let k = unwrap_for_party(LinkParty::Person1, "a-pass", &keys).unwrap();

    let first = encrypt_list_with_key(&k, &prayers).unwrap();
    let second = encrypt_list_with_key(&k, &prayers).unwrap();

    // Ciphertext differs (fresh nonce) but the semantic content and the
    // denormalized facts are identical.
    assert_ne!(first.ciphertext, second.ciphertext);
    let facts_first = ListFacts::compute(&decrypt_list_with_key(&k, &first).unwrap());
    let facts_second = ListFacts::compute(&decrypt_list_with_key(&k, &second).unwrap());
    assert_eq!(facts_first, facts_second);
}
