use catalog_translator::freezer::{protect, token_counts, unprotect, TOKEN_RE};
use catalog_translator::sentinels::ph_tokens_from_text;
use proptest::prelude::*;

fn ui_text() -> impl Strategy<Value = String> {
    let pieces = prop::collection::vec(
        prop_oneof![
            "[a-zA-Z ,.!?]{0,8}",
            Just("{name}".to_string()),
            Just("{{count}}".to_string()),
            Just("%1$s".to_string()),
            Just("%d".to_string()),
            Just(":user".to_string()),
            Just("$LIMIT".to_string()),
            Just("<b>".to_string()),
            Just("</b>".to_string()),
            Just("__PH_".to_string()),
            Just("__PH_3__".to_string()),
            Just("{n, plural, one {# item}}".to_string()),
            "[{}%$:<>/_a-z0-9]{1,4}",
        ],
        0..8,
    );
    pieces.prop_map(|p| p.concat())
}

proptest! {
    #[test]
    fn unprotect_restores_protected_text(text in ui_text()) {
        let (protected, map) = protect(&text);
        prop_assert_eq!(unprotect(&protected, &map), text);
    }

    #[test]
    fn one_marker_per_token_match(text in ui_text()) {
        prop_assume!(!text.contains("__PH_"));
        let (protected, map) = protect(&text);
        let matches = TOKEN_RE.find_iter(&text).count();
        prop_assert_eq!(ph_tokens_from_text(&protected).len(), matches);
        prop_assert_eq!(map.len(), matches);
        prop_assert_eq!(token_counts(&text).values().sum::<usize>(), matches);
    }

    #[test]
    fn arbitrary_text_survives(text in ".{0,48}") {
        let (protected, map) = protect(&text);
        prop_assert_eq!(unprotect(&protected, &map), text);
    }
}

#[test]
fn markers_are_numbered_by_offset() {
    let (protected, map) = protect("Hi {name}, you have %d <b>new</b> messages");
    assert_eq!(
        protected,
        "Hi __PH_0__, you have __PH_1__ __PH_2__new__PH_3__ messages"
    );
    assert_eq!(map["__PH_0__"], "{name}");
    assert_eq!(map["__PH_3__"], "</b>");
}
