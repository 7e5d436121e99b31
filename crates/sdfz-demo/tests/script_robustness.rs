//! Property tests for the launch script parser.

use proptest::prelude::*;
use sdfz_demo::parse_script;

fn key() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,11}"
}

fn value() -> impl Strategy<Value = String> {
    "[A-Za-z0-9 .:_-]{0,24}".prop_map(|v| v.trim().to_owned())
}

proptest! {
    #[test]
    fn never_panics_on_arbitrary_text(text in ".{0,256}") {
        let _ = parse_script(&text);
    }

    #[test]
    fn never_panics_on_grammar_soup(text in "[\\[\\]{}=;/\\n a-z0-9]{0,128}") {
        let _ = parse_script(&text);
    }

    #[test]
    fn well_formed_scripts_keep_every_key(
        entries in prop::collection::vec((key(), value()), 1..12),
        upper in any::<bool>(),
    ) {
        let mut text = String::from("[game]\n{\n");
        for (k, v) in &entries {
            let k = if upper { k.to_uppercase() } else { k.clone() };
            text.push_str(&format!("  {k} = {v};\n"));
        }
        text.push_str("}\n");

        let root = parse_script(&text).unwrap();
        let game = root.section("game").unwrap();
        for (k, _) in &entries {
            // Last write wins for repeated keys.
            let (_, expected) = entries.iter().rev().find(|(k2, _)| k2 == k).unwrap();
            prop_assert_eq!(game.get(k), Some(expected.as_str()));
        }
    }
}
