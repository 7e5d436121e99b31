//! Property tests: decoding never panics and always keeps the wire params.

use proptest::prelude::*;
use sdfz_command::{CommandData, CommandDecoder, CommandOptions, RawCommand, UnitDefTable};

fn any_slot() -> impl Strategy<Value = f64> {
    prop_oneof![
        -5000.0f64..5000.0,
        (-200i32..200).prop_map(f64::from),
        Just(f64::NAN),
        Just(f64::INFINITY),
        Just(f64::NEG_INFINITY),
    ]
}

proptest! {
    #[test]
    fn decode_is_total(
        id in prop_oneof![-500i32..200, any::<i32>()],
        options in any::<u8>(),
        params in prop::collection::vec(any_slot(), 0..24),
        unit_id in proptest::option::of(any::<u32>()),
    ) {
        let table = UnitDefTable::from_names(["armcom", "armpw", "corak"]);
        let mut decoder = CommandDecoder::new(&table);
        let mut raw = RawCommand::new(id, options, &params);
        raw.unit_id = unit_id;

        let decoded = decoder.decode(&raw);
        prop_assert_eq!(decoded.command_id, id);
        prop_assert_eq!(decoded.unit_id, unit_id);
        prop_assert_eq!(decoded.options, CommandOptions::from_bits(options));
        prop_assert_eq!(decoded.raw_params.len(), params.len());
        prop_assert_eq!(decoded.unit_def_id.is_some(), id < 0);
    }

    #[test]
    fn queue_edits_nest_to_any_depth(depth in 1usize..64) {
        // Each level is INSERT(queue_pos = level, id = INSERT, options = 0);
        // the innermost command is STOP.
        let mut params = Vec::new();
        for level in 0..depth {
            params.push(level as f64);
            params.push(if level + 1 == depth { 0.0 } else { 1.0 });
            params.push(0.0);
        }
        let table = UnitDefTable::new();
        let decoded = CommandDecoder::new(&table).decode(&RawCommand::new(1, 0, &params));

        let mut current = decoded;
        let mut levels = 0;
        while let CommandData::QueueEdit { command, .. } = current.data {
            levels += 1;
            current = *command;
        }
        prop_assert_eq!(levels, depth);
        prop_assert_eq!(current.name.as_str(), "STOP");
    }
}
