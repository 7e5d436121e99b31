//! Benchmark fixtures for the sdfz demo reader.
//!
//! - [`skirmish_script`]: a launch script for an `n` versus `n` match
//! - [`skirmish_demo`]: a finalized demo with a realistic packet mix
//! - [`command_mix`]: raw command parameter lists covering every shape

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use sdfz_test_utils::{DemoBuilder, ScriptBuilder};

/// Launch script for a match with `per_side` players on each of two ally
/// teams, plus a few spectators and options.
pub fn skirmish_script(per_side: u32) -> String {
    let mut script = ScriptBuilder::new()
        .game("Supreme Isthmus v1.6.4", "Beyond All Reason test-27012")
        .ally_team(0)
        .ally_team(1)
        .mod_option("startmetal", "1000")
        .mod_option("startenergy", "1000")
        .map_option("waterlevel", "0")
        .host_option("autobalance", "1");
    for id in 0..per_side * 2 {
        let ally = id % 2;
        let side = if ally == 0 { "Armada" } else { "Cortex" };
        script = script
            .player(id, &format!("Player{id}"), id)
            .team(id, ally, side);
    }
    for s in 0..4 {
        let id = per_side * 2 + s;
        script = script.spectator(id, &format!("Spec{s}"));
    }
    script.build()
}

/// Command id and parameters for each decodable shape.
pub fn command_mix() -> Vec<(i32, Vec<f32>)> {
    vec![
        (10, vec![1024.0, 64.0, 2048.0]),
        (16, vec![1024.0, 64.0, 2048.0, 1100.0, 64.0, 2100.0]),
        (20, vec![4711.0]),
        (20, vec![1024.0, 64.0, 2048.0]),
        (21, vec![1024.0, 64.0, 2048.0, 300.0]),
        (-42, vec![500.0, 12.0, 900.0, 1.0]),
        (2, vec![3.0, -42.0, 32.0, 500.0, 12.0, 900.0, 1.0]),
        (45, vec![1.0]),
        (7, vec![0.0, 0.0, 0.0, 64.0, 0.0, 64.0]),
        (90, vec![5123.0]),
        (0, vec![]),
        (31_999, vec![1.0, 2.0]),
    ]
}

/// A finalized demo with `per_side` players a side and `commands` unit
/// commands spread over a 20 minute game.
pub fn skirmish_demo(per_side: u32, commands: usize) -> DemoBuilder {
    let players = (per_side * 2).max(1);
    let mix = command_mix();
    let mut demo = DemoBuilder::new()
        .script(skirmish_script(per_side))
        .game_time(1200)
        .start_playing(0.0, 0);
    for i in 0..commands {
        let t = 1.0 + (i as f32) * 1199.0 / (commands.max(1) as f32);
        let player = (i as u32 % players) as u8;
        let (id, params) = &mix[i % mix.len()];
        demo = if i % 50 == 49 {
            demo.chat(t, player, 252, "gl hf")
        } else {
            demo.command(t, player, *id, (i % 4) as u8 * 32, params)
        };
    }
    demo.game_over(1199.5, 0, &[0])
        .winners(&[0])
        .player_stats(vec![[12_000, 800, 300, 1500, 1200]; players as usize])
}
