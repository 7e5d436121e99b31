//! Match roster: who played, on which team, and who watched.
//!
//! Built from the numbered `[playerN]`, `[teamN]`, `[allyteamN]` and
//! `[aiN]` sections of the launch script's `[game]` block, plus the
//! winners and player statistics from the demo footer.

use std::collections::BTreeMap;

use crate::script::ScriptSection;
use crate::types::{
    Ai, AllyTeam, Contender, DemoFooter, Player, Spectator, StartBox, StartPosition,
};

/// Participants of one match, in deterministic order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Roster {
    /// Ally teams by id.
    pub teams: Vec<AllyTeam>,
    /// Players by id, then AIs by id.
    pub contenders: Vec<Contender>,
    /// Spectators by id.
    pub spectators: Vec<Spectator>,
}

struct TeamInfo<'a> {
    ally_team_id: u32,
    section: &'a ScriptSection,
}

/// Children of `game` named `<prefix><number>`, keyed by number.
fn numbered<'a>(game: &'a ScriptSection, prefix: &str) -> BTreeMap<u32, &'a ScriptSection> {
    game.sections()
        .filter_map(|(name, section)| {
            let id = name.strip_prefix(prefix)?.parse().ok()?;
            Some((id, section))
        })
        .collect()
}

/// A float that JSON can carry. `nan` and `inf` parse as `f32` but would
/// be stored as `null`.
fn finite(text: &str) -> Option<f32> {
    text.parse::<f32>().ok().filter(|v| v.is_finite())
}

fn coordinate(section: &ScriptSection, key: &str) -> Option<f32> {
    section.get(key).and_then(finite)
}

fn rgb_color(section: &ScriptSection) -> Option<[f32; 3]> {
    let text = section.get("rgbcolor")?;
    let mut parts = text.split_whitespace().map(finite);
    let color = [parts.next()??, parts.next()??, parts.next()??];
    parts.next().is_none().then_some(color)
}

fn start_position(sections: &[&ScriptSection]) -> Option<StartPosition> {
    sections.iter().find_map(|s| {
        Some(StartPosition {
            x: coordinate(s, "startposx")?,
            z: coordinate(s, "startposz")?,
        })
    })
}

fn start_box(section: &ScriptSection) -> Option<StartBox> {
    Some(StartBox {
        left: coordinate(section, "startrectleft")?,
        top: coordinate(section, "startrecttop")?,
        right: coordinate(section, "startrectright")?,
        bottom: coordinate(section, "startrectbottom")?,
    })
}

fn owned(section: &ScriptSection, key: &str) -> Option<String> {
    section
        .get(key)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}

impl Roster {
    /// Build the roster from the parsed launch script.
    ///
    /// A script without a `[game]` block yields an empty roster. Players
    /// flagged `spectator=1`, or whose team does not exist, are spectators.
    pub fn from_script(root: &ScriptSection, footer: Option<&DemoFooter>) -> Self {
        let Some(game) = root.section("game") else {
            return Self::default();
        };

        let teams: BTreeMap<u32, TeamInfo<'_>> = numbered(game, "team")
            .into_iter()
            .map(|(id, section)| {
                let ally_team_id = section.get_parsed("allyteam").unwrap_or(0);
                (id, TeamInfo { ally_team_id, section })
            })
            .collect();

        let winners: &[u8] = footer.map_or(&[], |f| f.winning_ally_teams.as_slice());
        let mut ally_teams: BTreeMap<u32, AllyTeam> = numbered(game, "allyteam")
            .into_iter()
            .map(|(id, section)| {
                (
                    id,
                    AllyTeam {
                        ally_team_id: id,
                        team_ids: Vec::new(),
                        start_box: start_box(section),
                        winning: false,
                    },
                )
            })
            .collect();
        for (&team_id, team) in &teams {
            ally_teams
                .entry(team.ally_team_id)
                .or_insert_with(|| AllyTeam {
                    ally_team_id: team.ally_team_id,
                    ..AllyTeam::default()
                })
                .team_ids
                .push(team_id);
        }
        for ally in ally_teams.values_mut() {
            ally.winning = u8::try_from(ally.ally_team_id).is_ok_and(|id| winners.contains(&id));
        }

        let mut contenders = Vec::new();
        let mut spectators = Vec::new();
        for (player_id, section) in numbered(game, "player") {
            let team = section
                .get_parsed::<u32>("team")
                .and_then(|id| teams.get(&id).map(|t| (id, t)));
            let is_spectator = section.get_parsed::<u32>("spectator").unwrap_or(0) != 0;
            let name = section.get("name").unwrap_or_default().to_owned();
            let user_id = section.get_parsed("accountid");
            let rank = section.get_parsed("rank");
            let country_code = owned(section, "countrycode");

            match team {
                Some((team_id, team)) if !is_spectator => {
                    let statistics = footer
                        .and_then(|f| f.player_statistics.get(player_id as usize).copied())
                        .flatten();
                    contenders.push(Contender::Player(Player {
                        player_id,
                        name,
                        team_id,
                        ally_team_id: team.ally_team_id,
                        user_id,
                        rank,
                        skill: owned(section, "skill"),
                        country_code,
                        faction: owned(team.section, "side"),
                        rgb_color: rgb_color(team.section),
                        start_position: start_position(&[team.section, section]),
                        statistics,
                    }));
                }
                _ => spectators.push(Spectator {
                    player_id,
                    name,
                    user_id,
                    rank,
                    country_code,
                }),
            }
        }

        for (ai_id, section) in numbered(game, "ai") {
            let team_id = section.get_parsed::<u32>("team").unwrap_or(0);
            let team = teams.get(&team_id);
            contenders.push(Contender::Ai(Ai {
                ai_id,
                name: section.get("name").unwrap_or_default().to_owned(),
                short_name: section.get("shortname").unwrap_or_default().to_owned(),
                version: owned(section, "version"),
                host_player_id: section.get_parsed("host"),
                team_id,
                ally_team_id: team.map_or(0, |t| t.ally_team_id),
                faction: team.and_then(|t| owned(t.section, "side")),
                rgb_color: team.and_then(|t| rgb_color(t.section)),
            }));
        }

        Self {
            teams: ally_teams.into_values().collect(),
            contenders,
            spectators,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::parse_script;
    use crate::types::PlayerStatistics;

    const SCRIPT: &str = "
[game]
{
    [player1] { name=Bob; team=1; accountid=2002; countrycode=DE; skill=[18.0]; rank=3; }
    [player0] { name=Alice; team=0; accountid=1001; countrycode=GB; }
    [player2] { name=Watcher; spectator=1; team=0; }
    [team0] { teamleader=0; allyteam=0; rgbcolor=1 0 0; side=Armada; startposx=100; startposz=200; }
    [team1] { teamleader=1; allyteam=1; rgbcolor=0 0 1; side=Cortex; }
    [team2] { teamleader=0; allyteam=1; side=Cortex; }
    [ai0] { name=Bot; shortname=BARb; version=stable; host=0; team=2; }
    [allyteam1] { startrectleft=0.8; startrecttop=0; startrectright=1; startrectbottom=1; }
    [allyteam0] { startrectleft=0; startrecttop=0; startrectright=0.2; startrectbottom=1; }
}
";

    fn roster(footer: Option<&DemoFooter>) -> Roster {
        Roster::from_script(&parse_script(SCRIPT).unwrap(), footer)
    }

    #[test]
    fn orders_players_then_ais() {
        let r = roster(None);
        let names: Vec<_> = r.contenders.iter().map(Contender::name).collect();
        assert_eq!(names, ["Alice", "Bob", "Bot"]);
    }

    #[test]
    fn spectators_split_out() {
        let r = roster(None);
        assert_eq!(r.spectators.len(), 1);
        assert_eq!(r.spectators[0].name, "Watcher");
        assert_eq!(r.spectators[0].player_id, 2);
    }

    #[test]
    fn player_fields_come_from_player_and_team() {
        let r = roster(None);
        let Contender::Player(alice) = &r.contenders[0] else {
            panic!("expected a player");
        };
        assert_eq!(alice.user_id, Some(1001));
        assert_eq!(alice.country_code.as_deref(), Some("GB"));
        assert_eq!(alice.faction.as_deref(), Some("Armada"));
        assert_eq!(alice.rgb_color, Some([1.0, 0.0, 0.0]));
        assert_eq!(alice.start_position, Some(StartPosition { x: 100.0, z: 200.0 }));
        assert_eq!(alice.rank, None);

        let Contender::Player(bob) = &r.contenders[1] else {
            panic!("expected a player");
        };
        assert_eq!(bob.ally_team_id, 1);
        assert_eq!(bob.skill.as_deref(), Some("[18.0]"));
        assert_eq!(bob.rank, Some(3));
        assert_eq!(bob.start_position, None);
    }

    #[test]
    fn ai_inherits_team() {
        let r = roster(None);
        let Contender::Ai(bot) = &r.contenders[2] else {
            panic!("expected an ai");
        };
        assert_eq!(bot.short_name, "BARb");
        assert_eq!(bot.host_player_id, Some(0));
        assert_eq!(bot.ally_team_id, 1);
        assert_eq!(bot.faction.as_deref(), Some("Cortex"));
    }

    #[test]
    fn ally_teams_collect_teams_and_winners() {
        let footer = DemoFooter {
            winning_ally_teams: vec![1],
            player_statistics: vec![
                Some(PlayerStatistics {
                    mouse_clicks: 7,
                    ..PlayerStatistics::default()
                }),
                None,
                None,
            ],
        };
        let r = roster(Some(&footer));
        assert_eq!(r.teams.len(), 2);
        assert_eq!(r.teams[0].team_ids, [0]);
        assert_eq!(r.teams[1].team_ids, [1, 2]);
        assert!(!r.teams[0].winning);
        assert!(r.teams[1].winning);
        assert_eq!(r.teams[0].start_box.map(|b| b.right), Some(0.2));

        let Contender::Player(alice) = &r.contenders[0] else {
            panic!("expected a player");
        };
        assert_eq!(alice.statistics.map(|s| s.mouse_clicks), Some(7));
    }

    #[test]
    fn no_game_section_is_empty() {
        let root = parse_script("[other]{x=1;}").unwrap();
        assert_eq!(Roster::from_script(&root, None), Roster::default());
    }

    #[test]
    fn malformed_color_is_dropped() {
        let root = parse_script("[s]{rgbcolor=1 0;}").unwrap();
        assert_eq!(rgb_color(root.section("s").unwrap()), None);
    }

    #[test]
    fn non_finite_floats_are_dropped() {
        let root = parse_script(
            "[game]{[team0]{allyteam=0; rgbcolor=1 nan 0; startposx=nan; startposz=1;}
             [allyteam0]{startrectleft=0; startrecttop=-inf; startrectright=1; startrectbottom=1;}
             [player0]{name=A; team=0;}}",
        )
        .unwrap();
        let r = Roster::from_script(&root, None);
        let Contender::Player(a) = &r.contenders[0] else {
            panic!("expected a player");
        };
        assert_eq!(a.rgb_color, None);
        assert_eq!(a.start_position, None);
        assert_eq!(r.teams[0].start_box, None);
    }
}
