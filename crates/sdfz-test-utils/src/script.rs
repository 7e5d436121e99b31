//! Launch script builder.

/// Builds the `[game] { ... }` launch script text the engine embeds in a
/// demo.
#[derive(Clone, Debug, Default)]
pub struct ScriptBuilder {
    game: Vec<(String, String)>,
    sections: Vec<(String, Vec<(String, String)>)>,
    mod_options: Vec<(String, String)>,
    map_options: Vec<(String, String)>,
    host_options: Vec<(String, String)>,
}

impl ScriptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map name and game version.
    pub fn game(self, map: &str, game_type: &str) -> Self {
        self.game_value("mapname", map).game_value("gametype", game_type)
    }

    /// A scalar key of `[game]`.
    pub fn game_value(mut self, key: &str, value: &str) -> Self {
        self.game.push((key.into(), value.into()));
        self
    }

    /// A key in the `[game]` child section `name`, created on first use.
    pub fn section_value(mut self, name: &str, key: &str, value: &str) -> Self {
        let entry = (key.to_owned(), value.to_owned());
        match self.sections.iter_mut().find(|(n, _)| n == name) {
            Some((_, values)) => values.push(entry),
            None => self.sections.push((name.to_owned(), vec![entry])),
        }
        self
    }

    pub fn player(self, id: u32, name: &str, team: u32) -> Self {
        let section = format!("player{id}");
        self.section_value(&section, "name", name)
            .section_value(&section, "team", &team.to_string())
            .section_value(&section, "spectator", "0")
    }

    pub fn spectator(self, id: u32, name: &str) -> Self {
        let section = format!("player{id}");
        self.section_value(&section, "name", name)
            .section_value(&section, "spectator", "1")
    }

    pub fn team(self, id: u32, ally_team: u32, side: &str) -> Self {
        let section = format!("team{id}");
        self.section_value(&section, "allyteam", &ally_team.to_string())
            .section_value(&section, "side", side)
    }

    pub fn ally_team(self, id: u32) -> Self {
        self.section_value(&format!("allyteam{id}"), "numallies", "0")
    }

    pub fn ai(self, id: u32, name: &str, short_name: &str, team: u32, host: u32) -> Self {
        let section = format!("ai{id}");
        self.section_value(&section, "name", name)
            .section_value(&section, "shortname", short_name)
            .section_value(&section, "team", &team.to_string())
            .section_value(&section, "host", &host.to_string())
    }

    pub fn mod_option(mut self, key: &str, value: &str) -> Self {
        self.mod_options.push((key.into(), value.into()));
        self
    }

    pub fn map_option(mut self, key: &str, value: &str) -> Self {
        self.map_options.push((key.into(), value.into()));
        self
    }

    pub fn host_option(mut self, key: &str, value: &str) -> Self {
        self.host_options.push((key.into(), value.into()));
        self
    }

    pub fn build(&self) -> String {
        let mut out = String::from("[game]\n{\n");
        for (k, v) in &self.game {
            out.push_str(&format!("\t{k}={v};\n"));
        }
        let options = [
            ("modoptions", &self.mod_options),
            ("mapoptions", &self.map_options),
            ("hostoptions", &self.host_options),
        ];
        let sections = self
            .sections
            .iter()
            .map(|(name, values)| (name.as_str(), values))
            .chain(options.into_iter().filter(|(_, values)| !values.is_empty()));
        for (name, values) in sections {
            out.push_str(&format!("\t[{name}]\n\t{{\n"));
            for (k, v) in values {
                out.push_str(&format!("\t\t{k}={v};\n"));
            }
            out.push_str("\t}\n");
        }
        out.push_str("}\n");
        out
    }
}
