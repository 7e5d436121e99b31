//! Launch script parser.
//!
//! The launch script is the text the lobby hands the engine to start a
//! match:
//!
//! ```text
//! [game]
//! {
//!     mapname=Red Comet Remake 1.8;
//!     // host settings
//!     [modoptions]
//!     {
//!         startmetal=1000;
//!     }
//! }
//! ```
//!
//! Section names and keys are case-insensitive and stored lowercased.
//! Values are trimmed and kept verbatim otherwise. A value ends at `;`,
//! at a line break, or just before a closing `}`. `//` starts a comment
//! when it opens a statement.

use indexmap::IndexMap;

use crate::error::DemoError;

/// Deepest section nesting accepted.
pub const MAX_DEPTH: usize = 32;

/// One `[section] { ... }` block, or the top level of the script.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScriptSection {
    values: IndexMap<String, String>,
    sections: IndexMap<String, ScriptSection>,
}

impl ScriptSection {
    /// Value of `key` in this section. Keys are matched case-insensitively.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(&key.to_ascii_lowercase()).map(String::as_str)
    }

    /// Parse the value of `key`, ignoring values that do not parse.
    pub fn get_parsed<T: std::str::FromStr>(&self, key: &str) -> Option<T> {
        self.get(key).and_then(|v| v.parse().ok())
    }

    /// Child section `name`.
    pub fn section(&self, name: &str) -> Option<&ScriptSection> {
        self.sections.get(&name.to_ascii_lowercase())
    }

    /// Follow a path of child sections.
    pub fn section_path(&self, path: &[&str]) -> Option<&ScriptSection> {
        path.iter().try_fold(self, |s, name| s.section(name))
    }

    /// Scalar values in script order.
    pub fn values(&self) -> &IndexMap<String, String> {
        &self.values
    }

    /// Child sections in script order.
    pub fn sections(&self) -> impl Iterator<Item = (&str, &ScriptSection)> {
        self.sections.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Whether the section has neither values nor children.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.sections.is_empty()
    }

    fn merge(&mut self, other: ScriptSection) {
        self.values.extend(other.values);
        for (name, child) in other.sections {
            self.sections.entry(name).or_default().merge(child);
        }
    }
}

/// Parse a launch script into its top-level section.
///
/// A repeated section name merges into the first occurrence; a repeated
/// key keeps the last value.
///
/// # Examples
///
/// ```
/// use sdfz_demo::parse_script;
///
/// let root = parse_script("[GAME] { MapName = Tundra ; [modoptions] { maxunits=500; } }").unwrap();
/// let game = root.section("game").unwrap();
/// assert_eq!(game.get("mapname"), Some("Tundra"));
/// assert_eq!(game.section("modoptions").unwrap().get("maxunits"), Some("500"));
/// ```
pub fn parse_script(text: &str) -> Result<ScriptSection, DemoError> {
    let mut parser = Parser { src: text, pos: 0 };
    parser.body(0, false)
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<u8> {
        self.src.as_bytes().get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.src.as_bytes().get(self.pos + offset).copied()
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(b) if b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn skip_line(&mut self) {
        while let Some(b) = self.peek() {
            self.pos += 1;
            if b == b'\n' {
                break;
            }
        }
    }

    /// Advance until a byte in `stops` (not consumed) or end of input.
    fn until(&mut self, stops: &[u8]) -> &str {
        let start = self.pos;
        while matches!(self.peek(), Some(b) if !stops.contains(&b)) {
            self.pos += 1;
        }
        // Stop bytes are ASCII, so both ends fall on char boundaries.
        &self.src[start..self.pos]
    }

    fn error(&self, detail: &str) -> DemoError {
        DemoError::corrupt(format!("launch script: {detail} at byte {}", self.pos))
    }

    fn body(&mut self, depth: usize, braced: bool) -> Result<ScriptSection, DemoError> {
        let mut section = ScriptSection::default();
        loop {
            self.skip_whitespace();
            match self.peek() {
                None if braced => return Err(self.error("unterminated section")),
                None => return Ok(section),
                Some(b'}') if braced => {
                    self.pos += 1;
                    return Ok(section);
                }
                Some(b'}') => return Err(self.error("unmatched '}'")),
                Some(b';') => self.pos += 1,
                Some(b'/') if self.peek_at(1) == Some(b'/') => self.skip_line(),
                Some(b'[') => {
                    let (name, child) = self.child(depth)?;
                    section.sections.entry(name).or_default().merge(child);
                }
                Some(_) => {
                    let (key, value) = self.statement()?;
                    section.values.insert(key, value);
                }
            }
        }
    }

    fn child(&mut self, depth: usize) -> Result<(String, ScriptSection), DemoError> {
        self.pos += 1;
        let name = self.until(b"]\n").trim().to_ascii_lowercase();
        if self.peek() != Some(b']') {
            return Err(self.error("unterminated section name"));
        }
        self.pos += 1;
        self.skip_whitespace();
        if self.peek() != Some(b'{') {
            return Err(self.error("expected '{' after section name"));
        }
        self.pos += 1;
        if depth + 1 > MAX_DEPTH {
            return Err(self.error("sections nested too deeply"));
        }
        let child = self.body(depth + 1, true)?;
        Ok((name, child))
    }

    fn statement(&mut self) -> Result<(String, String), DemoError> {
        let key = self.until(b"=;\n{}[").trim().to_ascii_lowercase();
        if self.peek() != Some(b'=') {
            return Err(self.error("expected '=' after key"));
        }
        if key.is_empty() {
            return Err(self.error("empty key"));
        }
        self.pos += 1;
        let value = self.until(b";\n}").trim().to_owned();
        if matches!(self.peek(), Some(b';' | b'\n')) {
            self.pos += 1;
        }
        Ok((key, value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCRIPT: &str = "\
[game]
{
    // comment line
    MapName=Red Comet Remake 1.8;
    GameType=Beyond All Reason test-27012-0bbe2c6;
    ishost=1;
    [modoptions]
    {
        startmetal=1000;
        deathmode=com;
    }
    [player0]
    {
        name=Alice;
        team=0;
    }
}
";

    #[test]
    fn parses_nested_sections() {
        let root = parse_script(SCRIPT).unwrap();
        let game = root.section("game").unwrap();
        assert_eq!(game.get("mapname"), Some("Red Comet Remake 1.8"));
        assert_eq!(game.get("MAPNAME"), Some("Red Comet Remake 1.8"));
        assert_eq!(
            game.get("gametype"),
            Some("Beyond All Reason test-27012-0bbe2c6")
        );
        let mods = root.section_path(&["game", "modoptions"]).unwrap();
        assert_eq!(mods.get("deathmode"), Some("com"));
        assert_eq!(game.get_parsed::<u32>("ishost"), Some(1));
        assert_eq!(game.section("player0").unwrap().get("name"), Some("Alice"));
    }

    #[test]
    fn keeps_script_order() {
        let root = parse_script(SCRIPT).unwrap();
        let game = root.section("game").unwrap();
        let keys: Vec<_> = game.values().keys().cloned().collect();
        assert_eq!(keys, ["mapname", "gametype", "ishost"]);
        let names: Vec<_> = game.sections().map(|(n, _)| n.to_owned()).collect();
        assert_eq!(names, ["modoptions", "player0"]);
    }

    #[test]
    fn value_stops_before_closing_brace() {
        let root = parse_script("[a]{x=1}").unwrap();
        assert_eq!(root.section("a").unwrap().get("x"), Some("1"));
    }

    #[test]
    fn newline_terminates_value() {
        let root = parse_script("[a]{\nx=1\ny = two words \n}").unwrap();
        let a = root.section("a").unwrap();
        assert_eq!(a.get("x"), Some("1"));
        assert_eq!(a.get("y"), Some("two words"));
    }

    #[test]
    fn slashes_inside_values_are_kept() {
        let root = parse_script("[a]{url=http://example.com/x;}").unwrap();
        assert_eq!(root.section("a").unwrap().get("url"), Some("http://example.com/x"));
    }

    #[test]
    fn repeated_sections_merge() {
        let root = parse_script("[a]{x=1;} [A]{y=2; x=3;}").unwrap();
        let a = root.section("a").unwrap();
        assert_eq!(a.get("x"), Some("3"));
        assert_eq!(a.get("y"), Some("2"));
    }

    #[test]
    fn unterminated_section_is_corrupt() {
        let err = parse_script("[game]{ mapname=x;").unwrap_err();
        assert!(matches!(err, DemoError::Corrupt { .. }));
    }

    #[test]
    fn missing_equals_is_corrupt() {
        assert!(parse_script("[game]{ mapname; }").is_err());
        assert!(parse_script("}").is_err());
    }

    #[test]
    fn depth_is_capped() {
        let deep = "[s]{".repeat(MAX_DEPTH + 1) + &"}".repeat(MAX_DEPTH + 1);
        assert!(parse_script(&deep).is_err());
        let ok = "[s]{".repeat(MAX_DEPTH) + &"}".repeat(MAX_DEPTH);
        assert!(parse_script(&ok).is_ok());
    }

    #[test]
    fn empty_script_is_empty() {
        assert!(parse_script("").unwrap().is_empty());
        assert!(parse_script("  \n // nothing\n").unwrap().is_empty());
    }
}
