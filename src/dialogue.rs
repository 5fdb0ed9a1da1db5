//! Characters, dialogue lines and the selection of lines a mastering pass
//! works on.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{AudioError, Result};

fn default_group() -> u32 {
    1
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Character {
    pub name: String,
    pub voice: String,
    pub voice_id: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_group")]
    pub group: u32,
}

impl Character {
    pub fn new(name: impl Into<String>, voice: impl Into<String>, voice_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            voice: voice.into(),
            voice_id: voice_id.into(),
            description: String::new(),
            group: default_group(),
        }
    }

    pub fn in_group(mut self, group: u32) -> Self {
        self.group = group;
        self
    }
}

/// One utterance. `line` names the audio artifact and never changes when the
/// line is regenerated.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DialogueLine {
    pub character: String,
    pub line: u32,
    pub text: String,
}

/// Which lines a mastering pass treats as affected.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Selection {
    #[default]
    All,
    Groups {
        groups: Vec<u32>,
    },
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Dialogue {
    characters: Vec<Character>,
    lines: Vec<DialogueLine>,
}

impl Dialogue {
    /// Line numbers must be unique and every line must name a known
    /// character.
    pub fn new(characters: Vec<Character>, lines: Vec<DialogueLine>) -> Result<Self> {
        let mut seen = HashSet::new();
        for line in &lines {
            if !seen.insert(line.line) {
                return Err(AudioError::Config(format!(
                    "line number {} is used more than once",
                    line.line
                )));
            }
            if !characters.iter().any(|c| c.name == line.character) {
                return Err(AudioError::Config(format!(
                    "line {} refers to unknown character '{}'",
                    line.line, line.character
                )));
            }
        }
        Ok(Self { characters, lines })
    }

    pub fn characters(&self) -> &[Character] {
        &self.characters
    }

    pub fn lines(&self) -> &[DialogueLine] {
        &self.lines
    }

    pub fn character(&self, name: &str) -> Option<&Character> {
        self.characters.iter().find(|c| c.name == name)
    }

    /// Line numbers in timeline order.
    pub fn line_numbers(&self) -> Vec<u32> {
        self.lines.iter().map(|l| l.line).collect()
    }

    /// Line numbers covered by `selection`, in timeline order.
    pub fn affected_lines(&self, selection: &Selection) -> Vec<u32> {
        match selection {
            Selection::All => self.line_numbers(),
            Selection::Groups { groups } => self
                .lines
                .iter()
                .filter(|l| {
                    self.character(&l.character)
                        .map_or(false, |c| groups.contains(&c.group))
                })
                .map(|l| l.line)
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(character: &str, n: u32) -> DialogueLine {
        DialogueLine {
            character: character.into(),
            line: n,
            text: format!("line {n}"),
        }
    }

    fn sample() -> Dialogue {
        Dialogue::new(
            vec![
                Character::new("Narrator", "Brian", "v1"),
                Character::new("Mira", "Rachel", "v2").in_group(2),
            ],
            vec![line("Narrator", 1), line("Mira", 2), line("Mira", 3), line("Narrator", 4)],
        )
        .unwrap()
    }

    #[test]
    fn test_group_selection() {
        let d = sample();
        assert_eq!(d.affected_lines(&Selection::All), vec![1, 2, 3, 4]);
        assert_eq!(
            d.affected_lines(&Selection::Groups { groups: vec![2] }),
            vec![2, 3]
        );
        assert!(d
            .affected_lines(&Selection::Groups { groups: vec![9] })
            .is_empty());
    }

    #[test]
    fn test_duplicate_line_rejected() {
        let err = Dialogue::new(
            vec![Character::new("A", "x", "1")],
            vec![line("A", 1), line("A", 1)],
        );
        assert!(err.is_err());
    }

    #[test]
    fn test_unknown_character_rejected() {
        assert!(Dialogue::new(vec![], vec![line("Ghost", 1)]).is_err());
    }

    #[test]
    fn test_default_group_from_json() {
        let c: Character =
            serde_json::from_str(r#"{"name": "A", "voice": "B", "voice_id": "C"}"#).unwrap();
        assert_eq!(c.group, 1);
    }
}
