use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Result, bail};
use rust_i18n::t;
use serde::{Deserialize, Serialize};

/// Locales compiled in from `locales/`.
pub const LOCALES: &[&str] = &["en", "uk"];

/// A key on the virtual keyboard. The key is its own identity: two presses
/// of `Key::Char('e')` address the same physical button.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Key {
    Char(char),
    Punctuation(char),
    Space,
    Backspace,
}

impl Key {
    /// Glyph inserted by a tap, `None` for backspace.
    pub fn glyph(self) -> Option<char> {
        match self {
            Key::Char(ch) | Key::Punctuation(ch) => Some(ch),
            Key::Space => Some(' '),
            Key::Backspace => None,
        }
    }

    /// Maps a raw character to the key that produces it.
    pub fn from_char(ch: char) -> Self {
        match ch {
            ' ' => Key::Space,
            c if c.is_alphabetic() || c == 'ʼ' => Key::Char(c),
            c => Key::Punctuation(c),
        }
    }
}

/// Keys of the fixed bottom row.
pub const SPECIAL_ROW: &[Key] = &[
    Key::Punctuation('.'),
    Key::Punctuation(','),
    Key::Space,
    Key::Punctuation('-'),
];

/// Base characters of a locale plus the long-press alternates bound to them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GlyphSet {
    pub locale: String,
    pub alphabet: Vec<char>,
    pub row_lengths: Vec<usize>,
    alternates: BTreeMap<char, Vec<char>>,
}

/// On-disk form of a custom glyph set.
#[derive(Clone, Debug, Serialize, Deserialize)]
struct GlyphSetFile {
    locale: String,
    alphabet: String,
    #[serde(default)]
    row_lengths: Vec<usize>,
    #[serde(default)]
    alternates: BTreeMap<String, String>,
}

impl GlyphSet {
    pub fn new(locale: &str, alphabet: &str, alternates: BTreeMap<char, Vec<char>>) -> Self {
        let alphabet: Vec<char> = alphabet.chars().collect();
        let row_lengths = default_row_lengths(locale, alphabet.len());
        Self {
            locale: locale.to_string(),
            alphabet,
            row_lengths,
            alternates,
        }
    }

    /// Builds the glyph set from the compiled locale tables.
    pub fn for_locale(locale: &str) -> Self {
        let alphabet = t!("keyboard.alphabet", locale = locale).to_string();
        let encoded = t!("keyboard.alternates", locale = locale).to_string();
        Self::new(locale, &alphabet, parse_alternates(&encoded))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let file: GlyphSetFile = toml::from_str(content)?;
        if file.alphabet.is_empty() {
            bail!("glyph set for '{}' has an empty alphabet", file.locale);
        }
        let mut alternates = BTreeMap::new();
        for (base, alts) in &file.alternates {
            let mut chars = base.chars();
            match (chars.next(), chars.next()) {
                (Some(b), None) => {
                    alternates.insert(b, alts.chars().collect());
                }
                _ => bail!("alternate key '{base}' must be a single character"),
            }
        }
        let mut set = Self::new(&file.locale, &file.alphabet, alternates);
        if !file.row_lengths.is_empty() {
            set.row_lengths = file.row_lengths;
        }
        Ok(set)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Alternates bound to `key`, or `None` when the key has none (the
    /// gesture then degrades to tap-only).
    pub fn alternates_for(&self, key: Key) -> Option<&[char]> {
        let base = match key {
            Key::Char(ch) | Key::Punctuation(ch) => ch,
            Key::Space | Key::Backspace => return None,
        };
        self.alternates
            .get(&base)
            .map(Vec::as_slice)
            .filter(|alts| !alts.is_empty())
    }

    /// Letter rows split per `row_lengths`, backspace closing the last letter
    /// row, then the fixed special row.
    pub fn rows(&self) -> Vec<Vec<Key>> {
        let mut rows: Vec<Vec<Key>> = Vec::new();
        let mut start = 0;
        for &len in &self.row_lengths {
            let end = (start + len).min(self.alphabet.len());
            rows.push(self.alphabet[start..end].iter().map(|&c| Key::Char(c)).collect());
            start = end;
        }
        if start < self.alphabet.len() {
            rows.push(self.alphabet[start..].iter().map(|&c| Key::Char(c)).collect());
        }
        match rows.last_mut() {
            Some(last) => last.push(Key::Backspace),
            None => rows.push(vec![Key::Backspace]),
        }
        rows.push(SPECIAL_ROW.to_vec());
        rows
    }

    pub fn contains(&self, key: Key) -> bool {
        match key {
            Key::Char(ch) => self.alphabet.contains(&ch),
            Key::Backspace => true,
            other => SPECIAL_ROW.contains(&other),
        }
    }
}

impl Default for GlyphSet {
    fn default() -> Self {
        Self::for_locale("en")
    }
}

fn default_row_lengths(locale: &str, total: usize) -> Vec<usize> {
    match locale {
        "en" if total == 26 => vec![10, 9, 7],
        "uk" if total == 34 => vec![12, 12, 10],
        _ => {
            let per_row = total.div_ceil(3).max(1);
            vec![per_row; 3]
        }
    }
}

/// Parses `base=alts;base=alts`. Malformed entries are skipped.
fn parse_alternates(encoded: &str) -> BTreeMap<char, Vec<char>> {
    let mut map = BTreeMap::new();
    for entry in encoded.split(';') {
        let Some((base, alts)) = entry.split_once('=') else {
            continue;
        };
        let mut base_chars = base.trim().chars();
        if let (Some(b), None) = (base_chars.next(), base_chars.next()) {
            let alts: Vec<char> = alts.trim().chars().collect();
            if !alts.is_empty() {
                map.insert(b, alts);
            }
        }
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_english_rows() {
        let set = GlyphSet::for_locale("en");
        let rows = set.rows();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].len(), 10);
        assert_eq!(rows[1].len(), 9);
        // 7 letters + backspace
        assert_eq!(rows[2].len(), 8);
        assert_eq!(rows[2].last(), Some(&Key::Backspace));
        assert_eq!(rows[3], SPECIAL_ROW.to_vec());
        assert_eq!(rows[0][0], Key::Char('q'));
    }

    #[test]
    fn test_ukrainian_rows() {
        let set = GlyphSet::for_locale("uk");
        assert_eq!(set.alphabet.len(), 34);
        let rows = set.rows();
        assert_eq!(rows[0].len(), 12);
        assert_eq!(rows[1].len(), 12);
        assert_eq!(rows[2].len(), 11);
        assert!(rows[2].contains(&Key::Char('ʼ')));
    }

    #[test]
    fn test_alternates_lookup() {
        let set = GlyphSet::for_locale("en");
        assert_eq!(set.alternates_for(Key::Char('e')), Some(&['è', 'é', 'ê', 'ë'][..]));
        assert_eq!(set.alternates_for(Key::Char('q')), None);
        assert_eq!(set.alternates_for(Key::Backspace), None);
        assert_eq!(set.alternates_for(Key::Space), None);
    }

    #[test]
    fn test_parse_alternates_skips_malformed() {
        let map = parse_alternates("a=àá;bad;cc=x;d=");
        assert_eq!(map.len(), 1);
        assert_eq!(map[&'a'], vec!['à', 'á']);
    }

    #[test]
    fn test_custom_glyph_set_from_toml() {
        let toml_str = r#"
locale = "de"
alphabet = "qwertzuiopasdfghjklyxcvbnm"
row_lengths = [10, 9, 7]

[alternates]
a = "ä"
s = "ß"
"#;
        let set = GlyphSet::from_toml(toml_str).unwrap();
        assert_eq!(set.locale, "de");
        assert_eq!(set.rows()[0][5], Key::Char('z'));
        assert_eq!(set.alternates_for(Key::Char('s')), Some(&['ß'][..]));
    }

    #[test]
    fn test_custom_glyph_set_rejects_multichar_base() {
        let toml_str = r#"
locale = "x"
alphabet = "ab"

[alternates]
ab = "c"
"#;
        assert!(GlyphSet::from_toml(toml_str).is_err());
    }

    #[test]
    fn test_key_from_char() {
        assert_eq!(Key::from_char('a'), Key::Char('a'));
        assert_eq!(Key::from_char(' '), Key::Space);
        assert_eq!(Key::from_char(','), Key::Punctuation(','));
        assert_eq!(Key::from_char('ʼ'), Key::Char('ʼ'));
        assert_eq!(Key::Backspace.glyph(), None);
        assert_eq!(Key::Space.glyph(), Some(' '));
    }
}
