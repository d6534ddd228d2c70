//! Dictionary tokens for the `user extras` stages.
//!
//! The on-disk format is the AFL dictionary format: one `name="value"` entry
//! per line (the name is optional), `#` comments, and `\\`, `\"`, `\xNN`
//! escapes inside the quotes.

use std::{fs, path::Path};

use anyhow::{Context, bail};
use derive_new::new as New;
use itertools::Itertools;

#[derive(Debug, Clone, Default, New)]
pub struct Dictionary {
    tokens: Vec<Vec<u8>>,
}

impl Dictionary {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn tokens(&self) -> &[Vec<u8>] {
        &self.tokens
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Reading dictionary {}", path.display()))?;
        let tokens = text
            .lines()
            .enumerate()
            .filter(|(_, line)| {
                let line = line.trim();
                !line.is_empty() && !line.starts_with('#')
            })
            .map(|(index, line)| {
                parse_entry(line.trim())
                    .with_context(|| format!("{}:{}: bad dictionary entry", path.display(), index + 1))
            })
            .try_collect()?;
        Ok(Self { tokens })
    }
}

/// Parses one `name="value"` (or bare `"value"`) entry into its raw bytes.
fn parse_entry(line: &str) -> anyhow::Result<Vec<u8>> {
    let open = line.find('"').context("Missing opening quote")?;
    let close = line.rfind('"').filter(|&i| i > open).context("Missing closing quote")?;
    unescape(&line[open + 1..close])
}

fn unescape(quoted: &str) -> anyhow::Result<Vec<u8>> {
    let mut out = Vec::with_capacity(quoted.len());
    let mut bytes = quoted.bytes();
    while let Some(b) = bytes.next() {
        if b != b'\\' {
            out.push(b);
            continue;
        }
        match bytes.next() {
            Some(b'\\') => out.push(b'\\'),
            Some(b'"') => out.push(b'"'),
            Some(b'x') => {
                let hi = bytes.next().context("Truncated \\x escape")?;
                let lo = bytes.next().context("Truncated \\x escape")?;
                let value = u8::from_str_radix(
                    std::str::from_utf8(&[hi, lo]).context("Non-ASCII \\x escape")?,
                    16,
                )
                .context("Bad \\x escape")?;
                out.push(value);
            }
            other => bail!("Unsupported escape \\{:?}", other.map(char::from)),
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parses_named_and_bare_entries() {
        assert_eq!(parse_entry(r#"kw_if="if""#).unwrap(), b"if");
        assert_eq!(parse_entry(r#""GET ""#).unwrap(), b"GET ");
    }

    #[test]
    fn unescapes_hex_and_literals() {
        assert_eq!(parse_entry(r#"magic="\x7fELF""#).unwrap(), b"\x7fELF");
        assert_eq!(parse_entry(r#"q="a\"b\\c""#).unwrap(), br#"a"b\c"#);
    }

    #[test]
    fn rejects_unterminated_entry() {
        assert!(parse_entry(r#"broken="oops"#).is_err());
    }

    #[test]
    fn file_parsing_skips_comments_and_blanks() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# http verbs").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "get=\"GET\"").unwrap();
        writeln!(file, "post=\"POST\"").unwrap();
        let dictionary = Dictionary::from_file(file.path()).unwrap();
        assert_eq!(dictionary.tokens(), &[b"GET".to_vec(), b"POST".to_vec()]);
    }
}
