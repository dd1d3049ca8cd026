use anyhow::{Result, bail};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Cooperative cancellation flag shared between the signal handler and the scan.
///
/// Polled at the top of every enumeration and comparison loop; never
/// delivered by interrupting a thread.
#[derive(Debug, Clone, Default)]
pub struct Cancel {
    flag: Arc<AtomicBool>,
}

impl Cancel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the flag and reports whether it was already set.
    pub fn cancel(&self) -> bool {
        self.flag.swap(true, Ordering::Relaxed)
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

pub fn validate_root(path: &Path) -> Result<()> {
    if !path.exists() {
        bail!("Path does not exist: {}", path.display());
    }
    if !path.is_dir() && !path.is_file() {
        bail!("Path is neither a file nor a directory: {}", path.display());
    }
    Ok(())
}

/// Decodes backslash escapes in an output template (`\n`, `\t`, octal, `\xHH`, ...).
pub fn convert_special_chars(input: &str) -> Result<String> {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let Some(esc) = chars.next() else {
            bail!("Unterminated escape sequence in '{}'", input);
        };
        match esc {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'v' => out.push('\x0b'),
            'b' => out.push('\x08'),
            'r' => out.push('\r'),
            'f' => out.push('\x0c'),
            'a' => out.push('\x07'),
            '\\' | '?' | '\'' | '"' => out.push(esc),
            '0'..='7' => {
                let mut value = esc.to_digit(8).unwrap_or(0);
                for _ in 0..2 {
                    match chars.peek().and_then(|d| d.to_digit(8)) {
                        Some(d) => {
                            value = value * 8 + d;
                            chars.next();
                        }
                        None => break,
                    }
                }
                out.push(ascii_escape(value, input)?);
            }
            'x' => {
                let mut value = 0u32;
                let mut digits = 0;
                while digits < 2 {
                    match chars.peek().and_then(|d| d.to_digit(16)) {
                        Some(d) => {
                            value = value * 16 + d;
                            chars.next();
                            digits += 1;
                        }
                        None => break,
                    }
                }
                if digits == 0 {
                    bail!("Unrecognized escape sequence '\\x' in '{}'", input);
                }
                out.push(ascii_escape(value, input)?);
            }
            other => bail!("Unrecognized escape sequence '\\{}' in '{}'", other, input),
        }
    }
    Ok(out)
}

/// Numeric escapes produce one character each, so only ASCII values are accepted.
fn ascii_escape(value: u32, input: &str) -> Result<char> {
    match u8::try_from(value) {
        Ok(byte) if byte.is_ascii() => Ok(char::from(byte)),
        _ => bail!("Escape value {:#x} is not ASCII in '{}'", value, input),
    }
}
