//! Clipboard copy through the OSC 52 terminal escape.
//!
//! Works over SSH and inside tmux (with `set-clipboard on`) without a
//! platform clipboard library.

use std::io::{self, Write};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::Result;

/// Escape sequence asking the terminal to put `text` on the clipboard.
pub fn osc52_sequence(text: &str) -> String {
    let encoded = STANDARD.encode(text.as_bytes());
    format!("\x1b]52;c;{encoded}\x1b\\")
}

pub fn copy_to_clipboard(text: &str) -> Result<()> {
    write_osc52(&mut io::stdout(), text)
}

fn write_osc52(out: &mut impl Write, text: &str) -> Result<()> {
    out.write_all(osc52_sequence(text).as_bytes())?;
    out.flush()?;
    Ok(())
}
