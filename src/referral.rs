use crossterm::{
    clipboard::CopyToClipboard,
    execute,
};
use rand::Rng;
use std::io::{
    self,
    stdout,
};
use thiserror::Error;

pub const REFERRAL_CODE_LEN: usize = 8;
pub const DEFAULT_REFERRAL_BASE_URL: &str = "https://t.me/yourbot";

const BASE36: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Best-effort invite code; not unique and not meant to be unguessable.
pub fn generate_referral_code<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..REFERRAL_CODE_LEN)
        .map(|_| BASE36[rng.random_range(0..BASE36.len())] as char)
        .collect()
}

pub fn referral_link(base_url: &str, code: &str) -> String {
    let separator = if base_url.contains('?') { '&' } else { '?' };
    format!("{base_url}{separator}start={code}")
}

pub fn generate_referral_link<R: Rng + ?Sized>(base_url: &str, rng: &mut R) -> String {
    referral_link(base_url, &generate_referral_code(rng))
}

#[derive(Debug, Error)]
#[error("clipboard write failed: {0}")]
pub struct ClipboardError(#[from] io::Error);

pub trait Clipboard {
    fn write_text(&mut self, text: &str) -> Result<(), ClipboardError>;
}

/// Writes to the system clipboard through the terminal (OSC 52).
#[derive(Clone, Copy, Debug, Default)]
pub struct TerminalClipboard;

impl Clipboard for TerminalClipboard {
    fn write_text(&mut self, text: &str) -> Result<(), ClipboardError> {
        execute!(stdout(), CopyToClipboard::to_clipboard_from(text))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]

    use super::*;
    use rand::{
        SeedableRng,
        rngs::StdRng,
    };

    #[test]
    fn generate_referral_code__is_eight_base36_chars() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..100 {
            let code = generate_referral_code(&mut rng);
            assert_eq!(code.len(), REFERRAL_CODE_LEN);
            assert!(code.bytes().all(|b| BASE36.contains(&b)));
        }
    }

    #[test]
    fn generate_referral_link__uses_start_parameter() {
        let mut rng = StdRng::seed_from_u64(7);
        let link = generate_referral_link(DEFAULT_REFERRAL_BASE_URL, &mut rng);

        let code = link
            .strip_prefix("https://t.me/yourbot?start=")
            .expect("link keeps the base url");
        assert_eq!(code.len(), REFERRAL_CODE_LEN);
    }

    #[test]
    fn referral_link__base_with_query__appends_parameter() {
        assert_eq!(
            referral_link("https://example.com/join?src=tg", "abc12345"),
            "https://example.com/join?src=tg&start=abc12345"
        );
    }
}
