//! Store password encodings
//!
//! - `OBF:<digits>`: reversible obfuscation, base-36 pair encoding
//!   compatible with Jetty's `Password` tool
//! - `ENV:<NAME>`: read from the named environment variable at startup
//! - anything else is the literal password

use crate::error::{Error, Result};

pub const OBFUSCATED_PREFIX: &str = "OBF:";
pub const ENV_PREFIX: &str = "ENV:";

/// Resolve a configured password to its plaintext value.
pub fn resolve_password(raw: &str) -> Result<String> {
    if let Some(encoded) = raw.strip_prefix(OBFUSCATED_PREFIX) {
        deobfuscate(encoded)
    } else if let Some(var) = raw.strip_prefix(ENV_PREFIX) {
        std::env::var(var.trim()).map_err(|e| {
            Error::Config(format!("password variable '{}' unavailable: {}", var.trim(), e))
        })
    } else {
        Ok(raw.to_string())
    }
}

/// Decode an obfuscated password. The `OBF:` prefix is optional.
pub fn deobfuscate(encoded: &str) -> Result<String> {
    let s = encoded.strip_prefix(OBFUSCATED_PREFIX).unwrap_or(encoded);
    let invalid = || Error::Config("malformed obfuscated password".to_string());

    let mut bytes = Vec::with_capacity(s.len() / 4);
    let mut i = 0;
    while i < s.len() {
        let wide = s.as_bytes()[i] == b'U';
        if wide {
            i += 1;
        }
        let chunk = s.get(i..i + 4).ok_or_else(invalid)?;
        let value = u32::from_str_radix(chunk, 36).map_err(|_| invalid())?;
        let byte = if wide {
            value >> 8
        } else {
            let sum = (value / 256 + value % 256) as i64 - 254;
            if sum < 0 {
                return Err(invalid());
            }
            (sum / 2) as u32
        };
        bytes.push(u8::try_from(byte).map_err(|_| invalid())?);
        i += 4;
    }

    String::from_utf8(bytes).map_err(|_| invalid())
}

/// Produce the `OBF:` form of a password.
pub fn obfuscate(plain: &str) -> String {
    let b = plain.as_bytes();
    let mut out = String::from(OBFUSCATED_PREFIX);

    for i in 0..b.len() {
        let b1 = b[i] as u32;
        let b2 = b[b.len() - (i + 1)] as u32;
        if b1 >= 128 || b2 >= 128 {
            let x = to_base36(b1 * 256 + b2);
            out.push('U');
            out.push_str(&"0".repeat(4 - x.len()));
            out.push_str(&x);
        } else {
            let i1 = 127 + b1 + b2;
            let i2 = 127 + b1 - b2;
            let x = to_base36(i1 * 256 + i2);
            out.push_str(&"0".repeat(4 - x.len()));
            out.push_str(&x);
        }
    }
    out
}

fn to_base36(mut n: u32) -> String {
    const DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut buf = Vec::new();
    loop {
        buf.push(DIGITS[(n % 36) as usize]);
        n /= 36;
        if n == 0 {
            break;
        }
    }
    buf.reverse();
    String::from_utf8(buf).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PASSWORD_OBF: &str = "OBF:1v2j1uum1xtv1zej1zer1xtn1uvk1v1v";

    #[test]
    fn test_deobfuscate_known_value() {
        assert_eq!(deobfuscate(PASSWORD_OBF).unwrap(), "password");
        assert_eq!(resolve_password(PASSWORD_OBF).unwrap(), "password");
    }

    #[test]
    fn test_obfuscate_matches_known_value() {
        assert_eq!(obfuscate("password"), PASSWORD_OBF);
    }

    #[test]
    fn test_non_ascii_round_trip() {
        let encoded = obfuscate("pässwörd");
        assert!(encoded.contains('U'));
        assert_eq!(deobfuscate(&encoded).unwrap(), "pässwörd");
    }

    #[test]
    fn test_non_ascii_encodes_both_bytes() {
        assert_eq!(obfuscate("é"), "OBF:U12ndU0xj7");
        assert_eq!(deobfuscate("OBF:U12ndU0xj7").unwrap(), "é");
    }

    #[test]
    fn test_env_indirection() {
        std::env::set_var("SEARCHDATA_TEST_STORE_PASSWORD", "from-env");
        assert_eq!(
            resolve_password("ENV:SEARCHDATA_TEST_STORE_PASSWORD").unwrap(),
            "from-env"
        );
        assert!(resolve_password("ENV:SEARCHDATA_TEST_UNSET_VARIABLE").is_err());
    }

    #[test]
    fn test_literal_fallthrough() {
        assert_eq!(resolve_password("changeit").unwrap(), "changeit");
        assert_eq!(resolve_password("obf:lowercase").unwrap(), "obf:lowercase");
    }

    #[test]
    fn test_malformed_obfuscation() {
        assert!(deobfuscate("OBF:1v2").is_err());
        assert!(deobfuscate("OBF:!!!!").is_err());
    }
}
