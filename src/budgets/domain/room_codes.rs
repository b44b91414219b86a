use rand::{thread_rng, Rng};

pub const ROOM_CODE_LENGTH: usize = 6;

const ROOM_CODE_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// A short code that grants access to join a budget.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct RoomCode(String);

impl RoomCode {
    /// Generate a random code of lowercase letters and digits.
    pub fn generate() -> Self {
        let mut rng = thread_rng();
        let code = (0..ROOM_CODE_LENGTH)
            .map(|_| char::from(ROOM_CODE_ALPHABET[rng.gen_range(0..ROOM_CODE_ALPHABET.len())]))
            .collect();

        Self(code)
    }

    /// Parse a code typed in by a user.
    ///
    /// Case and surrounding whitespace are ignored. Returns [`None`] if the
    /// input cannot be a room code.
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_lowercase();

        let well_formed = normalized.len() == ROOM_CODE_LENGTH
            && normalized
                .bytes()
                .all(|b| ROOM_CODE_ALPHABET.contains(&b));

        if well_formed {
            Some(Self(normalized))
        } else {
            None
        }
    }

    /// Wrap a code read back from the database.
    pub fn from_stored(code: String) -> Self {
        Self(code)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn generated_codes_are_well_formed() {
        for _ in 0..100 {
            let code = RoomCode::generate();

            assert_eq!(
                Some(code.clone()),
                RoomCode::parse(code.as_str()),
                "Generated code {:?} should parse",
                code
            );
        }
    }

    #[test]
    fn parse_normalizes_case_and_whitespace() {
        let code = RoomCode::parse("  Ab3XyZ\n").expect("code should parse");

        assert_eq!("ab3xyz", code.as_str());
    }

    #[test]
    fn parse_rejects_wrong_length() {
        assert_eq!(None, RoomCode::parse("abc"));
        assert_eq!(None, RoomCode::parse("abcdefg"));
        assert_eq!(None, RoomCode::parse(""));
    }

    #[test]
    fn parse_rejects_symbols() {
        assert_eq!(None, RoomCode::parse("ab-xyz"));
        assert_eq!(None, RoomCode::parse("ab xyz"));
    }
}
