use std::fmt;

use logos::Logos;

use crate::error::TokenError;

/// Raw token families as recognized by the lexer. Payloads are sliced out of
/// the source text afterwards, in [`Token::lex`].
#[derive(Logos, Debug, Clone, Copy, PartialEq)]
enum Lexeme {
    #[token("[PAD]")]
    Pad,
    #[token("[BOS]")]
    Bos,
    #[token("[EOS]")]
    Eos,
    #[token("[MASK]")]
    Mask,
    #[token("[UNK]")]
    Unk,
    #[token("[SEP]")]
    Sep,

    #[token("BAR")]
    Bar,
    #[token("PHRASE_START")]
    PhraseStart,
    #[token("PHRASE_END")]
    PhraseEnd,
    #[token("SECTION_A")]
    SectionA,
    #[token("SECTION_B")]
    SectionB,
    #[token("VERSE")]
    Verse,
    #[token("CHORUS")]
    Chorus,
    #[token("BRIDGE")]
    Bridge,

    #[regex(r"NOTE_[^ \t\r\n]+")]
    Note,
    #[regex(r"REST_[^ \t\r\n]+")]
    Rest,
    #[regex(r"PATTERN_[^ \t\r\n]+")]
    Pattern,

    #[regex(r"(TEMPO|KEY|TIME|STYLE)_[A-Z0-9_]+")]
    #[token("ACCENT")]
    #[token("TENUTO")]
    #[token("SLUR_START")]
    #[token("SLUR_END")]
    Control,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Special {
    Pad,
    Bos,
    Eos,
    Mask,
    Unk,
    Sep,
}

impl Special {
    /// Vocabulary order.
    pub const ALL: [Special; 6] = [
        Special::Pad,
        Special::Bos,
        Special::Eos,
        Special::Mask,
        Special::Unk,
        Special::Sep,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Special::Pad => "[PAD]",
            Special::Bos => "[BOS]",
            Special::Eos => "[EOS]",
            Special::Mask => "[MASK]",
            Special::Unk => "[UNK]",
            Special::Sep => "[SEP]",
        }
    }
}

/// Song-structure markers other than `BAR`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Structural {
    PhraseStart,
    PhraseEnd,
    SectionA,
    SectionB,
    Verse,
    Chorus,
    Bridge,
}

impl Structural {
    pub const ALL: [Structural; 7] = [
        Structural::PhraseStart,
        Structural::PhraseEnd,
        Structural::SectionA,
        Structural::SectionB,
        Structural::Verse,
        Structural::Chorus,
        Structural::Bridge,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Structural::PhraseStart => "PHRASE_START",
            Structural::PhraseEnd => "PHRASE_END",
            Structural::SectionA => "SECTION_A",
            Structural::SectionB => "SECTION_B",
            Structural::Verse => "VERSE",
            Structural::Chorus => "CHORUS",
            Structural::Bridge => "BRIDGE",
        }
    }
}

/// The three labels carried by a compound note token.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NoteFields {
    pub pitch: String,
    pub duration: String,
    pub dynamic: String,
}

impl NoteFields {
    /// Split the part after `NOTE_`.
    ///
    /// The first field is the pitch and the last the dynamic; everything in
    /// between is the duration, so dotted names like `dotted_quarter` survive.
    fn split(payload: &str) -> Option<Self> {
        let fields: Vec<&str> = payload.split('_').collect();
        if fields.len() < 3 || fields.iter().any(|f| f.is_empty()) {
            return None;
        }
        let last = fields.len() - 1;
        Some(NoteFields {
            pitch: fields[0].to_string(),
            duration: fields[1..last].join("_"),
            dynamic: fields[last].to_string(),
        })
    }
}

/// A single vocabulary atom, classified.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Token {
    Special(Special),
    Bar,
    Structural(Structural),
    Note(NoteFields),
    /// Rest with its duration name.
    Rest(String),
    /// Pattern label as written in the token (uppercase).
    Pattern(String),
    Control(String),
    Unparseable(String),
}

impl Token {
    /// Classify one token string.
    ///
    /// The whole string must be a single atom. A `NOTE_` token without
    /// pitch, duration and dynamic fields is reported as
    /// [`TokenError::MalformedNote`].
    pub fn lex(raw: &str) -> Result<Token, TokenError> {
        let unrecognized = || TokenError::Unrecognized {
            token: raw.to_string(),
        };

        let mut lexer = Lexeme::lexer(raw);
        let lexeme = match lexer.next() {
            Some(Ok(lexeme)) if lexer.span() == (0..raw.len()) => lexeme,
            _ if raw.starts_with("NOTE_") => {
                return Err(TokenError::MalformedNote {
                    token: raw.to_string(),
                })
            }
            _ => return Err(unrecognized()),
        };

        let token = match lexeme {
            Lexeme::Pad => Token::Special(Special::Pad),
            Lexeme::Bos => Token::Special(Special::Bos),
            Lexeme::Eos => Token::Special(Special::Eos),
            Lexeme::Mask => Token::Special(Special::Mask),
            Lexeme::Unk => Token::Special(Special::Unk),
            Lexeme::Sep => Token::Special(Special::Sep),
            Lexeme::Bar => Token::Bar,
            Lexeme::PhraseStart => Token::Structural(Structural::PhraseStart),
            Lexeme::PhraseEnd => Token::Structural(Structural::PhraseEnd),
            Lexeme::SectionA => Token::Structural(Structural::SectionA),
            Lexeme::SectionB => Token::Structural(Structural::SectionB),
            Lexeme::Verse => Token::Structural(Structural::Verse),
            Lexeme::Chorus => Token::Structural(Structural::Chorus),
            Lexeme::Bridge => Token::Structural(Structural::Bridge),
            Lexeme::Note => {
                let fields = NoteFields::split(&raw["NOTE_".len()..]).ok_or_else(|| {
                    TokenError::MalformedNote {
                        token: raw.to_string(),
                    }
                })?;
                Token::Note(fields)
            }
            Lexeme::Rest => Token::Rest(raw["REST_".len()..].to_string()),
            Lexeme::Pattern => Token::Pattern(raw["PATTERN_".len()..].to_string()),
            Lexeme::Control => Token::Control(raw.to_string()),
        };
        Ok(token)
    }

    /// Like [`Token::lex`], but folds every error into `Unparseable`.
    pub fn parse(raw: &str) -> Token {
        Token::lex(raw).unwrap_or_else(|_| Token::Unparseable(raw.to_string()))
    }

    pub fn note(
        pitch: impl Into<String>,
        duration: impl Into<String>,
        dynamic: impl Into<String>,
    ) -> Token {
        Token::Note(NoteFields {
            pitch: pitch.into(),
            duration: duration.into(),
            dynamic: dynamic.into(),
        })
    }

    pub fn is_special(&self) -> bool {
        matches!(self, Token::Special(_))
    }

    pub fn is_note(&self) -> bool {
        matches!(self, Token::Note(_))
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Special(special) => write!(f, "{}", special.as_str()),
            Token::Bar => write!(f, "BAR"),
            Token::Structural(marker) => write!(f, "{}", marker.as_str()),
            Token::Note(fields) => write!(
                f,
                "NOTE_{}_{}_{}",
                fields.pitch, fields.duration, fields.dynamic
            ),
            Token::Rest(duration) => write!(f, "REST_{}", duration),
            Token::Pattern(label) => write!(f, "PATTERN_{}", label),
            Token::Control(name) => write!(f, "{}", name),
            Token::Unparseable(raw) => write!(f, "{}", raw),
        }
    }
}

/// Lex whitespace-separated token text, e.g. the contents of a token file.
pub fn lex_stream(source: &str) -> Vec<Token> {
    source.split_whitespace().map(Token::parse).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(input: &str) -> Vec<Token> {
        lex_stream(input)
    }

    #[test]
    fn test_lex_special_and_structural() {
        assert_eq!(
            lex("[BOS] BAR PHRASE_START [EOS]"),
            vec![
                Token::Special(Special::Bos),
                Token::Bar,
                Token::Structural(Structural::PhraseStart),
                Token::Special(Special::Eos),
            ]
        );
    }

    #[test]
    fn test_lex_note() {
        assert_eq!(
            Token::lex("NOTE_C#4_quarter_mf"),
            Ok(Token::note("C#4", "quarter", "mf"))
        );
    }

    #[test]
    fn test_lex_note_with_dotted_duration() {
        assert_eq!(
            Token::lex("NOTE_A3_dotted_quarter_pp"),
            Ok(Token::note("A3", "dotted_quarter", "pp"))
        );
    }

    #[test]
    fn test_lex_malformed_note() {
        for raw in ["NOTE_C4_quarter", "NOTE_C4", "NOTE_", "NOTE_C4__mf", "NOTE_C4_quarter_"] {
            assert_eq!(
                Token::lex(raw),
                Err(TokenError::MalformedNote {
                    token: raw.to_string()
                }),
                "{}",
                raw
            );
        }
    }

    #[test]
    fn test_lex_rest_keeps_underscores() {
        assert_eq!(
            Token::lex("REST_dotted_quarter"),
            Ok(Token::Rest("dotted_quarter".to_string()))
        );
        assert_eq!(Token::lex("REST_half"), Ok(Token::Rest("half".to_string())));
    }

    #[test]
    fn test_lex_pattern_and_control() {
        assert_eq!(
            Token::lex("PATTERN_SCALE_UP"),
            Ok(Token::Pattern("SCALE_UP".to_string()))
        );
        assert_eq!(
            Token::lex("KEY_BB_MAJOR"),
            Ok(Token::Control("KEY_BB_MAJOR".to_string()))
        );
        assert_eq!(
            Token::lex("SLUR_END"),
            Ok(Token::Control("SLUR_END".to_string()))
        );
    }

    #[test]
    fn test_lex_unrecognized() {
        for raw in ["NOT_A_REAL_TOKEN", "BARX", "bar", "", "[BOS]x"] {
            assert!(
                matches!(Token::lex(raw), Err(TokenError::Unrecognized { .. })),
                "{}",
                raw
            );
        }
        assert_eq!(
            Token::parse("BARX"),
            Token::Unparseable("BARX".to_string())
        );
    }

    #[test]
    fn test_display_roundtrip() {
        let source = "[BOS] BAR NOTE_C4_quarter_mf REST_dotted_half PATTERN_ARPEGGIO_MAJOR TIME_3_4 VERSE [EOS]";
        let rendered: Vec<String> = lex(source).iter().map(|t| t.to_string()).collect();
        assert_eq!(rendered.join(" "), source);
    }

    #[test]
    fn test_special_order() {
        let names: Vec<&str> = Special::ALL.iter().map(|s| s.as_str()).collect();
        assert_eq!(names, ["[PAD]", "[BOS]", "[EOS]", "[MASK]", "[UNK]", "[SEP]"]);
    }
}
