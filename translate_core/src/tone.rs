use std::fmt;

const FORMAL_PREFIX: &str = "Please translate this formally: ";
const CASUAL_PREFIX: &str = "Translate casually: ";

/// Register hint prepended to the text before translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Formal,
    Casual,
    Neutral,
}

impl Tone {
    /// Parse a form value. Anything other than `formal` or `casual` is neutral.
    pub fn parse(value: &str) -> Self {
        match value {
            "formal" => Tone::Formal,
            "casual" => Tone::Casual,
            _ => Tone::Neutral,
        }
    }

    pub fn prefix(&self) -> &'static str {
        match self {
            Tone::Formal => FORMAL_PREFIX,
            Tone::Casual => CASUAL_PREFIX,
            Tone::Neutral => "",
        }
    }

    /// Return `text` with this tone's prefix in front.
    pub fn apply(&self, text: &str) -> String {
        format!("{}{}", self.prefix(), text)
    }
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Tone::Formal => "formal",
            Tone::Casual => "casual",
            Tone::Neutral => "neutral",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formal_and_casual_prefix_text() {
        assert_eq!(
            Tone::parse("formal").apply("hello"),
            "Please translate this formally: hello"
        );
        assert_eq!(Tone::parse("casual").apply("hello"), "Translate casually: hello");
    }

    #[test]
    fn unknown_tone_leaves_text_alone() {
        for value in ["", "neutral", "Formal", "angry"] {
            assert_eq!(Tone::parse(value), Tone::Neutral);
            assert_eq!(Tone::parse(value).apply("hello"), "hello");
        }
    }
}
