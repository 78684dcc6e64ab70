#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,    // /help
    Info,    // /info
    NewChat, // /new or /clear
    Menu,    // /menu
    Image,   // /image
    Mic,     // /mic
    Quit,    // /quit or /exit
    Unknown(String),
}

pub fn parse_command(input: &str) -> Command {
    let trimmed = input.trim();
    if !trimmed.starts_with('/') {
        return Command::Unknown(trimmed.to_string());
    }
    let verb = trimmed
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();

    match verb.as_str() {
        "/help" | "/?" => Command::Help,
        "/info" => Command::Info,
        "/new" | "/clear" => Command::NewChat,
        "/menu" => Command::Menu,
        "/image" => Command::Image,
        "/mic" => Command::Mic,
        "/quit" | "/exit" => Command::Quit,
        _ => Command::Unknown(trimmed.to_string()),
    }
}

pub const HELP_LINES: &[(&str, &str)] = &[
    ("/help", "show this list"),
    ("/info", "about Parlor (F1)"),
    ("/new", "start a new chat (Ctrl-N)"),
    ("/menu", "open the menu (Ctrl-O)"),
    ("/image", "attach an image"),
    ("/mic", "voice input"),
    ("/quit", "exit (Ctrl-C)"),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_command() {
        let cases = [
            ("/help", Command::Help),
            ("/?", Command::Help),
            ("/info", Command::Info),
            ("/new", Command::NewChat),
            ("/clear", Command::NewChat),
            ("/menu", Command::Menu),
            ("/image", Command::Image),
            ("/mic", Command::Mic),
            ("/quit", Command::Quit),
            ("/exit", Command::Quit),
        ];
        for (input, expected) in cases {
            assert_eq!(parse_command(input), expected, "{input}");
        }
    }

    #[test]
    fn verbs_ignore_case_and_trailing_words() {
        assert_eq!(parse_command("  /NEW please "), Command::NewChat);
        assert_eq!(parse_command("/Quit now"), Command::Quit);
    }

    #[test]
    fn unknown_and_plain_text() {
        assert_eq!(parse_command("/claim x"), Command::Unknown("/claim x".into()));
        assert_eq!(parse_command("hello"), Command::Unknown("hello".into()));
    }

    #[test]
    fn help_covers_every_verb() {
        let verbs: Vec<&str> = HELP_LINES.iter().map(|(v, _)| *v).collect();
        for verb in verbs {
            assert!(!matches!(parse_command(verb), Command::Unknown(_)), "{verb}");
        }
    }
}
