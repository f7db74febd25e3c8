/// Commands accepted on standard input, one per line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppCommand {
    /// Begin a new recording session.
    Start,
    /// Stop recording and submit the session for transcription.
    Stop,
    /// Print the current pipeline state.
    Status,
    /// Tear down the pipeline and exit.
    Quit,
}

impl AppCommand {
    /// Parse one input line. `None` for blank lines and unknown words.
    pub fn parse(line: &str) -> Option<Self> {
        match line.trim().to_ascii_lowercase().as_str() {
            "start" | "r" => Some(Self::Start),
            "stop" | "s" => Some(Self::Stop),
            "status" => Some(Self::Status),
            "quit" | "q" | "exit" => Some(Self::Quit),
            _ => None,
        }
    }
}
