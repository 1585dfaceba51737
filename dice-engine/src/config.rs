/// Feature switches handed in by the hosting shell. The engine receives the
/// configuration by value at request entry and never observes it changing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    /// Enables advantage/disadvantage suffixes, `stats`, `death save` and
    /// the NAT1/NAT20 roll comments.
    pub enable_dnd5e: bool,
    /// Renders numbers as inline LaTeX instead of plain Markdown.
    pub enable_latex: bool,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            enable_dnd5e: true,
            enable_latex: true,
        }
    }
}
