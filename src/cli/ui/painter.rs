use owo_colors::{OwoColorize, Style as OwoStyle};

/// Applies colour and style to terminal text.
#[derive(Debug)]
pub(crate) struct Painter {
    use_colour: bool,
}

impl Painter {
    /// Creates a painter with explicit colour control.
    pub(crate) fn new(use_colour: bool) -> Self {
        Self { use_colour }
    }

    pub(crate) fn heading<T: AsRef<str>>(&self, text: T) -> String {
        self.paint(text.as_ref(), OwoStyle::new().bold().cyan())
    }

    pub(crate) fn success<T: AsRef<str>>(&self, text: T) -> String {
        self.paint(text.as_ref(), OwoStyle::new().bold().green())
    }

    pub(crate) fn warning<T: AsRef<str>>(&self, text: T) -> String {
        self.paint(text.as_ref(), OwoStyle::new().bold().yellow())
    }

    pub(crate) fn muted<T: AsRef<str>>(&self, text: T) -> String {
        self.paint(text.as_ref(), OwoStyle::new().dimmed())
    }

    pub(crate) fn value<T: AsRef<str>>(&self, text: T) -> String {
        self.paint(text.as_ref(), OwoStyle::new().bold())
    }

    /// Renders an optional value, falling back to a muted placeholder.
    pub(crate) fn value_or<T: AsRef<str>>(&self, text: Option<T>, placeholder: &str) -> String {
        match text {
            Some(text) => self.value(text),
            None => self.muted(placeholder),
        }
    }

    /// Renders a capability flag as a green tick or a muted dash.
    pub(crate) fn flag(&self, set: bool) -> String {
        if set {
            self.success("yes")
        } else {
            self.muted("-")
        }
    }

    fn paint(&self, text: &str, style: OwoStyle) -> String {
        if self.use_colour {
            format!("{}", text.style(style))
        } else {
            text.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::present(Some("Sensor"), "Sensor")]
    #[case::absent(None, "<unknown>")]
    fn value_or_falls_back_to_placeholder(#[case] text: Option<&str>, #[case] expected: &str) {
        let painter = Painter::new(false);
        assert_eq!(expected, painter.value_or(text, "<unknown>"));
    }

    #[rstest]
    #[case(true, "yes")]
    #[case(false, "-")]
    fn plain_flag_is_unstyled(#[case] set: bool, #[case] expected: &str) {
        assert_eq!(expected, Painter::new(false).flag(set));
    }

    #[test]
    fn coloured_output_wraps_text_in_escapes() {
        let painter = Painter::new(true);
        let styled = painter.heading("GATT services:");

        assert_ne!("GATT services:", styled);
        assert!(styled.contains("GATT services:"));
    }
}
