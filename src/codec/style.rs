//! Style and theme serialization.
//!
//! Pen styles become an inline declaration list (`color: #000; width: 2`);
//! themes become a stylesheet with one rule per selector. Keys are sorted so
//! the output is stable.

use std::collections::BTreeMap;

/// Inline style declarations, property to value
pub type PenStyle = BTreeMap<String, String>;

/// Stylesheet, selector to declarations
pub type Theme = BTreeMap<String, PenStyle>;

/// Serialize declarations as an inline style string
pub fn to_inline_css(style: &PenStyle) -> String {
    style
        .iter()
        .map(|(property, value)| format!("{property}: {value}"))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Serialize a theme as a stylesheet
pub fn to_stylesheet(theme: &Theme) -> String {
    theme
        .iter()
        .map(|(selector, style)| format!("{selector} {{{}}}", to_inline_css(style)))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pen(pairs: &[(&str, &str)]) -> PenStyle {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_inline_css() {
        let style = pen(&[("color", "#1580CD"), ("-myscript-pen-width", "2")]);
        assert_eq!(to_inline_css(&style), "-myscript-pen-width: 2; color: #1580CD");
        assert_eq!(to_inline_css(&PenStyle::new()), "");
    }

    #[test]
    fn test_stylesheet() {
        let mut theme = Theme::new();
        theme.insert("ink".to_string(), pen(&[("color", "#000000")]));
        theme.insert(".math".to_string(), pen(&[("font-family", "STIXGeneral")]));
        assert_eq!(
            to_stylesheet(&theme),
            ".math {font-family: STIXGeneral}\nink {color: #000000}"
        );
    }
}
