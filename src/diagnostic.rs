use std::fmt;

/// One validation finding at a 1-based source position.
///
/// Only the JSON path fills `children` (failed `anyOf`/`oneOf` branches).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub line: u32,
    pub column: u32,
    pub message: String,
    pub children: Vec<Diagnostic>,
}

impl Diagnostic {
    pub fn new(line: u32, column: u32, message: impl Into<String>) -> Self {
        Self {
            line,
            column,
            message: message.into(),
            children: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: Vec<Diagnostic>) -> Self {
        self.children = children;
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.line, self.column, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let d = Diagnostic::new(3, 12, "\"thirty\" is not of type \"integer\"");
        assert_eq!(d.to_string(), "3 12 \"thirty\" is not of type \"integer\"");
        assert!(d.children.is_empty());
    }
}
