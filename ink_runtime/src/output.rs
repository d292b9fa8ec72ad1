//! Output buffering and whitespace cleanup.

/// Fragments written by the story, waiting to be flushed.
///
/// String and tag captures remember the buffer length when they begin and
/// later drain everything written since.
#[derive(Debug, Clone, Default)]
pub struct OutputBuffer {
    fragments: Vec<String>,
}

impl OutputBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, fragment: impl Into<String>) {
        self.fragments.push(fragment.into());
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// Remove trailing newlines so the next fragment joins the current line.
    pub fn glue(&mut self) {
        while self.fragments.last().is_some_and(|last| last == "\n") {
            self.fragments.pop();
        }
    }

    /// Drain everything written since `marker`, joined in write order.
    pub fn capture_since(&mut self, marker: usize) -> String {
        let start = marker.min(self.fragments.len());
        self.fragments.drain(start..).collect()
    }

    /// Drain the whole buffer.
    pub fn take(&mut self) -> String {
        self.capture_since(0)
    }
}

/// Normalize whitespace in flushed text.
///
/// Blank lines collapse into one newline, runs of spaces and tabs collapse
/// into one space, and whitespace at the start of a line is dropped.
pub fn clean_output(text: &str) -> String {
    let mut cleaned = String::with_capacity(text.len());
    let mut line_start = true;
    let mut pending_space = false;

    for ch in text.chars() {
        match ch {
            '\n' => {
                if cleaned.ends_with('\n') {
                    pending_space = false;
                    continue;
                }
                if pending_space {
                    cleaned.push(' ');
                }
                cleaned.push('\n');
                line_start = true;
                pending_space = false;
            }
            ' ' | '\t' => {
                if !line_start {
                    pending_space = true;
                }
            }
            _ => {
                if pending_space {
                    cleaned.push(' ');
                }
                cleaned.push(ch);
                line_start = false;
                pending_space = false;
            }
        }
    }
    if pending_space {
        cleaned.push(' ');
    }
    cleaned
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_output() {
        assert_eq!(clean_output("Hello \n"), "Hello \n");
        assert_eq!(clean_output("a\n\nb"), "a\nb");
        assert_eq!(clean_output("a\n  \n\tb"), "a\nb");
        assert_eq!(clean_output("one   two\t\tthree "), "one two three ");
        assert_eq!(clean_output("   indented"), "indented");
        assert_eq!(clean_output(""), "");
    }

    #[test]
    fn test_glue_strips_trailing_newlines() {
        let mut buffer = OutputBuffer::new();
        buffer.push("Hello");
        buffer.push("\n");
        buffer.push("\n");
        buffer.glue();
        buffer.push(" world");
        assert_eq!(buffer.take(), "Hello world");
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_capture_keeps_write_order() {
        let mut buffer = OutputBuffer::new();
        buffer.push("before ");
        let marker = buffer.len();
        buffer.push("x");
        buffer.push("y");
        buffer.push("z");
        assert_eq!(buffer.capture_since(marker), "xyz");
        assert_eq!(buffer.take(), "before ");

        let marker = buffer.len();
        assert_eq!(buffer.capture_since(marker), "");
    }
}
