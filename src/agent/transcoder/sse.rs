//! A Server-Sent Events (SSE) frame builder.
//!
//! Always writes a space after the field name (`data: x`), which some clients
//! require even though the SSE grammar makes it optional.

use std::fmt;

/// One outgoing SSE frame. The canonical protocol carries no `event:` labels,
/// so only the `data` field is written.
///
/// ```text
/// Event::default().data("Hello, world!").to_string() == "data: Hello, world!\n\n"
/// ```
#[derive(Debug, Default, Clone)]
pub struct Event {
    data: Option<String>,
}

impl Event {
    /// Sets the `data` field.
    /// Newlines in the data are split into multiple `data:` lines.
    pub fn data<T: Into<String>>(mut self, data: T) -> Self {
        self.data = Some(data.into());
        self
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(data) = &self.data {
            if data.is_empty() {
                // An empty payload still sends its `data:` line
                writeln!(f, "data: ")?;
            } else {
                for line in data.lines() {
                    writeln!(f, "data: {}", line)?;
                }
            }
        }

        // Blank line terminates the event
        f.write_str("\n")
    }
}

/// Returns the payload of a `data:` line, with the optional leading space removed.
pub fn data_field(line: &str) -> Option<&str> {
    field(line, "data")
}

/// Returns the label of an `event:` line.
pub fn event_field(line: &str) -> Option<&str> {
    field(line, "event")
}

fn field<'a>(line: &'a str, name: &str) -> Option<&'a str> {
    let rest = line.strip_prefix(name)?.strip_prefix(':')?;
    Some(rest.strip_prefix(' ').unwrap_or(rest))
}
