//! Call-site capture and short-form rendering

use std::fmt;
use std::panic::Location;

/// A source location a record is attributed to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub file: &'static str,
    pub line: u32,
}

impl Caller {
    pub fn new(file: &'static str, line: u32) -> Self {
        Self { file, line }
    }

    /// The location of the nearest caller not annotated with `#[track_caller]`
    #[track_caller]
    pub fn here() -> Self {
        Location::caller().into()
    }

    /// `dir/file.rs:line`, keeping only the last directory of the path
    pub fn short(&self) -> String {
        format!("{}:{}", trim_path(self.file), self.line)
    }
}

impl From<&'static Location<'static>> for Caller {
    fn from(location: &'static Location<'static>) -> Self {
        Self {
            file: location.file(),
            line: location.line(),
        }
    }
}

impl fmt::Display for Caller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", trim_path(self.file), self.line)
    }
}

fn trim_path(file: &str) -> &str {
    let mut separators = file.rmatch_indices(['/', '\\']).map(|(idx, _)| idx);
    match (separators.next(), separators.next()) {
        (Some(_), Some(parent)) => &file[parent + 1..],
        _ => file,
    }
}

/// The chain of known frames behind a log call, outermost first
///
/// A direct [`Logger`](crate::Logger) call knows one frame, the logical caller.
/// Calls through the global facade add the facade's forwarding site as an
/// inner frame, so a skip of 0 blames the facade and a skip of 1 blames the
/// application code that called it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallSite {
    frames: [Caller; 2],
    depth: usize,
}

impl CallSite {
    pub fn new(caller: Caller) -> Self {
        Self {
            frames: [caller, caller],
            depth: 1,
        }
    }

    /// Capture the logical caller of a `#[track_caller]` chain
    #[track_caller]
    pub fn here() -> Self {
        Self::new(Caller::here())
    }

    /// Record an inner frame the call passed through
    pub fn through(mut self, frame: Caller) -> Self {
        if self.depth < self.frames.len() {
            self.frames[self.depth] = frame;
            self.depth += 1;
        } else {
            self.frames[self.frames.len() - 1] = frame;
        }
        self
    }

    /// Skip `skip` frames from the innermost one, stopping at the outermost
    pub fn resolve(&self, skip: usize) -> Caller {
        let innermost = self.depth - 1;
        self.frames[innermost - skip.min(innermost)]
    }

    pub fn depth(&self) -> usize {
        self.depth
    }
}
