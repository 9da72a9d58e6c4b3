//! Bounded structured diagnostics for dispatch failures.
//!
//! [`TracebackCapturer`] turns a raw call chain (innermost frame first)
//! into a [`Traceback`]: per frame it normalizes the file path, reads a
//! clipped window of source context around the fault line, and classifies
//! the frame as app code or framework internals.
//!
//! Everything here is best-effort by contract: unreadable source files
//! simply produce no context lines, unresolvable paths pass through
//! unchanged, and unclassifiable frames default to "not app code". None
//! of these paths fail.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// One frame of a raw call chain, as captured at the fault site.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawFrame {
    /// Source file path, unnormalized.
    pub filename: String,
    /// Routine name.
    pub code_name: String,
    /// 1-based fault line within the file.
    pub line_number: u32,
}

impl RawFrame {
    /// Build a raw frame.
    pub fn new(filename: impl Into<String>, code_name: impl Into<String>, line_number: u32) -> Self {
        Self {
            filename: filename.into(),
            code_name: code_name.into(),
            line_number,
        }
    }
}

/// A single source line of frame context.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextLine {
    /// The source text, right-trimmed.
    pub code: String,
    /// Whether this is the fault line itself.
    pub is_caller: bool,
}

/// One formatted frame of a [`Traceback`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackFrame {
    /// Normalized source file path.
    pub filename: String,
    /// Routine name.
    pub code_name: String,
    /// 1-based fault line within the file.
    pub line_number: u32,
    /// Clipped source context around the fault line.
    pub lines: Vec<ContextLine>,
    /// Heuristic: does this frame belong to application logic?
    pub is_app_code: bool,
}

/// The outbound diagnostic payload: frames ordered innermost-out.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Traceback {
    /// Formatted frames, innermost call first.
    pub frames: Vec<StackFrame>,
}

/// Tunables for traceback capture.
#[derive(Clone, Debug)]
pub struct TracebackConfig {
    /// Context lines to read before the fault line.
    pub lines_before: u32,
    /// Context lines to read after the fault line.
    pub lines_after: u32,
    /// Toolchain-install marker segment. A path containing it collapses
    /// to the marker plus everything after it.
    pub toolchain_marker: String,
    /// Sandboxed-execution marker segment. A path containing it collapses
    /// to a root-relative form of everything after it.
    pub sandbox_marker: String,
    /// Path segments that mark a frame as app code. Heuristic only.
    pub app_markers: Vec<String>,
}

impl Default for TracebackConfig {
    fn default() -> Self {
        Self {
            lines_before: 2,
            lines_after: 4,
            toolchain_marker: "/toolchains".to_owned(),
            sandbox_marker: ".runfiles".to_owned(),
            app_markers: vec!["examples".to_owned(), "testing".to_owned()],
        }
    }
}

/// Formats raw call chains into bounded [`Traceback`] diagnostics.
#[derive(Clone, Debug, Default)]
pub struct TracebackCapturer {
    config: TracebackConfig,
}

impl TracebackCapturer {
    /// Build a capturer with the given tunables.
    pub fn new(config: TracebackConfig) -> Self {
        Self { config }
    }

    /// Capture a traceback from a raw call chain, innermost frame first.
    ///
    /// Frame order is preserved. Context lines are read from the local
    /// filesystem; an unreadable file yields a frame with no context
    /// lines, which is not a failure.
    pub fn capture(&self, frames: &[RawFrame]) -> Traceback {
        Traceback {
            frames: frames.iter().map(|f| self.format_frame(f)).collect(),
        }
    }

    fn format_frame(&self, raw: &RawFrame) -> StackFrame {
        StackFrame {
            filename: self.normalize_path(&raw.filename),
            code_name: raw.code_name.clone(),
            line_number: raw.line_number,
            lines: self.context_lines(&raw.filename, raw.line_number),
            is_app_code: self.is_app_code(&raw.filename),
        }
    }

    /// Read the clipped context window `[max(1, line - before), line + after]`.
    ///
    /// Lines blank after right-trim are omitted. The line whose number
    /// equals `line_number` is flagged as the caller; at most one line per
    /// frame carries the flag.
    fn context_lines(&self, filename: &str, line_number: u32) -> Vec<ContextLine> {
        let source = match std::fs::read_to_string(filename) {
            Ok(text) => text,
            Err(err) => {
                debug!(filename, %err, "source unavailable for traceback context");
                return Vec::new();
            }
        };
        let all: Vec<&str> = source.lines().collect();

        let start = line_number.saturating_sub(self.config.lines_before).max(1);
        let end = line_number.saturating_add(self.config.lines_after);

        let mut lines = Vec::new();
        for i in start..=end {
            let Some(text) = all.get(i as usize - 1) else {
                break;
            };
            let code = text.trim_end();
            if code.is_empty() {
                continue;
            }
            lines.push(ContextLine {
                code: code.to_owned(),
                is_caller: i == line_number,
            });
        }
        lines
    }

    /// Collapse well-known path prefixes to short canonical forms.
    ///
    /// Unrecognized paths pass through unchanged; this never fails.
    pub fn normalize_path(&self, path: &str) -> String {
        if let Some(idx) = path.find(&self.config.toolchain_marker) {
            let suffix = &path[idx + self.config.toolchain_marker.len()..];
            return format!("{}{suffix}", self.config.toolchain_marker);
        }
        if let Some(idx) = path.find(&self.config.sandbox_marker) {
            let suffix = &path[idx + self.config.sandbox_marker.len()..];
            return format!("/{}", suffix.trim_start_matches('/'));
        }
        path.to_owned()
    }

    /// Heuristic app-code classification by path segment.
    ///
    /// Never authoritative: a frame that matches no marker is framework
    /// code as far as reporting is concerned.
    pub fn is_app_code(&self, filename: &str) -> bool {
        self.config
            .app_markers
            .iter()
            .any(|marker| filename.contains(marker.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_source(lines: &[&str]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        for line in lines {
            writeln!(file, "{line}").unwrap();
        }
        file.flush().unwrap();
        file
    }

    fn capturer() -> TracebackCapturer {
        TracebackCapturer::default()
    }

    // --- Context windows ---

    #[test]
    fn context_window_is_clipped_at_file_start() {
        let file = write_source(&["fn a() {", "    b();", "}", "fn b() {}"]);
        let path = file.path().to_str().unwrap().to_owned();

        let tb = capturer().capture(&[RawFrame::new(&path, "a", 1)]);
        let frame = &tb.frames[0];
        // Window [max(1, 1-2), 1+4] = [1, 5]; file has 4 lines.
        assert_eq!(frame.lines.len(), 4);
        assert!(frame.lines[0].is_caller);
        assert_eq!(frame.lines[0].code, "fn a() {");
    }

    #[test]
    fn context_window_respects_before_and_after() {
        let lines: Vec<String> = (1..=20).map(|i| format!("line {i}")).collect();
        let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
        let file = write_source(&refs);
        let path = file.path().to_str().unwrap().to_owned();

        let tb = capturer().capture(&[RawFrame::new(&path, "f", 10)]);
        let frame = &tb.frames[0];
        // Window [8, 14], no blanks.
        assert_eq!(frame.lines.len(), 7);
        assert_eq!(frame.lines[0].code, "line 8");
        assert_eq!(frame.lines[6].code, "line 14");
    }

    #[test]
    fn blank_lines_are_omitted() {
        let file = write_source(&["first", "", "   ", "fault", "last"]);
        let path = file.path().to_str().unwrap().to_owned();

        let tb = capturer().capture(&[RawFrame::new(&path, "f", 4)]);
        let codes: Vec<&str> = tb.frames[0].lines.iter().map(|l| l.code.as_str()).collect();
        assert_eq!(codes, vec!["fault", "last"]);
    }

    #[test]
    fn exactly_one_caller_line_per_frame() {
        let lines: Vec<String> = (1..=10).map(|i| format!("line {i}")).collect();
        let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
        let file = write_source(&refs);
        let path = file.path().to_str().unwrap().to_owned();

        let tb = capturer().capture(&[RawFrame::new(&path, "f", 5)]);
        let callers: Vec<&ContextLine> = tb.frames[0]
            .lines
            .iter()
            .filter(|l| l.is_caller)
            .collect();
        assert_eq!(callers.len(), 1);
        assert_eq!(callers[0].code, "line 5");
    }

    #[test]
    fn caller_flag_absent_when_fault_line_is_blank() {
        let file = write_source(&["a", "", "c"]);
        let path = file.path().to_str().unwrap().to_owned();

        let tb = capturer().capture(&[RawFrame::new(&path, "f", 2)]);
        assert!(tb.frames[0].lines.iter().all(|l| !l.is_caller));
    }

    #[test]
    fn unreadable_source_yields_empty_context() {
        let tb = capturer().capture(&[RawFrame::new("/no/such/file.rs", "f", 3)]);
        assert_eq!(tb.frames.len(), 1);
        assert!(tb.frames[0].lines.is_empty());
        assert_eq!(tb.frames[0].line_number, 3);
    }

    #[test]
    fn synthetic_chain_preserves_order_and_depth() {
        let tb = capturer().capture(&[
            RawFrame::new("/no/inner.rs", "inner", 10),
            RawFrame::new("/no/middle.rs", "middle", 20),
            RawFrame::new("/no/outer.rs", "outer", 30),
        ]);
        assert_eq!(tb.frames.len(), 3);
        assert_eq!(tb.frames[0].code_name, "inner");
        assert_eq!(tb.frames[2].code_name, "outer");
    }

    // --- Path normalization ---

    #[test]
    fn toolchain_paths_collapse_to_marker_prefix() {
        let c = capturer();
        assert_eq!(
            c.normalize_path("/home/u/.rustup/toolchains/stable/lib/core.rs"),
            "/toolchains/stable/lib/core.rs"
        );
    }

    #[test]
    fn sandbox_paths_collapse_to_root_relative() {
        let c = capturer();
        assert_eq!(
            c.normalize_path("/build/out/app.runfiles/workspace/src/main.rs"),
            "/workspace/src/main.rs"
        );
    }

    #[test]
    fn unmarked_paths_pass_through() {
        let c = capturer();
        assert_eq!(c.normalize_path("/srv/app/src/main.rs"), "/srv/app/src/main.rs");
    }

    // --- App-code classification ---

    #[test]
    fn app_markers_classify_frames() {
        let c = capturer();
        assert!(c.is_app_code("/srv/app/examples/counter.rs"));
        assert!(c.is_app_code("/srv/app/testing/fixtures.rs"));
        assert!(!c.is_app_code("/srv/app/src/dispatch.rs"));
    }

    #[test]
    fn custom_app_markers_are_honored() {
        let c = TracebackCapturer::new(TracebackConfig {
            app_markers: vec!["pages".to_owned()],
            ..TracebackConfig::default()
        });
        assert!(c.is_app_code("/srv/app/pages/home.rs"));
        assert!(!c.is_app_code("/srv/app/examples/counter.rs"));
    }

    #[test]
    fn traceback_serializes_camel_case() {
        let tb = Traceback {
            frames: vec![StackFrame {
                filename: "/f.rs".into(),
                code_name: "f".into(),
                line_number: 1,
                lines: vec![ContextLine {
                    code: "x".into(),
                    is_caller: true,
                }],
                is_app_code: false,
            }],
        };
        let json = serde_json::to_value(&tb).unwrap();
        assert_eq!(json["frames"][0]["codeName"], "f");
        assert_eq!(json["frames"][0]["lineNumber"], 1);
        assert_eq!(json["frames"][0]["lines"][0]["isCaller"], true);
        assert_eq!(json["frames"][0]["isAppCode"], false);
    }
}
