//! Line-oriented post-processing over rendered documents.
//!
//! `serde_yaml` drops comments on both ends. [`PostProcessor`] makes
//! line-level edits over rendered text, and [`YamlWalker`] walks the key
//! lines with a section declaration to put field comments back where they
//! belong.

use docbind_core::SectionDecl;

// -----------------------------------------------------------------------------
// LineInfo

/// One key on the path from the document root to the line being walked.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LineInfo {
    name: String,
    indent: usize,
}

impl LineInfo {
    pub fn new(name: impl Into<String>, indent: usize) -> Self {
        Self {
            name: name.into(),
            indent,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Leading spaces of the key line.
    pub fn indent(&self) -> usize {
        self.indent
    }
}

// -----------------------------------------------------------------------------
// SectionWalker

/// Format hooks for walking the key lines of a rendered document.
pub trait SectionWalker {
    /// Whether the line opens a document key.
    fn is_path(&self, line: &str) -> bool;

    /// Whether the line starts a block whose body must pass through
    /// untouched.
    fn is_multiline_start(&self, line: &str) -> bool;

    /// The key name on the line.
    fn read_name<'a>(&self, line: &'a str) -> &'a str;

    /// Replacement text for a key line. `path` holds every key from the
    /// document root down to this line, the line's own key last. Return
    /// the line unchanged to leave it alone.
    fn update(&self, line: &str, path: &[LineInfo]) -> String;
}

// -----------------------------------------------------------------------------
// PostProcessor

/// Line-oriented edits over rendered document text.
pub struct PostProcessor {
    context: String,
}

impl PostProcessor {
    pub fn of(context: impl Into<String>) -> Self {
        Self {
            context: context.into(),
        }
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    pub fn into_string(self) -> String {
        self.context
    }

    /// Renders comment lines with `prefix`. A line already starting with
    /// the trimmed prefix keeps its own form.
    pub fn comment_block(prefix: &str, lines: &[String]) -> String {
        let bare = prefix.trim_end();
        let mut out = String::new();
        for line in lines {
            if !line.starts_with(bare) {
                out.push_str(prefix);
            }
            out.push_str(line);
            out.push('\n');
        }
        out
    }

    /// Drops every line the filter matches.
    #[must_use]
    pub fn remove_lines(mut self, filter: impl Fn(&str) -> bool) -> Self {
        let mut out = String::with_capacity(self.context.len());
        for line in self.context.lines() {
            if !filter(line) {
                out.push_str(line);
                out.push('\n');
            }
        }
        self.context = out;
        self
    }

    /// Rewrites every line through `update`.
    #[must_use]
    pub fn update_lines(mut self, update: impl Fn(&str) -> String) -> Self {
        let mut out = String::with_capacity(self.context.len());
        for line in self.context.lines() {
            out.push_str(&update(line));
            out.push('\n');
        }
        self.context = out;
        self
    }

    /// Walks key lines with their full path and lets the walker rewrite
    /// each one.
    ///
    /// The path is tracked through indentation: a key line pops every
    /// recorded key at the same or deeper indent before pushing its own.
    /// Lines inside a multiline block pass through without being read as
    /// keys.
    #[must_use]
    pub fn update_paths(mut self, walker: &dyn SectionWalker) -> Self {
        let mut out = String::with_capacity(self.context.len());
        let mut path: Vec<LineInfo> = Vec::new();
        let mut block_indent: Option<usize> = None;

        for line in self.context.lines() {
            let indent = indent_of(line);

            if let Some(opened_at) = block_indent {
                if line.trim().is_empty() || indent > opened_at {
                    out.push_str(line);
                    out.push('\n');
                    continue;
                }
                block_indent = None;
            }

            if walker.is_path(line) {
                while path.last().is_some_and(|info| info.indent() >= indent) {
                    path.pop();
                }
                path.push(LineInfo::new(walker.read_name(line), indent));
                if walker.is_multiline_start(line) {
                    block_indent = Some(indent);
                }
                out.push_str(&walker.update(line, &path));
                out.push('\n');
                continue;
            }

            out.push_str(line);
            out.push('\n');
        }

        self.context = out;
        self
    }

    /// Puts a comment block built from `lines` above the document, with a
    /// blank line in between.
    #[must_use]
    pub fn prepend_header(mut self, prefix: &str, lines: &[String]) -> Self {
        if lines.is_empty() {
            return self;
        }
        let mut out = Self::comment_block(prefix, lines);
        out.push('\n');
        out.push_str(&self.context);
        self.context = out;
        self
    }
}

fn indent_of(line: &str) -> usize {
    line.chars().take_while(|c| *c == ' ').count()
}

// -----------------------------------------------------------------------------
// YamlWalker

/// Key walker for YAML text, backed by a section declaration.
///
/// A key line whose path leads to a field with comments gets the comment
/// block inserted right above it, indented to match. Nested section
/// declarations are rebuilt from their descriptors on the way down; keys
/// with no matching declaration stay untouched.
pub struct YamlWalker<'d> {
    root: &'d SectionDecl,
    prefix: &'d str,
}

impl<'d> YamlWalker<'d> {
    pub fn new(root: &'d SectionDecl, prefix: &'d str) -> Self {
        Self { root, prefix }
    }
}

impl SectionWalker for YamlWalker<'_> {
    fn is_path(&self, line: &str) -> bool {
        let name = self.read_name(line);
        !name.is_empty() && !name.starts_with(['-', '#'])
    }

    fn is_multiline_start(&self, line: &str) -> bool {
        let trimmed = line.trim();
        ["|", "|-", ">", ">-"]
            .iter()
            .any(|tail| trimmed.ends_with(tail))
    }

    fn read_name<'a>(&self, line: &'a str) -> &'a str {
        line.split_once(':').map_or(line, |(head, _)| head).trim()
    }

    fn update(&self, line: &str, path: &[LineInfo]) -> String {
        let Some(info) = path.last() else {
            return line.to_owned();
        };
        let Some(comments) = field_comments(self.root, path) else {
            return line.to_owned();
        };
        if comments.is_empty() {
            return line.to_owned();
        }

        let block = PostProcessor::comment_block(self.prefix, &comments);
        let mut out = String::new();
        for comment in block.lines() {
            for _ in 0..info.indent() {
                out.push(' ');
            }
            out.push_str(comment);
            out.push('\n');
        }
        out.push_str(line);
        out
    }
}

/// The comment lines declared for the field at `path`, descending into
/// nested section declarations as needed.
fn field_comments(decl: &SectionDecl, path: &[LineInfo]) -> Option<Vec<String>> {
    let (head, rest) = path.split_first()?;
    let field = decl.field(head.name())?;
    if rest.is_empty() {
        return Some(field.comment_lines().to_vec());
    }
    let nested = SectionDecl::of(field.desc()).ok()?;
    field_comments(&nested, rest)
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::{LineInfo, PostProcessor, SectionWalker};

    struct RecordingWalker(RefCell<Vec<String>>);

    impl SectionWalker for RecordingWalker {
        fn is_path(&self, line: &str) -> bool {
            let name = self.read_name(line);
            !name.is_empty() && !name.starts_with(['-', '#'])
        }

        fn is_multiline_start(&self, line: &str) -> bool {
            line.trim().ends_with('|')
        }

        fn read_name<'a>(&self, line: &'a str) -> &'a str {
            line.split_once(':').map_or(line, |(head, _)| head).trim()
        }

        fn update(&self, line: &str, path: &[LineInfo]) -> String {
            let dotted: Vec<&str> = path.iter().map(LineInfo::name).collect();
            self.0.borrow_mut().push(dotted.join("."));
            line.to_owned()
        }
    }

    #[test]
    fn the_walk_tracks_nested_paths() {
        let text = "server:\n  port: 1\n  net:\n    host: x\nname: top\n";
        let walker = RecordingWalker(RefCell::default());

        let out = PostProcessor::of(text).update_paths(&walker).into_string();

        assert_eq!(out, text);
        assert_eq!(
            walker.0.into_inner(),
            ["server", "server.port", "server.net", "server.net.host", "name"]
        );
    }

    #[test]
    fn dedents_rewind_the_path() {
        let text = "a:\n  deep:\n    x: 1\nb: 2\n";
        let walker = RecordingWalker(RefCell::default());

        PostProcessor::of(text).update_paths(&walker);

        assert_eq!(walker.0.into_inner(), ["a", "a.deep", "a.deep.x", "b"]);
    }

    #[test]
    fn multiline_blocks_pass_through_unread() {
        let text = "note: |\n  looks: like-a-key\n\n  more text\nafter: 1\n";
        let walker = RecordingWalker(RefCell::default());

        let out = PostProcessor::of(text).update_paths(&walker).into_string();

        assert_eq!(out, text);
        assert_eq!(walker.0.into_inner(), ["note", "after"]);
    }

    #[test]
    fn list_items_are_not_keys() {
        let text = "features:\n- fast\n- safe\n";
        let walker = RecordingWalker(RefCell::default());

        PostProcessor::of(text).update_paths(&walker);

        assert_eq!(walker.0.into_inner(), ["features"]);
    }

    #[test]
    fn remove_and_update_compose() {
        let out = PostProcessor::of("# stale\nkey: 1\n")
            .remove_lines(|line| line.starts_with('#'))
            .update_lines(|line| line.replace('1', "2"))
            .into_string();

        assert_eq!(out, "key: 2\n");
    }

    #[test]
    fn headers_land_above_the_document() {
        let out = PostProcessor::of("key: 1\n")
            .prepend_header("# ", &["Top".to_owned(), "# kept-as-is".to_owned()])
            .into_string();

        assert_eq!(out, "# Top\n# kept-as-is\n\nkey: 1\n");
    }

    #[test]
    fn comment_blocks_respect_existing_prefixes() {
        let block =
            PostProcessor::comment_block("# ", &["plain".to_owned(), "#bare".to_owned()]);
        assert_eq!(block, "# plain\n#bare\n");
    }
}
