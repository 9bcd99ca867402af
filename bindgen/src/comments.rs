//! Header comment reconstruction: a backward block scan feeding a section
//! state machine.
//!
//! PDFium documents each exported function with a loosely formatted block:
//!
//! ```text
//! // Function: FPDF_LoadPage
//! //          Load a page inside the document.
//! // Parameters:
//! //          document    -   Handle to document. Returned by
//! //                          FPDF_LoadDocument.
//! //          page_index  -   Index number of the page. 0 for the first
//! //                          page.
//! // Return value:
//! //          A handle to the loaded page, or NULL if page load fails.
//! ```
//!
//! The block is recovered by walking upward from the declaration, then each
//! line is classified into a section and either starts a new segment or
//! continues the previous one.

use crate::corpus::HeaderCorpus;
use crate::error::Result;
use crate::model::*;
use tracing::{debug, info};

/// Marks the top of a function's comment block.
pub const BLOCK_SENTINEL: &str = "// Function:";

// Three-character prefixes are tried before the two-character ones so that
// `// x` loses its separating space.
const PREFIXES_3: [&str; 3] = ["// ", " * ", " */"];
const PREFIXES_2: [&str; 5] = ["//", " *", "* ", "/*", "*/"];

/// Leading spaces that turn a line into a continuation, per section.
const PARAMETERS_INDENT: usize = 12;
const COMMENTS_INDENT: usize = 4;

// -- Block scan ---------------------------------------------------------------

/// Collect the comment block above a declaration starting at 1-based `line`.
///
/// Walks upward from the line above the declaration until a blank line (not
/// collected) or a sentinel line (collected). Lines come back top-to-bottom.
pub fn collect_block(lines: &[String], line: u32) -> Vec<&str> {
    let mut stack: Vec<&str> = Vec::new();
    let Some(start) = (line as usize).checked_sub(2) else {
        return stack;
    };
    if start >= lines.len() {
        return stack;
    }

    for text in lines[..=start].iter().rev() {
        if text.trim().is_empty() {
            break;
        }
        stack.push(text);
        if text.starts_with(BLOCK_SENTINEL) {
            break;
        }
    }

    stack.reverse();
    stack
}

/// Remove one recognized comment delimiter from the start of `line`.
pub fn strip_comment_prefix(line: &str) -> &str {
    PREFIXES_3
        .iter()
        .chain(PREFIXES_2.iter())
        .find_map(|prefix| line.strip_prefix(prefix))
        .unwrap_or(line)
}

// -- Section state machine ----------------------------------------------------

/// What to do with one stripped comment line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineAction {
    /// Append to the previous segment.
    Continue,
    /// Start a new segment.
    Start,
    /// Drop the line.
    Skip,
}

/// Tracks the current section across the lines of one block.
#[derive(Debug, Default)]
pub struct SectionMachine {
    section: CommentSection,
}

impl SectionMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn section(&self) -> CommentSection {
        self.section
    }

    /// Feed one stripped line. A label line switches sections; anything else
    /// leaves the state untouched.
    pub fn advance(&mut self, content: &str) -> CommentSection {
        let starts_flush = content.chars().next().is_some_and(|c| !c.is_whitespace());
        if starts_flush {
            if let Some(next) = CommentSection::from_label(content.trim()) {
                self.section = next;
            }
        }
        self.section
    }
}

/// Decide how `content` joins the segment list while in `section`.
///
/// `open` is true when the last segment has text a continuation can extend.
/// Inside Parameters and Comments a whitespace-only line that is not a
/// continuation opens an empty segment, which marks a paragraph break.
pub fn line_action(section: CommentSection, content: &str, open: bool) -> LineAction {
    let threshold = match section {
        CommentSection::Parameters => Some(PARAMETERS_INDENT),
        CommentSection::Comments => Some(COMMENTS_INDENT),
        _ => None,
    };

    match threshold {
        Some(indent) if open && leading_spaces(content) >= indent => LineAction::Continue,
        None if content.trim().is_empty() => LineAction::Skip,
        _ => LineAction::Start,
    }
}

fn leading_spaces(s: &str) -> usize {
    s.bytes().take_while(|&b| b == b' ').count()
}

/// Collapse internal whitespace runs and trim.
fn normalize(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Classify a top-to-bottom comment block into one paragraph of segments.
pub fn reconstruct_block(block: &[&str]) -> Paragraph {
    let mut machine = SectionMachine::new();
    let mut segments: Vec<Segment> = Vec::new();

    for raw in block {
        if raw.is_empty() {
            continue;
        }
        let content = strip_comment_prefix(raw);
        let section = machine.advance(content);

        let open = segments.last().is_some_and(|s| !s.text.is_empty());
        match line_action(section, content, open) {
            LineAction::Skip => {}
            LineAction::Continue => {
                let text = normalize(content);
                if let (Some(last), false) = (segments.last_mut(), text.is_empty()) {
                    last.text.push(' ');
                    last.text.push_str(&text);
                }
            }
            LineAction::Start => segments.push(Segment {
                section,
                text: normalize(content),
                trailing_newline: true,
            }),
        }
    }

    Paragraph { segments }
}

// -- Pass over the tree -------------------------------------------------------

/// Rebuild the documentation of every free function from its header comment.
///
/// Replaces whatever the parser attached natively. Methods keep theirs.
/// Returns the number of declarations that received a non-empty block.
pub fn reconstruct_comments(tree: &mut DeclarationTree, corpus: &mut HeaderCorpus) -> Result<usize> {
    let mut documented = 0;

    for decl in &mut tree.declarations {
        if !matches!(decl.kind, DeclKind::Function(_)) {
            continue;
        }
        let lines = corpus.lines_of(&decl.location.file)?;
        let block = collect_block(lines, decl.location.line);
        let paragraph = reconstruct_block(&block);
        if paragraph.segments.is_empty() {
            debug!(function = %decl.name, "no preceding comment block");
        } else {
            documented += 1;
        }
        decl.doc = Some(Documentation::single(paragraph));
    }

    info!(
        documented,
        headers = corpus.cached_files(),
        "reconstructed function documentation"
    );
    Ok(documented)
}
