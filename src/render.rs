//! Markdown transform passes applied before display.
//!
//! Three rewrites over raw strand text: strip custom control-flag tokens
//! (`::word-with-hyphens::`), point relative image references at the
//! raw-content CDN, and resolve relative markdown links against the
//! strand's directory. Code fences and anything already carrying a
//! scheme pass through untouched; display highlighting belongs to the
//! rendering front-end, not this pipeline.

use regex::Regex;

/// Where a strand lives, for resolving relative references.
#[derive(Debug, Clone)]
pub struct RenderContext {
    /// Raw-content base for this branch, e.g.
    /// `https://raw.githubusercontent.com/owner/repo/main`.
    pub raw_base: String,
    /// Directory of the strand being rendered, "" at the root.
    pub current_dir: String,
}

pub struct MarkdownPipeline {
    flag_re: Regex,
    link_re: Regex,
    strip_flags: bool,
}

impl MarkdownPipeline {
    pub fn new(strip_flags: bool) -> Self {
        // Both regexes are fixed; construction cannot fail.
        Self {
            flag_re: Regex::new(r"::[A-Za-z0-9]+(?:-[A-Za-z0-9]+)*::").unwrap(),
            // Images and links share one pass; the optional bang
            // distinguishes them (the regex crate has no lookbehind).
            link_re: Regex::new(r"(!?)\[([^\]]*)\]\(([^)\s]+)\)").unwrap(),
            strip_flags,
        }
    }

    /// Remove control-flag tokens like `::no-toc::` or `::draft::`.
    pub fn strip_control_flags(&self, text: &str) -> String {
        self.flag_re.replace_all(text, "").into_owned()
    }

    /// Rewrite image and link targets. Relative images become absolute
    /// raw-CDN URLs; relative markdown links are normalized against the
    /// current directory so the viewer can navigate them.
    pub fn rewrite_references(&self, text: &str, ctx: &RenderContext) -> String {
        self.link_re
            .replace_all(text, |caps: &regex::Captures<'_>| {
                let bang = &caps[1];
                let label = &caps[2];
                let target = &caps[3];

                if has_scheme(target) {
                    return caps[0].to_string();
                }

                if bang == "!" {
                    let resolved = resolve_relative(&ctx.current_dir, target);
                    format!(
                        "![{}]({}/{})",
                        label,
                        ctx.raw_base.trim_end_matches('/'),
                        resolved
                    )
                } else if is_markdown_target(target) {
                    format!("[{}]({})", label, resolve_relative(&ctx.current_dir, target))
                } else {
                    caps[0].to_string()
                }
            })
            .into_owned()
    }

    /// Full pipeline: flags first, then reference rewriting.
    pub fn apply(&self, text: &str, ctx: &RenderContext) -> String {
        let text = if self.strip_flags {
            self.strip_control_flags(text)
        } else {
            text.to_string()
        };
        self.rewrite_references(&text, ctx)
    }
}

fn has_scheme(target: &str) -> bool {
    target.starts_with("http://")
        || target.starts_with("https://")
        || target.starts_with("data:")
        || target.starts_with('#')
}

fn is_markdown_target(target: &str) -> bool {
    let path = target.split('#').next().unwrap_or(target);
    let lower = path.to_ascii_lowercase();
    lower.ends_with(".md") || lower.ends_with(".mdx")
}

/// Resolve a relative target against a directory: `.` segments drop,
/// `..` pops, a leading `/` restarts from the repository root. The
/// result is always a root-relative path with no empty segments.
pub fn resolve_relative(current_dir: &str, target: &str) -> String {
    let mut segments: Vec<&str> = if target.starts_with('/') {
        Vec::new()
    } else {
        current_dir.split('/').filter(|s| !s.is_empty()).collect()
    };

    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }

    segments.join("/")
}
