//! Document shell composition.
//!
//! The shell is an HTML document with four anchors. Fragments are spliced in
//! at each anchor and everything else is copied through unchanged:
//!
//! | anchor            | inserted                                  |
//! |-------------------|-------------------------------------------|
//! | after `<head>`    | base, title, meta                         |
//! | before `</head>`  | styles, links                             |
//! | after mount marker| app markup (the mount element's content)  |
//! | before `</body>`  | hydration script, script tags             |

use std::borrow::Cow;
use std::path::Path;

use crate::error::TemplateError;

pub const DEFAULT_MOUNT_MARKER: &str = "<div id=\"app\">";
pub const HEAD_OPEN: &str = "<head>";
pub const HEAD_CLOSE: &str = "</head>";
pub const BODY_CLOSE: &str = "</body>";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Anchors {
    /// Offset just past `<head>`.
    head_open: usize,
    /// Offset of `</head>`.
    head_close: usize,
    /// Offset just past the mount marker.
    mount: usize,
    /// Offset of `</body>`.
    body_close: usize,
}

/// Markup spliced into the shell.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fragments {
    pub base: String,
    pub title: String,
    pub meta: String,
    pub links: String,
    pub styles: String,
    pub app: String,
    pub state_script: String,
    pub scripts: String,
}

/// A validated document shell.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    shell: String,
    mount_marker: String,
    anchors: Anchors,
}

impl Template {
    /// Parse a shell using the default mount marker.
    pub fn parse(shell: impl Into<String>) -> Result<Self, TemplateError> {
        Self::with_mount_marker(shell, DEFAULT_MOUNT_MARKER)
    }

    pub fn with_mount_marker(
        shell: impl Into<String>,
        mount_marker: &str,
    ) -> Result<Self, TemplateError> {
        let shell = shell.into();

        let head_open = find(&shell, HEAD_OPEN)? + HEAD_OPEN.len();
        let head_close = find(&shell, HEAD_CLOSE)?;
        let mount = find(&shell, mount_marker)? + mount_marker.len();
        let body_close = shell
            .rfind(BODY_CLOSE)
            .ok_or_else(|| TemplateError::MissingAnchor(BODY_CLOSE.to_string()))?;

        if head_close < head_open {
            return Err(TemplateError::Misordered(HEAD_CLOSE.to_string()));
        }
        if mount < head_close {
            return Err(TemplateError::Misordered(mount_marker.to_string()));
        }
        if body_close < mount {
            return Err(TemplateError::Misordered(BODY_CLOSE.to_string()));
        }

        Ok(Self {
            shell,
            mount_marker: mount_marker.to_string(),
            anchors: Anchors {
                head_open,
                head_close,
                mount,
                body_close,
            },
        })
    }

    /// Read and parse a shell file.
    pub fn load(path: impl AsRef<Path>, mount_marker: &str) -> Result<Self, TemplateError> {
        let shell = std::fs::read_to_string(path)?;
        Self::with_mount_marker(shell, mount_marker)
    }

    pub fn shell(&self) -> &str {
        &self.shell
    }

    pub fn mount_marker(&self) -> &str {
        &self.mount_marker
    }

    /// This shell parsed around `mount_marker`, borrowed when it already is.
    pub fn remount(&self, mount_marker: &str) -> Result<Cow<'_, Self>, TemplateError> {
        if self.mount_marker == mount_marker {
            return Ok(Cow::Borrowed(self));
        }
        Self::with_mount_marker(self.shell.as_str(), mount_marker).map(Cow::Owned)
    }

    /// Splice `fragments` into the shell.
    pub fn compose(&self, fragments: &Fragments) -> String {
        let Anchors {
            head_open,
            head_close,
            mount,
            body_close,
        } = self.anchors;
        let shell = &self.shell;

        let extra = fragments.base.len()
            + fragments.title.len()
            + fragments.meta.len()
            + fragments.links.len()
            + fragments.styles.len()
            + fragments.app.len()
            + fragments.state_script.len()
            + fragments.scripts.len();
        let mut out = String::with_capacity(shell.len() + extra);

        out.push_str(&shell[..head_open]);
        out.push_str(&fragments.base);
        out.push_str(&fragments.title);
        out.push_str(&fragments.meta);
        out.push_str(&shell[head_open..head_close]);
        out.push_str(&fragments.styles);
        out.push_str(&fragments.links);
        out.push_str(&shell[head_close..mount]);
        out.push_str(&fragments.app);
        out.push_str(&shell[mount..body_close]);
        out.push_str(&fragments.state_script);
        out.push_str(&fragments.scripts);
        out.push_str(&shell[body_close..]);
        out
    }
}

fn find(shell: &str, anchor: &str) -> Result<usize, TemplateError> {
    shell
        .find(anchor)
        .ok_or_else(|| TemplateError::MissingAnchor(anchor.to_string()))
}
