use std::fmt;
use std::panic::Location;

use mythtpl_conf::Settings;
use serde::Deserialize;
use serde::Serialize;

/// Compiler switches, usually derived from [`Settings`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileOptions {
    /// Match built-in tag names case-insensitively (`{LOOP=...}`).
    pub case_insensitive_tags: bool,
    /// Honor `{php}` regions instead of degrading them to ignored blocks.
    pub allow_raw_code: bool,
    /// Drop HTML comments from the output.
    pub strip_comments: bool,
    /// Initial output-escaping policy.
    pub auto_escape: bool,
    pub charset: String,
    /// Prefix stripped from a template's directory when resolving includes.
    pub template_dir: String,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            case_insensitive_tags: false,
            allow_raw_code: false,
            strip_comments: false,
            auto_escape: false,
            charset: "UTF-8".to_string(),
            template_dir: String::new(),
        }
    }
}

impl From<&Settings> for CompileOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            case_insensitive_tags: settings.tags_icase,
            allow_raw_code: settings.allow_php,
            strip_comments: settings.remove_comments,
            auto_escape: settings.auto_escape,
            charset: settings.charset.clone(),
            template_dir: settings.template_dir.clone(),
        }
    }
}

/// Where a template came from, used for include resolution and error messages.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Origin {
    File {
        /// Directory holding the template, including the template root.
        directory: String,
        path: String,
    },
    String {
        caller_file: String,
        caller_line: u32,
    },
}

impl Origin {
    #[must_use]
    pub fn file(directory: impl Into<String>, path: impl Into<String>) -> Self {
        Origin::File {
            directory: directory.into(),
            path: path.into(),
        }
    }

    /// An in-memory origin that records the source location of its caller.
    #[must_use]
    #[track_caller]
    pub fn caller() -> Self {
        let location = Location::caller();
        Origin::String {
            caller_file: location.file().to_string(),
            caller_line: location.line(),
        }
    }

    /// Directory of the template, empty for in-memory sources.
    #[must_use]
    pub fn directory(&self) -> &str {
        match self {
            Origin::File { directory, .. } => directory,
            Origin::String { .. } => "",
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::File { path, .. } => f.write_str(path),
            Origin::String {
                caller_file,
                caller_line,
            } => write!(f, "the string loaded by {caller_file} at line {caller_line}"),
        }
    }
}
