use std::collections::HashSet;
use std::path::PathBuf;
use std::str::FromStr;

/// How a generic procedure picks among candidates whose signatures all match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverloadPolicy {
    /// First candidate in declaration order wins.
    #[default]
    FirstMatch,
    /// More than one matching candidate is an error.
    Unique,
}

impl FromStr for OverloadPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "first-match" | "first" => Ok(OverloadPolicy::FirstMatch),
            "unique" | "strict" => Ok(OverloadPolicy::Unique),
            other => Err(format!("unknown overload policy '{}'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SemaSettings {
    pub allow: HashSet<String>,
    pub deny: HashSet<String>,
    pub error: HashSet<String>,
    pub wall: bool,
    pub werror: bool,
    pub overload_policy: OverloadPolicy,
    pub module_paths: Vec<PathBuf>,
    /// Replace array intrinsic calls by generated helper procedures.
    pub lower_array_intrinsics: bool,
    /// Apply the i-n integer rule in units without `implicit none`.
    pub default_implicit_typing: bool,
}

impl Default for SemaSettings {
    fn default() -> Self {
        SemaSettings {
            allow: HashSet::new(),
            deny: HashSet::new(),
            error: HashSet::new(),
            wall: false,
            werror: false,
            overload_policy: OverloadPolicy::FirstMatch,
            module_paths: Vec::new(),
            lower_array_intrinsics: true,
            default_implicit_typing: false,
        }
    }
}

impl SemaSettings {
    /// Lints listed here fire only with `-Wall` or an explicit `deny`/`error`.
    const OPT_IN: &'static [&'static str] = &["unused_dummy_argument"];

    /// Whether a lint is reported at all.
    pub fn lint_enabled(&self, name: &str) -> bool {
        let name = name.to_ascii_lowercase();
        if self.allow.contains(&name) {
            return false;
        }
        if Self::OPT_IN.contains(&name.as_str()) {
            return self.wall || self.deny.contains(&name) || self.error.contains(&name);
        }
        true
    }

    /// Whether a reported lint counts as an error.
    pub fn lint_is_error(&self, name: &str) -> bool {
        let name = name.to_ascii_lowercase();
        self.werror || self.error.contains(&name) || self.deny.contains(&name)
    }

    /// Folds `!#allow(...)`-style directives into these settings.
    pub fn merge(&mut self, other: SemaSettings) {
        self.allow.extend(other.allow);
        self.deny.extend(other.deny);
        self.error.extend(other.error);
        self.wall |= other.wall;
        self.werror |= other.werror;
    }
}

pub fn parse_directives(src: &str) -> SemaSettings {
    let mut s = SemaSettings::default();
    for line in src.lines() {
        let l = line.trim();
        if let Some(rest) = l.strip_prefix("!#") {
            let r = rest.trim();
            for (kw, set) in [
                ("allow", &mut s.allow),
                ("deny", &mut s.deny),
                ("error", &mut s.error),
            ] {
                let prefix = format!("{}(", kw);
                if r.starts_with(&prefix) && r.ends_with(')') {
                    let inner = &r[prefix.len()..r.len() - 1];
                    let name = inner.trim().to_ascii_lowercase();
                    set.insert(name);
                }
            }
        }
    }
    s
}
