use std::fmt;

/// Build metadata baked in at compile time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionInfo {
    pub version: &'static str,
    pub git_commit: Option<&'static str>,
    pub prerelease: Option<&'static str>,
}

impl VersionInfo {
    pub const fn current() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION"),
            git_commit: option_env!("CCRAWLER_GIT_COMMIT"),
            prerelease: option_env!("CCRAWLER_PRERELEASE"),
        }
    }
}

impl fmt::Display for VersionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CCrawler {}", self.version)?;
        if let Some(pre) = self.prerelease.filter(|p| !p.is_empty()) {
            write!(f, "-{}", pre)?;
        }
        write!(f, " (commit {})", self.git_commit.unwrap_or("unknown"))
    }
}
