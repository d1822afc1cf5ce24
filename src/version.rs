//! Build metadata: crate version plus git details captured by vergen.

/// Package version from Cargo.toml.
pub const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Git branch at build time, or "unknown" outside a checkout.
pub const GIT_BRANCH: &str = match option_env!("VERGEN_GIT_BRANCH") {
    Some(branch) => branch,
    None => "unknown",
};

/// Git commit SHA at build time, or "unknown" outside a checkout.
pub const GIT_SHA: &str = match option_env!("VERGEN_GIT_SHA") {
    Some(sha) => sha,
    None => "unknown",
};

/// Whether the working tree had uncommitted changes at build time.
pub fn git_dirty() -> bool {
    option_env!("VERGEN_GIT_DIRTY") == Some("true")
}

/// `{version}+{branch}.{short sha}`, with `.dirty` appended for dirty trees.
///
/// Printed by `copysmith version`.
pub fn version_string() -> String {
    let short_sha = &GIT_SHA[..7.min(GIT_SHA.len())];
    let dirty = if git_dirty() { ".dirty" } else { "" };
    format!("{PKG_VERSION}+{GIT_BRANCH}.{short_sha}{dirty}")
}

/// `User-Agent` sent with every upstream request.
pub(crate) fn user_agent() -> String {
    format!("copysmith/{PKG_VERSION}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_string_starts_with_pkg_version() {
        assert!(version_string().starts_with(PKG_VERSION));
    }

    #[test]
    fn version_string_carries_branch() {
        let version = version_string();
        assert!(version.contains('+'));
        assert!(version.contains(GIT_BRANCH));
    }

    #[test]
    fn user_agent_names_crate_and_version() {
        assert_eq!(user_agent(), format!("copysmith/{PKG_VERSION}"));
    }
}
