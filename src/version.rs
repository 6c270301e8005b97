/// Returns the version banner printed by `--version`.
pub fn version_info(build_time: Option<&str>) -> String {
    let fallback = "Unknown (env var does not exist when building)";
    format!(
        "\nRelease Version:   {}\
         \nGit Commit Hash:   {}\
         \nUTC Build Time:    {}\
         \nRust Version:      {}\
         \nProfile:           {}",
        env!("CARGO_PKG_VERSION"),
        option_env!("WEBHDFS_PROXY_BUILD_GIT_HASH").unwrap_or(fallback),
        build_time.unwrap_or(fallback),
        option_env!("WEBHDFS_PROXY_BUILD_RUSTC_VERSION").unwrap_or(fallback),
        option_env!("WEBHDFS_PROXY_PROFILE").unwrap_or(fallback),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_info() {
        let info = version_info(Some("2021-01-01 00:00:00"));
        assert!(info.contains(env!("CARGO_PKG_VERSION")));
        assert!(info.contains("2021-01-01 00:00:00"));
        assert!(version_info(None).contains("Unknown"));
    }
}
