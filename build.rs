fn main() {
    println!(
        "cargo:rustc-env=WEBHDFS_PROXY_BUILD_TIME={}",
        chrono::Utc::now().format("%Y-%m-%d %H:%M:%S"),
    );
}
