use std::env;

fn main() {
    // DuckDB 的 bundled 库在 Windows 上引用 Restart Manager (Rm*) 符号，
    // 需要链接 Rstrtmgr.lib；只在启用 DuckDB 目标时链接。
    let windows = env::var("CARGO_CFG_TARGET_OS").unwrap_or_default() == "windows";
    let duckdb = env::var_os("CARGO_FEATURE_TARGET_DUCKDB").is_some();
    if windows && duckdb {
        println!("cargo:rustc-link-lib=Rstrtmgr");
    }
}
