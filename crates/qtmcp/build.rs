//! Compiles the `cxx` bridge against the target's Qt headers.
//!
//! Qt's include path is not discoverable in a portable way without `qmake`/`cmake`,
//! so it is taken from `QTMCP_QT_INCLUDE` (colon-separated on Unix, semicolon on
//! Windows). Builds without that variable set still succeed — the bridge module is
//! compiled, but linking the final loader crate against a real `libQt*Core` is left
//! to `qtmcp-loader`'s build script, which is the crate that actually embeds into a
//! Qt process.

fn main() {
  let mut build = cxx_build::bridge("src/ffi/bridge.rs");
  build
    .file("src/ffi/shim.cpp")
    .flag_if_supported("-std=c++17")
    .define("QTMCP_QT6", None); // overridden to 0 by the loader's build script on Qt5 targets

  if let Ok(include_path) = std::env::var("QTMCP_QT_INCLUDE") {
    let sep = if cfg!(windows) { ';' } else { ':' };
    for dir in include_path.split(sep).filter(|s| !s.is_empty()) {
      build.include(dir);
    }
  }

  build.compile("qtmcp-ffi-bridge");

  println!("cargo:rerun-if-changed=src/ffi/bridge.rs");
  println!("cargo:rerun-if-changed=src/ffi/shim.cpp");
  println!("cargo:rerun-if-changed=src/ffi/shim.h");
  println!("cargo:rerun-if-env-changed=QTMCP_QT_INCLUDE");
}
