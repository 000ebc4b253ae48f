//! Links the final cdylib against the host's Qt libraries.
//!
//! `crates/qtmcp`'s build script only compiles the `cxx` bridge; it never links
//! against `libQt*Core` because a static library doesn't need to resolve Qt's
//! symbols until something loads it into a process that already has them. This
//! crate is that something, so it is the one that needs `QTMCP_QT_LIB` (same
//! separator convention as `QTMCP_QT_INCLUDE`) pointing at the directory holding
//! `libQt6Core`/`libQt6Widgets`/`libQt6Gui` (or their Qt5 equivalents, selected
//! with `QTMCP_QT5=1`).

fn main() {
  let qt5 = std::env::var("QTMCP_QT5").as_deref() == Ok("1");
  let suffix = if qt5 { "5" } else { "6" };

  if let Ok(lib_path) = std::env::var("QTMCP_QT_LIB") {
    let sep = if cfg!(windows) { ';' } else { ':' };
    for dir in lib_path.split(sep).filter(|s| !s.is_empty()) {
      println!("cargo:rustc-link-search=native={dir}");
    }
  }

  for module in ["Core", "Gui", "Widgets"] {
    println!("cargo:rustc-link-lib=dylib=Qt{suffix}{module}");
  }

  println!("cargo:rerun-if-env-changed=QTMCP_QT_LIB");
  println!("cargo:rerun-if-env-changed=QTMCP_QT5");
}
