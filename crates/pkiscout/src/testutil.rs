//! Fixture helpers shared by the test modules.

use std::fs;
use std::path::{Path, PathBuf};

pub const RSA_FP: &str = "952679f858cfdb1f477a1c19b9ddab21b60941ff4e7e973f503526a5c8e33299";
pub const EC_FP: &str = "8e35eedc3a2d8bc03a08cfe64c2c47e5d1692da3b87691dbf843b70b882c9e32";
pub const ENC_FP: &str = "d185a577d3ee55ae423468eb7fcddf18df600583f1cb475edc216578b5b67715";
/// SHA-256 of the DER inside `enc.key`
pub const ENC_BLOB_FP: &str = "fc131e6e88b61ce8171cde027eabd1ae0307dbd49d8e66bf71bf8f600bfc165f";

/// Contents of a file under `testdata/`.
pub fn fixture(name: &str) -> Vec<u8> {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("testdata")
        .join(name);
    fs::read(&path).unwrap_or_else(|e| panic!("fixture {}: {e}", path.display()))
}

/// Copy fixture `name` to `dir/rel`, creating parent directories.
pub fn place(dir: &Path, rel: &str, name: &str) -> PathBuf {
    let dest = dir.join(rel);
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&dest, fixture(name)).unwrap();
    dest
}
