use solc_runtime::{DlModule, Error, Solc};
use std::io::Write;

#[test]
fn load_nonexistent_module() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("libsolc.so");
    assert!(matches!(Solc::load(&path), Err(Error::DlError(_))));
}

#[test]
fn load_non_library_file() {
    let mut file = tempfile::Builder::new()
        .prefix("soljson")
        .suffix(".so")
        .tempfile()
        .unwrap();
    file.write_all(b"this is not a shared object").unwrap();
    file.flush().unwrap();
    assert!(matches!(
        DlModule::load_with_symbol_prefix(file.path(), "_"),
        Err(Error::DlError(_))
    ));
}
