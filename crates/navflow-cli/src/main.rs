use std::ffi::OsString;

use navflow_core::notice::Notice;

fn main() {
    let args: Vec<OsString> = std::env::args_os().collect();
    if let Err(err) = navflow_core::run(args) {
        eprintln!("error: {}", Notice::from_error(&err));
        std::process::exit(1);
    }
}
