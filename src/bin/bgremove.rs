//! Background removal CLI tool
//!
//! `bgremove <input_path> <output_path>`

#[cfg(feature = "cli")]
fn main() -> std::process::ExitCode {
    bgremove::cli::main()
}

#[cfg(not(feature = "cli"))]
fn main() {
    panic!("CLI feature not enabled. Please rebuild with --features cli");
}
