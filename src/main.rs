fn main() {
    if let Err(err) = wgpu_forward::run() {
        eprintln!("fatal: {err}");
        std::process::exit(1);
    }
}
