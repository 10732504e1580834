fn main() {
    signdesk_cli::init_tracing();

    if let Err(error) = signdesk_cli::run(std::env::args_os()) {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}
