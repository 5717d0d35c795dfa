//! CLI entry point: `proxy [port]`.

use relay_proxy::config::Config;

fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt::init();

    // Belt-and-suspenders SIGPIPE ignore, matching the convention of
    // C-heritage proxies; Rust's runtime already installs SIG_IGN for
    // SIGPIPE before `main` runs, so this is documentation value rather
    // than a functional requirement.
    unsafe {
        libc::signal(libc::SIGPIPE, libc::SIG_IGN);
    }

    let config = Config::from_args(std::env::args()).unwrap_or_else(|err| {
        eprintln!("proxy: {err}");
        std::process::exit(1);
    });

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(relay_proxy::server::run(config))
}
