use clap::Parser;

fn main() -> anyhow::Result<()> {
    let cfg = pivroot::config::Config::parse();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let result = runtime.block_on(pivroot::run(cfg));
    // A blocking enrollment may still be waiting on the device or terminal after Ctrl-C.
    runtime.shutdown_background();
    result
}
