use anyhow::Context;
use aura_core::config::Config;
use std::path::Path;

pub fn run(root: &Path, port: Option<u16>, open: bool) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load config")?;
    let port = port.unwrap_or(config.server.port);

    let rt = tokio::runtime::Runtime::new()?;
    let root_buf = root.to_path_buf();

    rt.block_on(async move {
        let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
            .await
            .with_context(|| format!("cannot listen on port {port}"))?;
        let actual_port = listener.local_addr()?.port();
        println!("aura for {} → http://localhost:{actual_port}", root_buf.display());

        tokio::select! {
            res = aura_server::serve_on(root_buf, listener, open) => res,
            _ = tokio::signal::ctrl_c() => Ok(()),
        }
    })
}
