use anyhow::Result;
use std::path::PathBuf;
use vistoria_server::StaticServer;

/// Serve a static application bundle until Ctrl+C.
pub fn execute(root: PathBuf, port: u16) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        let server = StaticServer::bind(root, port).await?;
        let addr = server.local_addr()?;

        println!("✓ Serving on http://{}", addr);
        println!();
        println!("Point scenario base_url values at this address.");
        println!("Press Ctrl+C to stop...");

        let shutdown = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to install Ctrl+C handler: {}", e);
            }
            println!();
            println!("🛑 Shutting down...");
        };

        server.run_until(shutdown).await?;
        anyhow::Ok(())
    })?;

    Ok(())
}
