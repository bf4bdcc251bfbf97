use les_cli::RunOutcome;

#[tokio::main]
async fn main() {
    let cwd = match std::env::current_dir() {
        Ok(cwd) => cwd,
        Err(err) => {
            eprintln!("Error: {err}");
            std::process::exit(1);
        }
    };

    match les_cli::run(std::env::args(), &cwd).await {
        Ok(RunOutcome::Usage(usage)) => println!("{usage}"),
        Ok(RunOutcome::Initialized) => {}
        Ok(RunOutcome::Started(mut started)) => {
            // Serve until interrupted, then release every listener.
            let _ = tokio::signal::ctrl_c().await;
            for server in &mut started {
                if let Some(info) = server.instance.stop() {
                    eprintln!(
                        "stopped (proto = {}, host = {}, port = {})",
                        info.proto, info.host, info.port
                    );
                }
            }
        }
        Err(err) => {
            eprintln!("Error: {err:#}");
            std::process::exit(1);
        }
    }
}
